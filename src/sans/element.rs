//! The decoded element tree.
//!
//! A segment owns its fields, a field its components, and a component its
//! subcomponents. Each node holds either a direct value or children. Repeated
//! occurrences of a field are owned by the first occurrence and are not its
//! children.

use alloc::{borrow::Cow, string::String, sync::Arc, vec::Vec};
use core::iter;

use either::Either::{self, Left, Right};

use super::{
    SEGMENT_TERMINATOR,
    encoding::{DecodeError, Encoding},
};

/// The structural kind of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Segment,
    Field,
    Component,
    Subcomponent,
}

impl Kind {
    /// The delimiter separating siblings of this kind.
    pub fn delimiter(self, encoding: &Encoding) -> char {
        match self {
            Kind::Segment => SEGMENT_TERMINATOR as char,
            Kind::Field => encoding.field_delimiter(),
            Kind::Component => encoding.component_delimiter(),
            Kind::Subcomponent => encoding.subcomponent_delimiter(),
        }
    }

    /// The kind of children beneath this kind, if it can have any.
    pub const fn child(self) -> Option<Kind> {
        match self {
            Kind::Segment => Some(Kind::Field),
            Kind::Field => Some(Kind::Component),
            Kind::Component => Some(Kind::Subcomponent),
            Kind::Subcomponent => None,
        }
    }
}

/// Behaviour common to every node of the tree.
pub trait Element {
    /// The structural kind of this element.
    const KIND: Kind;

    /// The raw, undecoded value, if this element holds one directly.
    fn value(&self) -> Option<&str>;

    /// The position of this element within its parent.
    fn index(&self) -> usize;

    /// The encoding this element was produced with.
    fn encoding(&self) -> &Arc<Encoding>;

    /// Reconstruct the raw text of this element.
    ///
    /// Returns `None` for an absent element.
    fn inner_text(&self) -> Option<String>;

    /// The value with escape sequences resolved.
    fn decoded_value(&self) -> Result<Option<Cow<'_, str>>, DecodeError> {
        self.value().map(|v| self.encoding().decode(v)).transpose()
    }

    /// Whether the value is the explicit present-but-null marker.
    fn is_present_but_null(&self) -> bool {
        self.value() == Some(Encoding::PRESENT_BUT_NULL)
    }
}

/// An element that can own children.
///
/// Subcomponents are leaves and do not implement this trait.
pub trait Parent: Element {
    /// The element of kind [`Kind::child`] of this one.
    type Child: Element;

    fn children(&self) -> &[Self::Child];

    /// Create a detached child carrying this element's encoding.
    fn create_child(&self, value: Option<&str>) -> Self::Child;

    /// Create a child and append it to this element.
    fn add_child(&mut self, value: Option<&str>) -> &mut Self::Child;
}

/// Join the reconstructed text of children with their sibling delimiter.
fn join<C: Element>(children: &[C], encoding: &Encoding) -> String {
    let delimiter = C::KIND.delimiter(encoding);
    let mut text = String::new();

    for (i, child) in children.iter().enumerate() {
        if i != 0 {
            text.push(delimiter);
        }

        if let Some(t) = child.inner_text() {
            text.push_str(&t);
        }
    }

    text
}

macro_rules! parent {
    ($t:ident, $child:ident, $children:ident) => {
        const _: () = assert!(matches!(Kind::$t.child(), Some(Kind::$child)));

        impl Parent for $t {
            type Child = $child;

            fn children(&self) -> &[$child] {
                &self.$children
            }

            fn create_child(&self, value: Option<&str>) -> $child {
                let mut child = $child::new(Arc::clone(&self.encoding), value.map(String::from));
                child.index = self.$children.len();
                child
            }

            fn add_child(&mut self, value: Option<&str>) -> &mut $child {
                let child = self.create_child(value);
                let i = self.$children.len();
                self.$children.push(child);
                &mut self.$children[i]
            }
        }
    };
}

/// The innermost level of structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcomponent {
    pub(crate) value: Option<String>,
    pub(crate) index: usize,
    pub(crate) encoding: Arc<Encoding>,
}

impl Subcomponent {
    /// A leaf carrying a raw value.
    pub fn new(encoding: Arc<Encoding>, value: Option<String>) -> Self {
        Self {
            value,
            index: 0,
            encoding,
        }
    }
}

impl Element for Subcomponent {
    const KIND: Kind = Kind::Subcomponent;

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    fn inner_text(&self) -> Option<String> {
        self.value.clone()
    }
}

/// A subdivision of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub(crate) value: Option<String>,
    pub(crate) subcomponents: Vec<Subcomponent>,
    pub(crate) index: usize,
    pub(crate) encoding: Arc<Encoding>,
}

impl Component {
    /// A component with a raw value and no subcomponents.
    pub fn new(encoding: Arc<Encoding>, value: Option<String>) -> Self {
        Self {
            value,
            subcomponents: Vec::new(),
            index: 0,
            encoding,
        }
    }

    pub fn subcomponents(&self) -> &[Subcomponent] {
        &self.subcomponents
    }

    /// The direct value if present, otherwise the subcomponents.
    pub fn content(&self) -> Either<Option<&str>, &[Subcomponent]> {
        match &self.value {
            Some(value) => Left(Some(value.as_str())),
            None if self.subcomponents.is_empty() => Left(None),
            None => Right(&self.subcomponents),
        }
    }
}

impl Element for Component {
    const KIND: Kind = Kind::Component;

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    fn inner_text(&self) -> Option<String> {
        match self.content() {
            Left(value) => value.map(String::from),
            Right(subcomponents) => Some(join(subcomponents, &self.encoding)),
        }
    }
}

parent!(Component, Subcomponent, subcomponents);

/// A position within a segment.
///
/// When a field repeats, this is its first occurrence and owns the rest; see
/// [`Field::repetitions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub(crate) value: Option<String>,
    pub(crate) components: Vec<Component>,
    pub(crate) repeats: Vec<Field>,
    pub(crate) index: usize,
    pub(crate) encoding: Arc<Encoding>,
}

impl Field {
    /// A single occurrence with a raw value and no components.
    pub fn new(encoding: Arc<Encoding>, value: Option<String>) -> Self {
        Self {
            value,
            components: Vec::new(),
            repeats: Vec::new(),
            index: 0,
            encoding,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The direct value if present, otherwise the components.
    pub fn content(&self) -> Either<Option<&str>, &[Component]> {
        match &self.value {
            Some(value) => Left(Some(value.as_str())),
            None if self.components.is_empty() => Left(None),
            None => Right(&self.components),
        }
    }

    /// Every occurrence of this field, starting with this one.
    pub fn repetitions(&self) -> impl Iterator<Item = &Field> {
        iter::once(self).chain(&self.repeats)
    }

    /// Append an occurrence to the end of the repetition chain.
    pub fn push_repetition(&mut self, mut field: Field) {
        let repeats = core::mem::take(&mut field.repeats);
        field.index = self.index;
        self.repeats.push(field);

        for mut repeat in repeats {
            repeat.index = self.index;
            self.repeats.push(repeat);
        }
    }

    /// The text of this occurrence alone.
    fn occurrence_text(&self) -> Option<String> {
        match self.content() {
            // The encoding field of a header segment carries the field
            // delimiter in front of the remaining delimiters.
            Left(Some(value)) => Some(String::from(
                value
                    .strip_prefix(self.encoding.field_delimiter())
                    .unwrap_or(value),
            )),
            Left(None) => None,
            Right(components) => Some(join(components, &self.encoding)),
        }
    }
}

impl Element for Field {
    const KIND: Kind = Kind::Field;

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    fn inner_text(&self) -> Option<String> {
        if self.repeats.is_empty() {
            return self.occurrence_text();
        }

        let delimiter = self.encoding.repetition_delimiter();
        let mut text = String::new();

        for (i, field) in self.repetitions().enumerate() {
            if i != 0 {
                text.push(delimiter);
            }

            if let Some(t) = field.occurrence_text() {
                text.push_str(&t);
            }
        }

        Some(text)
    }
}

parent!(Field, Component, components);

/// One line of a message, labelled by a three-character code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub(crate) label: String,
    pub(crate) fields: Vec<Field>,
    pub(crate) index: usize,
    pub(crate) encoding: Arc<Encoding>,
}

impl Segment {
    /// A segment from its label and fields.
    pub fn new(encoding: Arc<Encoding>, label: String, fields: Vec<Field>) -> Self {
        Self {
            label,
            fields,
            index: 0,
            encoding,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The field at a position, counting from zero after the label.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }
}

impl Element for Segment {
    const KIND: Kind = Kind::Segment;

    /// The segment label.
    fn value(&self) -> Option<&str> {
        Some(self.label.as_str())
    }

    fn index(&self) -> usize {
        self.index
    }

    fn encoding(&self) -> &Arc<Encoding> {
        &self.encoding
    }

    fn inner_text(&self) -> Option<String> {
        let mut text = self.label.clone();
        text.push(self.encoding.field_delimiter());
        text.push_str(&join(&self.fields, &self.encoding));
        Some(text)
    }
}

parent!(Segment, Field, fields);
