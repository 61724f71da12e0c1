#![cfg(feature = "std")]

use std::path::Path;

use csv::ReaderBuilder;
use hl7_pipe::{
    avec::{MessageAssembler, message},
    sans::{
        element::{Element, Parent, Segment},
        framer::{Options, StreamProcessor},
    },
};

const PATH: &str = "fixtures/admissions.hl7";

#[test]
fn decode_slice_admissions() {
    let data = std::fs::read(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    hl7_pipe::avec::decode_slice(&data, Options::default(), &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_reader_admissions() {
    let mut file = std::fs::File::open(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    hl7_pipe::avec::decode_reader(&mut file, Options::default(), &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_slice_admissions_byte_by_byte() {
    let data = std::fs::read(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    let mut framer = hl7_pipe::sans::framer::Framer::new(Options::default());

    for b in &data {
        framer.feed(std::slice::from_ref(b), &mut validator).unwrap();
    }

    framer.finish(&mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_messages_admissions() {
    let data = std::fs::read(PATH).unwrap();
    let messages = hl7_pipe::avec::slice::decode_messages(&data).unwrap();

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].segments().len(), 5);
    assert_eq!(messages[1].segments().len(), 2);
    assert_eq!(messages[2].segments().len(), 2);

    assert_eq!(messages[0].encoding().delimiters(), "|^~\\&");
    assert_eq!(messages[2].encoding().delimiters(), "!@#$%");

    let obx = messages[1].segment("OBX").unwrap();
    let note = obx.field(4).unwrap().decoded_value().unwrap().unwrap();
    assert_eq!(note, "Result & note<BR>second line");

    let name = messages[2].segment("PID").unwrap().field(4).unwrap();
    let given = name.children()[1].value();
    assert_eq!(given, Some("JANE"));
}

#[test]
fn decode_reader_messages_match_slice() {
    let data = std::fs::read(PATH).unwrap();
    let mut file = std::fs::File::open(PATH).unwrap();

    let messages = hl7_pipe::avec::reader::decode_messages(&mut file).unwrap();
    assert_eq!(
        messages,
        hl7_pipe::avec::slice::decode_messages(&data).unwrap()
    );
}

/// Checks every dispatched segment against a row of expectations:
/// message, line number, label, field count, field index and field text.
struct Validator {
    assembler: MessageAssembler,
    expected: Vec<Vec<String>>,
    comments: usize,
    completed: bool,
}

impl Validator {
    fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().with_extension("csv");

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .unwrap();

        let expected: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();

        Self {
            assembler: MessageAssembler::new(),
            expected,
            comments: 0,
            completed: false,
        }
    }

    fn finish(self) {
        assert!(self.completed);
        assert!(self.expected.is_empty());
        assert_eq!(self.comments, 1);
        assert_eq!(self.assembler.messages().len(), 3);
    }
}

impl StreamProcessor for Validator {
    type Error = message::Error;

    fn on_next(&mut self, line: &[u8], line_number: usize) -> Result<(), Self::Error> {
        self.assembler.on_next(line, line_number)?;

        let row = self.expected.remove(0);
        let message = self.assembler.messages().len();

        // The assembler has applied any encoding the line declared.
        let segment = Segment::parse(line, self.assembler.encoding()).unwrap();

        assert_eq!(row[0], message.to_string());
        assert_eq!(row[1], line_number.to_string());
        assert_eq!(row[2], segment.label());
        assert_eq!(row[3], segment.fields().len().to_string());

        let field: usize = row[4].parse().unwrap();
        assert_eq!(
            row[5],
            segment.fields()[field].inner_text().unwrap_or_default()
        );

        Ok(())
    }

    fn on_comment(&mut self, line: &[u8], line_number: usize) {
        assert_eq!(line, b"# Sample admissions feed");
        assert_eq!(line_number, 1);
        self.comments += 1;
    }

    fn on_complete(&mut self) {
        self.assembler.on_complete();
        self.completed = true;
    }
}
