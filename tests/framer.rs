use hl7_pipe::sans::framer::{Framer, INLINE_LINE_CAPACITY, Options, StreamProcessor};

const FEED: &[u8] = b"# header\r\nMSH|^~\\&|A\r\nPID|1\r\n\r\nPV1|I\rOBX|1|TX\rNTE|1";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Line(usize, Vec<u8>),
    Comment(usize, Vec<u8>),
    Error(usize, Vec<u8>),
    Complete,
}

/// Records everything a framer dispatches, rejecting lines starting with a
/// configured byte.
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    reject: Option<u8>,
    skip_errors: bool,
}

impl Recorder {
    fn lines(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Line(_, line) => Some(line.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl StreamProcessor for Recorder {
    type Error = usize;

    fn on_next(&mut self, line: &[u8], line_number: usize) -> Result<(), usize> {
        if self.reject.is_some() && line.first() == self.reject.as_ref() {
            return Err(line_number);
        }

        self.events.push(Event::Line(line_number, line.to_vec()));
        Ok(())
    }

    fn on_comment(&mut self, line: &[u8], line_number: usize) {
        self.events.push(Event::Comment(line_number, line.to_vec()));
    }

    fn on_error(&mut self, line: &[u8], error: usize, line_number: usize) -> Result<(), usize> {
        assert_eq!(error, line_number);
        self.events.push(Event::Error(line_number, line.to_vec()));

        if self.skip_errors { Ok(()) } else { Err(error) }
    }

    fn on_complete(&mut self) {
        self.events.push(Event::Complete);
    }
}

fn frame(data: &[u8], chunk_size: usize, options: Options) -> Recorder {
    let mut recorder = Recorder::default();
    let mut framer = Framer::new(options);

    for chunk in data.chunks(chunk_size) {
        framer.feed(chunk, &mut recorder).unwrap();
    }

    framer.finish(&mut recorder).unwrap();
    recorder
}

#[test]
fn lines_are_split_on_terminators() {
    let recorder = frame(FEED, FEED.len(), Options::default());

    assert_eq!(
        recorder.events,
        [
            Event::Comment(1, b"# header".to_vec()),
            Event::Line(2, b"MSH|^~\\&|A".to_vec()),
            Event::Line(3, b"PID|1".to_vec()),
            Event::Line(5, b"PV1|I".to_vec()),
            Event::Line(6, b"OBX|1|TX".to_vec()),
            Event::Line(7, b"NTE|1".to_vec()),
            Event::Complete,
        ]
    );
}

#[test]
fn chunking_does_not_change_lines() {
    let expected = frame(FEED, FEED.len(), Options::default()).events;

    for chunk_size in 1..FEED.len() {
        let recorder = frame(FEED, chunk_size, Options::default());
        assert_eq!(recorder.events, expected, "chunk size {chunk_size}");
    }
}

#[test]
fn newline_split_from_terminator_is_skipped() {
    let mut recorder = Recorder::default();
    let mut framer = Framer::new(Options::default());

    framer.feed(b"PID|1\r", &mut recorder).unwrap();
    framer.feed(b"", &mut recorder).unwrap();
    framer.feed(b"\nPV1|2\r", &mut recorder).unwrap();
    framer.feed(b"\n", &mut recorder).unwrap();
    framer.finish(&mut recorder).unwrap();

    assert_eq!(recorder.lines(), [b"PID|1".as_slice(), b"PV1|2"]);
}

#[test]
fn blank_lines_can_be_kept() {
    let options = Options {
        ignore_blank_lines: false,
        ..Options::default()
    };

    let recorder = frame(b"PID|1\r\r\nPV1|2\r", 3, options);

    assert_eq!(
        recorder.events,
        [
            Event::Line(1, b"PID|1".to_vec()),
            Event::Line(2, Vec::new()),
            Event::Line(3, b"PV1|2".to_vec()),
            Event::Complete,
        ]
    );
}

#[test]
fn comments_can_be_disabled() {
    let options = Options {
        allow_comments: false,
        ..Options::default()
    };

    let recorder = frame(b"# note\rPID|1\r", 4, options);

    assert_eq!(recorder.lines(), [b"# note".as_slice(), b"PID|1"]);
}

#[test]
fn terminated_stream_has_no_trailing_line() {
    let recorder = frame(b"PID|1\r\n", 2, Options::default());

    assert_eq!(
        recorder.events,
        [Event::Line(1, b"PID|1".to_vec()), Event::Complete]
    );
}

#[test]
fn empty_stream_only_completes() {
    let recorder = frame(b"", 1, Options::default());

    assert_eq!(recorder.events, [Event::Complete]);
}

#[test]
fn long_lines_spill_past_inline_capacity() {
    let mut line = b"NTE|1|".to_vec();
    line.resize(INLINE_LINE_CAPACITY * 3, b'x');

    let mut data = line.clone();
    data.extend_from_slice(b"\rPID|1\r");
    data.extend_from_slice(&line);

    let recorder = frame(&data, 100, Options::default());

    assert_eq!(
        recorder.lines(),
        [line.as_slice(), b"PID|1", line.as_slice()]
    );
}

#[test]
fn rejected_lines_abort_by_default() {
    let mut recorder = Recorder {
        reject: Some(b'X'),
        ..Recorder::default()
    };

    let mut framer = Framer::new(Options::default());
    let result = framer.feed(b"PID|1\rXYZ|2\rPV1|3\r", &mut recorder);

    assert_eq!(result, Err(2));
    assert_eq!(framer.line_number(), 2);
    assert_eq!(
        recorder.events,
        [
            Event::Line(1, b"PID|1".to_vec()),
            Event::Error(2, b"XYZ|2".to_vec()),
        ]
    );
}

#[test]
fn rejected_lines_can_be_skipped() {
    let mut recorder = Recorder {
        reject: Some(b'X'),
        skip_errors: true,
        ..Recorder::default()
    };

    let mut framer = Framer::new(Options::default());
    framer.feed(b"PID|1\rXYZ|2\rPV1|3", &mut recorder).unwrap();
    framer.finish(&mut recorder).unwrap();

    assert_eq!(
        recorder.events,
        [
            Event::Line(1, b"PID|1".to_vec()),
            Event::Error(2, b"XYZ|2".to_vec()),
            Event::Line(3, b"PV1|3".to_vec()),
            Event::Complete,
        ]
    );
}

#[test]
fn rejected_final_line_prevents_completion() {
    let mut recorder = Recorder {
        reject: Some(b'X'),
        ..Recorder::default()
    };

    let mut framer = Framer::new(Options::default());
    framer.feed(b"PID|1\rXYZ", &mut recorder).unwrap();

    assert_eq!(framer.finish(&mut recorder), Err(2));
    assert!(!recorder.events.contains(&Event::Complete));
}
