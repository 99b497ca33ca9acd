//! Fuzz target: `LineDecoder::feed`
//!
//! Arbitrary UART bytes must never panic the decoder or yield a line
//! that is empty, oversized or still carries its terminator.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use osm_comms::at::codec::{LineDecoder, LINE_MAX};

fuzz_target!(|data: &[u8]| {
    let mut decoder = LineDecoder::new();
    decoder.feed(data, |line| {
        assert!(!line.is_empty(), "decoder must not yield blank lines");
        assert!(line.len() <= LINE_MAX, "line exceeds LINE_MAX");
        assert!(!line.contains(&b'\n'), "terminator leaked into line");
    });

    // Whatever state the input left behind, a terminator flushes it and
    // the next line comes out whole.
    decoder.feed(b"\n", |_| {});
    let mut tail = 0;
    decoder.feed(b"OK\r\n", |line| {
        assert_eq!(line, b"OK");
        tail += 1;
    });
    assert_eq!(tail, 1);
});
