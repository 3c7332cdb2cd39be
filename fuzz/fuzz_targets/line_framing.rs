//! Arbitrary chunking of a byte stream: the lines a `LineBuffer` yields must
//! not depend on where reads happen to split.

#![no_main]

use flightlink_proto::LineBuffer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (stream, cuts) = input;

    let mut whole = LineBuffer::new();
    if whole.push(&stream).is_err() {
        return;
    }
    let expected: Vec<Vec<u8>> = std::iter::from_fn(|| whole.next_line()).collect();

    let mut chunked = LineBuffer::new();
    let mut got = Vec::new();
    let mut rest = stream.as_slice();
    for cut in cuts.iter().map(|&c| usize::from(c)) {
        let (head, tail) = rest.split_at(cut.min(rest.len()));
        // A long line split mid-way can trip the limit before its newline.
        if chunked.push(head).is_err() {
            return;
        }
        got.extend(std::iter::from_fn(|| chunked.next_line()));
        rest = tail;
    }
    if chunked.push(rest).is_err() {
        return;
    }
    got.extend(std::iter::from_fn(|| chunked.next_line()));

    assert_eq!(got, expected);
    assert_eq!(chunked.len(), whole.len());
});
