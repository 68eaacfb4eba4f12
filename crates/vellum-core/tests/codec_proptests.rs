#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the streaming hex and Base64 codecs.

use std::io::Cursor;

use data_encoding::{BASE64, HEXLOWER};
use proptest::prelude::*;
use ring::digest;
use vellum_core::codec::{Base64Stream, Base64Writer, HexReader, HexStream, HexWriter, TRAILER};

/// Strategy for a payload split into arbitrary write calls.
fn split_payload() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    (
        proptest::collection::vec(any::<u8>(), 0..1200),
        proptest::collection::vec(1usize..400, 0..8),
    )
}

/// Cut `data` at the given run lengths; the tail forms the last piece.
fn pieces<'a>(data: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    let mut rest = data;
    for &cut in cuts {
        let (head, tail) = rest.split_at(cut.min(rest.len()));
        out.push(head);
        rest = tail;
    }
    out.push(rest);
    out
}

proptest! {
    /// Hex output equals one-shot encoding, however the input is split.
    #[test]
    fn hex_writer_output_independent_of_splits((data, cuts) in split_payload()) {
        let mut writer = HexWriter::new(Cursor::new(Vec::new()));
        for piece in pieces(&data, &cuts) {
            writer.write_chunk(piece).unwrap();
        }
        prop_assert_eq!(writer.position(), data.len() as u64);
        let (sink, checksum) = writer.finish().unwrap();

        let mut expected = HEXLOWER.encode(&data).into_bytes();
        expected.extend_from_slice(TRAILER);
        prop_assert_eq!(sink.into_inner(), expected);
        let expected_sum = digest::digest(&digest::SHA256, &data);
        prop_assert_eq!(checksum.as_slice(), expected_sum.as_ref());
    }

    /// Base64 output equals one-shot encoding, however the input is split.
    #[test]
    fn base64_writer_output_independent_of_splits((data, cuts) in split_payload()) {
        let mut writer = Base64Writer::new(Vec::new());
        for piece in pieces(&data, &cuts) {
            writer.write_chunk(piece).unwrap();
            prop_assert!(writer.runt_len() < 3);
        }
        let sink = writer.finish().unwrap();

        let mut expected = BASE64.encode(&data).into_bytes();
        expected.extend_from_slice(TRAILER);
        prop_assert_eq!(sink, expected);
    }

    /// Hex text decodes back to the payload through the stream.
    #[test]
    fn hex_stream_recovers_payload((data, cuts) in split_payload()) {
        let text = HEXLOWER.encode(&data);
        let mut stream = HexStream::new();
        let mut out = Vec::new();
        for piece in pieces(text.as_bytes(), &cuts) {
            for chunk in stream.feed(piece) {
                out.extend_from_slice(&chunk.unwrap());
            }
        }
        stream.finish().unwrap();
        prop_assert_eq!(out, data);
    }

    /// Base64 text with line breaks decodes back to the payload.
    #[test]
    fn base64_stream_ignores_line_breaks(
        data in proptest::collection::vec(any::<u8>(), 0..900),
        width in 1usize..80,
    ) {
        let encoded = BASE64.encode(&data);
        let wrapped: Vec<u8> = encoded
            .as_bytes()
            .chunks(width)
            .flat_map(|line| line.iter().copied().chain(*b"\r\n"))
            .collect();

        let mut out = Vec::new();
        let written = Base64Stream::new().pump(wrapped.as_slice(), &mut out).unwrap();
        prop_assert_eq!(written, data.len() as u64);
        prop_assert_eq!(out, data);
    }

    /// Every decoded chunk stays within the fixed window.
    #[test]
    fn decoded_chunks_are_bounded(data in proptest::collection::vec(any::<u8>(), 0..2000)) {
        let text = HEXLOWER.encode(&data);
        let mut stream = HexStream::new();
        for chunk in stream.feed(text.as_bytes()) {
            prop_assert!(chunk.unwrap().len() <= vellum_core::CHUNK_GROUPS);
        }
    }

    /// The reader yields the payload regardless of read sizes.
    #[test]
    fn hex_reader_recovers_payload((data, cuts) in split_payload()) {
        let text = HEXLOWER.encode(&data);
        let mut reader = HexReader::new(text.as_bytes());
        let mut out = Vec::new();
        for &n in cuts.iter().chain(std::iter::repeat(&64)) {
            let got = reader.read_decoded(n).unwrap();
            if got.is_empty() {
                break;
            }
            out.extend_from_slice(&got);
        }
        prop_assert_eq!(reader.position(), data.len() as u64);
        prop_assert_eq!(out, data);
    }
}
