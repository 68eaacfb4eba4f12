//! Hex writer and reader adapters.

use std::io::{Read, Seek, SeekFrom, Write};

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use ring::digest;

use super::{CHECKSUM_LEN, CHUNK_GROUPS, ENCODED_WINDOW, TRAILER};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Converts binary chunks to hex as they are written to an underlying sink.
///
/// Positions are tracked in decoded bytes; the sink sees two characters per
/// byte. A SHA-256 checksum runs over the decoded bytes, not the hex text.
///
/// Call [`finish`](Self::finish) to append the trailer and obtain the
/// checksum. A writer dropped without `finish` still appends the trailer,
/// but any error doing so can only be logged.
pub struct HexWriter<W: Write + Seek> {
    inner: Option<W>,
    pos: u64,
    checksum: digest::Context,
}

impl<W: Write + Seek> HexWriter<W> {
    /// Open a write session over `inner`.
    pub fn new(inner: W) -> Self {
        tracing::debug!("hex writer session opened");
        Self {
            inner: Some(inner),
            pos: 0,
            checksum: digest::Context::new(&digest::SHA256),
        }
    }

    /// Current position in decoded bytes.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Encode `chunk` and append it to the sink.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the sink rejects the write.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), CoreError> {
        let mut text = [0u8; ENCODED_WINDOW];
        for window in chunk.chunks(CHUNK_GROUPS) {
            let out = &mut text[..HEXLOWER.encode_len(window.len())];
            HEXLOWER.encode_mut(window, out);
            self.sink()?.write_all(out)?;
            self.checksum.update(window);
            self.pos = self.pos.saturating_add(window.len() as u64);
        }
        Ok(())
    }

    /// Reposition to decoded offset `p`, which moves the sink to `2p`.
    ///
    /// Only [`SeekFrom::Start`] is supported.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedOperation`] for relative or end seeks,
    /// and [`CoreError::Io`] if the sink cannot seek.
    pub fn seek_to(&mut self, target: SeekFrom) -> Result<u64, CoreError> {
        let SeekFrom::Start(offset) = target else {
            return Err(CoreError::UnsupportedOperation(format!(
                "hex writer only seeks from the start, got {target:?}"
            )));
        };
        let encoded = offset.checked_mul(2).ok_or_else(|| {
            CoreError::UnsupportedOperation(format!("seek offset {offset} out of range"))
        })?;

        self.sink()?.seek(SeekFrom::Start(encoded))?;
        self.pos = offset;
        Ok(offset)
    }

    /// Close the session: append the trailer and return the sink together
    /// with the SHA-256 of every decoded byte written.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the trailer cannot be written.
    pub fn finish(mut self) -> Result<(W, [u8; CHECKSUM_LEN]), CoreError> {
        let mut inner = self.take_sink()?;
        append_trailer(&mut inner)?;

        let digest = self.checksum.clone().finish();
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(digest.as_ref());

        tracing::debug!(decoded_len = self.pos, "hex writer session closed");
        Ok((inner, checksum))
    }

    fn sink(&mut self) -> std::io::Result<&mut W> {
        self.inner
            .as_mut()
            .ok_or_else(|| std::io::Error::other("hex writer session already closed"))
    }

    fn take_sink(&mut self) -> std::io::Result<W> {
        self.inner
            .take()
            .ok_or_else(|| std::io::Error::other("hex writer session already closed"))
    }
}

impl<W: Write + Seek> Write for HexWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.sink()?.flush()
    }
}

impl<W: Write + Seek> Seek for HexWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.pos)
    }
}

impl<W: Write + Seek> Drop for HexWriter<W> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            tracing::warn!(decoded_len = self.pos, "hex writer dropped without finish");
            if let Err(e) = append_trailer(inner) {
                tracing::warn!("hex writer trailer lost: {e}");
            }
        }
    }
}

fn append_trailer<W: Write + Seek>(sink: &mut W) -> std::io::Result<()> {
    sink.seek(SeekFrom::End(0))?;
    sink.write_all(TRAILER)?;
    sink.flush()
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads hex text from a source and yields the decoded bytes.
///
/// Upper- and lowercase digits are both accepted.
pub struct HexReader<R: Read> {
    inner: R,
    pos: u64,
}

impl<R: Read> HexReader<R> {
    /// Wrap a hex text source.
    pub const fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Current position in decoded bytes.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Consume the reader, returning the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read up to `len` decoded bytes by pulling `2 * len` characters.
    ///
    /// Characters are pulled through a fixed window, so a large `len` costs
    /// only what the source actually holds. An exhausted source yields an
    /// empty vector. A source that ends early on a pair boundary yields the
    /// shorter decoded run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Format`] if the source yields an odd number of
    /// characters or anything outside the hex alphabet, and
    /// [`CoreError::Io`] if the source fails.
    pub fn read_decoded(&mut self, len: usize) -> Result<Vec<u8>, CoreError> {
        let mut out = Vec::new();
        let mut text = [0u8; ENCODED_WINDOW];
        let mut pulled: usize = 0;

        while out.len() < len {
            let bytes = len.saturating_sub(out.len()).min(ENCODED_WINDOW / 2);
            let window = &mut text[..bytes.saturating_mul(2)];
            let n = self.fill(window)?;
            pulled = pulled.saturating_add(n);
            if n % 2 != 0 {
                return Err(CoreError::Format(format!(
                    "odd-length hex: source yielded {pulled} characters"
                )));
            }
            if n == 0 {
                break;
            }

            let decoded = HEXLOWER_PERMISSIVE
                .decode(&window[..n])
                .map_err(|e| CoreError::Format(format!("invalid hex: {e}")))?;
            self.pos = self.pos.saturating_add(decoded.len() as u64);
            out.extend_from_slice(&decoded);

            if n < window.len() {
                break;
            }
        }
        Ok(out)
    }

    /// Read until `buf` is full or the source is exhausted.
    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled: usize = 0;
        while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
            match self.inner.read(rest) {
                Ok(0) => break,
                Ok(n) => filled = filled.saturating_add(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Fill as much of `buf` as the source allows, returning the count.
    ///
    /// # Errors
    ///
    /// Same as [`read_decoded`](Self::read_decoded).
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, CoreError> {
        let decoded = self.read_decoded(buf.len())?;
        buf[..decoded.len()].copy_from_slice(&decoded);
        Ok(decoded.len())
    }
}

impl<R: Read> Read for HexReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// SHA-256 of `data`, computed independently of the writer.
    fn sha256(data: &[u8]) -> Vec<u8> {
        digest::digest(&digest::SHA256, data).as_ref().to_vec()
    }

    #[test]
    fn writes_lowercase_hex_and_trailer() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        w.write_chunk(&[0xDE, 0xAD]).unwrap();
        w.write_chunk(&[0xBE, 0xEF]).unwrap();
        let (sink, _) = w.finish().unwrap();
        assert_eq!(sink.into_inner(), b"deadbeef\r\n");
    }

    #[test]
    fn checksum_covers_decoded_bytes() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        w.write_chunk(b"hello ").unwrap();
        w.write_chunk(b"world").unwrap();
        let (_, checksum) = w.finish().unwrap();
        assert_eq!(checksum.to_vec(), sha256(b"hello world"));
    }

    #[test]
    fn checksum_of_empty_session() {
        let w = HexWriter::new(Cursor::new(Vec::new()));
        let (sink, checksum) = w.finish().unwrap();
        assert_eq!(sink.into_inner(), b"\r\n");
        assert_eq!(checksum.to_vec(), sha256(b""));
    }

    /// Sink that rejects its next write once, then behaves like a cursor.
    struct FlakySink {
        fail_next: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if std::mem::take(&mut self.fail_next) {
                return Err(std::io::Error::other("sink full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for FlakySink {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn failed_write_leaves_checksum_and_position_untouched() {
        let mut w = HexWriter::new(FlakySink {
            fail_next: true,
            inner: Cursor::new(Vec::new()),
        });
        assert!(matches!(w.write_chunk(b"lost"), Err(CoreError::Io(_))));
        assert_eq!(w.position(), 0);

        w.write_chunk(b"kept").unwrap();
        assert_eq!(w.position(), 4);
        let (sink, checksum) = w.finish().unwrap();
        assert_eq!(checksum.to_vec(), sha256(b"kept"));
        assert_eq!(sink.inner.into_inner(), b"6b657074\r\n");
    }

    #[test]
    fn position_tracks_decoded_bytes() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        w.write_chunk(&[0u8; 300]).unwrap();
        assert_eq!(w.position(), 300);
        let (sink, _) = w.finish().unwrap();
        assert_eq!(sink.into_inner().len(), 600 + TRAILER.len());
    }

    #[test]
    fn seek_from_start_maps_to_double_offset() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        w.write_chunk(&[0x00, 0x11, 0x22]).unwrap();
        assert_eq!(w.seek_to(SeekFrom::Start(1)).unwrap(), 1);
        assert_eq!(w.position(), 1);
        w.write_chunk(&[0xFF]).unwrap();
        let (sink, _) = w.finish().unwrap();
        // Trailer goes to the end, not after the overwritten byte.
        assert_eq!(sink.into_inner(), b"00ff22\r\n");
    }

    #[test]
    fn relative_seek_is_unsupported() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        let result = w.seek_to(SeekFrom::Current(0));
        assert!(matches!(result, Err(CoreError::UnsupportedOperation(_))));
        let result = w.seek_to(SeekFrom::End(-2));
        assert!(matches!(result, Err(CoreError::UnsupportedOperation(_))));
    }

    #[test]
    fn io_seek_reports_unsupported_kind() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        let err = Seek::seek(&mut w, SeekFrom::Current(1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
        assert_eq!(w.stream_position().unwrap(), 0);
    }

    #[test]
    fn drop_without_finish_still_writes_trailer() {
        let mut buf = Vec::new();
        {
            let mut w = HexWriter::new(Cursor::new(&mut buf));
            w.write_chunk(&[0xAB]).unwrap();
        }
        assert_eq!(buf, b"ab\r\n");
    }

    #[test]
    fn io_write_adapter_encodes() {
        let mut w = HexWriter::new(Cursor::new(Vec::new()));
        w.write_all(&[0x01, 0x02]).unwrap();
        w.flush().unwrap();
        let (sink, _) = w.finish().unwrap();
        assert_eq!(sink.into_inner(), b"0102\r\n");
    }

    #[test]
    fn reader_decodes_requested_count() {
        let mut r = HexReader::new(Cursor::new(b"deadbeef".to_vec()));
        assert_eq!(r.read_decoded(2).unwrap(), vec![0xDE, 0xAD]);
        assert_eq!(r.position(), 2);
        assert_eq!(r.read_decoded(2).unwrap(), vec![0xBE, 0xEF]);
        assert_eq!(r.position(), 4);
        assert!(r.read_decoded(2).unwrap().is_empty());
    }

    #[test]
    fn reader_stops_at_end_of_short_source() {
        let mut r = HexReader::new(&b"abcd"[..]);
        assert_eq!(r.read_decoded(usize::MAX / 2).unwrap(), vec![0xAB, 0xCD]);
        assert_eq!(r.position(), 2);
        assert!(r.read_decoded(usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn reader_spans_several_windows() {
        let text = "5a".repeat(ENCODED_WINDOW * 3 + 7);
        let mut r = HexReader::new(text.as_bytes());
        let out = r.read_decoded(ENCODED_WINDOW * 4).unwrap();
        assert_eq!(out, vec![0x5A; ENCODED_WINDOW * 3 + 7]);
    }

    #[test]
    fn reader_rejects_odd_total_after_full_windows() {
        let text = format!("{}a", "00".repeat(ENCODED_WINDOW));
        let mut r = HexReader::new(text.as_bytes());
        assert!(matches!(
            r.read_decoded(ENCODED_WINDOW * 2),
            Err(CoreError::Format(ref msg)) if msg.contains("odd")
        ));
    }

    #[test]
    fn reader_accepts_uppercase() {
        let mut r = HexReader::new(Cursor::new(b"DEADbeef".to_vec()));
        assert_eq!(r.read_decoded(4).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn reader_rejects_odd_count() {
        let mut r = HexReader::new(Cursor::new(b"abc".to_vec()));
        let result = r.read_decoded(2);
        assert!(
            matches!(result, Err(CoreError::Format(ref msg)) if msg.contains("odd")),
            "odd-length source must be a format error"
        );
    }

    #[test]
    fn reader_rejects_non_hex() {
        let mut r = HexReader::new(Cursor::new(b"zz".to_vec()));
        assert!(matches!(r.read_decoded(1), Err(CoreError::Format(_))));
    }

    #[test]
    fn read_into_fills_prefix() {
        let mut r = HexReader::new(Cursor::new(b"0102".to_vec()));
        let mut buf = [0xFFu8; 4];
        assert_eq!(r.read_into(&mut buf).unwrap(), 2);
        assert_eq!(buf, [0x01, 0x02, 0xFF, 0xFF]);
    }

    #[test]
    fn io_read_adapter_reports_invalid_data() {
        let mut r = HexReader::new(Cursor::new(b"0g".to_vec()));
        let mut buf = [0u8; 1];
        let err = r.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
