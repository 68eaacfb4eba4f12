//! Base64 writer adapter.

use std::io::Write;

use data_encoding::BASE64;

use super::{CHUNK_GROUPS, ENCODED_WINDOW, TRAILER};
use crate::error::CoreError;

/// Raw bytes per Base64 group.
const RAW_GROUP: usize = 3;

/// Raw bytes encoded per window (128 groups).
const RAW_WINDOW: usize = CHUNK_GROUPS * RAW_GROUP;

/// Converts binary chunks to Base64 as they are written to a sink.
///
/// Three raw bytes map to one four-character group, so up to two trailing
/// bytes of each write (the runt) are held back until the next write
/// completes the group. Only [`finish`](Self::finish) flushes a partial
/// group, which is the one place padding may appear.
pub struct Base64Writer<W: Write> {
    inner: Option<W>,
    runt: Vec<u8>,
    pos: u64,
}

impl<W: Write> Base64Writer<W> {
    /// Open a write session over `inner`.
    pub fn new(inner: W) -> Self {
        tracing::debug!("base64 writer session opened");
        Self {
            inner: Some(inner),
            runt: Vec::with_capacity(RAW_GROUP),
            pos: 0,
        }
    }

    /// Decoded bytes accepted so far, including the buffered runt.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes currently held back waiting for a whole group.
    #[must_use]
    pub fn runt_len(&self) -> usize {
        self.runt.len()
    }

    /// Accept `chunk`, emitting every whole group now available.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the sink rejects the write, and
    /// [`CoreError::Format`] if the encoder produced a malformed run.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), CoreError> {
        self.pos = self.pos.saturating_add(chunk.len() as u64);
        let mut rest = chunk;

        if !self.runt.is_empty() {
            let need = RAW_GROUP.saturating_sub(self.runt.len()).min(rest.len());
            let (head, tail) = rest.split_at(need);
            self.runt.extend_from_slice(head);
            rest = tail;
            if self.runt.len() < RAW_GROUP {
                return Ok(());
            }
            let group = std::mem::take(&mut self.runt);
            self.emit(&group)?;
        }

        let whole = rest.len().saturating_sub(rest.len() % RAW_GROUP);
        let (groups, runt) = rest.split_at(whole);
        for window in groups.chunks(RAW_WINDOW) {
            self.emit(window)?;
        }
        self.runt.extend_from_slice(runt);
        Ok(())
    }

    /// Close the session: flush the runt (with padding) and append the
    /// trailer, returning the sink.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the sink rejects the final writes.
    pub fn finish(mut self) -> Result<W, CoreError> {
        let mut inner = self
            .inner
            .take()
            .ok_or_else(|| std::io::Error::other("base64 writer session already closed"))?;
        flush_runt(&mut inner, &self.runt)?;
        self.runt.clear();

        tracing::debug!(decoded_len = self.pos, "base64 writer session closed");
        Ok(inner)
    }

    /// Encode whole groups and append them to the sink.
    fn emit(&mut self, raw: &[u8]) -> Result<(), CoreError> {
        let mut text = [0u8; ENCODED_WINDOW];
        let out = &mut text[..BASE64.encode_len(raw.len())];
        BASE64.encode_mut(raw, out);

        if out.last() == Some(&b'\n') {
            return Err(CoreError::Format(
                "base64 encoder emitted a trailing newline".into(),
            ));
        }
        if out.contains(&b'=') {
            return Err(CoreError::Format(
                "base64 encoder emitted padding inside a whole-group run".into(),
            ));
        }

        let sink = self
            .inner
            .as_mut()
            .ok_or_else(|| std::io::Error::other("base64 writer session already closed"))?;
        sink.write_all(out)?;
        Ok(())
    }
}

impl<W: Write> Write for Base64Writer<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.inner.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for Base64Writer<W> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            tracing::warn!(decoded_len = self.pos, "base64 writer dropped without finish");
            if let Err(e) = flush_runt(inner, &self.runt) {
                tracing::warn!("base64 writer trailer lost: {e}");
            }
        }
    }
}

fn flush_runt<W: Write>(sink: &mut W, runt: &[u8]) -> std::io::Result<()> {
    if !runt.is_empty() {
        sink.write_all(BASE64.encode(runt).as_bytes())?;
    }
    sink.write_all(TRAILER)?;
    sink.flush()
}
