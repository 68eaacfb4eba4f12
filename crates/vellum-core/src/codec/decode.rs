//! Chunked, whitespace-tolerant decoding from hex or Base64 text.

use std::io::{ErrorKind, Read, Write};
use std::marker::PhantomData;

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};

use super::{CHUNK_GROUPS, ENCODED_WINDOW};
use crate::error::CoreError;

/// A text alphabet decoded in fixed-size groups.
pub trait TextEncoding {
    /// Encoded characters per group.
    const GROUP: usize;

    /// Short name used in error messages and logs.
    const NAME: &'static str;

    /// Decode a run whose length is a multiple of [`Self::GROUP`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Format`] for characters outside the alphabet.
    fn decode(text: &[u8]) -> Result<Vec<u8>, CoreError>;
}

/// Hex digits, either case.
#[derive(Clone, Copy, Debug)]
pub struct Hex;

impl TextEncoding for Hex {
    const GROUP: usize = 2;
    const NAME: &'static str = "hex";

    fn decode(text: &[u8]) -> Result<Vec<u8>, CoreError> {
        HEXLOWER_PERMISSIVE
            .decode(text)
            .map_err(|e| CoreError::Format(format!("invalid hex: {e}")))
    }
}

/// Standard padded Base64.
#[derive(Clone, Copy, Debug)]
pub struct Base64;

impl TextEncoding for Base64 {
    const GROUP: usize = 4;
    const NAME: &'static str = "base64";

    fn decode(text: &[u8]) -> Result<Vec<u8>, CoreError> {
        BASE64
            .decode(text)
            .map_err(|e| CoreError::Format(format!("invalid base64: {e}")))
    }
}

/// Hex text decoder.
pub type HexStream = DecodeStream<Hex>;

/// Base64 text decoder.
pub type Base64Stream = DecodeStream<Base64>;

/// Accumulates encoded text across calls and yields decoded chunks.
///
/// Whitespace, including VT and the ASCII separators 0x1C..=0x1F, is
/// discarded. A chunk is emitted each time the window of
/// [`CHUNK_GROUPS`] groups fills, and once more at the end of every
/// [`feed`](Self::feed) for whatever whole groups remain. Characters that do
/// not yet complete a group stay pending for the next call.
///
/// Dropping the stream discards any pending partial group without comment;
/// [`finish`](Self::finish) reports it instead.
pub struct DecodeStream<E: TextEncoding> {
    pending: Vec<u8>,
    _encoding: PhantomData<E>,
}

impl<E: TextEncoding> DecodeStream<E> {
    /// Encoded characters held before a chunk is emitted.
    pub const WINDOW: usize = CHUNK_GROUPS * E::GROUP;

    /// Create an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(Self::WINDOW),
            _encoding: PhantomData,
        }
    }

    /// Feed more text; iterate the result to receive decoded chunks.
    ///
    /// The iterator must be driven to completion for the trailing whole
    /// groups of `text` to be emitted.
    pub fn feed<'s, 't>(&'s mut self, text: &'t [u8]) -> Decoded<'s, 't, E> {
        Decoded {
            stream: self,
            text,
            flushed: false,
        }
    }

    /// Characters waiting for the rest of their group.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End the stream.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Format`] if a partial group is still pending,
    /// i.e. the text ended mid-group.
    pub fn finish(self) -> Result<(), CoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        tracing::warn!(
            encoding = E::NAME,
            leftover = self.pending.len(),
            "decode stream ended inside a group"
        );
        Err(CoreError::Format(format!(
            "{} text ends with {} character(s) short of a {}-character group",
            E::NAME,
            self.pending.len(),
            E::GROUP
        )))
    }

    /// Read all of `src`, writing decoded bytes to `dst`.
    ///
    /// Reads through a fixed window buffer, so memory use does not grow
    /// with the input. Returns the number of decoded bytes written. Does
    /// not call [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Format`] on malformed text and [`CoreError::Io`]
    /// if either side fails.
    pub fn pump<R: Read, W: Write>(&mut self, mut src: R, mut dst: W) -> Result<u64, CoreError> {
        let mut buf = [0u8; ENCODED_WINDOW];
        let mut total: u64 = 0;
        let mut chunks: u32 = 0;

        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for chunk in self.feed(&buf[..n]) {
                let chunk = chunk?;
                dst.write_all(&chunk)?;
                total = total.saturating_add(chunk.len() as u64);
                chunks = chunks.saturating_add(1);
            }
        }
        dst.flush()?;

        tracing::debug!(encoding = E::NAME, decoded_len = total, chunks, "decode pump drained");
        Ok(total)
    }

    /// Decode a complete text in one call, rejecting a trailing partial group.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Format`] on malformed or truncated text.
    pub fn decode_all(text: &[u8]) -> Result<Vec<u8>, CoreError> {
        let mut stream = Self::new();
        let mut out = Vec::new();
        for chunk in stream.feed(text) {
            out.extend_from_slice(&chunk?);
        }
        stream.finish()?;
        Ok(out)
    }
}

impl<E: TextEncoding> Default for DecodeStream<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes skipped between encoded characters.
///
/// Unicode whitespace read as Latin-1 (tab through carriage return, space,
/// NEL and no-break space) plus the ASCII file, group, record and unit
/// separators 0x1C..=0x1F.
fn is_separator(byte: u8) -> bool {
    char::from(byte).is_whitespace() || (0x1C..=0x1F).contains(&byte)
}

/// Decoded chunks produced by one [`DecodeStream::feed`] call.
pub struct Decoded<'s, 't, E: TextEncoding> {
    stream: &'s mut DecodeStream<E>,
    text: &'t [u8],
    flushed: bool,
}

impl<E: TextEncoding> Iterator for Decoded<'_, '_, E> {
    type Item = Result<Vec<u8>, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pending = &mut self.stream.pending;

        while let Some((&byte, rest)) = self.text.split_first() {
            self.text = rest;
            if is_separator(byte) {
                continue;
            }
            pending.push(byte);
            if pending.len() == DecodeStream::<E>::WINDOW {
                let chunk = E::decode(pending.as_slice());
                pending.clear();
                return Some(chunk);
            }
        }

        if self.flushed {
            return None;
        }
        self.flushed = true;

        let aligned = pending.len().saturating_sub(pending.len() % E::GROUP);
        if aligned == 0 {
            return None;
        }
        let chunk = E::decode(&pending[..aligned]);
        pending.drain(..aligned);
        Some(chunk)
    }
}
