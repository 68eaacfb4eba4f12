//! Encoded file export and import.
//!
//! Export writes binary chunks to a text file through the streaming codec
//! writers; import pulls a text file through the chunked decoder. Both
//! hold at most one codec window in memory regardless of file size.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use data_encoding::HEXLOWER;
use ring::digest;
use vellum_core::codec::{
    Base64Stream, Base64Writer, DecodeStream, HexStream, HexWriter, TextEncoding, CHECKSUM_LEN,
};
use vellum_core::Encoding;

use crate::error::DeviceError;

/// Summary of a completed export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Binary bytes written, before encoding.
    pub decoded_len: u64,
    /// SHA-256 of those bytes.
    pub checksum: [u8; CHECKSUM_LEN],
}

impl ExportReceipt {
    /// Checksum as lowercase hex, for display next to the file name.
    #[must_use]
    pub fn checksum_hex(&self) -> String {
        HEXLOWER.encode(&self.checksum)
    }
}

/// Write `chunks` to a new file at `path` in the given text encoding.
///
/// The file is created (or truncated), every chunk is encoded as it
/// arrives, and the trailer is appended. The checksum covers the binary
/// bytes, not the text.
///
/// # Errors
///
/// Returns [`DeviceError::Io`] if the file cannot be created or written,
/// and [`DeviceError::Core`] if the codec fails.
pub fn export_file<I, C>(
    path: &Path,
    encoding: Encoding,
    chunks: I,
) -> Result<ExportReceipt, DeviceError>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let file = File::create(path)?;

    let (file, receipt) = match encoding {
        Encoding::Hex => {
            let mut writer = HexWriter::new(file);
            for chunk in chunks {
                writer.write_chunk(chunk.as_ref())?;
            }
            let decoded_len = writer.position();
            let (file, checksum) = writer.finish()?;
            (
                file,
                ExportReceipt {
                    decoded_len,
                    checksum,
                },
            )
        }
        Encoding::Base64 => {
            let mut writer = Base64Writer::new(file);
            let mut context = digest::Context::new(&digest::SHA256);
            for chunk in chunks {
                context.update(chunk.as_ref());
                writer.write_chunk(chunk.as_ref())?;
            }
            let decoded_len = writer.position();
            let file = writer.finish()?;

            let mut checksum = [0u8; CHECKSUM_LEN];
            checksum.copy_from_slice(context.finish().as_ref());
            (
                file,
                ExportReceipt {
                    decoded_len,
                    checksum,
                },
            )
        }
    };
    file.sync_all()?;

    tracing::debug!(
        %encoding,
        decoded_len = receipt.decoded_len,
        "export written"
    );
    Ok(receipt)
}

/// Decode the text file at `path` into `dst`, returning the byte count.
///
/// Whitespace (including line breaks and the trailer) is ignored.
///
/// # Errors
///
/// Returns [`DeviceError::Core`] with a format error if the text has
/// characters outside the alphabet or ends inside a group, and
/// [`DeviceError::Io`] if either side fails.
pub fn import_into<W: Write>(path: &Path, encoding: Encoding, dst: W) -> Result<u64, DeviceError> {
    let file = File::open(path)?;
    let decoded_len = match encoding {
        Encoding::Hex => drain(HexStream::new(), file, dst)?,
        Encoding::Base64 => drain(Base64Stream::new(), file, dst)?,
    };
    tracing::debug!(%encoding, decoded_len, "import decoded");
    Ok(decoded_len)
}

/// Decode the text file at `path` into memory.
///
/// # Errors
///
/// As for [`import_into`].
pub fn import_file(path: &Path, encoding: Encoding) -> Result<Vec<u8>, DeviceError> {
    let mut out = Vec::new();
    import_into(path, encoding, &mut out)?;
    Ok(out)
}

/// Pump `src` through `stream` and reject a trailing partial group.
fn drain<E: TextEncoding, W: Write>(
    mut stream: DecodeStream<E>,
    src: File,
    dst: W,
) -> Result<u64, DeviceError> {
    let written = stream.pump(src, dst)?;
    stream.finish()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vellum_core::CoreError;

    #[test]
    fn hex_export_matches_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.hex");

        let receipt = export_file(&path, Encoding::Hex, [&b"\xde\xad"[..], b"\xbe\xef"]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"deadbeef\r\n");
        assert_eq!(receipt.decoded_len, 4);
        assert_eq!(
            receipt.checksum.as_slice(),
            digest::digest(&digest::SHA256, b"\xde\xad\xbe\xef").as_ref()
        );
    }

    #[test]
    fn base64_export_pads_only_at_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.b64");

        let receipt = export_file(&path, Encoding::Base64, [&b"ab"[..], b"cd"]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"YWJjZA==\r\n");
        assert_eq!(receipt.decoded_len, 4);
    }

    #[test]
    fn checksum_independent_of_encoding() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..=255).collect();

        let hex = export_file(&dir.path().join("a"), Encoding::Hex, [&data]).unwrap();
        let b64 = export_file(&dir.path().join("b"), Encoding::Base64, [&data]).unwrap();
        assert_eq!(hex, b64);
        assert_eq!(hex.checksum_hex().len(), 64);
    }

    #[test]
    fn import_reads_back_export() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();

        for encoding in [Encoding::Hex, Encoding::Base64] {
            let path = dir.path().join(encoding.to_string());
            export_file(&path, encoding, data.chunks(77)).unwrap();
            assert_eq!(import_file(&path, encoding).unwrap(), data);
        }
    }

    #[test]
    fn import_rejects_trailing_partial_group() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.hex");
        fs::write(&path, "deadbee\r\n").unwrap();

        let result = import_file(&path, Encoding::Hex);
        assert!(matches!(
            result,
            Err(DeviceError::Core(CoreError::Format(ref msg))) if msg.contains("short of")
        ));
    }

    #[test]
    fn import_tolerates_uppercase_and_line_breaks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upper.hex");
        fs::write(&path, "DE AD\nbe\tEF\r\n").unwrap();
        assert_eq!(import_file(&path, Encoding::Hex).unwrap(), b"\xde\xad\xbe\xef");
    }

    #[test]
    fn import_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = import_file(&dir.path().join("absent"), Encoding::Hex);
        assert!(matches!(result, Err(DeviceError::Io(_))));
    }
}
