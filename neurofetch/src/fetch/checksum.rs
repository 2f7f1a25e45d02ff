//! SHA-256 hashing of download streams.
//!
//! The digest is computed while bytes are written to the staging file, so a
//! verified download never needs a second read pass.

use std::io::{self, Write};

use sha2::{Digest, Sha256};

use crate::error::{FetchError, FetchResult};

/// Writer adapter that hashes everything written through it.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Lowercase hex digest of everything written.
    pub fn hex_digest(&self) -> String {
        format!("{:x}", self.hasher.clone().finalize())
    }

    /// Unwrap the inner writer without flushing it.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compare an actual digest against the expected one.
pub fn verify_digest(filename: &str, expected: &str, actual: &str) -> FetchResult<()> {
    if !expected.eq_ignore_ascii_case(actual) {
        return Err(FetchError::ChecksumMismatch {
            filename: filename.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_hashing_writer_digest() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();

        assert_eq!(writer.written(), 11);
        assert_eq!(writer.hex_digest(), HELLO_WORLD_SHA256);
        assert_eq!(writer.into_inner(), b"hello world");
    }

    #[test]
    fn test_empty_digest() {
        let writer = HashingWriter::new(io::sink());
        assert_eq!(
            writer.hex_digest(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_digest_case_insensitive() {
        let upper = HELLO_WORLD_SHA256.to_uppercase();
        assert!(verify_digest("a.zip", &upper, HELLO_WORLD_SHA256).is_ok());
    }

    #[test]
    fn test_verify_digest_mismatch() {
        match verify_digest("a.zip", "wrong", HELLO_WORLD_SHA256) {
            Err(FetchError::ChecksumMismatch { filename, .. }) => assert_eq!(filename, "a.zip"),
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }
}
