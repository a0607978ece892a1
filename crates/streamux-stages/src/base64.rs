//! Streaming base64 (standard alphabet, `=` padding).
//!
//! Both stages accept input split at arbitrary points. The encoder only
//! pads in `finish()`, so a writer that keeps every write a multiple of
//! three bytes gets unpadded, independently decodable pieces.

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine;

use streamux_core::{Error, Result, Transform};

const PAD: u8 = b'=';

/// Bytes → base64 text.
#[derive(Debug, Default)]
pub struct Base64Encode {
    /// Input bytes not yet forming a whole triple (at most 2).
    held: Vec<u8>,
}

impl Base64Encode {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transform for Base64Encode {
    fn name(&self) -> &str {
        "base64-encode"
    }

    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.held.extend_from_slice(chunk);
        let whole = self.held.len() / 3 * 3;
        if whole > 0 {
            out.extend_from_slice(STANDARD.encode(&self.held[..whole]).as_bytes());
            self.held.drain(..whole);
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if !self.held.is_empty() {
            out.extend_from_slice(STANDARD.encode(&self.held).as_bytes());
            self.held.clear();
        }
        Ok(())
    }
}

/// Base64 text → bytes.
///
/// ASCII whitespace is skipped. A quad with padding ends one encoded
/// segment; decoding carries on with the next quad, so concatenated padded
/// streams decode as their concatenation.
#[derive(Debug, Default)]
pub struct Base64Decode {
    /// Symbols not yet decoded; whole quads are consumed on every call.
    held: Vec<u8>,
}

impl Base64Decode {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_into(&self, symbols: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let bytes = STANDARD
            .decode(symbols)
            .map_err(|e| Error::transform(self.name(), e.to_string()))?;
        out.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Transform for Base64Decode {
    fn name(&self) -> &str {
        "base64-decode"
    }

    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.held
            .extend(chunk.iter().copied().filter(|b| !b.is_ascii_whitespace()));
        let whole = self.held.len() / 4 * 4;

        // a padded quad closes a segment; decode segment by segment
        let mut start = 0;
        for end in (4..=whole).step_by(4) {
            if self.held[end - 1] == PAD {
                self.decode_into(&self.held[start..end], out)?;
                start = end;
            }
        }
        if start < whole {
            self.decode_into(&self.held[start..whole], out)?;
        }
        self.held.drain(..whole);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<()> {
        if !self.held.is_empty() {
            let left = self.held.len();
            self.held.clear();
            return Err(Error::transform(
                self.name(),
                format!("truncated input: {} symbol(s) left over", left),
            ));
        }
        Ok(())
    }
}
