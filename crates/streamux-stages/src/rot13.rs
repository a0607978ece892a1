//! `Rot13` - rotate ASCII letters by 13 places.
//!
//! Self-inverse, so the same stage serves both directions.

use streamux_core::{Result, Transform};

#[derive(Debug, Default, Clone, Copy)]
pub struct Rot13;

impl Rot13 {
    #[inline]
    fn rotate(b: u8) -> u8 {
        match b {
            b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
            b'A'..=b'Z' => (b - b'A' + 13) % 26 + b'A',
            _ => b,
        }
    }
}

impl Transform for Rot13 {
    fn name(&self) -> &str {
        "rot13"
    }

    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend(chunk.iter().map(|&b| Self::rotate(b)));
        Ok(())
    }
}
