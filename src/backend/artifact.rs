//! Stimulus and response artifact format shared with the simulator.
//!
//! One byte per line, written as an 8-character zero-padded binary string,
//! in transmission order:
//!
//! ```text
//! 10101010
//! 01010101
//! ```

use std::path::Path;
use thiserror::Error;

/// Width of one token in characters.
pub const TOKEN_WIDTH: usize = 8;

/// Errors decoding an artifact.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    /// A line is not an 8-character binary string.
    #[error("Malformed artifact token on line {line}: {token:?}")]
    BadToken { line: usize, token: String },
}

/// Encode one byte as its binary token, without the newline.
pub fn encode_byte(byte: u8) -> String {
    format!("{byte:08b}")
}

/// Decode one binary token.
pub fn decode_token(token: &str) -> Option<u8> {
    if token.len() != TOKEN_WIDTH || !token.bytes().all(|c| c == b'0' || c == b'1') {
        return None;
    }
    u8::from_str_radix(token, 2).ok()
}

/// Encode a byte sequence, one newline-terminated token per byte.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * (TOKEN_WIDTH + 1));
    for &byte in data {
        out.push_str(&encode_byte(byte));
        out.push('\n');
    }
    out
}

/// Decode an artifact back into bytes.
///
/// Accepts `\r\n` line endings and blank trailing lines.
pub fn decode(text: &str) -> Result<Vec<u8>, ArtifactError> {
    let mut bytes = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let byte = decode_token(line).ok_or_else(|| ArtifactError::BadToken {
            line: index + 1,
            token: line.to_string(),
        })?;
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Write an artifact file.
pub fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, encode(data))
}

/// Read and decode an artifact file.
pub fn read_file(path: &Path) -> Result<Vec<u8>, super::BackendError> {
    let text = std::fs::read_to_string(path)?;
    Ok(decode(&text)?)
}
