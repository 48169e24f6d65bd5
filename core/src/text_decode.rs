//! Byte-to-text decoding for model payloads that may be UTF-16 encoded.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextDecodeError {
    #[error("invalid UTF-16 byte length")]
    OddUtf16Length,
    #[error("invalid UTF-16 text")]
    InvalidUtf16,
    #[error("invalid UTF-8 text: {0}")]
    InvalidUtf8(String),
}

/// Decodes UTF-8 or UTF-16 (LE/BE, with or without BOM) into a string with
/// any byte order mark removed.
///
/// Without a BOM, UTF-16 is recognized by a zero byte in the first code unit,
/// which holds for payloads starting with an ASCII character such as `{`.
pub fn decode_text(bytes: &[u8]) -> Result<String, TextDecodeError> {
    if let Some(body) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return decode_utf8(body);
    }
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(body, true);
    }
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(body, false);
    }

    match bytes {
        [lo, 0, ..] if *lo != 0 => decode_utf16(bytes, true),
        [0, hi, ..] if *hi != 0 => decode_utf16(bytes, false),
        _ => decode_utf8(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, TextDecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| TextDecodeError::InvalidUtf8(e.to_string()))?;
    Ok(strip_bom(text).to_string())
}

fn decode_utf16(body: &[u8], little_endian: bool) -> Result<String, TextDecodeError> {
    if body.len() % 2 != 0 {
        return Err(TextDecodeError::OddUtf16Length);
    }

    let mut code_units = Vec::with_capacity(body.len() / 2);
    for chunk in body.chunks_exact(2) {
        let unit = if little_endian {
            u16::from_le_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], chunk[1]])
        };
        code_units.push(unit);
    }

    let text = String::from_utf16(&code_units).map_err(|_| TextDecodeError::InvalidUtf16)?;
    Ok(strip_bom(&text).to_string())
}

fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{FEFF}').unwrap_or(s)
}
