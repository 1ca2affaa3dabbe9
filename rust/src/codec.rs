//! UTF-8 text <-> hex transform used for every payload handed to the peer transport.
//!
//! Encoded form is `0x` followed by uppercase hex digits. Decoding accepts either case
//! and tolerates a missing prefix, since peers running older builds send both.

use std::string::FromUtf8Error;

const HEX_PREFIX: &str = "0x";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("decoded bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

pub fn encode(text: &str) -> String {
    format!("{HEX_PREFIX}{}", hex::encode_upper(text.as_bytes()))
}

pub fn decode(input: &str) -> Result<String, DecodeError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix(HEX_PREFIX)
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_uppercase_with_prefix() {
        assert_eq!(encode("hi"), "0x6869");
        assert_eq!(encode("\u{00e9}"), "0xC3A9");
        assert_eq!(encode(""), "0x");
    }

    #[test]
    fn round_trips_multibyte_text() {
        for s in ["", "hello", "\u{1F496} charm", "line\nbreak", "\"quoted\" {json}"] {
            assert_eq!(decode(&encode(s)).unwrap(), s);
        }
    }

    #[test]
    fn decode_accepts_lowercase_and_missing_prefix() {
        assert_eq!(decode("c3a9").unwrap(), "\u{00e9}");
        assert_eq!(decode("0XC3a9").unwrap(), "\u{00e9}");
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(decode("0xZZ"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(decode("0xABC"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(decode("0xFF"), Err(DecodeError::InvalidUtf8(_))));
    }
}
