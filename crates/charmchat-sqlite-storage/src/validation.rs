//! Input validation constants and utilities for SQLite storage.
//!
//! These limits prevent unbounded peer input from causing disk and CPU exhaustion.

use crate::error::Error;

/// Maximum size for an encoded message body (256 KB)
pub const MAX_MESSAGE_BODY_SIZE: usize = 256 * 1024;

/// Maximum size for serialized transfer metadata JSON (16 KB)
pub const MAX_TRANSFER_METADATA_SIZE: usize = 16 * 1024;

/// Maximum length for group name (255 bytes, UTF-8 encoded)
pub const MAX_GROUP_NAME_LENGTH: usize = 255;

/// Maximum length for a display name (255 bytes, UTF-8 encoded)
pub const MAX_DISPLAY_NAME_LENGTH: usize = 255;

/// Validate that a byte slice does not exceed the specified maximum size.
#[inline]
pub fn validate_size(data: &[u8], max_size: usize, field_name: &str) -> Result<(), Error> {
    if data.len() > max_size {
        return Err(Error::Validation {
            field_name: field_name.to_string(),
            max_size,
            actual_size: data.len(),
        });
    }
    Ok(())
}

/// Validate that a string does not exceed the specified maximum length in bytes.
///
/// Note: This validates UTF-8 byte length, not Unicode character count.
#[inline]
pub fn validate_string_length(s: &str, max_length: usize, field_name: &str) -> Result<(), Error> {
    validate_size(s.as_bytes(), max_length, field_name)
}
