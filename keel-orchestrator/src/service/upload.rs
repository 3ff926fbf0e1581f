//! Upload Service
//!
//! Validation of uploaded build files. Anything rejected here never reaches
//! the build engine.

use thiserror::Error;

/// Reasons an upload is rejected before any build is attempted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Dockerfile not provided.")]
    MissingField,

    #[error("Only one Dockerfile may be uploaded per request.")]
    DuplicateField,

    #[error("Empty Dockerfile provided.")]
    Empty,

    #[error("Dockerfile exceeds the maximum size of {limit} bytes.")]
    TooLarge { limit: usize },

    #[error("Dockerfile is not valid UTF-8 text.")]
    NotText,

    #[error("Dockerfile must start with a FROM instruction.")]
    MissingFrom,

    #[error("Malformed multipart request: {0}")]
    Malformed(String),
}

/// Validate the content of an uploaded build file
pub fn validate_dockerfile(content: &[u8], max_bytes: usize) -> Result<(), ValidationError> {
    if content.len() > max_bytes {
        return Err(ValidationError::TooLarge { limit: max_bytes });
    }

    let text = std::str::from_utf8(content).map_err(|_| ValidationError::NotText)?;

    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    if !starts_with_from(text) {
        return Err(ValidationError::MissingFrom);
    }

    Ok(())
}

/// Checks that the first instruction is `FROM`
///
/// Blank lines, comments (including parser directives) and `ARG`
/// instructions may precede it.
fn starts_with_from(text: &str) -> bool {
    let mut continued = false;

    for line in text.lines() {
        let trimmed = line.trim();

        // Continuation lines of a preceding ARG
        if continued {
            continued = trimmed.ends_with('\\');
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let instruction = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        match instruction.as_str() {
            "ARG" => continued = trimmed.ends_with('\\'),
            "FROM" => return trimmed.split_whitespace().nth(1).is_some(),
            _ => return false,
        }
    }

    false
}
