//! Per-station document-number generation.
//!
//! Numbers look like `PO0000000042`: a type prefix followed by a 10-digit
//! zero-padded sequence, scoped to one station. The zero padding keeps
//! lexicographic order equal to numeric order, so the services can fetch the
//! current maximum with a plain `ORDER BY ... DESC LIMIT 1` inside the
//! creation transaction. Uniqueness is ultimately enforced by the composite
//! `(station_code, number)` index; a concurrent duplicate surfaces as a
//! constraint violation the service retries.

use super::DocumentKind;

/// Width of the numeric suffix.
pub const SUFFIX_WIDTH: usize = 10;

/// A stored document number that cannot be parsed. This is a data-integrity
/// fault: generation must stop rather than silently coerce or restart the
/// sequence.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("document number {number:?} does not carry the {prefix} prefix")]
    WrongPrefix { number: String, prefix: &'static str },

    #[error("document number {number:?} has a malformed numeric suffix")]
    MalformedSuffix { number: String },

    #[error("document number sequence for prefix {prefix} is exhausted")]
    Exhausted { prefix: &'static str },
}

/// Extracts the numeric suffix of a stored document number, validating the
/// prefix and the fixed suffix width.
pub fn parse_suffix(kind: DocumentKind, number: &str) -> Result<u64, SequenceError> {
    let prefix = kind.prefix();
    let suffix = number
        .strip_prefix(prefix)
        .ok_or_else(|| SequenceError::WrongPrefix {
            number: number.to_string(),
            prefix,
        })?;
    if suffix.len() != SUFFIX_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SequenceError::MalformedSuffix {
            number: number.to_string(),
        });
    }
    suffix
        .parse::<u64>()
        .map_err(|_| SequenceError::MalformedSuffix {
            number: number.to_string(),
        })
}

/// Formats a suffix into the full document number.
pub fn format_number(kind: DocumentKind, suffix: u64) -> String {
    format!("{}{:0width$}", kind.prefix(), suffix, width = SUFFIX_WIDTH)
}

/// Returns the number following `last` for this station/type partition, or
/// the first number of the sequence when no document exists yet.
pub fn next_number(kind: DocumentKind, last: Option<&str>) -> Result<String, SequenceError> {
    let next = match last {
        Some(number) => {
            let suffix = parse_suffix(kind, number)?;
            suffix
                .checked_add(1)
                .filter(|n| *n < 10u64.pow(SUFFIX_WIDTH as u32))
                .ok_or(SequenceError::Exhausted {
                    prefix: kind.prefix(),
                })?
        }
        None => 1,
    };
    Ok(format_number(kind, next))
}
