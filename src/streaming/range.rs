//! `Range` header interpretation for the chunked video endpoint.
//!
//! Only the start offset chosen by the client matters: every response is
//! capped at one chunk, so the window is always
//! `[start, min(start + chunk - 1, size - 1)]`. In strict mode an explicit
//! end offset can shrink the window further.

use cinestream_common::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

use crate::config::RangeMode;

/// Default number of bytes served per range response.
pub const CHUNK_SIZE: u64 = 1_000_000;

/// Byte window of one partial-content response.
///
/// Always satisfies `start <= end < total_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ByteRange {
    /// Number of bytes in the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

fn strict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^bytes=(\d+)-(\d*)$").unwrap_or_else(|e| panic!("invalid range pattern: {e}"))
    })
}

/// Requested `(start, explicit end)` from a header, before clamping.
///
/// Returns `None` when the header cannot be interpreted in `mode`.
pub fn parse_range_header(header: &str, mode: RangeMode) -> Option<(u64, Option<u64>)> {
    match mode {
        RangeMode::Strict => {
            let caps = strict_pattern().captures(header.trim())?;
            let start = caps.get(1)?.as_str().parse().ok()?;
            let end = match caps.get(2).map(|m| m.as_str()) {
                Some("") | None => None,
                Some(end) => Some(end.parse().ok()?),
            };
            Some((start, end))
        }
        RangeMode::Lenient => {
            // Everything that is not a digit is dropped, so "bytes=0-999"
            // reads as 999. Nothing left, or too many digits, means 0.
            let digits: String = header.chars().filter(|c| c.is_ascii_digit()).collect();
            Some((digits.parse().unwrap_or(0), None))
        }
    }
}

/// Compute the window served for `header` against a file of `total_size`
/// bytes.
///
/// Fails with [`Error::RangeNotSatisfiable`] when the header is rejected by
/// `mode`, when the start lies at or beyond the end of the file (an empty
/// file is never satisfiable), or when an explicit end precedes the start.
pub fn resolve_range(
    header: &str,
    total_size: u64,
    chunk_size: u64,
    mode: RangeMode,
) -> Result<ByteRange> {
    let unsatisfiable = || Error::range_not_satisfiable(header, total_size);

    let (start, requested_end) = parse_range_header(header, mode).ok_or_else(unsatisfiable)?;
    if start >= total_size {
        return Err(unsatisfiable());
    }

    let mut end = start
        .saturating_add(chunk_size.max(1) - 1)
        .min(total_size - 1);
    if let Some(requested_end) = requested_end {
        if requested_end < start {
            return Err(unsatisfiable());
        }
        end = end.min(requested_end);
    }

    Ok(ByteRange {
        start,
        end,
        total_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn strict(header: &str, size: u64) -> Result<ByteRange> {
        resolve_range(header, size, CHUNK_SIZE, RangeMode::Strict)
    }

    fn lenient(header: &str, size: u64) -> Result<ByteRange> {
        resolve_range(header, size, CHUNK_SIZE, RangeMode::Lenient)
    }

    #[test]
    fn first_chunk_of_large_file() {
        let range = strict("bytes=0-", 5_000_000).unwrap();
        assert_eq!(range.content_range(), "bytes 0-999999/5000000");
        assert_eq!(range.len(), 1_000_000);
    }

    #[test]
    fn small_file_is_served_whole() {
        let range = strict("bytes=0-", 500_000).unwrap();
        assert_eq!(range.content_range(), "bytes 0-499999/500000");
        assert_eq!(range.len(), 500_000);
    }

    #[test]
    fn window_is_capped_by_chunk_and_file_end() {
        for (start, size) in [(0, 1), (999_999, 5_000_000), (4_500_000, 5_000_000), (42, 43)] {
            let range = strict(&format!("bytes={start}-"), size).unwrap();
            assert_eq!(range.start, start);
            assert_eq!(range.end, (start + CHUNK_SIZE - 1).min(size - 1));
            assert_eq!(range.len(), range.end - start + 1);
        }
    }

    #[test]
    fn strict_honours_smaller_explicit_end() {
        let range = strict("bytes=100-199", 5_000_000).unwrap();
        assert_eq!((range.start, range.end), (100, 199));

        let range = strict("bytes=0-9999999", 5_000_000).unwrap();
        assert_eq!(range.end, 999_999);
    }

    #[test]
    fn strict_rejects_nonconforming_headers() {
        for header in ["bytes=abc", "items=0-", "bytes=-500", "0-100", "bytes=1-2,5-6", ""] {
            let err = strict(header, 1000).unwrap_err();
            assert!(
                matches!(err, Error::RangeNotSatisfiable { size: 1000, .. }),
                "{header:?} should be rejected"
            );
        }
    }

    #[test]
    fn strict_rejects_inverted_range() {
        assert!(strict("bytes=500-100", 1000).is_err());
    }

    #[test]
    fn start_at_or_past_end_is_unsatisfiable() {
        assert_matches!(
            strict("bytes=1000-", 1000),
            Err(Error::RangeNotSatisfiable { size: 1000, .. })
        );
        assert_matches!(
            lenient("bytes=5000-", 1000),
            Err(Error::RangeNotSatisfiable { size: 1000, .. })
        );
        assert_matches!(strict("bytes=0-", 0), Err(Error::RangeNotSatisfiable { size: 0, .. }));
        assert_matches!(lenient("", 0), Err(Error::RangeNotSatisfiable { size: 0, .. }));
    }

    #[test]
    fn lenient_degrades_garbage_to_zero() {
        let range = lenient("bytes=abc", 2_000_000).unwrap();
        assert_eq!((range.start, range.end), (0, 999_999));

        let range = lenient("", 10).unwrap();
        assert_eq!((range.start, range.end), (0, 9));
    }

    #[test]
    fn lenient_concatenates_all_digits() {
        assert_eq!(parse_range_header("bytes=0-999", RangeMode::Lenient), Some((999, None)));
        assert_eq!(parse_range_header("bytes=32768-", RangeMode::Lenient), Some((32768, None)));
    }

    #[test]
    fn overflowing_offsets() {
        let huge = "bytes=99999999999999999999999-";
        assert!(strict(huge, 1000).is_err());
        assert_eq!(lenient(huge, 1000).unwrap().start, 0);
    }

    #[test]
    fn custom_chunk_size() {
        let range = resolve_range("bytes=10-", 100, 16, RangeMode::Strict).unwrap();
        assert_eq!((range.start, range.end, range.len()), (10, 25, 16));
    }
}
