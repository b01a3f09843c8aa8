//! Byte-for-byte comparison of a received burst against what was sent.

/// Index of the first byte where `received` departs from `expected`.
///
/// A length difference counts as a mismatch at the end of the shorter
/// slice. Returns `None` when both are identical.
pub fn first_mismatch(expected: &[u8], received: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(received)
        .position(|(sent, got)| sent != got)
        .or_else(|| (expected.len() != received.len()).then(|| expected.len().min(received.len())))
}
