//! Constant-time equality for credential material.

use subtle::ConstantTimeEq;

/// Compares two byte strings without short-circuiting on the first difference.
///
/// When the lengths differ the expected value is still compared against itself
/// so the call takes comparable time before returning `false`.
pub fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"admin", b"admin"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn differing_inputs_do_not_match() {
        assert!(!constant_time_eq(b"admin", b"Admin"));
        assert!(!constant_time_eq(b"admin", b"admin "));
        assert!(!constant_time_eq(b"", b"admin"));
    }
}
