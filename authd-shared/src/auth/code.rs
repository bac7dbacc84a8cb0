//! Email confirmation codes and constant-time string comparison.

use rand::Rng;

/// Alphabet for confirmation codes: unambiguous to read out of an email
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a confirmation code
pub const CODE_LENGTH: usize = 6;

/// Generates a random confirmation code such as `"K3Q9ZB"`
pub fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Compares two strings without short-circuiting on the first differing byte
///
/// Length is not secret: strings of different length compare unequal
/// immediately.
///
/// # Example
///
/// ```
/// use authd_shared::auth::code::constant_time_eq;
///
/// assert!(constant_time_eq("hello", "hello"));
/// assert!(!constant_time_eq("hello", "world"));
/// ```
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        for _ in 0..100 {
            let code = generate_confirmation_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn test_codes_vary() {
        let a = generate_confirmation_code();
        let b = generate_confirmation_code();
        let c = generate_confirmation_code();
        // 36^6 possibilities; three equal codes in a row means the RNG is broken
        assert!(!(a == b && b == c));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("", ""));
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
