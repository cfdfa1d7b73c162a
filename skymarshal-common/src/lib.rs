use chrono::{SecondsFormat, Utc};
use rand::Rng;

pub mod env;
pub mod error;
pub mod progress;
pub mod syntax;
pub mod time;

pub use error::SkymarshalError;

/// Current instant as the millisecond-precision RFC3339 string stored in
/// exports, cache rows, and share records.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Random lowercase hex string of `len` characters. Used for session and
/// share identifiers.
pub fn get_random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_random_hex_shape() {
        let id = get_random_hex(32);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_now_is_rfc3339_zulu() {
        let ts = now();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
