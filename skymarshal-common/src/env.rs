//! Environment overrides. Skymarshal's variables all carry the
//! `SKYMARSHAL_` prefix: `SKYMARSHAL_HOME` (storage root),
//! `SKYMARSHAL_SERVICE` (PDS endpoint), `SKYMARSHAL_JETSTREAM`
//! (firehose endpoint), `SKYMARSHAL_USE_CAR` (prefer backup imports),
//! `SKYMARSHAL_FIREHOSE_AUTOSTART`, and `SKYMARSHAL_ALLOWED_ORIGIN`.

use std::env;

/// Value of an environment variable. Blank values count as unset so an
/// `export SKYMARSHAL_SERVICE=` line cannot silently break the client.
pub fn env_str(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Boolean flag. Accepts the usual spellings in either direction; any
/// other value reads as unset rather than guessing.
pub fn env_bool(name: &str) -> Option<bool> {
    match env_str(name)?.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_str_treats_blank_as_unset() {
        env::set_var("SKYMARSHAL_TEST_BLANK", "   ");
        assert_eq!(env_str("SKYMARSHAL_TEST_BLANK"), None);
        env::set_var("SKYMARSHAL_TEST_SET", "https://pds.example.org");
        assert_eq!(
            env_str("SKYMARSHAL_TEST_SET").as_deref(),
            Some("https://pds.example.org")
        );
        assert_eq!(env_str("SKYMARSHAL_TEST_NEVER_SET"), None);
    }

    #[test]
    fn test_env_bool_spellings() {
        for (value, expected) in [
            ("1", Some(true)),
            ("on", Some(true)),
            ("Yes", Some(true)),
            ("0", Some(false)),
            ("off", Some(false)),
            ("False", Some(false)),
            ("maybe", None),
        ] {
            env::set_var("SKYMARSHAL_TEST_FLAG", value);
            assert_eq!(env_bool("SKYMARSHAL_TEST_FLAG"), expected, "value {value:?}");
        }
    }
}
