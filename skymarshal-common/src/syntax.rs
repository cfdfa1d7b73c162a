use crate::error::SkymarshalError;

/// Normalize a user-supplied handle into ATProto's DNS-name form: trim
/// whitespace, strip one leading `@`, convert any remaining `@` to `.`
/// (email-style custom domains), and append `.bsky.social` when no dot is
/// left. Idempotent.
pub fn normalize_handle(handle: &str) -> String {
    let mut h = handle.trim().to_string();
    if let Some(stripped) = h.strip_prefix('@') {
        h = stripped.to_string();
    }
    h = h.replace('@', ".");
    if !h.contains('.') {
        h = format!("{h}.bsky.social");
    }
    h
}

/// A normalized handle is valid when every dot-separated segment is
/// non-empty. Catches inputs that were only an `@` or only a `.`.
pub fn validate_handle(handle: &str) -> Result<String, SkymarshalError> {
    let normalized = normalize_handle(handle);
    if normalized.is_empty() || normalized.split('.').any(|segment| segment.is_empty()) {
        return Err(SkymarshalError::Validation(format!(
            "'{handle}' is not a valid Bluesky handle"
        )));
    }
    Ok(normalized)
}

/// Parsed `at://<did>/<collection>/<rkey>` record URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUri {
    pub did: String,
    pub collection: String,
    pub rkey: String,
}

impl RecordUri {
    pub fn parse(uri: &str) -> Result<Self, SkymarshalError> {
        let rest = uri.strip_prefix("at://").ok_or_else(|| {
            SkymarshalError::Validation(format!("'{uri}' is not an at:// record URI"))
        })?;
        let mut parts = rest.splitn(3, '/');
        let did = parts.next().unwrap_or_default();
        let collection = parts.next().unwrap_or_default();
        let rkey = parts.next().unwrap_or_default();
        if did.is_empty() || collection.is_empty() || rkey.is_empty() {
            return Err(SkymarshalError::Validation(format!(
                "'{uri}' is missing a did, collection, or rkey segment"
            )));
        }
        Ok(RecordUri {
            did: did.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        })
    }

    /// The repo DID of an at:// URI, without requiring all three segments.
    /// Used for subject URIs of likes/reposts where only the author matters.
    pub fn did_of(uri: &str) -> Option<&str> {
        let rest = uri.strip_prefix("at://")?;
        let did = rest.split('/').next()?;
        if did.is_empty() {
            None
        } else {
            Some(did)
        }
    }
}

impl std::fmt::Display for RecordUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at://{}/{}/{}", self.did, self.collection, self.rkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle_variants() {
        assert_eq!(normalize_handle("@alice.bsky.social"), "alice.bsky.social");
        assert_eq!(normalize_handle("alice"), "alice.bsky.social");
        assert_eq!(normalize_handle("adam@blacksky.com"), "adam.blacksky.com");
        assert_eq!(normalize_handle("  bob.example.org  "), "bob.example.org");
    }

    #[test]
    fn test_normalize_handle_idempotent() {
        for input in ["@alice", "alice", "adam@blacksky.com", "bob.example.org"] {
            let once = normalize_handle(input);
            assert_eq!(normalize_handle(&once), once);
        }
    }

    #[test]
    fn test_validate_handle_rejects_degenerate_input() {
        assert!(validate_handle("@").is_err());
        assert!(validate_handle(".").is_err());
        assert!(validate_handle("alice.bsky.social").is_ok());
    }

    #[test]
    fn test_record_uri_parse() {
        let uri = RecordUri::parse("at://did:plc:abc/app.bsky.feed.post/3k2a").unwrap();
        assert_eq!(uri.did, "did:plc:abc");
        assert_eq!(uri.collection, "app.bsky.feed.post");
        assert_eq!(uri.rkey, "3k2a");
        assert_eq!(uri.to_string(), "at://did:plc:abc/app.bsky.feed.post/3k2a");
    }

    #[test]
    fn test_record_uri_parse_rejects_short_uris() {
        assert!(RecordUri::parse("at://did:plc:abc/app.bsky.feed.post").is_err());
        assert!(RecordUri::parse("https://bsky.app/profile/x").is_err());
    }

    #[test]
    fn test_did_of_subject_uri() {
        assert_eq!(
            RecordUri::did_of("at://did:plc:bob/app.bsky.feed.post/xyz"),
            Some("did:plc:bob")
        );
        assert_eq!(RecordUri::did_of("nonsense"), None);
    }
}
