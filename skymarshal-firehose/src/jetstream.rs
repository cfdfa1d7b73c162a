use anyhow::{bail, Result};
use serde_json::Value;
use skymarshal_lexicon::app::bsky::feed::Post;

#[derive(Debug, Deserialize)]
pub struct CommitEvent {
    pub did: String,
    pub time_us: i64,
    pub commit: Commit,
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    pub rev: String,
    pub operation: String,
    pub collection: String,
    pub rkey: String,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub cid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    pub did: String,
    pub time_us: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccountEvent {
    pub did: String,
    pub time_us: i64,
}

#[derive(Debug)]
pub enum JetstreamEvent {
    Commit(CommitEvent),
    Identity(IdentityEvent),
    Account(AccountEvent),
}

/// Parse one Jetstream frame. Unknown kinds are an error the caller logs
/// and skips.
pub fn read(data: &str) -> Result<JetstreamEvent> {
    let value: Value = serde_json::from_str(data)?;
    let kind = value["kind"].as_str().unwrap_or_default().to_string();
    let event = match kind.as_str() {
        "commit" => JetstreamEvent::Commit(serde_json::from_value(value)?),
        "identity" => JetstreamEvent::Identity(serde_json::from_value(value)?),
        "account" => JetstreamEvent::Account(serde_json::from_value(value)?),
        other => bail!("received unknown kind {other:?}"),
    };
    Ok(event)
}

impl CommitEvent {
    /// The post record of a create commit in the post collection, if any.
    pub fn created_post(&self) -> Option<(String, Post)> {
        if self.commit.operation != "create"
            || self.commit.collection != "app.bsky.feed.post"
        {
            return None;
        }
        let record = self.commit.record.clone()?;
        let post: Post = serde_json::from_value(record).ok()?;
        let uri = format!(
            "at://{}/{}/{}",
            self.did, self.commit.collection, self.commit.rkey
        );
        Some((uri, post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_commit_create_post() {
        let data = "{\"did\":\"did:plc:uhtptnlcrj4wrxfjfcanf34q\",\"time_us\":1731539977109649,\"kind\":\"commit\",\"commit\":{\"rev\":\"3lauicnwejh2f\",\"operation\":\"create\",\"collection\":\"app.bsky.feed.post\",\"rkey\":\"3lauicnw5op2f\",\"record\":{\"$type\":\"app.bsky.feed.post\",\"createdAt\":\"2024-11-13T23:19:36.449Z\",\"text\":\"good morning sky\",\"langs\":[\"en\"]},\"cid\":\"bafyreifsdaip3s5nm3hcz4fbgkxodnils75oi3rmqhipwtom34rxw4vwdi\"}}";
        let event = read(data).unwrap();
        let JetstreamEvent::Commit(commit) = event else {
            panic!("expected commit event");
        };
        assert_eq!(commit.did, "did:plc:uhtptnlcrj4wrxfjfcanf34q");
        let (uri, post) = commit.created_post().unwrap();
        assert_eq!(
            uri,
            "at://did:plc:uhtptnlcrj4wrxfjfcanf34q/app.bsky.feed.post/3lauicnw5op2f"
        );
        assert_eq!(post.text, "good morning sky");
        assert_eq!(post.langs, Some(vec!["en".to_string()]));
    }

    #[test]
    fn test_read_commit_delete_has_no_post() {
        let data = "{\"did\":\"did:plc:zfr76ms7mkg6ct7qldg5c3z5\",\"time_us\":1731623029598761,\"kind\":\"commit\",\"commit\":{\"rev\":\"3lawvnsupm222\",\"operation\":\"delete\",\"collection\":\"app.bsky.feed.post\",\"rkey\":\"3kwrdj3olqr2t\"}}";
        let event = read(data).unwrap();
        let JetstreamEvent::Commit(commit) = event else {
            panic!("expected commit event");
        };
        assert!(commit.created_post().is_none());
    }

    #[test]
    fn test_read_identity() {
        let data = "{\"did\":\"did:plc:sh5zdynqtvfavtkv6estb73d\",\"time_us\":1731623029695659,\"kind\":\"identity\",\"identity\":{\"did\":\"did:plc:sh5zdynqtvfavtkv6estb73d\",\"handle\":\"irlasajj.bsky.social\",\"seq\":3478739942,\"time\":\"2024-11-14T22:23:49.147Z\"}}";
        let event = read(data).unwrap();
        assert!(matches!(event, JetstreamEvent::Identity(_)));
    }

    #[test]
    fn test_read_unknown_kind_errors() {
        assert!(read("{\"kind\":\"mystery\"}").is_err());
        assert!(read("not json").is_err());
    }
}
