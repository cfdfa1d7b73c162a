use crate::app::bsky::actor::ProfileView;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub created_at: String,
    /// DID of the account being followed.
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetFollowsOutput {
    pub cursor: Option<String>,
    pub subject: ProfileView,
    pub follows: Vec<ProfileView>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetFollowersOutput {
    pub cursor: Option<String>,
    pub subject: ProfileView,
    pub followers: Vec<ProfileView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_record() {
        let data = "{\"$type\":\"app.bsky.graph.follow\",\"createdAt\":\"2024-11-14T22:23:49.147Z\",\"subject\":\"did:plc:sh5zdynqtvfavtkv6estb73d\"}";
        let follow: Follow = serde_json::from_str(data).unwrap();
        assert_eq!(follow.subject, "did:plc:sh5zdynqtvfavtkv6estb73d");
    }

    #[test]
    fn test_get_follows_output() {
        let data = "{\"cursor\":\"3lauicnw5op2f\",\"subject\":{\"did\":\"did:plc:abc\",\"handle\":\"alice.bsky.social\"},\"follows\":[{\"did\":\"did:plc:def\",\"handle\":\"bob.bsky.social\",\"displayName\":\"Bob\"}]}";
        let output: GetFollowsOutput = serde_json::from_str(data).unwrap();
        assert_eq!(output.follows.len(), 1);
        assert_eq!(output.follows[0].handle, "bob.bsky.social");
    }
}
