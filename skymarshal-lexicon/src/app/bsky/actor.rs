#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(rename(deserialize = "displayName", serialize = "displayName"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(rename(deserialize = "displayName", serialize = "displayName"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileViewDetailed {
    pub did: String,
    pub handle: String,
    #[serde(rename(deserialize = "displayName", serialize = "displayName"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename(deserialize = "followersCount", serialize = "followersCount"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<usize>,
    #[serde(rename(deserialize = "followsCount", serialize = "followsCount"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follows_count: Option<usize>,
    #[serde(rename(deserialize = "postsCount", serialize = "postsCount"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<usize>,
    #[serde(rename(deserialize = "indexedAt", serialize = "indexedAt"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetProfilesOutput {
    pub profiles: Vec<ProfileViewDetailed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_view_detailed_deserializes_wire_shape() {
        let data = "{\"did\":\"did:plc:w4xbfzo7kqfes5zb7r6qv3rw\",\"handle\":\"blacksky.app\",\"displayName\":\"Blacksky\",\"description\":\"Community infrastructure\",\"followersCount\":1042,\"followsCount\":387,\"postsCount\":215,\"indexedAt\":\"2024-11-13T23:19:36.449Z\"}";
        let profile: ProfileViewDetailed = serde_json::from_str(data).unwrap();
        assert_eq!(profile.handle, "blacksky.app");
        assert_eq!(profile.followers_count, Some(1042));
        assert_eq!(profile.display_name.as_deref(), Some("Blacksky"));
    }

    #[test]
    fn test_profile_view_detailed_tolerates_missing_counts() {
        let data = "{\"did\":\"did:plc:abc\",\"handle\":\"ghost.bsky.social\"}";
        let profile: ProfileViewDetailed = serde_json::from_str(data).unwrap();
        assert_eq!(profile.followers_count, None);
        assert_eq!(profile.avatar, None);
    }
}
