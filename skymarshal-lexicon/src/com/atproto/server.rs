/// Create an authentication session.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CreateSessionInput {
    /// Handle or other identifier supported by the server for the authenticating user.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CreateSessionOutput {
    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
    #[serde(rename = "refreshJwt")]
    pub refresh_jwt: String,
    pub handle: String,
    pub did: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshSessionOutput {
    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
    #[serde(rename = "refreshJwt")]
    pub refresh_jwt: String,
    pub handle: String,
    pub did: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_output() {
        let data = "{\"accessJwt\":\"eyJ0.access\",\"refreshJwt\":\"eyJ0.refresh\",\"handle\":\"alice.bsky.social\",\"did\":\"did:plc:uhtptnlcrj4wrxfjfcanf34q\",\"email\":null}";
        let output: CreateSessionOutput = serde_json::from_str(data).unwrap();
        assert_eq!(output.did, "did:plc:uhtptnlcrj4wrxfjfcanf34q");
        assert_eq!(output.access_jwt, "eyJ0.access");
    }
}
