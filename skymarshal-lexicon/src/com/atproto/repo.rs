use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub uri: String,
    pub cid: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListRecordsOutput {
    pub cursor: Option<String>,
    pub records: Vec<Record>,
}

/// Delete a repository record, or ensure it doesn't exist. Requires auth.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeleteRecordInput {
    /// The handle or DID of the repo (aka, current account).
    pub repo: String,
    /// The NSID of the record collection.
    pub collection: String,
    /// The Record Key.
    pub rkey: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_records_output() {
        let data = "{\"cursor\":\"3lawvnsupm222\",\"records\":[{\"uri\":\"at://did:plc:abc/app.bsky.feed.post/3k2a\",\"cid\":\"bafyexample\",\"value\":{\"$type\":\"app.bsky.feed.post\",\"text\":\"hello\",\"createdAt\":\"2024-11-13T23:19:36.449Z\"}}]}";
        let output: ListRecordsOutput = serde_json::from_str(data).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].value["text"], "hello");
    }
}
