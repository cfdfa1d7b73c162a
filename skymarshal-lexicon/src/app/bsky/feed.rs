use crate::app::bsky::actor::ProfileViewBasic;
use crate::com::atproto::repo::StrongRef;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Client-declared timestamp when this post was originally created.
    pub created_at: String,
    /// The primary post content. Might be an empty string, if there are embeds.
    pub text: String,
    /// Indicates human language of post primary text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub langs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub created_at: String,
    pub subject: StrongRef,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repost {
    pub created_at: String,
    pub subject: StrongRef,
}

/// Hydrated view of a post from `app.bsky.feed.getPosts`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub record: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repost_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_count: Option<usize>,
    pub indexed_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetPostsOutput {
    pub posts: Vec<PostView>,
}

/// Like from `app.bsky.feed.getLikes`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLikesLike {
    pub created_at: String,
    pub indexed_at: String,
    pub actor: crate::app::bsky::actor::ProfileView,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetLikesOutput {
    pub cursor: Option<String>,
    pub likes: Vec<GetLikesLike>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRepostedByOutput {
    pub cursor: Option<String>,
    pub reposted_by: Vec<crate::app::bsky::actor::ProfileView>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetQuotesOutput {
    pub cursor: Option<String>,
    pub posts: Vec<PostView>,
}

/// Thread shape from `app.bsky.feed.getPostThread`; the nested reply union
/// is walked generically.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GetPostThreadOutput {
    pub thread: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedViewPost {
    pub post: PostView,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuthorFeedOutput {
    pub cursor: Option<String>,
    pub feed: Vec<FeedViewPost>,
}
