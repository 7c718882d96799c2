use chrono::{DateTime, Utc};

/// Represents a blog post.
#[derive(Debug, Clone)]
pub struct Post {
    /// The unique identifier for the post.
    pub id: i64,
    /// The title of the post.
    pub title: String,
    /// The body of the post.
    pub content: String,
    /// The ID of the user who wrote the post. Never changes after creation.
    pub author_id: i64,
    /// The timestamp when the post was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the post was last edited.
    pub updated_at: DateTime<Utc>,
}

/// A post joined with its author's username, as shown on the index page.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author_username: String,
}
