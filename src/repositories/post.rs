use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use crate::{
    error::{AppError, Result},
    models::post::{Post, PostWithAuthor},
};

fn row_to_post(row: &Row) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        title: row.try_get("title").map_err(|_| AppError::MissingData("title".to_string()))?,
        content: row.try_get("content").map_err(|_| AppError::MissingData("content".to_string()))?,
        author_id: row.try_get("author_id").map_err(|_| AppError::MissingData("author_id".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Inserts a post owned by `author_id`.
pub async fn create_post(
    pool: &Pool,
    author_id: i64,
    title: &str,
    content: &str,
) -> Result<Post> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            INSERT INTO posts (title, content, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, author_id, created_at, updated_at
            "#,
        )
        .await?;
    let row = client.query_one(&stmt, &[&title, &content, &author_id]).await?;
    row_to_post(&row)
}

/// Lists every post with its author's username, newest first.
pub async fn list_with_authors(pool: &Pool) -> Result<Vec<PostWithAuthor>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            SELECT p.id, p.title, p.content, p.author_id, p.created_at, p.updated_at,
                   u.username AS author_username
            FROM posts p
            INNER JOIN users u ON u.id = p.author_id
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .await?;

    client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(|row| {
            Ok(PostWithAuthor {
                post: row_to_post(row)?,
                author_username: row
                    .try_get("author_username")
                    .map_err(|_| AppError::MissingData("author_username".to_string()))?,
            })
        })
        .collect()
}

/// Finds a post by its ID.
pub async fn find_by_id(pool: &Pool, post_id: i64) -> Result<Option<Post>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            SELECT id, title, content, author_id, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .await?;
    let row = client.query_opt(&stmt, &[&post_id]).await?;
    row.map(|r| row_to_post(&r)).transpose()
}

/// Updates title and content of a post, only if `author_id` still owns it.
///
/// `author_id` is matched, never written. Returns the number of rows changed.
pub async fn update_post(
    pool: &Pool,
    post_id: i64,
    author_id: i64,
    title: &str,
    content: &str,
) -> Result<u64> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            UPDATE posts
            SET title = $1, content = $2, updated_at = NOW()
            WHERE id = $3 AND author_id = $4
            "#,
        )
        .await?;
    Ok(client
        .execute(&stmt, &[&title, &content, &post_id, &author_id])
        .await?)
}

/// Deletes a post, only if `author_id` owns it. Returns the number of rows removed.
pub async fn delete_post(pool: &Pool, post_id: i64, author_id: i64) -> Result<u64> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached("DELETE FROM posts WHERE id = $1 AND author_id = $2")
        .await?;
    Ok(client.execute(&stmt, &[&post_id, &author_id]).await?)
}

/// Post storage as the post services see it.
///
/// `update` and `delete` only touch a row whose `author_id` matches, and
/// return the number of rows affected.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, author_id: i64, title: &str, content: &str) -> Result<Post>;
    async fn list(&self) -> Result<Vec<PostWithAuthor>>;
    async fn find(&self, post_id: i64) -> Result<Option<Post>>;
    async fn update(&self, post_id: i64, author_id: i64, title: &str, content: &str) -> Result<u64>;
    async fn delete(&self, post_id: i64, author_id: i64) -> Result<u64>;
}

#[async_trait]
impl PostStore for Pool {
    async fn insert(&self, author_id: i64, title: &str, content: &str) -> Result<Post> {
        create_post(self, author_id, title, content).await
    }

    async fn list(&self) -> Result<Vec<PostWithAuthor>> {
        list_with_authors(self).await
    }

    async fn find(&self, post_id: i64) -> Result<Option<Post>> {
        find_by_id(self, post_id).await
    }

    async fn update(&self, post_id: i64, author_id: i64, title: &str, content: &str) -> Result<u64> {
        update_post(self, post_id, author_id, title, content).await
    }

    async fn delete(&self, post_id: i64, author_id: i64) -> Result<u64> {
        delete_post(self, post_id, author_id).await
    }
}
