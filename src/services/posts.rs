use garde::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        post::{Post, PostWithAuthor},
        session::Session,
    },
    repositories::post::PostStore,
    validation::posts::PostForm,
};

/// The ownership check.
///
/// An anonymous caller gets `LoginRequired`; an authenticated caller who is
/// not the post's author gets `NotOwner`. Returns the acting user's ID.
pub fn authorize_owner(session: Option<&Session>, post: &Post) -> Result<i64> {
    let session = session.ok_or(AppError::LoginRequired)?;
    if session.user_id != post.author_id {
        return Err(AppError::NotOwner);
    }
    Ok(session.user_id)
}

/// Lists every post for the index page.
pub async fn list_posts<S: PostStore + ?Sized>(store: &S) -> Result<Vec<PostWithAuthor>> {
    store.list().await
}

/// Creates a post owned by the session user.
pub async fn create_post<S: PostStore + ?Sized>(
    store: &S,
    session: &Session,
    form: &PostForm,
) -> Result<Post> {
    form.validate()?;

    let post = store.insert(session.user_id, &form.title, &form.content).await?;
    tracing::info!("📝 Post {} created by user {}", post.id, session.user_id);
    Ok(post)
}

/// Loads a post and checks that `session` may change it.
///
/// Lookup comes first: a missing post is `NotFound` whoever is asking.
pub async fn load_owned_post<S: PostStore + ?Sized>(
    store: &S,
    session: Option<&Session>,
    post_id: i64,
) -> Result<Post> {
    let post = store.find(post_id).await?.ok_or(AppError::NotFound)?;
    authorize_owner(session, &post)?;
    Ok(post)
}

/// Replaces title and content of `post`, which came from `load_owned_post`.
pub async fn update_post<S: PostStore + ?Sized>(
    store: &S,
    post: &Post,
    form: &PostForm,
) -> Result<()> {
    form.validate()?;

    let updated = store
        .update(post.id, post.author_id, &form.title, &form.content)
        .await?;
    if updated == 0 {
        // Deleted between the lookup and the update.
        return Err(AppError::NotFound);
    }

    tracing::info!("✏️ Post {} updated by user {}", post.id, post.author_id);
    Ok(())
}

/// Deletes a post the session user owns.
pub async fn delete_post<S: PostStore + ?Sized>(
    store: &S,
    session: Option<&Session>,
    post_id: i64,
) -> Result<()> {
    let post = load_owned_post(store, session, post_id).await?;

    let deleted = store.delete(post.id, post.author_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!("🗑️ Post {} deleted by user {}", post.id, post.author_id);
    Ok(())
}
