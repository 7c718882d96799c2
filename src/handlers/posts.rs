use axum::{
    extract::{rejection::FormRejection, Path, State},
    response::{Html, Response},
    Extension, Form,
};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    flash::{self, Level},
    models::session::CurrentSession,
    repositories::post::PostStore,
    services::posts as post_service,
    state::AppState,
    validation::posts::PostForm,
    views::{self, layout::PageContext},
};

/// A post form as extracted, before it is known to be complete.
type PostBody = std::result::Result<Form<PostForm>, FormRejection>;

/// Lists every post.
pub async fn index(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
) -> Result<Html<String>> {
    let posts = post_service::list_posts(&state.db).await?;
    let ctx = PageContext::load(&state, &cookies, current).await?;
    Ok(views::posts::index_page(&ctx, &posts))
}

/// Renders the new-post form. Sits behind `require_auth`.
pub async fn create_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
) -> Result<Html<String>> {
    let ctx = PageContext::load(&state, &cookies, current).await?;
    Ok(views::posts::create_page(&ctx))
}

/// Creates a post owned by the session user.
///
/// The session is checked before the body is looked at.
pub async fn create<S>(
    State(store): State<S>,
    Extension(current): Extension<CurrentSession>,
    form: PostBody,
) -> Result<Response>
where
    S: PostStore + Clone + 'static,
{
    let session = current.session().ok_or(AppError::LoginRequired)?;

    let created = match form {
        Ok(Form(form)) => post_service::create_post(&store, session, &form).await,
        Err(rejection) => Err(rejection.into()),
    };
    match created {
        Ok(_) => Ok(flash::redirect("/", Level::Success, "Post created")),
        Err(AppError::Validation(msg)) => Ok(flash::redirect("/create", Level::Danger, msg)),
        Err(e) => Err(e),
    }
}

/// Renders the edit form for a post the session user owns.
pub async fn edit_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    cookies: Cookies,
    Path(post_id): Path<i64>,
) -> Result<Html<String>> {
    let post = post_service::load_owned_post(&state.db, current.session(), post_id).await?;
    let ctx = PageContext::load(&state, &cookies, current).await?;
    Ok(views::posts::edit_page(&ctx, &post))
}

/// Saves an edit to a post the session user owns.
///
/// Lookup and ownership are settled before the body is looked at, so an
/// incomplete form from a stranger is refused like a complete one.
pub async fn edit<S>(
    State(store): State<S>,
    Extension(current): Extension<CurrentSession>,
    Path(post_id): Path<i64>,
    form: PostBody,
) -> Result<Response>
where
    S: PostStore + Clone + 'static,
{
    let post = post_service::load_owned_post(&store, current.session(), post_id).await?;

    let saved = match form {
        Ok(Form(form)) => post_service::update_post(&store, &post, &form).await,
        Err(rejection) => Err(rejection.into()),
    };
    match saved {
        Ok(()) => Ok(flash::redirect("/", Level::Success, "Post updated")),
        Err(AppError::Validation(msg)) => Ok(flash::redirect(
            &format!("/edit/{}", post_id),
            Level::Danger,
            msg,
        )),
        Err(e) => Err(e),
    }
}

/// Deletes a post the session user owns.
pub async fn delete<S>(
    State(store): State<S>,
    Extension(current): Extension<CurrentSession>,
    Path(post_id): Path<i64>,
) -> Result<Response>
where
    S: PostStore + Clone + 'static,
{
    post_service::delete_post(&store, current.session(), post_id).await?;
    Ok(flash::redirect("/", Level::Success, "Post deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
    };
    use tower::ServiceExt;

    use crate::{
        flash::Flash,
        models::session::Session,
        repositories::post::memory::MemoryPosts,
    };

    const ALICE: i64 = 10;
    const MALLORY: i64 = 11;

    fn app(store: MemoryPosts, session: Option<Session>) -> Router {
        Router::new()
            .route("/create", post(create::<MemoryPosts>))
            .route("/edit/{post_id}", post(edit::<MemoryPosts>))
            .route("/delete/{post_id}", post(delete::<MemoryPosts>))
            .layer(Extension(CurrentSession(session)))
            .with_state(store)
    }

    fn as_user(user_id: i64) -> Option<Session> {
        Some(Session::new(user_id, format!("user{}", user_id), 1))
    }

    async fn submit(app: Router, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn flash_level(response: &Response) -> Option<Level> {
        response.extensions().get::<Flash>().map(|flash| flash.level)
    }

    #[tokio::test]
    async fn anonymous_edit_with_incomplete_body_is_sent_to_login() {
        let store = MemoryPosts::with_post(1, ALICE, "Original");
        let response = submit(app(store.clone(), None), "/edit/1", "title=defaced").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get(1).unwrap().title, "Original");
    }

    #[tokio::test]
    async fn anonymous_edit_with_complete_body_is_sent_to_login() {
        let store = MemoryPosts::with_post(1, ALICE, "Original");
        let response = submit(app(store.clone(), None), "/edit/1", "title=defaced&content=x").await;

        assert_eq!(location(&response), "/login");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn edit_of_missing_post_is_not_found() {
        let store = MemoryPosts::default();

        let anonymous = submit(app(store.clone(), None), "/edit/7", "title=x&content=y").await;
        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

        let signed_in = submit(app(store.clone(), as_user(ALICE)), "/edit/7", "title=x").await;
        assert_eq!(signed_in.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn other_user_cannot_edit() {
        let store = MemoryPosts::with_post(1, ALICE, "Original");

        let complete = submit(
            app(store.clone(), as_user(MALLORY)),
            "/edit/1",
            "title=hijacked&content=x",
        )
        .await;
        assert_eq!(complete.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&complete), "/");
        assert_eq!(flash_level(&complete), Some(Level::Danger));

        let incomplete = submit(app(store.clone(), as_user(MALLORY)), "/edit/1", "title=hijacked").await;
        assert_eq!(location(&incomplete), "/");

        assert_eq!(store.writes(), 0);
        assert_eq!(store.get(1).unwrap().title, "Original");
    }

    #[tokio::test]
    async fn owner_with_incomplete_body_goes_back_to_the_form() {
        let store = MemoryPosts::with_post(1, ALICE, "Original");
        let response = submit(app(store.clone(), as_user(ALICE)), "/edit/1", "title=New").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/edit/1");
        assert_eq!(flash_level(&response), Some(Level::Danger));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn owner_can_edit() {
        let store = MemoryPosts::with_post(1, ALICE, "Original");
        let response = submit(
            app(store.clone(), as_user(ALICE)),
            "/edit/1",
            "title=Revised&content=New+body",
        )
        .await;

        assert_eq!(location(&response), "/");
        assert_eq!(flash_level(&response), Some(Level::Success));
        let post = store.get(1).unwrap();
        assert_eq!(post.title, "Revised");
        assert_eq!(post.content, "New body");
        assert_eq!(post.author_id, ALICE);
    }

    #[tokio::test]
    async fn delete_of_missing_post_is_not_found() {
        let store = MemoryPosts::default();

        let anonymous = submit(app(store.clone(), None), "/delete/7", "").await;
        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

        let signed_in = submit(app(store.clone(), as_user(ALICE)), "/delete/7", "").await;
        assert_eq!(signed_in.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn anonymous_delete_is_sent_to_login() {
        let store = MemoryPosts::with_post(1, ALICE, "Keep me");
        let response = submit(app(store.clone(), None), "/delete/1", "").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert_eq!(store.writes(), 0);
        assert!(store.get(1).is_some());
    }

    #[tokio::test]
    async fn other_user_cannot_delete() {
        let store = MemoryPosts::with_post(1, ALICE, "Keep me");
        let response = submit(app(store.clone(), as_user(MALLORY)), "/delete/1", "").await;

        assert_eq!(location(&response), "/");
        assert_eq!(flash_level(&response), Some(Level::Danger));
        assert_eq!(store.writes(), 0);
        assert!(store.get(1).is_some());
    }

    #[tokio::test]
    async fn owner_can_delete() {
        let store = MemoryPosts::with_post(1, ALICE, "Bye");
        let response = submit(app(store.clone(), as_user(ALICE)), "/delete/1", "").await;

        assert_eq!(location(&response), "/");
        assert!(store.get(1).is_none());
    }

    #[tokio::test]
    async fn anonymous_create_is_sent_to_login() {
        let store = MemoryPosts::default();
        let response = submit(app(store.clone(), None), "/create", "title=sneaky").await;

        assert_eq!(location(&response), "/login");
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn incomplete_create_goes_back_to_the_form() {
        let store = MemoryPosts::default();
        let response = submit(app(store.clone(), as_user(ALICE)), "/create", "content=x").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/create");
        assert_eq!(flash_level(&response), Some(Level::Danger));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn create_is_owned_by_the_session_user() {
        let store = MemoryPosts::default();
        let response = submit(
            app(store.clone(), as_user(ALICE)),
            "/create",
            "title=Hello&content=First+post",
        )
        .await;

        assert_eq!(location(&response), "/");
        assert_eq!(store.get(1).unwrap().author_id, ALICE);
    }
}
