use axum::response::Html;

use super::layout::{PageContext, escape, page};
use crate::models::post::{Post, PostWithAuthor};

fn post_card(ctx: &PageContext, entry: &PostWithAuthor) -> String {
    let post = &entry.post;
    let owned = ctx
        .session
        .as_ref()
        .is_some_and(|session| session.user_id == post.author_id);

    // Controls are a convenience only; the handlers re-check ownership.
    let controls = if owned {
        format!(
            r#"<div class="controls">
<a href="/edit/{id}">Edit</a>
<form method="post" action="/delete/{id}">{csrf}<button type="submit">Delete</button></form>
</div>"#,
            id = post.id,
            csrf = ctx.csrf_input()
        )
    } else {
        String::new()
    };

    format!(
        r#"<article>
<h2>{}</h2>
<p class="meta">by {} on {}</p>
<div class="content">{}</div>
{}
</article>"#,
        escape(&post.title),
        escape(&entry.author_username),
        post.created_at.format("%Y-%m-%d %H:%M UTC"),
        escape(&post.content),
        controls
    )
}

pub fn index_page(ctx: &PageContext, posts: &[PostWithAuthor]) -> Html<String> {
    let list = if posts.is_empty() {
        "<p>No posts yet.</p>".to_string()
    } else {
        posts
            .iter()
            .map(|entry| post_card(ctx, entry))
            .collect::<Vec<_>>()
            .join("\n")
    };
    page("Posts", ctx, &format!("<h1>Posts</h1>\n{}", list))
}

fn post_form(ctx: &PageContext, action: &str, title: &str, content: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{}">
{}
<label>Title <input type="text" name="title" required maxlength="120" value="{}"></label>
<label>Content <textarea name="content" required>{}</textarea></label>
<button type="submit">{}</button>
</form>"#,
        escape(action),
        ctx.csrf_input(),
        escape(title),
        escape(content),
        escape(submit)
    )
}

pub fn create_page(ctx: &PageContext) -> Html<String> {
    let body = format!(
        "<h1>New post</h1>\n{}",
        post_form(ctx, "/create", "", "", "Publish")
    );
    page("New post", ctx, &body)
}

pub fn edit_page(ctx: &PageContext, post: &Post) -> Html<String> {
    let body = format!(
        "<h1>Edit post</h1>\n{}",
        post_form(ctx, &format!("/edit/{}", post.id), &post.title, &post.content, "Save")
    );
    page("Edit post", ctx, &body)
}
