use axum::response::Html;

use super::layout::{PageContext, page};

pub fn login_page(ctx: &PageContext) -> Html<String> {
    let body = format!(
        r#"<h1>Log in</h1>
<form method="post" action="/login">
{}
<label>Username <input type="text" name="username" required maxlength="120"></label>
<label>Password <input type="password" name="password" required maxlength="128"></label>
<button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>"#,
        ctx.csrf_input()
    );
    page("Log in", ctx, &body)
}

pub fn register_page(ctx: &PageContext) -> Html<String> {
    let body = format!(
        r#"<h1>Register</h1>
<form method="post" action="/register">
{}
<label>Username <input type="text" name="username" required minlength="3" maxlength="120" pattern="[A-Za-z0-9_-]+"></label>
<label>Password <input type="password" name="password" required minlength="8" maxlength="128"></label>
<button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#,
        ctx.csrf_input()
    );
    page("Register", ctx, &body)
}
