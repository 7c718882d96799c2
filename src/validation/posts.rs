use garde::Validate;
use serde::Deserialize;

/// The form behind both `/create` and `/edit/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostForm {
    #[garde(length(chars, min = 1, max = 120), custom(not_blank))]
    pub title: String,
    #[garde(length(chars, min = 1, max = 20000), custom(not_blank))]
    pub content: String,
}

fn not_blank(value: &str, _: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}
