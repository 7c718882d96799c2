use garde::Validate;
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The registration form.
#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct RegisterForm {
    #[garde(length(chars, min = 3, max = 120), pattern(r"^[A-Za-z0-9_-]+$"))]
    pub username: String,
    #[garde(length(chars, min = 8, max = 128))]
    pub password: String,
}

/// The login form.
///
/// Only emptiness is checked here: length rules would tell an attacker which
/// usernames cannot exist, and every other failure must read the same.
#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct LoginForm {
    #[garde(length(chars, min = 1, max = 120))]
    pub username: String,
    #[garde(length(chars, min = 1, max = 128))]
    pub password: String,
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_a_reasonable_registration() {
        assert!(register("alice_01", "correct horse").validate().is_ok());
        assert!(register("a-b", "12345678").validate().is_ok());
    }

    #[test]
    fn rejects_short_or_oddly_shaped_usernames() {
        assert!(register("al", "correct horse").validate().is_err());
        assert!(register("alice smith", "correct horse").validate().is_err());
        assert!(register("<script>", "correct horse").validate().is_err());
        assert!(register(&"x".repeat(121), "correct horse").validate().is_err());
    }

    #[test]
    fn rejects_short_or_huge_passwords() {
        assert!(register("alice", "short").validate().is_err());
        assert!(register("alice", &"p".repeat(129)).validate().is_err());
    }

    #[test]
    fn password_limits_count_characters() {
        // 8 characters, 16 bytes.
        assert!(register("alice", "ññññññññ").validate().is_ok());
        assert!(register("alice", &"ñ".repeat(128)).validate().is_ok());
        assert!(register("alice", &"ñ".repeat(129)).validate().is_err());
    }

    #[test]
    fn debug_output_hides_the_password() {
        let form = register("alice", "super-secret-pw");
        assert!(!format!("{:?}", form).contains("super-secret-pw"));
    }

    #[test]
    fn login_only_requires_non_empty_fields() {
        let ok = LoginForm { username: "x".into(), password: "y".into() };
        assert!(ok.validate().is_ok());
        let empty = LoginForm { username: String::new(), password: "y".into() };
        assert!(empty.validate().is_err());
    }
}
