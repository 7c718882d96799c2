use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use deadpool_postgres::Pool;
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::repositories::user as user_repo;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hash verified when the username does not exist, so both failure paths cost the same.
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Hashing(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Hashing(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Hashing(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a PHC hash.
///
/// # Returns
///
/// `Ok(true)` on match, `Ok(false)` on mismatch, an error if the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Hashing(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

fn dummy_hash() -> Result<&'static str> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("inkpost-timing-equalizer")?;
    Ok(DUMMY_HASH.get_or_init(|| hash).as_str())
}

/// Decides the outcome of a login attempt from the looked-up user.
///
/// Both failure modes collapse into `AppError::InvalidCredentials`.
pub fn check_credentials(user: Option<User>, password: &str) -> Result<User> {
    match user {
        Some(user) => {
            if verify_password(password, &user.password)? {
                Ok(user)
            } else {
                Err(AppError::InvalidCredentials)
            }
        }
        None => {
            let _ = verify_password(password, dummy_hash()?)?;
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Creates a new user with a hashed password.
///
/// # Arguments
///
/// * `db` - The database connection pool.
/// * `username` - The user's username.
/// * `password` - The user's plaintext password. Never stored.
///
/// # Returns
///
/// A `Result` containing the created `User`, or `AppError::UsernameTaken`.
pub async fn register_user(db: &Pool, username: &str, password: &str) -> Result<User> {
    tracing::debug!("🔐 Creating user: {}", username);
    let hashed_password = hash_password(password)?;

    let user = user_repo::create_user(db, username, &hashed_password).await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a user by username and password.
///
/// # Returns
///
/// A `Result` containing the authenticated `User`, or `AppError::InvalidCredentials`.
pub async fn authenticate_user(db: &Pool, username: &str, password: &str) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", username);

    let user = user_repo::find_by_username(db, username).await?;
    let user = check_credentials(user, password)?;

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(user)
}
