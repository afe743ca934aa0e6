use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::User,
    },
    error::AppError,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_TOKEN: &str = "Not authorized, token failed";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    /// Verified against on unknown-email logins.
    static ref DUMMY_HASH: Option<String> = hash_password("unknown-account").ok();
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A freshly minted session for `user`.
#[derive(Debug)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Verifies credentials, mints session tokens and resolves them back to
/// user ids. The only component allowed to turn a bearer token into an
/// identity.
#[derive(Clone)]
pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
    password_min_len: usize,
}

impl SessionIssuer {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys, password_min_len: usize) -> Self {
        Self {
            users,
            keys,
            password_min_len,
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please provide all fields".into()));
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        if password.chars().count() < self.password_min_len {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.password_min_len
            )));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let hash = hash_password(password)?;
        let user = self.users.create(name, &email, &hash).await?;
        let token = self.keys.sign(user.id)?;

        info!(user_id = %user.id, "user registered");
        Ok(AuthSession { user, token })
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please provide email and password".into()));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            // same Argon2 cost as a wrong password, so timing does not reveal
            // which emails are registered
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            warn!("login with unknown email");
            return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with invalid password");
            return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { user, token })
    }

    /// Resolves a bearer token to the id of an existing user.
    pub async fn validate(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Auth(INVALID_TOKEN.into())
        })?;

        match self.users.find_by_id(claims.sub).await? {
            Some(user) => Ok(user.id),
            None => {
                warn!(user_id = %claims.sub, "token for unknown user");
                Err(AppError::Auth(INVALID_TOKEN.into()))
            }
        }
    }

    /// Ends the session carried by `token`. Tokens are stateless, so this
    /// only checks the token and records the logout; the client discards
    /// its copy.
    pub async fn revoke(&self, token: &str) -> Result<Uuid, AppError> {
        let user_id = self.validate(token).await?;
        info!(user_id = %user_id, "session revoked by client");
        Ok(user_id)
    }
}
