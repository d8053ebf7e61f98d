use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        activity::ActivityAction,
        users::{AdminIdentity, AdminSession},
    },
    repositories::{activity_repo::ActivityRepository, user_repo::AdminUserRepository},
    Error, Result,
};

/// Verified against when the username is unknown, so that every failed
/// login costs one argon2 run.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn AdminUserRepository>,
    activity: Arc<dyn ActivityRepository>,
    session_secret: String,
    session_max_age_hours: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    jti: String,
    iat: usize,
    exp: usize,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn AdminUserRepository>,
        activity: Arc<dyn ActivityRepository>,
        session_secret: String,
        session_max_age_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            activity,
            session_secret,
            session_max_age_hours,
        }
    }

    /// Unknown, inactive and wrong-password logins all fail with
    /// `Error::InvalidCredentials`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AdminIdentity> {
        let username = username.trim();
        let Some(user) = self.user_repo.find_active_by_username(username).await? else {
            if let Ok(dummy) = PasswordHash::new(DUMMY_PASSWORD_HASH) {
                let _ = Argon2::default().verify_password(password.as_bytes(), &dummy);
            }
            warn!(username, "Login attempt for unknown or inactive admin");
            return Err(Error::InvalidCredentials);
        };

        let parsed_hash = match PasswordHash::new(&user.password_hash) {
            Ok(hash) => hash,
            Err(err) => {
                error!(user_id = user.id, "Stored password hash is malformed: {}", err);
                return Err(Error::InvalidCredentials);
            }
        };
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            warn!(username, "Login attempt with wrong password");
            return Err(Error::InvalidCredentials);
        }

        self.user_repo.touch_last_login(user.id).await?;
        info!(user_id = user.id, "Admin logged in");

        let identity = AdminIdentity {
            id: user.id,
            username: user.username,
        };
        self.record(&identity, ActivityAction::Login, "User logged in")
            .await;

        Ok(identity)
    }

    /// Stores a new session row for `identity` and returns its cookie token.
    pub async fn start_session(&self, identity: AdminIdentity) -> Result<String> {
        match self.user_repo.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Expired sessions removed"),
            Err(err) => warn!("Could not purge expired sessions: {:?}", err),
        }

        let session = AdminSession {
            id: Uuid::now_v7(),
            identity,
        };
        let expires_at = self.expires_at();
        self.user_repo
            .create_session(session.id, session.identity.id, expires_at)
            .await?;

        self.issue_token(&session, expires_at)
    }

    /// Resolves a cookie token to its session. Tokens whose row was deleted
    /// or expired, or whose admin was deactivated, are `Error::Unauthorized`.
    pub async fn resume_session(&self, token: &str) -> Result<AdminSession> {
        let claims = self.decode_token(token)?;
        let session_id: Uuid = claims.jti.parse().map_err(|_| Error::Unauthorized)?;

        let identity = self
            .user_repo
            .find_session(session_id)
            .await?
            .ok_or(Error::Unauthorized)?;

        Ok(AdminSession {
            id: session_id,
            identity,
        })
    }

    /// Pushes the session's expiry out by the max age and re-issues the token.
    pub async fn refresh_session(&self, session: &AdminSession) -> Result<String> {
        let expires_at = self.expires_at();
        if !self
            .user_repo
            .extend_session(session.id, expires_at)
            .await?
        {
            return Err(Error::Unauthorized);
        }

        self.issue_token(session, expires_at)
    }

    pub async fn logout(&self, session: &AdminSession) {
        match self.user_repo.delete_session(session.id).await {
            Ok(_) => info!(user_id = session.identity.id, "Admin logged out"),
            Err(err) => error!("Could not delete session: {:?}", err),
        }
        self.record(&session.identity, ActivityAction::Logout, "User logged out")
            .await;
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<i32> {
        let password_hash = hash_password(password)?;

        let user_id = self
            .user_repo
            .create_admin(username.trim(), &password_hash, email)
            .await?;
        info!(user_id, "Admin user created");

        Ok(user_id)
    }

    /// Replaces the admin's password and ends every session they hold.
    pub async fn reset_password(&self, username: &str, password: &str) -> Result<i32> {
        let password_hash = hash_password(password)?;

        let user_id = self
            .user_repo
            .update_password(username.trim(), &password_hash)
            .await?
            .ok_or(Error::NotFound)?;
        let revoked = self.user_repo.delete_user_sessions(user_id).await?;
        info!(user_id, revoked, "Admin password reset");

        Ok(user_id)
    }

    fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::hours(self.session_max_age_hours)
    }

    fn issue_token(&self, session: &AdminSession, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: session.identity.id.to_string(),
            username: session.identity.username.clone(),
            jti: session.id.to_string(),
            iat: Utc::now().timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_bytes()),
        )
        .map_err(|_| Error::InternalServerError)
    }

    fn decode_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.session_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::Unauthorized)?;

        Ok(decoded.claims)
    }

    async fn record(&self, identity: &AdminIdentity, action: ActivityAction, details: &str) {
        if let Err(err) = self
            .activity
            .log_activity(identity.id, action, details)
            .await
        {
            warn!(%action, "Could not record activity: {:?}", err);
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;

    Ok(password_hash.to_string())
}
