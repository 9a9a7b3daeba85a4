use crate::domain::password::{hash_password, verify_password};
use crate::domain::ports::{SessionStoreRef, UserStoreRef};
use crate::domain::session::{SessionState, generate_token};
use crate::domain::user::{Registration, Role, User, UserRecord, normalize_email};
use crate::error::{Result, ShippingError};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A signed-in user together with the session token issued for them.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl From<SessionState> for AuthSession {
    fn from(state: SessionState) -> Self {
        Self {
            user: state.user,
            token: state.token,
        }
    }
}

/// Credential checks, sign-up and the persisted session.
pub struct IdentityService {
    users: UserStoreRef,
    sessions: SessionStoreRef,
}

impl IdentityService {
    /// Creates the service.
    ///
    /// # Arguments
    ///
    /// * `users` - The store of user records and password hashes.
    /// * `sessions` - Where the signed-in session document is kept.
    pub fn new(users: UserStoreRef, sessions: SessionStoreRef) -> Self {
        Self { users, sessions }
    }

    /// Checks an email/password pair and persists a fresh session on success.
    ///
    /// Unknown emails, accounts without a password and wrong passwords all fail the
    /// same way.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession> {
        let record = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(ShippingError::InvalidCredentials)?;
        let hash = record
            .password_hash
            .as_deref()
            .ok_or(ShippingError::InvalidCredentials)?;

        if let Err(e) = verify_password(password, hash) {
            warn!(user_id = %record.user.id, "rejected sign-in");
            return Err(e);
        }

        info!(user_id = %record.user.id, role = %record.user.role, "signed in");
        self.start_session(record.user).await
    }

    /// Creates a customer account and signs it in.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<AuthSession> {
        registration.validate()?;
        let email = normalize_email(&registration.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ShippingError::EmailTaken(email));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            role: Role::Customer,
            created_at: Utc::now(),
        };
        let password_hash = hash_password(&registration.password)?;
        self.users
            .store(UserRecord {
                user: user.clone(),
                password_hash: Some(password_hash),
            })
            .await?;

        info!(user_id = %user.id, "registered customer");
        self.start_session(user).await
    }

    /// Forgets the persisted session. Signing out twice is fine.
    pub async fn sign_out(&self) -> Result<()> {
        self.sessions.clear().await
    }

    /// Reads back the persisted session and checks it against the user store.
    ///
    /// Unreadable, foreign-version or tampered documents are discarded and reported as
    /// signed out. The returned user is the stored record, never the persisted copy.
    pub async fn restore_session(&self) -> Result<Option<AuthSession>> {
        let raw = match self.sessions.load().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(ShippingError::CorruptSession(reason)) => return self.discard(&reason).await,
            Err(e) => return Err(e),
        };
        let state = match SessionState::decode(&raw) {
            Ok(state) => state,
            Err(e) => return self.discard(&e.to_string()).await,
        };

        match self.users.get(state.user.id).await? {
            Some(record) if record.user == state.user => Ok(Some(AuthSession {
                user: record.user,
                token: state.token,
            })),
            _ => self.discard("session does not match a stored user").await,
        }
    }

    async fn discard(&self, reason: &str) -> Result<Option<AuthSession>> {
        warn!(reason, "discarding stored session");
        self.sessions.clear().await?;
        Ok(None)
    }

    /// Like `restore_session` but fails with `NotSignedIn` when there is none.
    pub async fn current_session(&self) -> Result<AuthSession> {
        self.restore_session().await?.ok_or(ShippingError::NotSignedIn)
    }

    async fn start_session(&self, user: User) -> Result<AuthSession> {
        let state = SessionState::new(user, generate_token());
        self.sessions.save(&state.encode()?).await?;
        Ok(state.into())
    }
}

/// Gate for role-restricted operations.
pub fn require_role(user: &User, role: Role) -> Result<()> {
    if user.role == role {
        Ok(())
    } else {
        Err(ShippingError::Forbidden(role.to_string()))
    }
}
