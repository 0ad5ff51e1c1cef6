//! Identity collaborator and the injected auth context.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub points: u32,
    pub level: u32,
}

const MIN_PASSWORD_LEN: usize = 6;

impl User {
    /// Profile created on sign-up: named after the email's local part,
    /// department "General", no points, level 1
    pub fn new_profile(id: impl Into<String>, email: &str) -> Self {
        let email = email.trim().to_string();
        let full_name = email.split('@').next().map(str::to_string);
        Self {
            id: id.into(),
            email,
            full_name,
            department: Some("General".to_string()),
            points: 0,
            level: 1,
        }
    }

    /// Full name, or the local part of the email when none is set
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    /// A recent failure locked the form
    #[error("too many attempts, retry in {}s", .remaining.as_secs().max(1))]
    CoolingDown { remaining: Duration },
    #[error("an account already exists for this email")]
    EmailTaken,
    #[error("cannot create account: {reason}")]
    SignUpRejected { reason: &'static str },
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// What subscribers see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// `init` has not finished yet
    Loading,
    SignedIn(User),
    SignedOut,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

/// Backend that owns credentials and sessions
pub trait IdentityProvider {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send;

    /// Create an account with a default profile and sign it in
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// User of a session that survived from earlier, if any
    fn restore(&self) -> impl Future<Output = Result<Option<User>, AuthError>> + Send;
}

/// Process-local provider for demos and tests
#[derive(Debug, Default)]
pub struct InMemoryIdentity {
    accounts: Mutex<HashMap<String, (String, User)>>,
    current: Mutex<Option<User>>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, password: impl Into<String>, user: User) {
        self.accounts
            .lock()
            .await
            .insert(user.email.to_lowercase(), (password.into(), user));
    }
}

impl IdentityProvider for InMemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = {
            let accounts = self.accounts.lock().await;
            match accounts.get(&email.trim().to_lowercase()) {
                Some((expected, user)) if expected == password => user.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        *self.current.lock().await = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(AuthError::SignUpRejected {
                reason: "invalid email address",
            });
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::SignUpRejected {
                reason: "password must be at least 6 characters",
            });
        }

        let user = {
            let mut accounts = self.accounts.lock().await;
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailTaken);
            }
            let user = User::new_profile(format!("user-{}", accounts.len() + 1), email);
            accounts.insert(key, (password.to_string(), user.clone()));
            user
        };
        *self.current.lock().await = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.current.lock().await.take();
        Ok(())
    }

    async fn restore(&self) -> Result<Option<User>, AuthError> {
        Ok(self.current.lock().await.clone())
    }
}

/// Signed-in user for everything that needs one.
///
/// Constructed once and handed to whoever needs it; subscribers are pushed
/// every signed-in / signed-out change.
pub struct AuthContext<P> {
    provider: P,
    state: watch::Sender<AuthState>,
    cooldown: Duration,
    locked_until: Option<Instant>,
}

impl<P: IdentityProvider> AuthContext<P> {
    pub fn new(provider: P, cooldown: Duration) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            provider,
            state,
            cooldown,
            locked_until: None,
        }
    }

    pub fn from_config(provider: P, config: &Config) -> Self {
        Self::new(provider, config.auth_cooldown())
    }

    /// Restore any existing session. Provider failures leave the context
    /// signed out.
    pub async fn init(&mut self) {
        let next = match self.provider.restore().await {
            Ok(Some(user)) => AuthState::SignedIn(user),
            Ok(None) => AuthState::SignedOut,
            Err(err) => {
                tracing::error!(%err, "failed to restore session");
                AuthState::SignedOut
            }
        };
        self.state.send_replace(next);
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Time left before another sign-in or sign-up attempt is accepted
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let until = self.locked_until?;
        let remaining = until.saturating_duration_since(Instant::now());
        (!remaining.is_zero()).then_some(remaining)
    }

    fn ensure_unlocked(&self) -> Result<(), AuthError> {
        match self.cooldown_remaining() {
            Some(remaining) => Err(AuthError::CoolingDown { remaining }),
            None => Ok(()),
        }
    }

    fn settle(
        &mut self,
        attempt: &'static str,
        result: Result<User, AuthError>,
    ) -> Result<User, AuthError> {
        match result {
            Ok(user) => {
                self.locked_until = None;
                tracing::info!(user = %user.id, attempt, "signed in");
                self.state.send_replace(AuthState::SignedIn(user.clone()));
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(%err, attempt, "authentication failed");
                self.locked_until = Some(Instant::now() + self.cooldown);
                Err(err)
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        self.ensure_unlocked()?;
        let result = self.provider.sign_in(email, password).await;
        self.settle("sign_in", result)
    }

    /// Create an account and sign it in. Failures lock the form for the
    /// same cooldown as a failed sign-in.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        self.ensure_unlocked()?;
        let result = self.provider.sign_up(email, password).await;
        self.settle("sign_up", result)
    }

    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        tracing::info!("signed out");
        self.state.send_replace(AuthState::SignedOut);
        Ok(())
    }

    /// Forget the local view of the user. The provider's session is left
    /// alone so a later `init` can restore it.
    pub fn teardown(&mut self) {
        self.locked_until = None;
        self.state.send_replace(AuthState::Loading);
    }
}
