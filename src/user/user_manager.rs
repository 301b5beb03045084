use super::{
    auth::PasswordHasherKind, AuthToken, AuthTokenValue, UserAuthCredentials, UserStore,
    UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Username and password cannot be empty")]
    EmptyField,

    #[error("User {0} already exists")]
    HandleTaken(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct UserManager {
    user_store: Box<dyn UserStore>,
    session_ttl: Duration,
}

impl UserManager {
    pub fn new(user_store: Box<dyn UserStore>, session_ttl: Duration) -> Self {
        Self {
            user_store,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let user_handle = user_handle.as_ref();
        if user_handle.trim().is_empty() {
            bail!("The user handle cannot be empty.")
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }
        self.user_store.create_user(user_handle)
    }

    /// Creates a user with password credentials in one go.
    pub fn register(&self, user_handle: &str, password: &str) -> Result<usize, RegistrationError> {
        if user_handle.trim().is_empty() || password.is_empty() {
            return Err(RegistrationError::EmptyField);
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            return Err(RegistrationError::HandleTaken(user_handle.to_string()));
        }
        let user_id = self
            .user_store
            .create_user(user_handle)
            .map_err(|err| match self.user_store.get_user_id(user_handle) {
                // Lost a race with a concurrent registration.
                Ok(Some(_)) => RegistrationError::HandleTaken(user_handle.to_string()),
                _ => RegistrationError::Store(err),
            })?;
        self.user_store
            .update_user_auth_credentials(UserAuthCredentials {
                user_id,
                username_password: Some(Self::create_hashed_password(user_id, password)?),
            })?;
        info!("Registered user {}", user_handle);
        Ok(user_id)
    }

    fn create_hashed_password(user_id: usize, password: &str) -> Result<UsernamePasswordCredentials> {
        let hasher = PasswordHasherKind::Argon2;
        let salt = hasher.generate_b64_salt()?;
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn create_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_some() {
            bail!("User with handle {} already has password credentials. Maybe you want to modify them?", user_handle);
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn update_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_none() {
            bail!(
                "Cannot update password of user with handle {} since it never had one.",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn delete_password_credentials(&self, user_handle: &str) -> Result<()> {
        let mut credentials = self
            .user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password = None;
        self.user_store.update_user_auth_credentials(credentials)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store.get_user_auth_credentials(user_handle)
    }

    /// Returns the user id when the password matches.
    pub fn check_password(&self, user_handle: &str, password: &str) -> Result<Option<usize>> {
        let credentials = match self.user_store.get_user_auth_credentials(user_handle)? {
            Some(UserAuthCredentials {
                username_password: Some(credentials),
                ..
            }) => credentials,
            _ => return Ok(None),
        };
        let matches = credentials
            .hasher
            .verify(password, &credentials.hash)
            .unwrap_or(false);
        self.user_store
            .touch_password_credentials(credentials.user_id, matches)?;
        Ok(matches.then_some(credentials.user_id))
    }

    /// Checks the password and issues a new session token.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        match self.check_password(user_handle, password)? {
            Some(user_id) => Ok(Some(self.generate_auth_token(user_id)?)),
            None => Ok(None),
        }
    }

    pub fn generate_auth_token(&self, user_id: usize) -> Result<AuthToken> {
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(token.clone())?;
        Ok(token)
    }

    /// Looks up a live session token. Expired tokens are deleted on sight.
    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let token = match self.user_store.get_user_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        if token.is_expired(self.session_ttl, SystemTime::now()) {
            debug!("Auth token of user {} expired", token.user_id);
            self.user_store.delete_user_auth_token(value)?;
            return Ok(None);
        }
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)?;
        Ok(Some(token))
    }

    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        let token = self
            .user_store
            .get_user_auth_token(token_value)?
            .context("Auth token not found")?;
        if token.user_id != user_id {
            bail!(
                "User {} tried to delete an auth token owned by user {}",
                user_id,
                token.user_id
            );
        }
        self.user_store.delete_user_auth_token(token_value)?;
        Ok(())
    }

    pub fn get_user_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.user_store.get_all_user_auth_tokens(user_handle)
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.user_store.get_user_handle(user_id)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.get_all_user_handles()
    }
}
