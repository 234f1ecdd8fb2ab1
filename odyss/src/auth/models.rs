//! Authentication data models.

use super::errors::{AuthError, AuthResult};
use crate::gateway::{Account, AccountId, Document, DocumentId, fields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signed-in user, assembled from the gateway account and its profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: AccountId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// Email address confirmed through the gateway link
    pub verified: bool,
}

impl User {
    /// Build a user from its account and profile
    pub fn from_parts(account: &Account, profile: &Profile) -> Self {
        Self {
            id: account.id.clone(),
            email: if profile.email.is_empty() {
                account.email.clone()
            } else {
                profile.email.clone()
            },
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            phone_number: profile.phone_number.clone(),
            verified: account.is_verified(),
        }
    }

    /// "First Last", used as the account display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Profile document stored in the users collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Document id; absent until the gateway assigns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Foreign key to the authentication account
    pub user_id: AccountId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
}

impl Profile {
    /// Decode a profile from a gateway document
    pub fn from_document(document: Document) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(document))
    }

    /// Encode the profile for insertion
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(fields::USER_ID.to_string(), self.user_id.clone().into());
        document.insert(fields::EMAIL.to_string(), self.email.clone().into());
        document.insert(fields::FIRST_NAME.to_string(), self.first_name.clone().into());
        document.insert(fields::LAST_NAME.to_string(), self.last_name.clone().into());
        document.insert(
            fields::PHONE_NUMBER.to_string(),
            self.phone_number.clone().into(),
        );
        document
    }
}

/// Which auth panel the view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthPanel {
    Signup,
    Signin,
    ForgotPassword,
}

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    /// No session (initial state)
    #[default]
    Anonymous,
    /// Status check in flight
    Checking,
    /// Register or login in flight
    Authenticating,
    /// Session established and profile loaded
    Authenticated,
    /// Logout in flight
    LoggingOut,
}

/// Snapshot of the session state container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub show_auth: Option<AuthPanel>,
    pub reset_success: bool,
    pub verification_sent: bool,
    pub verification_success: bool,
    pub phase: AuthPhase,
}

impl SessionState {
    /// Enter the authenticated state with `user`
    pub(crate) fn sign_in(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
        self.phase = AuthPhase::Authenticated;
    }

    /// Drop the identity, leaving panel and flag fields alone
    pub(crate) fn sign_out(&mut self) {
        self.user = None;
        self.is_authenticated = false;
        self.phase = AuthPhase::Anonymous;
    }
}

/// Registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Repeated password, checked when the form asks for it
    #[serde(default)]
    pub password_confirm: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl RegisterRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            password_confirm: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: phone_number.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        require_credentials(&self.email, &self.password)?;
        if let Some(confirm) = &self.password_confirm {
            passwords_match(&self.password, confirm)?;
        }
        Ok(())
    }
}

/// Login form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        require_credentials(&self.email, &self.password)
    }
}

/// New-password form reached through the reset link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_again: String,
}

impl ResetPasswordRequest {
    pub fn new(password: impl Into<String>, password_again: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            password_again: password_again.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        passwords_match(&self.password, &self.password_again)
    }
}

fn require_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }
    Ok(())
}

fn passwords_match(password: &str, confirm: &str) -> AuthResult<()> {
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}
