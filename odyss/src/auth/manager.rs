//! Session state container: the authentication state machine.

use super::{
    errors::{AuthError, AuthResult},
    models::{
        AuthPanel, AuthPhase, LoginRequest, Profile, RegisterRequest, ResetPasswordRequest,
        SessionState, User,
    },
};
use crate::config::GatewayConfig;
use crate::gateway::{AccountId, Collection, Filter, Gateway, GatewayError, Query, fields};
use crate::request::{RequestTracker, Ticket};
use crate::routes::{RedirectKind, RedirectParams, Route};
use std::sync::Arc;
use tokio::sync::watch;

/// Request kinds whose results supersede each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRequest {
    /// Register, login, logout, status check: all decide who is signed in
    Identity,
    /// Forgot-password and reset-password
    Password,
    /// Resend and refresh of email confirmation
    Verification,
}

/// Authentication manager
///
/// Owns the [`SessionState`] snapshot. Each operation issues its gateway
/// calls, then settles the state exactly once: the result is merged in, or
/// the failure is recorded in `error`. Results of requests superseded by a
/// newer request of the same [`AuthRequest`] kind are dropped.
#[derive(Clone)]
pub struct AuthManager {
    gateway: Arc<dyn Gateway>,
    state: Arc<watch::Sender<SessionState>>,
    requests: Arc<RequestTracker<AuthRequest>>,
    reset_redirect_url: String,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `gateway` - Backend gateway
    /// * `config` - Gateway configuration, used for email redirect links
    pub fn new(gateway: Arc<dyn Gateway>, config: &GatewayConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            gateway,
            state: Arc::new(state),
            requests: Arc::new(RequestTracker::new()),
            reset_redirect_url: config.redirect_url(Route::ResetPassword),
        }
    }

    /// Current session state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every new session state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Register a new user
    ///
    /// Creates the account, opens a session, then stores the profile
    /// document keyed by the new account id. A failed profile write leaves
    /// the account in place without a profile.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Missing email/password or mismatched confirmation
    /// * `AuthError::Registration` - Account exists, profile write failed, or network fault
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        self.validated(request.validate())?;

        let previous = self.state.borrow().phase;
        let ticket = self.begin(AuthRequest::Identity, |s| {
            s.phase = AuthPhase::Authenticating;
            s.error = None;
        });

        let result = self.register_inner(&request).await;

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(user) => {
                log::info!("Registered user {}", user.id);
                s.sign_in(user.clone());
                s.show_auth = None;
            }
            Err(e) => {
                s.phase = previous;
                s.error = e.client_message();
            }
        })
    }

    async fn register_inner(&self, request: &RegisterRequest) -> AuthResult<User> {
        let display_name = format!("{} {}", request.first_name, request.last_name);
        let registration = |e: GatewayError| AuthError::Registration(e.client_message());

        let account_id = self
            .gateway
            .create_account(&request.email, &request.password, &display_name)
            .await
            .map_err(registration)?;

        self.gateway
            .authenticate(&request.email, &request.password)
            .await
            .map_err(registration)?;

        let profile = Profile {
            id: None,
            user_id: account_id.clone(),
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            phone_number: request.phone_number.clone(),
        };

        if let Err(e) = self
            .gateway
            .insert(Collection::Users, profile.to_document())
            .await
        {
            log::warn!("Account {} created without a profile: {}", account_id, e);
            return Err(AuthError::Registration(format!(
                "Account created but profile could not be saved: {}",
                e.client_message()
            )));
        }

        Ok(User {
            id: account_id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone_number: profile.phone_number,
            verified: false,
        })
    }

    /// Login with email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Missing email or password
    /// * `AuthError::Authentication` - Bad credentials or no profile for the account
    pub async fn login(&self, request: LoginRequest) -> AuthResult<User> {
        self.validated(request.validate())?;

        let previous = self.state.borrow().phase;
        let ticket = self.begin(AuthRequest::Identity, |s| {
            s.phase = AuthPhase::Authenticating;
            s.error = None;
        });

        let result = async {
            self.gateway
                .authenticate(&request.email, &request.password)
                .await
                .map_err(|e| AuthError::Authentication(e.client_message()))?;
            self.load_user().await
        }
        .await;

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(user) => {
                log::info!("User {} logged in", user.id);
                s.sign_in(user.clone());
                s.show_auth = None;
            }
            Err(e) => {
                s.phase = previous;
                s.error = e.client_message();
            }
        })
    }

    /// End the session
    ///
    /// Local identity is always cleared, whether or not the gateway accepted
    /// the request; a gateway failure is still reported in `error`.
    pub async fn logout(&self) -> AuthResult<()> {
        let ticket = self.begin(AuthRequest::Identity, |s| {
            s.phase = AuthPhase::LoggingOut;
            s.error = None;
        });

        let result = self
            .gateway
            .end_session()
            .await
            .map_err(|e| AuthError::Logout(e.client_message()));

        self.settle(&ticket, result, |s, outcome| {
            s.sign_out();
            match outcome {
                Ok(()) => log::info!("Logged out"),
                Err(e) => {
                    log::warn!("Gateway logout failed, clearing local session anyway: {}", e);
                    s.error = e.client_message();
                }
            }
        })
    }

    /// Check for an existing session and load its user
    ///
    /// Never records an error: any failure resolves to the anonymous state.
    /// Returns whether a user is signed in afterwards.
    pub async fn check_auth_status(&self) -> bool {
        let ticket = self.begin(AuthRequest::Identity, |s| {
            s.phase = AuthPhase::Checking;
        });

        let result = async {
            if !self.gateway.has_session().await.unwrap_or(false) {
                return Err(AuthError::SessionExpired);
            }
            self.load_user().await
        }
        .await;

        if let Err(e) = &result {
            log::debug!("Status check resolved to anonymous: {}", e);
        }

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(user) => s.sign_in(user.clone()),
            Err(_) => s.sign_out(),
        })
        .is_ok()
    }

    /// Request a password-reset email
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return self.validated(Err(AuthError::Validation("Email is required".to_string())));
        }

        let ticket = self.begin(AuthRequest::Password, |s| {
            s.error = None;
            s.reset_success = false;
        });

        let result = self
            .gateway
            .request_password_reset(email, &self.reset_redirect_url)
            .await
            .map_err(|e| AuthError::PasswordReset(e.client_message()));

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(()) => s.reset_success = true,
            Err(e) => s.error = e.client_message(),
        })
    }

    /// Set a new password on the session opened by the reset link
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AuthResult<()> {
        self.validated(request.validate())?;

        let ticket = self.begin(AuthRequest::Password, |s| {
            s.error = None;
            s.reset_success = false;
        });

        let result = self
            .gateway
            .update_password(&request.password)
            .await
            .map_err(|e| AuthError::PasswordReset(e.client_message()));

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(()) => {
                s.reset_success = true;
                s.show_auth = Some(AuthPanel::Signin);
            }
            Err(e) => s.error = e.client_message(),
        })
    }

    /// Re-send the confirmation email to the signed-in user
    pub async fn resend_verification(&self) -> AuthResult<()> {
        let email = self.state.borrow().user.as_ref().map(|u| u.email.clone());
        let Some(email) = email else {
            return self.validated(Err(AuthError::Verification(
                "Sign in to verify your email".to_string(),
            )));
        };

        let ticket = self.begin(AuthRequest::Verification, |s| {
            s.error = None;
        });

        let result = self
            .gateway
            .resend_verification(&email)
            .await
            .map_err(|e| AuthError::Verification(e.client_message()));

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(()) => s.verification_sent = true,
            Err(e) => s.error = e.client_message(),
        })
    }

    /// Re-read the account and record a completed email confirmation
    ///
    /// Returns whether the address is confirmed.
    pub async fn refresh_verification(&self) -> AuthResult<bool> {
        let ticket = self.begin(AuthRequest::Verification, |_| {});

        let result = self
            .gateway
            .current_account()
            .await
            .map(|account| account.is_verified())
            .map_err(|e| AuthError::Verification(e.client_message()));

        self.settle(&ticket, result, |s, outcome| match outcome {
            Ok(true) => {
                if let Some(user) = s.user.as_mut() {
                    user.verified = true;
                }
                s.verification_success = true;
            }
            Ok(false) => {}
            Err(e) => s.error = e.client_message(),
        })
    }

    /// Finish an email-link redirect
    ///
    /// Installs the session the link carries (if any), then runs a status
    /// check. A signup confirmation link that lands on a verified user also
    /// sets `verification_success`. Returns whether a user is signed in
    /// afterwards.
    pub async fn complete_redirect(&self, params: RedirectParams) -> bool {
        if let Some(description) = params.error_description.clone() {
            self.state.send_modify(|s| s.error = Some(description));
            return false;
        }

        let kind = params.kind.clone();
        if let Some(session) = params.into_session() {
            if let Err(e) = self.gateway.adopt_session(session).await {
                log::warn!("Could not install session from redirect: {}", e);
            }
        }

        let signed_in = self.check_auth_status().await;

        if signed_in && kind == Some(RedirectKind::Signup) {
            let verified = self
                .state
                .borrow()
                .user
                .as_ref()
                .is_some_and(|u| u.verified);
            if verified {
                self.state.send_modify(|s| s.verification_success = true);
            }
        }

        signed_in
    }

    /// Select the visible auth panel, starting from a clean slate
    pub fn set_show_auth(&self, panel: Option<AuthPanel>) {
        self.state.send_modify(|s| {
            s.show_auth = panel;
            s.reset_success = false;
            s.verification_sent = false;
            s.error = None;
        });
    }

    /// Record the outcome of an externally observed email confirmation
    pub fn set_verification_success(&self, success: bool) {
        self.state.send_modify(|s| s.verification_success = success);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Account of the current session joined with its profile document
    async fn load_user(&self) -> AuthResult<User> {
        let account = self
            .gateway
            .current_account()
            .await
            .map_err(|e| AuthError::Authentication(e.client_message()))?;
        let profile = self.find_profile(&account.id).await?;
        Ok(User::from_parts(&account, &profile))
    }

    async fn find_profile(&self, account_id: &AccountId) -> AuthResult<Profile> {
        let query = Query::new().filter(Filter::eq(fields::USER_ID, account_id.as_str()));
        let document = self
            .gateway
            .get(Collection::Users, &query)
            .await
            .map_err(|e| AuthError::Authentication(e.client_message()))?
            .ok_or_else(|| AuthError::Authentication("User data not found".to_string()))?;

        Profile::from_document(document).map_err(|e| {
            log::warn!("Malformed profile for account {}: {}", account_id, e);
            AuthError::Authentication("User data not found".to_string())
        })
    }

    /// Record a failed local check without touching the loading flag
    fn validated<T>(&self, result: AuthResult<T>) -> AuthResult<T> {
        if let Err(e) = &result {
            self.state.send_modify(|s| s.error = e.client_message());
        }
        result
    }

    /// Start a request: issue a ticket and apply the pending transition
    fn begin(
        &self,
        kind: AuthRequest,
        pending: impl FnOnce(&mut SessionState),
    ) -> Ticket<AuthRequest> {
        let ticket = self.requests.begin(kind);
        log::debug!("auth request {:?} #{} started", ticket.kind, ticket.id);
        self.state.send_modify(|s| {
            s.is_loading = true;
            pending(s);
        });
        ticket
    }

    /// Settle a request: apply its outcome unless it was superseded
    fn settle<T>(
        &self,
        ticket: &Ticket<AuthRequest>,
        result: AuthResult<T>,
        apply: impl FnOnce(&mut SessionState, &AuthResult<T>),
    ) -> AuthResult<T> {
        let current = self.requests.finish(ticket);
        let loading = self.requests.has_pending();

        self.state.send_modify(|s| {
            s.is_loading = loading;
            if current {
                apply(s, &result);
            }
        });

        if current {
            result
        } else {
            log::debug!("auth request {:?} #{} superseded", ticket.kind, ticket.id);
            Err(AuthError::Superseded)
        }
    }
}
