//! Client-visible routes and the parameters gateway email links append to them.

use crate::gateway::GatewaySession;
use secrecy::SecretString;

/// Top-level views of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Landing page with the trip form and listings
    Home,
    /// Target of the password-reset email
    ResetPassword,
    /// Target of the signup confirmation email
    VerifyEmail,
}

impl Route {
    /// Path component of the route
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::ResetPassword => "/reset-password",
            Route::VerifyEmail => "/verify-email",
        }
    }

    /// Resolve a request path, tolerating a trailing slash
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Route::Home),
            "/reset-password" => Some(Route::ResetPassword),
            "/verify-email" => Some(Route::VerifyEmail),
            _ => None,
        }
    }
}

/// Kind of email link that produced a redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectKind {
    Signup,
    Recovery,
    Other(String),
}

/// Parameters a gateway email link carries in the URL fragment
#[derive(Debug, Default)]
pub struct RedirectParams {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub kind: Option<RedirectKind>,
    pub error_description: Option<String>,
}

impl RedirectParams {
    /// Parse a fragment such as `#access_token=...&type=recovery`
    pub fn parse(fragment: &str) -> Self {
        let mut params = RedirectParams::default();
        let raw = fragment.trim_start_matches('#').trim_start_matches('?');

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "access_token" => params.access_token = Some(value.into_owned()),
                "refresh_token" => params.refresh_token = Some(value.into_owned()),
                "expires_in" => params.expires_in = value.parse().ok(),
                "type" => {
                    params.kind = Some(match value.as_ref() {
                        "signup" => RedirectKind::Signup,
                        "recovery" => RedirectKind::Recovery,
                        other => RedirectKind::Other(other.to_string()),
                    })
                }
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        params
    }

    /// Session carried by the link, if it has an access token
    pub fn into_session(self) -> Option<GatewaySession> {
        let access_token = self.access_token?;
        Some(GatewaySession {
            access_token: SecretString::from(access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: self.expires_in.and_then(GatewaySession::expiry_after),
        })
    }
}
