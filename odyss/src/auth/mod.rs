//! Session State: registration, login, and the authentication lifecycle.
//!
//! This module implements:
//! - The session phase machine (anonymous, checking, authenticating,
//!   authenticated, logging out)
//! - Profile documents joined to gateway accounts by `user_id`
//! - Password reset and email verification flows driven by redirect links
//! - Supersession of overlapping requests of the same kind
//!
//! ## Example
//!
//! ```no_run
//! use odyss::auth::{AuthManager, LoginRequest};
//! use odyss::config::GatewayConfig;
//! use odyss::gateway;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let auth = AuthManager::new(gateway::connect(&config)?, &config);
//!
//!     if !auth.check_auth_status().await {
//!         let user = auth.login(LoginRequest::new("a@x.com", "secret1")).await?;
//!         println!("Signed in as {}", user.display_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, AuthRequest};
pub use models::{
    AuthPanel, AuthPhase, LoginRequest, Profile, RegisterRequest, ResetPasswordRequest,
    SessionState, User,
};
