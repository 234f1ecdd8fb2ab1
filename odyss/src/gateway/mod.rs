//! Backend gateway: the hosted account and document service.
//!
//! The state containers only ever talk to the [`Gateway`] trait. One concrete
//! adapter ([`supabase::SupabaseGateway`]) is selected by [`connect`]; tests
//! use the in-memory [`mock::MockGateway`] behind the `test-support` feature.
//!
//! ## Example
//!
//! ```no_run
//! use odyss::config::GatewayConfig;
//! use odyss::gateway::{self, Collection, Query};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let gateway = gateway::connect(&config)?;
//!
//!     let trips = gateway.list(Collection::Trips, &Query::new()).await?;
//!     println!("{} trips posted", trips.len());
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod models;
pub mod supabase;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use errors::{GatewayError, GatewayResult};
pub use models::{
    Account, AccountId, Collection, Document, DocumentId, Filter, GatewaySession, Query, fields,
};

use crate::config::GatewayConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Account and document capabilities consumed by the state containers
///
/// Every call is a single request/response with no retry. Session tokens are
/// held by the adapter; callers only see account identifiers.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Create an account; returns its identifier
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> GatewayResult<AccountId>;

    /// Open a session for an email/password pair
    async fn authenticate(&self, email: &str, password: &str) -> GatewayResult<AccountId>;

    /// Whether an unexpired session is currently held
    async fn has_session(&self) -> GatewayResult<bool>;

    /// Install a session obtained out of band (email link redirect)
    async fn adopt_session(&self, session: GatewaySession) -> GatewayResult<()>;

    /// End the current session
    async fn end_session(&self) -> GatewayResult<()>;

    /// Re-send the signup confirmation email
    async fn resend_verification(&self, email: &str) -> GatewayResult<()>;

    /// Send a password-reset email linking back to `redirect_url`
    async fn request_password_reset(&self, email: &str, redirect_url: &str) -> GatewayResult<()>;

    /// Change the password of the current session's account
    async fn update_password(&self, new_password: &str) -> GatewayResult<()>;

    /// Account behind the current session
    async fn current_account(&self) -> GatewayResult<Account>;

    /// Insert a document; returns it with gateway-assigned columns filled in
    async fn insert(&self, collection: Collection, fields: Document) -> GatewayResult<Document>;

    /// First document matching `query`
    async fn get(&self, collection: Collection, query: &Query) -> GatewayResult<Option<Document>>;

    /// All documents matching `query`
    async fn list(&self, collection: Collection, query: &Query) -> GatewayResult<Vec<Document>>;
}

/// Build the configured gateway adapter
///
/// # Errors
///
/// Returns error if the configured gateway URL is unusable
pub fn connect(config: &GatewayConfig) -> GatewayResult<Arc<dyn Gateway>> {
    let gateway = supabase::SupabaseGateway::new(config)?;
    log::info!("Using gateway at {}", config.gateway_url);
    Ok(Arc::new(gateway))
}
