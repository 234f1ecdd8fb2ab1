//! # Odyss
//!
//! Session and trip state for the Odyss ride-sharing client.
//!
//! Users register, sign in, post inter-city trips and search for travel
//! companions. All persistence and authentication live in a hosted backend
//! reached through the [`gateway::Gateway`] trait; this crate owns the two
//! state containers layered on top of it and their request lifecycle.
//!
//! ## Architecture
//!
//! - **Session State** ([`auth::AuthManager`]): who is signed in, which auth
//!   panel is visible, password reset and email verification flags
//! - **Trip State** ([`trip::TripManager`]): the draft trip form and the
//!   list produced by the last fetch or search
//! - **Store** ([`store::Store`]): owns both containers, accepts
//!   [`store::Intent`]s and publishes snapshots over `tokio::sync::watch`
//!
//! Each container settles every request exactly once. Overlapping requests
//! of the same kind are ordered by [`request::RequestTracker`]: only the
//! newest one's result is applied.
//!
//! ## Example
//!
//! ```no_run
//! use odyss::config::GatewayConfig;
//! use odyss::store::{Intent, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let store = Store::connect(&config).await?;
//!
//!     store.dispatch(Intent::FetchTrips).await?;
//!     println!("{} trips available", store.snapshot().trips.trips.len());
//!     Ok(())
//! }
//! ```

/// Gateway configuration loaded from the environment.
pub mod config;

/// Client-visible routes and email redirect parameters.
pub mod routes;

/// Backend gateway port and its adapters.
pub mod gateway;

/// Request ids and supersession tracking.
pub mod request;

/// Session State: authentication lifecycle.
pub mod auth;

/// Trip State: trip draft, creation and search.
pub mod trip;

/// Process-wide store owning both state containers.
pub mod store;

pub use auth::{AuthError, AuthManager, SessionState, User};
pub use config::{ConfigError, GatewayConfig};
pub use gateway::{Gateway, GatewayError};
pub use routes::Route;
pub use store::{DispatchError, Intent, Store};
pub use trip::{Trip, TripError, TripListing, TripManager, TripState};
