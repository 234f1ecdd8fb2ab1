//! Trip State: the draft form, trip creation, listing and search.
//!
//! ## Example
//!
//! ```no_run
//! use odyss::config::GatewayConfig;
//! use odyss::gateway;
//! use odyss::trip::{TripManager, TripSearch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let trips = TripManager::new(gateway::connect(&config)?, &config);
//!
//!     let found = trips.find_trips(TripSearch::new("Enugu", "", "")).await?;
//!     for listing in found {
//!         println!("{} -> {} on {}", listing.trip.origin, listing.trip.destination,
//!             listing.trip.display_date());
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TripError, TripResult};
pub use manager::{TripManager, TripRequest};
pub use models::{
    TRIP_DATE_FORMAT, Trip, TripDraft, TripField, TripListing, TripSearch, TripState,
};
