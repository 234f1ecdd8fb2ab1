//! Trip state container: draft editing, creation, listing and search.

use super::{
    errors::{TripError, TripResult},
    models::{Trip, TripDraft, TripField, TripListing, TripSearch, TripState, validate_trip},
};
use crate::auth::Profile;
use crate::config::GatewayConfig;
use crate::gateway::{Collection, Document, Filter, Gateway, Query, fields};
use crate::request::{RequestTracker, Ticket};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Request kinds whose results supersede each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripRequest {
    Create,
    /// Fetch and search: both replace the whole list
    Load,
}

/// Trip manager
#[derive(Clone)]
pub struct TripManager {
    gateway: Arc<dyn Gateway>,
    state: Arc<watch::Sender<TripState>>,
    requests: Arc<RequestTracker<TripRequest>>,
    enrich_contacts: bool,
}

impl TripManager {
    /// Create a new trip manager
    pub fn new(gateway: Arc<dyn Gateway>, config: &GatewayConfig) -> Self {
        let (state, _) = watch::channel(TripState::default());
        Self {
            gateway,
            state: Arc::new(state),
            requests: Arc::new(RequestTracker::new()),
            enrich_contacts: config.enrich_contacts,
        }
    }

    /// Current trip state
    pub fn snapshot(&self) -> TripState {
        self.state.borrow().clone()
    }

    /// Receive every new trip state
    pub fn subscribe(&self) -> watch::Receiver<TripState> {
        self.state.subscribe()
    }

    /// Edit one draft field
    pub fn update_field(&self, field: TripField, value: impl Into<String>) {
        let value = value.into();
        self.state.send_modify(|s| s.draft.set(field, value));
    }

    /// Reset the draft to empty
    pub fn clear_draft(&self) {
        self.state.send_modify(|s| s.draft = TripDraft::default());
    }

    /// Post a trip for the signed-in account `owner`
    ///
    /// The account id is translated to the poster's profile document id,
    /// which becomes the trip's `user_id`. On success the trip is prepended
    /// to the list and the draft is cleared.
    ///
    /// # Errors
    ///
    /// * `TripError::CreateTrip` - No owner, no profile, or the insert failed
    /// * `TripError::Validation` - Blank field or unparseable date
    pub async fn create_trip(
        &self,
        owner: Option<&str>,
        origin: &str,
        destination: &str,
        trip_date: &str,
    ) -> TripResult<TripListing> {
        let Some(owner) = owner else {
            return self.rejected(TripError::CreateTrip("User not authenticated".to_string()));
        };
        let trip_date = match validate_trip(origin, destination, trip_date) {
            Ok(date) => date,
            Err(e) => return self.rejected(e),
        };

        let ticket = self.begin(TripRequest::Create);

        let result = async {
            let profile = self.owner_profile(owner).await?;
            let profile_id = profile.id.ok_or_else(|| {
                TripError::CreateTrip("User profile not found".to_string())
            })?;

            let document = Trip::new_document(&profile_id, origin, destination, trip_date);
            let stored = self
                .gateway
                .insert(Collection::Trips, document)
                .await
                .map_err(|e| TripError::CreateTrip(e.client_message()))?;
            let trip = Trip::from_document(stored).map_err(|e| {
                log::warn!("Inserted trip could not be decoded: {}", e);
                TripError::CreateTrip("Unexpected response from server".to_string())
            })?;

            let phone = Some(profile.phone_number).filter(|p| !p.is_empty());
            Ok::<_, TripError>(TripListing::new(trip, phone))
        }
        .await;

        self.settle(&ticket, result, |s, listing| {
            log::info!(
                "Created trip {} ({} -> {})",
                listing.trip.id,
                listing.trip.origin,
                listing.trip.destination
            );
            s.trips.insert(0, listing.clone());
            s.draft = TripDraft::default();
        })
    }

    /// Load all trips, most recent first
    pub async fn fetch_trips(&self) -> TripResult<Vec<TripListing>> {
        let query = Query::new().order_desc(fields::CREATED_AT);
        self.load(query).await
    }

    /// Load the trips matching `search` exactly
    ///
    /// Result order is whatever the gateway returns. A date that does not
    /// parse is rejected without a gateway call.
    pub async fn find_trips(&self, search: TripSearch) -> TripResult<Vec<TripListing>> {
        match search.to_query() {
            Ok(query) => self.load(query).await,
            Err(e) => self.rejected(e),
        }
    }

    async fn load(&self, query: Query) -> TripResult<Vec<TripListing>> {
        let ticket = self.begin(TripRequest::Load);

        let result = async {
            let rows = self
                .gateway
                .list(Collection::Trips, &query)
                .await
                .map_err(|e| TripError::Fetch(e.client_message()))?;
            Ok::<_, TripError>(self.listings(decode_trips(rows)).await)
        }
        .await;

        self.settle(&ticket, result, |s, listings| {
            s.trips = listings.clone();
        })
    }

    /// Profile document of the account `owner`
    async fn owner_profile(&self, owner: &str) -> TripResult<Profile> {
        let query = Query::new().filter(Filter::eq(fields::USER_ID, owner));
        let document = self
            .gateway
            .get(Collection::Users, &query)
            .await
            .map_err(|e| TripError::CreateTrip(e.client_message()))?
            .ok_or_else(|| TripError::CreateTrip("User profile not found".to_string()))?;

        Profile::from_document(document).map_err(|e| {
            log::warn!("Malformed profile for account {}: {}", owner, e);
            TripError::CreateTrip("User profile not found".to_string())
        })
    }

    /// Attach each poster's phone number, one lookup per distinct poster
    async fn listings(&self, trips: Vec<Trip>) -> Vec<TripListing> {
        if !self.enrich_contacts {
            return trips
                .into_iter()
                .map(|trip| TripListing::new(trip, None))
                .collect();
        }

        let mut phones: HashMap<String, Option<String>> = HashMap::new();
        for trip in &trips {
            if phones.contains_key(&trip.user_id) {
                continue;
            }
            let phone = self.contact_phone(&trip.user_id).await;
            phones.insert(trip.user_id.clone(), phone);
        }

        trips
            .into_iter()
            .map(|trip| {
                let phone = phones.get(&trip.user_id).cloned().flatten();
                TripListing::new(trip, phone)
            })
            .collect()
    }

    async fn contact_phone(&self, profile_id: &str) -> Option<String> {
        let query = Query::new().filter(Filter::eq(fields::ID, profile_id));
        match self.gateway.get(Collection::Users, &query).await {
            Ok(Some(document)) => document
                .get(fields::PHONE_NUMBER)
                .and_then(|v| v.as_str())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Contact lookup for profile {} failed: {}", profile_id, e);
                None
            }
        }
    }

    /// Record a request refused before reaching the gateway
    fn rejected<T>(&self, error: TripError) -> TripResult<T> {
        self.state.send_modify(|s| s.error = error.client_message());
        Err(error)
    }

    fn begin(&self, kind: TripRequest) -> Ticket<TripRequest> {
        let ticket = self.requests.begin(kind);
        log::debug!("trip request {:?} #{} started", ticket.kind, ticket.id);
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        ticket
    }

    /// Apply a settled result unless a newer request of its kind exists
    fn settle<T>(
        &self,
        ticket: &Ticket<TripRequest>,
        result: TripResult<T>,
        on_success: impl FnOnce(&mut TripState, &T),
    ) -> TripResult<T> {
        let current = self.requests.finish(ticket);
        let loading = self.requests.has_pending();

        self.state.send_modify(|s| {
            s.is_loading = loading;
            if !current {
                return;
            }
            match &result {
                Ok(value) => on_success(s, value),
                Err(e) => s.error = e.client_message(),
            }
        });

        if current {
            result
        } else {
            log::debug!("trip request {:?} #{} superseded", ticket.kind, ticket.id);
            Err(TripError::Superseded)
        }
    }
}

/// Decode listed rows, skipping any that do not parse
fn decode_trips(rows: Vec<Document>) -> Vec<Trip> {
    rows.into_iter()
        .filter_map(|row| match Trip::from_document(row) {
            Ok(trip) => Some(trip),
            Err(e) => {
                log::warn!("Skipping malformed trip row: {}", e);
                None
            }
        })
        .collect()
}
