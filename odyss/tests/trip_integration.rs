//! Integration tests for the trip state container.

use odyss::config::GatewayConfig;
use odyss::gateway::mock::{MockGateway, MockOp};
use odyss::gateway::{Collection, Document, GatewayError};
use odyss::trip::{TripDraft, TripError, TripField, TripManager, TripSearch};
use serde_json::{Value, json};
use std::sync::Arc;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// Helper to create a trip manager over a fresh mock gateway
fn setup() -> (MockGateway, TripManager) {
    let gateway = MockGateway::new();
    let config = GatewayConfig::new("https://project.supabase.co", "anon-key");
    let trips = TripManager::new(Arc::new(gateway.clone()), &config);
    (gateway, trips)
}

/// Helper to seed an account with a profile; returns (account id, profile id)
fn seed_poster(gateway: &MockGateway, email: &str, phone: &str) -> (String, String) {
    let account_id = gateway
        .clone()
        .with_account(email, "pw123456", true)
        .account_id(email)
        .expect("Seeded account should exist");
    let profile = gateway.seed(
        Collection::Users,
        doc(json!({
            "user_id": account_id,
            "email": email,
            "first_name": "Chidi",
            "last_name": "Eze",
            "phone_number": phone
        })),
    );
    let profile_id = profile["id"].as_str().unwrap().to_string();
    (account_id, profile_id)
}

fn seed_trip(gateway: &MockGateway, profile_id: &str, origin: &str, destination: &str) {
    gateway.seed(
        Collection::Trips,
        doc(json!({
            "user_id": profile_id,
            "origin": origin,
            "destination": destination,
            "trip_date": "2024-03-01"
        })),
    );
}

#[tokio::test]
async fn test_create_then_fetch_returns_new_trip_first() {
    let (gateway, trips) = setup();
    let (account_id, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");
    seed_trip(&gateway, &profile_id, "Kano", "Abuja");

    trips.update_field(TripField::Origin, "Lagos");
    trips.update_field(TripField::Destination, "Abuja");
    trips.update_field(TripField::TripDate, "2024-03-01");

    let created = trips
        .create_trip(Some(account_id.as_str()), "Lagos", "Abuja", "2024-03-01")
        .await
        .expect("Trip creation should succeed");

    assert_eq!(created.trip.user_id, profile_id);
    assert_eq!(created.trip.display_date(), "Mar 1, 2024");
    assert_eq!(created.contact_phone.as_deref(), Some("+2348011111111"));

    let state = trips.snapshot();
    assert_eq!(state.trips.first(), Some(&created));
    assert_eq!(state.draft, TripDraft::default());
    assert!(!state.is_loading);

    let fetched = trips.fetch_trips().await.expect("Fetch should succeed");
    assert_eq!(fetched.len(), 3);
    assert_eq!(fetched[0].trip.id, created.trip.id);
    assert_eq!(fetched[0].trip.origin, "Lagos");
    assert_eq!(fetched[1].trip.origin, "Kano");
    assert_eq!(fetched[2].trip.origin, "Enugu");
}

#[tokio::test]
async fn test_create_trip_unauthenticated() {
    let (gateway, trips) = setup();

    let result = trips.create_trip(None, "Lagos", "Abuja", "2024-03-01").await;

    assert_eq!(
        result,
        Err(TripError::CreateTrip("User not authenticated".to_string()))
    );
    assert_eq!(gateway.calls(MockOp::Insert(Collection::Trips)), 0);
    let state = trips.snapshot();
    assert_eq!(state.error.as_deref(), Some("User not authenticated"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_create_trip_requires_all_fields() {
    let (gateway, trips) = setup();
    let (account_id, _) = seed_poster(&gateway, "c@x.com", "+2348011111111");

    let result = trips
        .create_trip(Some(account_id.as_str()), "Lagos", "", "2024-03-01")
        .await;
    assert_eq!(
        result,
        Err(TripError::Validation("Destination is required".to_string()))
    );

    let result = trips
        .create_trip(Some(account_id.as_str()), "Lagos", "Abuja", "March 1st")
        .await;
    assert!(matches!(result, Err(TripError::Validation(_))));

    assert_eq!(gateway.calls(MockOp::Get(Collection::Users)), 0);
    assert_eq!(gateway.calls(MockOp::Insert(Collection::Trips)), 0);
}

#[tokio::test]
async fn test_create_trip_without_profile() {
    let (gateway, trips) = setup();
    let account_id = gateway
        .clone()
        .with_account("orphan@x.com", "pw123456", false)
        .account_id("orphan@x.com")
        .unwrap();

    let result = trips
        .create_trip(Some(account_id.as_str()), "Lagos", "Abuja", "2024-03-01")
        .await;

    assert_eq!(
        result,
        Err(TripError::CreateTrip("User profile not found".to_string()))
    );
    assert_eq!(gateway.calls(MockOp::Insert(Collection::Trips)), 0);
}

#[tokio::test]
async fn test_create_trip_insert_failure_keeps_draft() {
    let (gateway, trips) = setup();
    let (account_id, _) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    trips.update_field(TripField::Origin, "Lagos");
    gateway.fail_next(
        MockOp::Insert(Collection::Trips),
        GatewayError::Api {
            status: 400,
            message: "new row violates row-level security policy".to_string(),
        },
    );

    let result = trips
        .create_trip(Some(account_id.as_str()), "Lagos", "Abuja", "2024-03-01")
        .await;

    assert!(matches!(result, Err(TripError::CreateTrip(_))));
    let state = trips.snapshot();
    assert!(state.trips.is_empty());
    assert_eq!(state.draft.origin, "Lagos");
    assert_eq!(
        state.error.as_deref(),
        Some("new row violates row-level security policy")
    );
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_fetch_attaches_contact_numbers() {
    let (gateway, trips) = setup();
    let (_, first) = seed_poster(&gateway, "c@x.com", "+234 801 111 1111");
    let (_, second) = seed_poster(&gateway, "d@x.com", "");
    seed_trip(&gateway, &first, "Enugu", "Lagos");
    seed_trip(&gateway, &second, "Kano", "Abuja");
    seed_trip(&gateway, &first, "Jos", "Kaduna");

    let fetched = trips.fetch_trips().await.expect("Fetch should succeed");

    assert_eq!(fetched[0].trip.origin, "Jos");
    assert_eq!(
        fetched[0].contact_link().as_deref(),
        Some("https://wa.me/2348011111111")
    );
    assert_eq!(fetched[1].contact_phone, None);
    assert_eq!(fetched[1].contact_link(), None);

    // One lookup per distinct poster
    assert_eq!(gateway.calls(MockOp::Get(Collection::Users)), 2);
}

#[tokio::test]
async fn test_fetch_survives_contact_lookup_failure() {
    let (gateway, trips) = setup();
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");
    gateway.fail_next(
        MockOp::Get(Collection::Users),
        GatewayError::Api {
            status: 500,
            message: "boom".to_string(),
        },
    );

    let fetched = trips.fetch_trips().await.expect("Fetch should succeed");

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].contact_phone, None);
    assert_eq!(trips.snapshot().error, None);
}

#[tokio::test]
async fn test_fetch_without_contact_enrichment() {
    let gateway = MockGateway::new();
    let mut config = GatewayConfig::new("https://project.supabase.co", "anon-key");
    config.enrich_contacts = false;
    let trips = TripManager::new(Arc::new(gateway.clone()), &config);
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");

    let fetched = trips.fetch_trips().await.expect("Fetch should succeed");

    assert_eq!(fetched[0].contact_phone, None);
    assert_eq!(gateway.calls(MockOp::Get(Collection::Users)), 0);
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_list() {
    let (gateway, trips) = setup();
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");
    trips.fetch_trips().await.expect("Fetch should succeed");

    gateway.fail_next(
        MockOp::List(Collection::Trips),
        GatewayError::Api {
            status: 500,
            message: "Internal error".to_string(),
        },
    );
    let result = trips.fetch_trips().await;

    assert_eq!(result, Err(TripError::Fetch("Internal error".to_string())));
    let state = trips.snapshot();
    assert_eq!(state.trips.len(), 1);
    assert_eq!(state.error.as_deref(), Some("Internal error"));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_fetch_skips_malformed_rows() {
    let (gateway, trips) = setup();
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");
    gateway.seed(
        Collection::Trips,
        doc(json!({
            "user_id": profile_id,
            "origin": "Kano",
            "destination": "Abuja",
            "trip_date": "next tuesday"
        })),
    );

    let fetched = trips.fetch_trips().await.expect("Fetch should succeed");

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].trip.origin, "Enugu");
}

#[tokio::test]
async fn test_find_trips_replaces_list() {
    let (gateway, trips) = setup();
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Enugu", "Lagos");
    seed_trip(&gateway, &profile_id, "Kano", "Abuja");
    trips.fetch_trips().await.expect("Fetch should succeed");
    assert_eq!(trips.snapshot().trips.len(), 2);

    let found = trips
        .find_trips(TripSearch::new("Kano", "Abuja", ""))
        .await
        .expect("Search should succeed");

    assert_eq!(found.len(), 1);
    assert_eq!(trips.snapshot().trips, found);

    let none = trips
        .find_trips(TripSearch::new("Kano", "Lagos", ""))
        .await
        .expect("Search should succeed");
    assert!(none.is_empty());
    assert!(trips.snapshot().trips.is_empty());
}

#[tokio::test]
async fn test_find_trips_matches_unpadded_date() {
    let (gateway, trips) = setup();
    let (account_id, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Kano", "Abuja");
    trips
        .create_trip(Some(account_id.as_str()), "Enugu", "Lagos", "2024-3-2")
        .await
        .expect("Trip creation should succeed");

    for date in ["2024-3-2", " 2024-03-02 "] {
        let found = trips
            .find_trips(TripSearch::new("", "", date))
            .await
            .expect("Search should succeed");
        assert_eq!(found.len(), 1, "search date {:?}", date);
        assert_eq!(found[0].trip.origin, "Enugu");
    }
}

#[tokio::test]
async fn test_find_trips_with_invalid_date() {
    let (gateway, trips) = setup();
    let (_, profile_id) = seed_poster(&gateway, "c@x.com", "+2348011111111");
    seed_trip(&gateway, &profile_id, "Kano", "Abuja");
    trips.fetch_trips().await.expect("Fetch should succeed");

    let result = trips.find_trips(TripSearch::new("Kano", "", "03/01/2024")).await;

    assert_eq!(
        result,
        Err(TripError::Validation("Invalid trip date: 03/01/2024".to_string()))
    );
    assert_eq!(gateway.calls(MockOp::List(Collection::Trips)), 1);
    let state = trips.snapshot();
    assert_eq!(state.error.as_deref(), Some("Invalid trip date: 03/01/2024"));
    assert_eq!(state.trips.len(), 1);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_draft_editing() {
    let (_gateway, trips) = setup();

    trips.update_field(TripField::Origin, "Lagos");
    trips.update_field(TripField::Destination, "Abuja");
    trips.update_field(TripField::TripDate, "2024-03-01");

    let draft = trips.snapshot().draft;
    assert_eq!(draft.origin, "Lagos");
    assert_eq!(draft.destination, "Abuja");
    assert_eq!(draft.trip_date, "2024-03-01");

    trips.clear_draft();
    assert_eq!(trips.snapshot().draft, TripDraft::default());
}
