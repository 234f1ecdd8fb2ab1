/// Property-based tests for trip listing and search using proptest
///
/// These tests check the equality-filter semantics of search and the
/// most-recent-first ordering of fetch over randomly generated trip sets.
use odyss::config::GatewayConfig;
use odyss::gateway::mock::MockGateway;
use odyss::gateway::{Collection, Document};
use odyss::trip::{TripListing, TripManager, TripSearch};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

// Place names including near-misses of "Enugu" that must never match it
const PLACES: &[&str] = &["Enugu", "enugu", "ENUGU", "Enugu ", "Lagos", "Abuja", "Kano"];

#[derive(Debug, Clone)]
struct TripRow {
    origin: String,
    destination: String,
    trip_date: String,
}

fn place_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(PLACES).prop_map(str::to_string)
}

fn date_strategy() -> impl Strategy<Value = String> {
    (2020i32..=2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| format!("{:04}-{:02}-{:02}", y, m, d))
}

fn row_strategy() -> impl Strategy<Value = TripRow> {
    (place_strategy(), place_strategy(), date_strategy()).prop_map(
        |(origin, destination, trip_date)| TripRow {
            origin,
            destination,
            trip_date,
        },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Seed one poster and the given trips; returns the poster's account id
fn setup(rows: &[TripRow]) -> (MockGateway, TripManager, String) {
    let gateway = MockGateway::new().with_account("p@x.com", "pw123456", true);
    let account_id = gateway.account_id("p@x.com").unwrap();
    let profile = gateway.seed(
        Collection::Users,
        json!({
            "user_id": account_id,
            "email": "p@x.com",
            "first_name": "P",
            "last_name": "Q",
            "phone_number": "+2348000000000"
        })
        .as_object()
        .cloned()
        .unwrap(),
    );
    let profile_id = profile["id"].as_str().unwrap().to_string();

    for row in rows {
        let document: Document = json!({
            "user_id": profile_id,
            "origin": row.origin,
            "destination": row.destination,
            "trip_date": row.trip_date
        })
        .as_object()
        .cloned()
        .unwrap();
        gateway.seed(Collection::Trips, document);
    }

    let config = GatewayConfig::new("https://project.supabase.co", "anon-key");
    let trips = TripManager::new(Arc::new(gateway.clone()), &config);
    (gateway, trips, account_id)
}

fn ids(listings: &[TripListing]) -> BTreeSet<String> {
    listings.iter().map(|l| l.trip.id.clone()).collect()
}

proptest! {
    #[test]
    fn test_origin_search_is_exact_and_case_sensitive(
        rows in prop::collection::vec(row_strategy(), 0..20)
    ) {
        let (_gateway, trips, _) = setup(&rows);

        let found = runtime()
            .block_on(trips.find_trips(TripSearch::new("Enugu", "", "")))
            .unwrap();

        let expected = rows.iter().filter(|r| r.origin == "Enugu").count();
        prop_assert_eq!(found.len(), expected, "Only exact matches should be returned");
        for listing in &found {
            prop_assert_eq!(listing.trip.origin.as_str(), "Enugu");
        }
    }

    #[test]
    fn test_search_matches_every_given_field(
        rows in prop::collection::vec(row_strategy(), 0..20),
        probe in row_strategy()
    ) {
        let (_gateway, trips, _) = setup(&rows);

        let found = runtime()
            .block_on(trips.find_trips(TripSearch::new(
                probe.origin.clone(),
                probe.destination.clone(),
                probe.trip_date.clone(),
            )))
            .unwrap();

        let expected = rows
            .iter()
            .filter(|r| {
                r.origin == probe.origin
                    && r.destination == probe.destination
                    && r.trip_date == probe.trip_date
            })
            .count();
        prop_assert_eq!(found.len(), expected);
    }

    #[test]
    fn test_empty_search_equals_fetch(rows in prop::collection::vec(row_strategy(), 0..20)) {
        let (_gateway, trips, _) = setup(&rows);
        let rt = runtime();

        let found = rt.block_on(trips.find_trips(TripSearch::default())).unwrap();
        let fetched = rt.block_on(trips.fetch_trips()).unwrap();

        prop_assert_eq!(found.len(), rows.len());
        prop_assert_eq!(ids(&found), ids(&fetched), "Empty search should be unfiltered");
    }

    #[test]
    fn test_created_trip_is_fetched_first(
        rows in prop::collection::vec(row_strategy(), 0..10),
        origin in "[A-Z][a-z]{1,11}",
        destination in "[A-Z][a-z]{1,11}",
        trip_date in date_strategy()
    ) {
        let (_gateway, trips, account_id) = setup(&rows);
        let rt = runtime();

        let created = rt
            .block_on(trips.create_trip(Some(account_id.as_str()), &origin, &destination, &trip_date))
            .unwrap();
        let fetched = rt.block_on(trips.fetch_trips()).unwrap();

        prop_assert_eq!(fetched.len(), rows.len() + 1);
        prop_assert_eq!(&fetched[0].trip, &created.trip);
        prop_assert_eq!(fetched[0].trip.origin.as_str(), origin.as_str());
    }
}
