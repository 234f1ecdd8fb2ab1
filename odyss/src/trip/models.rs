//! Trip data models.

use super::errors::{TripError, TripResult};
use crate::gateway::{Document, DocumentId, Filter, Query, fields};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Date format used at the gateway boundary and in the draft form
pub const TRIP_DATE_FORMAT: &str = "%Y-%m-%d";

/// A posted journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: DocumentId,
    /// Profile document id of the poster
    pub user_id: DocumentId,
    pub origin: String,
    pub destination: String,
    pub trip_date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// Decode a trip from a gateway document
    pub fn from_document(document: Document) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(document))
    }

    /// Columns of a new trip row; `id` and `created_at` are assigned by the gateway
    pub fn new_document(
        owner: &str,
        origin: &str,
        destination: &str,
        trip_date: NaiveDate,
    ) -> Document {
        let mut document = Document::new();
        document.insert(fields::USER_ID.to_string(), owner.into());
        document.insert(fields::ORIGIN.to_string(), origin.into());
        document.insert(fields::DESTINATION.to_string(), destination.into());
        document.insert(
            fields::TRIP_DATE.to_string(),
            trip_date.format(TRIP_DATE_FORMAT).to_string().into(),
        );
        document
    }

    /// Date as shown on a trip card, e.g. "Mar 1, 2024"
    pub fn display_date(&self) -> String {
        self.trip_date.format("%b %-d, %Y").to_string()
    }
}

/// A trip together with the poster's contact number, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripListing {
    #[serde(flatten)]
    pub trip: Trip,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

impl TripListing {
    pub fn new(trip: Trip, contact_phone: Option<String>) -> Self {
        Self { trip, contact_phone }
    }

    /// Messaging link for the poster's phone number
    ///
    /// Non-digits (including the leading `+`) are stripped; `None` when no
    /// digits remain.
    pub fn contact_link(&self) -> Option<String> {
        let digits: String = self
            .contact_phone
            .as_deref()?
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            None
        } else {
            Some(format!("https://wa.me/{}", digits))
        }
    }
}

/// Editable fields of the trip form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripField {
    Origin,
    Destination,
    TripDate,
}

/// In-progress trip form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDraft {
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`, as entered
    pub trip_date: String,
}

impl TripDraft {
    pub fn set(&mut self, field: TripField, value: String) {
        match field {
            TripField::Origin => self.origin = value,
            TripField::Destination => self.destination = value,
            TripField::TripDate => self.trip_date = value,
        }
    }

    /// Search using the draft's fields
    pub fn search(&self) -> TripSearch {
        TripSearch {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            trip_date: self.trip_date.clone(),
        }
    }
}

/// Trip search criteria; blank fields impose no filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSearch {
    pub origin: String,
    pub destination: String,
    pub trip_date: String,
}

impl TripSearch {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        trip_date: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            trip_date: trip_date.into(),
        }
    }

    /// Exact-equality query over the non-blank fields
    ///
    /// The date is written in its stored `YYYY-MM-DD` form, so `2024-3-1`
    /// matches a trip posted for `2024-03-01`.
    ///
    /// # Errors
    ///
    /// Returns `TripError::Validation` if a non-blank date does not parse.
    pub fn to_query(&self) -> TripResult<Query> {
        let query = [
            (fields::ORIGIN, &self.origin),
            (fields::DESTINATION, &self.destination),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .fold(Query::new(), |query, (field, value)| {
            query.filter(Filter::eq(field, value.as_str()))
        });

        if self.trip_date.trim().is_empty() {
            return Ok(query);
        }
        let date = parse_trip_date(&self.trip_date)?;
        Ok(query.filter(Filter::eq(
            fields::TRIP_DATE,
            date.format(TRIP_DATE_FORMAT).to_string(),
        )))
    }
}

/// Snapshot of the trip state container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripState {
    pub draft: TripDraft,
    /// Result of the last fetch or search, plus trips created since
    pub trips: Vec<TripListing>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Check the required trip fields and parse the date
pub(crate) fn validate_trip(
    origin: &str,
    destination: &str,
    trip_date: &str,
) -> TripResult<NaiveDate> {
    if origin.trim().is_empty() {
        return Err(TripError::Validation("Origin is required".to_string()));
    }
    if destination.trim().is_empty() {
        return Err(TripError::Validation("Destination is required".to_string()));
    }
    if trip_date.trim().is_empty() {
        return Err(TripError::Validation("Trip date is required".to_string()));
    }
    parse_trip_date(trip_date)
}

fn parse_trip_date(trip_date: &str) -> TripResult<NaiveDate> {
    NaiveDate::parse_from_str(trip_date.trim(), TRIP_DATE_FORMAT)
        .map_err(|_| TripError::Validation(format!("Invalid trip date: {}", trip_date)))
}
