//! Gateway data models: accounts, sessions and the document query vocabulary.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde_json::{Map, Value};

/// Authentication account identifier assigned by the gateway
pub type AccountId = String;

/// Document identifier assigned by the gateway
pub type DocumentId = String;

/// A stored document, as a JSON object keyed by column name
pub type Document = Map<String, Value>;

/// Collections the client reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Per-user profile documents, joined to accounts by `user_id`
    Users,
    /// Posted trips
    Trips,
}

/// Column names shared by the gateway adapters and the state containers
pub mod fields {
    pub const ID: &str = "id";
    pub const USER_ID: &str = "user_id";
    pub const EMAIL: &str = "email";
    pub const FIRST_NAME: &str = "first_name";
    pub const LAST_NAME: &str = "last_name";
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const ORIGIN: &str = "origin";
    pub const DESTINATION: &str = "destination";
    pub const TRIP_DATE: &str = "trip_date";
    pub const CREATED_AT: &str = "created_at";
}

/// Equality filter on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// Match documents whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check a document against this filter
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// A list query: conjunction of equality filters plus optional descending order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_desc: Option<String>,
}

impl Query {
    /// Unfiltered, unordered query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order results by `field`, most recent first
    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order_desc = Some(field.into());
        self
    }

    /// Check a document against every filter
    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }
}

/// Authentication account as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    /// Set once the user followed the confirmation link
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Whether the email address has been confirmed
    pub fn is_verified(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Tokens of an authenticated gateway session
#[derive(Debug)]
pub struct GatewaySession {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl GatewaySession {
    /// Expiry `expires_in` seconds from now
    ///
    /// `None` when the lifetime is out of range; such a session is held
    /// without a local expiry and left for the gateway to reject.
    pub fn expiry_after(expires_in: i64) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(expires_in).and_then(|d| Utc::now().checked_add_signed(d))
    }

    /// Whether the access token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}
