//! In-memory gateway for tests.
//!
//! Behaves like a hosted backend with email confirmation enabled: creating an
//! account does not open a session. Calls can be made to fail once or to stall
//! until released, so overlapping dispatches can be driven deterministically.

use super::{
    Gateway,
    errors::{GatewayError, GatewayResult},
    models::{Account, AccountId, Collection, Document, GatewaySession, Query, fields},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Gateway operations, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateAccount,
    Authenticate,
    HasSession,
    AdoptSession,
    EndSession,
    ResendVerification,
    RequestPasswordReset,
    UpdatePassword,
    CurrentAccount,
    Insert(Collection),
    Get(Collection),
    List(Collection),
}

#[derive(Debug, Clone)]
struct MockAccount {
    id: AccountId,
    email: String,
    password: String,
    email_confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<MockAccount>,
    session: Option<AccountId>,
    documents: HashMap<Collection, Vec<Document>>,
    last_created_at: Option<DateTime<Utc>>,
    faults: HashMap<MockOp, VecDeque<GatewayError>>,
    gates: HashMap<MockOp, VecDeque<oneshot::Receiver<()>>>,
    calls: HashMap<MockOp, usize>,
    password_resets: Vec<(String, String)>,
    verification_emails: Vec<String>,
}

/// Releases one stalled gateway call
pub struct MockGate {
    tx: oneshot::Sender<()>,
}

impl MockGate {
    /// Let the stalled call proceed
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

/// Mock implementation of [`Gateway`]
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account directly, bypassing signup
    pub fn with_account(self, email: &str, password: &str, verified: bool) -> Self {
        let account = MockAccount {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            email_confirmed_at: verified.then(Utc::now),
        };
        self.state.lock().unwrap().accounts.push(account);
        self
    }

    /// Identifier of the account registered under `email`
    pub fn account_id(&self, email: &str) -> Option<AccountId> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.id.clone())
    }

    /// Mark the account's email as confirmed
    pub fn confirm_email(&self, email: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.email == email) {
            account.email_confirmed_at = Some(Utc::now());
        }
    }

    /// Store a document as-is, filling `id` and `created_at` when absent
    pub fn seed(&self, collection: Collection, document: Document) -> Document {
        let mut state = self.state.lock().unwrap();
        let stored = state.stamp(document);
        state
            .documents
            .entry(collection)
            .or_default()
            .push(stored.clone());
        stored
    }

    /// All documents in a collection, in insertion order
    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: MockOp, error: GatewayError) {
        self.state
            .lock()
            .unwrap()
            .faults
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Make the next call of `op` wait until the returned gate is released
    pub fn pause_next(&self, op: MockOp) -> MockGate {
        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .unwrap()
            .gates
            .entry(op)
            .or_default()
            .push_back(rx);
        MockGate { tx }
    }

    /// Number of times `op` was called
    pub fn calls(&self, op: MockOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Password-reset emails sent, as `(email, redirect_url)`
    pub fn password_resets(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().password_resets.clone()
    }

    /// Addresses a confirmation email was re-sent to
    pub fn verification_emails(&self) -> Vec<String> {
        self.state.lock().unwrap().verification_emails.clone()
    }

    /// Count the call, wait on any gate, then surface any injected fault
    async fn enter(&self, op: MockOp) -> GatewayResult<()> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(op).or_insert(0) += 1;
            state.gates.get_mut(&op).and_then(VecDeque::pop_front)
        };

        if let Some(rx) = gate {
            let _ = rx.await;
        }

        let fault = self
            .state
            .lock()
            .unwrap()
            .faults
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn session_account(&self) -> GatewayResult<MockAccount> {
        let state = self.state.lock().unwrap();
        let id = state.session.as_ref().ok_or(GatewayError::NoSession)?;
        state
            .accounts
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or(GatewayError::NoSession)
    }
}

impl MockState {
    /// Strictly increasing creation timestamps, so ordering is deterministic
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(next);
        next
    }

    fn stamp(&mut self, mut document: Document) -> Document {
        if !document.contains_key(fields::ID) {
            document.insert(
                fields::ID.to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        if !document.contains_key(fields::CREATED_AT) {
            let created_at = self
                .next_created_at()
                .to_rfc3339_opts(SecondsFormat::Micros, true);
            document.insert(fields::CREATED_AT.to_string(), Value::String(created_at));
        }
        document
    }

    fn select(&self, collection: Collection, query: &Query) -> Vec<Document> {
        let mut rows: Vec<Document> = self
            .documents
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some(field) = &query.order_desc {
            rows.sort_by(|a, b| {
                let a = a.get(field).and_then(Value::as_str).unwrap_or_default();
                let b = b.get(field).and_then(Value::as_str).unwrap_or_default();
                b.cmp(a)
            });
        }
        rows
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        _display_name: &str,
    ) -> GatewayResult<AccountId> {
        self.enter(MockOp::CreateAccount).await?;

        let mut state = self.state.lock().unwrap();
        if state.accounts.iter().any(|a| a.email == email) {
            return Err(GatewayError::AlreadyExists);
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.accounts.push(MockAccount {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
            email_confirmed_at: None,
        });
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> GatewayResult<AccountId> {
        self.enter(MockOp::Authenticate).await?;

        let mut state = self.state.lock().unwrap();
        let id = state
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.id.clone())
            .ok_or(GatewayError::InvalidCredentials)?;
        state.session = Some(id.clone());
        Ok(id)
    }

    async fn has_session(&self) -> GatewayResult<bool> {
        self.enter(MockOp::HasSession).await?;
        Ok(self.state.lock().unwrap().session.is_some())
    }

    /// The mock treats the access token as the account id
    async fn adopt_session(&self, session: GatewaySession) -> GatewayResult<()> {
        self.enter(MockOp::AdoptSession).await?;

        let mut state = self.state.lock().unwrap();
        let token = session.access_token.expose_secret();
        if !state.accounts.iter().any(|a| a.id == token) {
            return Err(GatewayError::Api {
                status: 401,
                message: "invalid JWT".to_string(),
            });
        }
        state.session = Some(token.to_string());
        Ok(())
    }

    async fn end_session(&self) -> GatewayResult<()> {
        self.enter(MockOp::EndSession).await?;
        self.state.lock().unwrap().session = None;
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> GatewayResult<()> {
        self.enter(MockOp::ResendVerification).await?;
        self.state
            .lock()
            .unwrap()
            .verification_emails
            .push(email.to_string());
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_url: &str) -> GatewayResult<()> {
        self.enter(MockOp::RequestPasswordReset).await?;
        self.state
            .lock()
            .unwrap()
            .password_resets
            .push((email.to_string(), redirect_url.to_string()));
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> GatewayResult<()> {
        self.enter(MockOp::UpdatePassword).await?;

        let account = self.session_account()?;
        let mut state = self.state.lock().unwrap();
        if let Some(stored) = state.accounts.iter_mut().find(|a| a.id == account.id) {
            stored.password = new_password.to_string();
        }
        Ok(())
    }

    async fn current_account(&self) -> GatewayResult<Account> {
        self.enter(MockOp::CurrentAccount).await?;

        let account = self.session_account()?;
        Ok(Account {
            id: account.id,
            email: account.email,
            email_confirmed_at: account.email_confirmed_at,
        })
    }

    async fn insert(&self, collection: Collection, fields: Document) -> GatewayResult<Document> {
        self.enter(MockOp::Insert(collection)).await?;
        Ok(self.seed(collection, fields))
    }

    async fn get(&self, collection: Collection, query: &Query) -> GatewayResult<Option<Document>> {
        self.enter(MockOp::Get(collection)).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .select(collection, query)
            .into_iter()
            .next())
    }

    async fn list(&self, collection: Collection, query: &Query) -> GatewayResult<Vec<Document>> {
        self.enter(MockOp::List(collection)).await?;
        Ok(self.state.lock().unwrap().select(collection, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::models::Filter;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_mock_account_lifecycle() {
        let gateway = MockGateway::new();

        let id = gateway
            .create_account("a@x.com", "secret1", "A B")
            .await
            .expect("Failed to create account");
        assert!(!gateway.has_session().await.unwrap());

        assert!(matches!(
            gateway.create_account("a@x.com", "other", "A B").await,
            Err(GatewayError::AlreadyExists)
        ));
        assert!(matches!(
            gateway.authenticate("a@x.com", "wrong").await,
            Err(GatewayError::InvalidCredentials)
        ));

        let session_id = gateway.authenticate("a@x.com", "secret1").await.unwrap();
        assert_eq!(session_id, id);
        assert!(!gateway.current_account().await.unwrap().is_verified());

        gateway.end_session().await.unwrap();
        assert!(matches!(
            gateway.current_account().await,
            Err(GatewayError::NoSession)
        ));
    }

    #[tokio::test]
    async fn test_mock_orders_by_creation_desc() {
        let gateway = MockGateway::new();
        for origin in ["Lagos", "Enugu", "Kano"] {
            gateway
                .insert(Collection::Trips, doc(json!({ "origin": origin })))
                .await
                .unwrap();
        }

        let rows = gateway
            .list(Collection::Trips, &Query::new().order_desc(fields::CREATED_AT))
            .await
            .unwrap();
        let origins: Vec<&str> = rows
            .iter()
            .map(|r| r["origin"].as_str().unwrap())
            .collect();
        assert_eq!(origins, vec!["Kano", "Enugu", "Lagos"]);
    }

    #[tokio::test]
    async fn test_mock_fault_is_consumed_once() {
        let gateway = MockGateway::new();
        gateway.fail_next(MockOp::List(Collection::Trips), GatewayError::NotFound);

        assert!(gateway.list(Collection::Trips, &Query::new()).await.is_err());
        assert!(gateway.list(Collection::Trips, &Query::new()).await.is_ok());
        assert_eq!(gateway.calls(MockOp::List(Collection::Trips)), 2);
    }

    #[tokio::test]
    async fn test_mock_get_filters() {
        let gateway = MockGateway::new();
        gateway.seed(Collection::Users, doc(json!({ "user_id": "acc-1" })));

        let query = Query::new().filter(Filter::eq(fields::USER_ID, "acc-1"));
        assert!(gateway.get(Collection::Users, &query).await.unwrap().is_some());

        let query = Query::new().filter(Filter::eq(fields::USER_ID, "acc-2"));
        assert!(gateway.get(Collection::Users, &query).await.unwrap().is_none());
    }
}
