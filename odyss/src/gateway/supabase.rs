//! Supabase gateway adapter.
//!
//! Talks to the project's GoTrue (`/auth/v1`) and PostgREST (`/rest/v1`)
//! endpoints over HTTPS. The current session's tokens are cached in memory
//! and attached to every request.

use super::{
    Gateway,
    errors::{GatewayError, GatewayResult},
    models::{Account, AccountId, Collection, Document, GatewaySession, Query},
};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

/// Gateway adapter for a Supabase project
pub struct SupabaseGateway {
    base_url: Url,
    anon_key: SecretString,
    users_table: String,
    trips_table: String,
    client: reqwest::Client,
    session: RwLock<Option<GatewaySession>>,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignupMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct SignupMetadata<'a> {
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordUpdate<'a> {
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

/// Signup answers with a session when email confirmation is off, and with
/// the bare user otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(TokenResponse),
    User(UserResponse),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> (AccountId, GatewaySession) {
        let session = GatewaySession {
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: self.expires_in.and_then(GatewaySession::expiry_after),
        };
        (self.user.id, session)
    }
}

impl SupabaseGateway {
    /// Create a new adapter without a session
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Url` if the gateway URL does not parse
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        // Url::join replaces the last segment unless the base ends in '/'
        let base_url = Url::parse(&format!(
            "{}/",
            config.gateway_url.trim_end_matches('/')
        ))?;

        Ok(Self {
            base_url,
            anon_key: config.anon_key.clone(),
            users_table: config.users_table.clone(),
            trips_table: config.trips_table.clone(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
        })
    }

    fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.users_table,
            Collection::Trips => &self.trips_table,
        }
    }

    fn auth_url(&self, path: &str) -> GatewayResult<Url> {
        Ok(self.base_url.join("auth/v1/")?.join(path)?)
    }

    fn rest_url(&self, collection: Collection) -> GatewayResult<Url> {
        Ok(self.base_url.join("rest/v1/")?.join(self.table(collection))?)
    }

    /// Attach the project key and, if `token` is given, the user bearer token
    fn authorize(&self, request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        request
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }

    async fn send_anonymous(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = self.authorize(request, None).send().await?;
        check_status(response).await
    }

    /// Send with the session token when one is held, anon key otherwise
    async fn send_as_user(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let guard = self.session.read().await;
        let token = guard.as_ref().map(|s| &s.access_token);
        let response = self.authorize(request, token).send().await?;
        drop(guard);
        check_status(response).await
    }

    /// Send with the session token; fails without a session
    async fn send_with_session(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(GatewayError::NoSession)?;
        let response = self
            .authorize(request, Some(&session.access_token))
            .send()
            .await?;
        drop(guard);
        check_status(response).await
    }

    /// Exchange the refresh token for a new session
    async fn refresh(&self) -> GatewayResult<()> {
        let refresh_token = {
            let guard = self.session.read().await;
            guard
                .as_ref()
                .and_then(|s| s.refresh_token.as_ref())
                .map(|t| t.expose_secret().to_string())
                .ok_or(GatewayError::NoSession)?
        };

        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let response = self
            .send_anonymous(self.client.post(url).json(&RefreshGrant {
                refresh_token: &refresh_token,
            }))
            .await?;
        let tokens: TokenResponse = decode(response).await?;
        let (_, session) = tokens.into_session();
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn fetch_rows(
        &self,
        collection: Collection,
        query: &Query,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<Document>> {
        let mut url = self.rest_url(collection)?;
        apply_query(&mut url, query, limit);
        let response = self.send_as_user(self.client.get(url)).await?;
        decode(response).await
    }
}

#[async_trait]
impl Gateway for SupabaseGateway {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> GatewayResult<AccountId> {
        let request = SignupRequest {
            email,
            password,
            data: SignupMetadata { display_name },
        };

        let response = self
            .send_anonymous(self.client.post(self.auth_url("signup")?).json(&request))
            .await?;

        match decode::<SignupResponse>(response).await? {
            SignupResponse::Session(tokens) => {
                let (account_id, session) = tokens.into_session();
                *self.session.write().await = Some(session);
                Ok(account_id)
            }
            // An existing confirmed address comes back as a user with no identities
            SignupResponse::User(user) if user.identities.as_ref().is_some_and(Vec::is_empty) => {
                Err(GatewayError::AlreadyExists)
            }
            SignupResponse::User(user) => Ok(user.id),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> GatewayResult<AccountId> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .send_anonymous(self.client.post(url).json(&PasswordGrant { email, password }))
            .await?;

        let tokens: TokenResponse = decode(response).await?;
        let (account_id, session) = tokens.into_session();
        *self.session.write().await = Some(session);
        Ok(account_id)
    }

    async fn has_session(&self) -> GatewayResult<bool> {
        let (present, expired, refreshable) = {
            let guard = self.session.read().await;
            match guard.as_ref() {
                Some(s) => (true, s.is_expired(), s.refresh_token.is_some()),
                None => (false, false, false),
            }
        };

        if !present {
            return Ok(false);
        }
        if !expired {
            return Ok(true);
        }
        if refreshable && self.refresh().await.is_ok() {
            return Ok(true);
        }

        log::debug!("Dropping expired gateway session");
        *self.session.write().await = None;
        Ok(false)
    }

    async fn adopt_session(&self, session: GatewaySession) -> GatewayResult<()> {
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn end_session(&self) -> GatewayResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let request = self.client.post(self.auth_url("logout")?);
        let response = self
            .authorize(request, Some(&session.access_token))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> GatewayResult<()> {
        let request = ResendRequest {
            kind: "signup",
            email,
        };
        self.send_anonymous(self.client.post(self.auth_url("resend")?).json(&request))
            .await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_url: &str) -> GatewayResult<()> {
        let mut url = self.auth_url("recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_url);

        self.send_anonymous(self.client.post(url).json(&EmailRequest { email }))
            .await?;
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> GatewayResult<()> {
        let request = self.client.put(self.auth_url("user")?).json(&PasswordUpdate {
            password: new_password,
        });
        self.send_with_session(request).await?;
        Ok(())
    }

    async fn current_account(&self) -> GatewayResult<Account> {
        let response = self
            .send_with_session(self.client.get(self.auth_url("user")?))
            .await?;
        let user: UserResponse = decode(response).await?;

        Ok(Account {
            id: user.id,
            email: user.email.unwrap_or_default(),
            email_confirmed_at: user.email_confirmed_at,
        })
    }

    async fn insert(&self, collection: Collection, fields: Document) -> GatewayResult<Document> {
        let request = self
            .client
            .post(self.rest_url(collection)?)
            .header("Prefer", "return=representation")
            .json(&fields);

        let response = self.send_as_user(request).await?;
        let rows: Vec<Document> = decode(response).await?;
        rows.into_iter().next().ok_or(GatewayError::NotFound)
    }

    async fn get(&self, collection: Collection, query: &Query) -> GatewayResult<Option<Document>> {
        let rows = self.fetch_rows(collection, query, Some(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, collection: Collection, query: &Query) -> GatewayResult<Vec<Document>> {
        self.fetch_rows(collection, query, None).await
    }
}

/// Turn a non-success response into a `GatewayError`
async fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
    Err(error_from_body(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

fn error_from_body(status: StatusCode, body: &str) -> GatewayError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string());

    let lowered = message.to_lowercase();
    if lowered.contains("invalid login credentials") {
        GatewayError::InvalidCredentials
    } else if lowered.contains("already registered") || lowered.contains("already exists") {
        GatewayError::AlreadyExists
    } else if status == StatusCode::UNAUTHORIZED && lowered.contains("jwt") {
        GatewayError::NoSession
    } else {
        GatewayError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Render a filter value the way PostgREST expects after `eq.`
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_query(url: &mut Url, query: &Query, limit: Option<usize>) {
    let mut pairs = url.query_pairs_mut();
    pairs.append_pair("select", "*");
    for filter in &query.filters {
        pairs.append_pair(&filter.field, &format!("eq.{}", filter_value(&filter.value)));
    }
    if let Some(field) = &query.order_desc {
        pairs.append_pair("order", &format!("{}.desc", field));
    }
    if let Some(limit) = limit {
        pairs.append_pair("limit", &limit.to_string());
    }
}
