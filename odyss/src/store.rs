//! Process-wide store owning the session and trip state containers.
//!
//! The view layer sends [`Intent`]s through [`Store::dispatch`] and renders
//! from the snapshot channels returned by the `subscribe_*` methods.

use crate::auth::{
    AuthError, AuthManager, AuthPanel, LoginRequest, RegisterRequest, ResetPasswordRequest,
    SessionState,
};
use crate::config::GatewayConfig;
use crate::gateway::{self, Gateway, GatewayResult};
use crate::routes::RedirectParams;
use crate::trip::{TripError, TripField, TripManager, TripSearch, TripState};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::watch;

static GLOBAL_STORE: OnceLock<Store> = OnceLock::new();

/// Operations the view layer can request
#[derive(Debug)]
pub enum Intent {
    CheckAuthStatus,
    Register(RegisterRequest),
    Login(LoginRequest),
    Logout,
    ForgotPassword { email: String },
    ResetPassword(ResetPasswordRequest),
    ResendVerification,
    RefreshVerification,
    /// Arrival on a route through a gateway email link
    CompleteRedirect(RedirectParams),
    SetShowAuth(Option<AuthPanel>),
    SetVerificationSuccess(bool),
    ClearError,
    UpdateField { field: TripField, value: String },
    ClearDraft,
    /// Post the draft as the signed-in user
    CreateTrip,
    FetchTrips,
    /// Search with the draft's fields
    FindTrips,
}

impl Intent {
    /// Short name for logging; never includes payloads
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CheckAuthStatus => "check_auth_status",
            Intent::Register(_) => "register",
            Intent::Login(_) => "login",
            Intent::Logout => "logout",
            Intent::ForgotPassword { .. } => "forgot_password",
            Intent::ResetPassword(_) => "reset_password",
            Intent::ResendVerification => "resend_verification",
            Intent::RefreshVerification => "refresh_verification",
            Intent::CompleteRedirect(_) => "complete_redirect",
            Intent::SetShowAuth(_) => "set_show_auth",
            Intent::SetVerificationSuccess(_) => "set_verification_success",
            Intent::ClearError => "clear_error",
            Intent::UpdateField { .. } => "update_field",
            Intent::ClearDraft => "clear_draft",
            Intent::CreateTrip => "create_trip",
            Intent::FetchTrips => "fetch_trips",
            Intent::FindTrips => "find_trips",
        }
    }
}

/// Failure of a dispatched intent; already recorded in the owning slice
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Trip(#[from] TripError),
}

/// Both state slices at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub session: SessionState,
    pub trips: TripState,
}

/// Single source of truth for session and trip state
#[derive(Clone)]
pub struct Store {
    auth: AuthManager,
    trips: TripManager,
}

impl Store {
    /// Create a store over an existing gateway
    pub fn new(gateway: Arc<dyn Gateway>, config: &GatewayConfig) -> Self {
        Self {
            auth: AuthManager::new(gateway.clone(), config),
            trips: TripManager::new(gateway, config),
        }
    }

    /// Connect to the configured gateway and resolve the startup session
    ///
    /// # Errors
    ///
    /// Returns error if the gateway adapter cannot be built
    pub async fn connect(config: &GatewayConfig) -> GatewayResult<Self> {
        let store = Self::new(gateway::connect(config)?, config);
        store.auth.check_auth_status().await;
        Ok(store)
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn trips(&self) -> &TripManager {
        &self.trips
    }

    pub fn subscribe_auth(&self) -> watch::Receiver<SessionState> {
        self.auth.subscribe()
    }

    pub fn subscribe_trips(&self) -> watch::Receiver<TripState> {
        self.trips.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            session: self.auth.snapshot(),
            trips: self.trips.snapshot(),
        }
    }

    /// Run one intent to settlement
    ///
    /// The outcome is always reflected in the snapshots; the returned error
    /// is for callers that want to branch on it.
    pub async fn dispatch(&self, intent: Intent) -> Result<(), DispatchError> {
        log::debug!("dispatch {}", intent.name());

        match intent {
            Intent::CheckAuthStatus => {
                self.auth.check_auth_status().await;
            }
            Intent::Register(request) => {
                self.auth.register(request).await?;
            }
            Intent::Login(request) => {
                self.auth.login(request).await?;
            }
            Intent::Logout => self.auth.logout().await?,
            Intent::ForgotPassword { email } => self.auth.forgot_password(&email).await?,
            Intent::ResetPassword(request) => self.auth.reset_password(request).await?,
            Intent::ResendVerification => self.auth.resend_verification().await?,
            Intent::RefreshVerification => {
                self.auth.refresh_verification().await?;
            }
            Intent::CompleteRedirect(params) => {
                self.auth.complete_redirect(params).await;
            }
            Intent::SetShowAuth(panel) => self.auth.set_show_auth(panel),
            Intent::SetVerificationSuccess(flag) => self.auth.set_verification_success(flag),
            Intent::ClearError => self.auth.clear_error(),
            Intent::UpdateField { field, value } => self.trips.update_field(field, value),
            Intent::ClearDraft => self.trips.clear_draft(),
            Intent::CreateTrip => {
                let session = self.auth.snapshot();
                let owner = session
                    .user
                    .as_ref()
                    .filter(|_| session.is_authenticated)
                    .map(|user| user.id.as_str());
                let draft = self.trips.snapshot().draft;
                self.trips
                    .create_trip(owner, &draft.origin, &draft.destination, &draft.trip_date)
                    .await?;
            }
            Intent::FetchTrips => {
                self.trips.fetch_trips().await?;
            }
            Intent::FindTrips => {
                let search: TripSearch = self.trips.snapshot().draft.search();
                self.trips.find_trips(search).await?;
            }
        }

        Ok(())
    }
}

/// Install the process-wide store
///
/// Returns `false` if a store was already installed.
pub fn init_global(store: Store) -> bool {
    GLOBAL_STORE.set(store).is_ok()
}

/// The process-wide store, if installed
pub fn global() -> Option<&'static Store> {
    GLOBAL_STORE.get()
}
