use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GoogleConfig;
use crate::connect::{
    ConnectError, ConnectionOutcome, ConnectionWorkflow, Notice, ProfileCatalog, PropertyLister,
    PropertyListing, TitleFetcher,
};
use crate::google::{
    AnalyticsGateway, GatewayError, GatewayResult, OAuthFlow, RestClient, RESOURCE_OWNER,
};
use crate::models::{Application, Channel, Location, OAuthToken, Profile};
use crate::session::{SessionId, SessionStore};
use crate::storage::Storage;

pub const LOGIN_PATH: &str = "/channels/google-analytics/login";
pub const APPLICATION_PATH: &str = "/channels/google-analytics/application";
pub const PROPERTIES_PATH: &str = "/channels/google-analytics/properties";
pub const OVERVIEW_PATH: &str = "/locations";

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionStore>,
    pub oauth: OAuthFlow,
    pub reports: RestClient,
    pub lister: PropertyLister,
    pub workflow: ConnectionWorkflow,
}

impl AppState {
    /// Wire the connection flow around `gateway`; reports always go through
    /// the REST client built from `google`.
    pub fn new(
        storage: Arc<dyn Storage>,
        sessions: Arc<SessionStore>,
        google: &GoogleConfig,
        gateway: Arc<dyn AnalyticsGateway>,
        titles: Arc<dyn TitleFetcher>,
    ) -> GatewayResult<Self> {
        let catalog = ProfileCatalog::new(Arc::clone(&storage));
        Ok(Self {
            oauth: OAuthFlow::new(google)?,
            reports: RestClient::new(google)?,
            lister: PropertyLister::new(Arc::clone(&gateway), catalog),
            workflow: ConnectionWorkflow::new(Arc::clone(&storage), gateway, titles),
            storage,
            sessions,
        })
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn storage_failure(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!("{context}: {e}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {e}"))
}

pub(crate) fn gateway_failure(e: GatewayError) -> ApiError {
    if e.is_auth_failure() {
        warn!("Google rejected the session token: {e}");
        return api_error(StatusCode::UNAUTHORIZED, e.to_string());
    }
    error!("Google Analytics request failed: {e}");
    api_error(StatusCode::BAD_GATEWAY, e.to_string())
}

fn connect_failure(e: ConnectError) -> ApiError {
    match e {
        ConnectError::InvalidSelection(e) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        ConnectError::UnknownApplication(id) => api_error(
            StatusCode::UNAUTHORIZED,
            format!("Application {id} is no longer registered; sign in again at {LOGIN_PATH}"),
        ),
        ConnectError::Gateway(e) => gateway_failure(e),
        ConnectError::Storage(e) => storage_failure("Storage failure", e),
        ConnectError::Wizard(e) => storage_failure("Channel creation failed", e),
    }
}

async fn session_token(
    sessions: &SessionStore,
    session: &SessionId,
) -> Result<Arc<OAuthToken>, ApiError> {
    sessions.token(session).await.ok_or_else(|| {
        api_error(
            StatusCode::UNAUTHORIZED,
            format!("Not signed in to Google Analytics; start at {LOGIN_PATH}"),
        )
    })
}

async fn registered_application(state: &AppState) -> Result<Option<Application>, ApiError> {
    state
        .storage
        .get_application(RESOURCE_OWNER)
        .await
        .map_err(|e| storage_failure("Failed to load application", e))
}

fn application_required() -> Response {
    (
        StatusCode::CONFLICT,
        Json(ApplicationRequired {
            error: "A Google application must be registered before connecting properties"
                .to_string(),
            fields: ApplicationFields {
                app_key: "Client ID",
                app_secret: "Client secret",
            },
            configure_url: APPLICATION_PATH,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
pub struct ApplicationFields {
    pub app_key: &'static str,
    pub app_secret: &'static str,
}

#[derive(Serialize)]
pub struct ApplicationRequired {
    pub error: String,
    pub fields: ApplicationFields,
    pub configure_url: &'static str,
}

#[derive(Serialize)]
pub struct CreateChannelResponse {
    pub app_id: i64,
    pub login_url: &'static str,
}

/// Entry point of the connection flow
pub async fn create_channel(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    Ok(match registered_application(&state).await? {
        Some(application) => Json(CreateChannelResponse {
            app_id: application.id,
            login_url: LOGIN_PATH,
        })
        .into_response(),
        None => application_required(),
    })
}

#[derive(Deserialize)]
pub struct ApplicationRequest {
    pub app_key: String,
    pub app_secret: String,
}

/// Register or replace the Google OAuth client
pub async fn register_application(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ApplicationRequest>,
) -> Result<Json<Application>, ApiError> {
    let app_key = payload.app_key.trim();
    let app_secret = payload.app_secret.trim();
    if app_key.is_empty() || app_secret.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Client ID and client secret are required",
        ));
    }

    let application = state
        .storage
        .upsert_application(RESOURCE_OWNER, app_key, app_secret)
        .await
        .map_err(|e| storage_failure("Failed to save application", e))?;

    info!(application_id = application.id, "registered Google application");
    Ok(Json(application))
}

/// Start the OAuth handshake
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Result<Response, ApiError> {
    let Some(application) = registered_application(&state).await? else {
        return Ok(application_required());
    };

    let nonce = state.sessions.issue_state(&session).await;
    let url = state
        .oauth
        .authorize_url(&application, &nonce)
        .map_err(gateway_failure)?;

    Ok(Redirect::to(&url).into_response())
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target: exchange the code and keep the token in the session
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    if let Some(reason) = query.error {
        warn!(reason = %reason, "Google consent was not granted");
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            format!("Google authorization failed: {reason}"),
        ));
    }

    let returned_state = query.state.unwrap_or_default();
    if !state.sessions.verify_state(&session, &returned_state).await {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid OAuth state"));
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing authorization code"));
    };

    let application = registered_application(&state).await?.ok_or_else(|| {
        api_error(
            StatusCode::CONFLICT,
            "The Google application was removed during sign in",
        )
    })?;

    let token = state
        .oauth
        .exchange_code(&application, &code)
        .await
        .map_err(gateway_failure)?;

    state.sessions.store_token(&session, token).await;
    info!("stored Google Analytics token in session");
    Ok(Redirect::to(PROPERTIES_PATH))
}

/// Every view the session token can see, flagged when already connected
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<PropertyListing>, ApiError> {
    let token = session_token(&state.sessions, &session).await?;
    state
        .lister
        .list(&token)
        .await
        .map(Json)
        .map_err(connect_failure)
}

#[derive(Deserialize)]
pub struct SelectionForm {
    #[serde(rename = "google-analytics-profile-id", default)]
    pub profile_ids: Vec<String>,
}

/// Connect the selected views and continue to the overview
pub async fn create_locations(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Json(form): Json<SelectionForm>,
) -> Result<Redirect, ApiError> {
    let token = session_token(&state.sessions, &session).await?;

    let outcome = state
        .workflow
        .connect(&token, &form.profile_ids)
        .await
        .map_err(connect_failure)?;

    state
        .sessions
        .push_notices(&session, outcome.notices().iter().cloned())
        .await;

    Ok(match outcome {
        ConnectionOutcome::EmptySelection(_) => Redirect::to(PROPERTIES_PATH),
        ConnectionOutcome::Processed(_) => Redirect::to(OVERVIEW_PATH),
    })
}

#[derive(Serialize)]
pub struct ConnectionsOverview {
    pub locations: Vec<Location>,
    pub channels: Vec<Channel>,
    pub profiles: Vec<Profile>,
    pub notices: Vec<Notice>,
}

/// Connected locations and channels, plus any notices queued for the session
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<ConnectionsOverview>, ApiError> {
    let locations = state
        .storage
        .list_locations(None)
        .await
        .map_err(|e| storage_failure("Failed to list locations", e))?;
    let channels = state
        .storage
        .list_channels()
        .await
        .map_err(|e| storage_failure("Failed to list channels", e))?;
    let profiles = state
        .storage
        .list_profiles()
        .await
        .map_err(|e| storage_failure("Failed to list profiles", e))?;

    Ok(Json(ConnectionsOverview {
        locations,
        channels,
        profiles,
        notices: state.sessions.drain_notices(&session).await,
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
