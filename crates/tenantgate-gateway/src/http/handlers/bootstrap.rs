//! Bootstrap handlers.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};

use crate::bootstrap::BootstrapError;
use crate::http::responses::{BootstrapAuthResponse, BootstrapJoinResponse};
use crate::state::AppState;

/// Join endpoint.
///
/// Returns detached signatures over the active tokens' secrets.
pub async fn join(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BootstrapJoinResponse>, BootstrapError> {
    let authorization = authorization_header(&headers);
    let response = state.bootstrap.join(authorization.as_deref()).await?;
    Ok(Json(response))
}

/// Auth endpoint.
///
/// The body is read as raw bytes so the credential is checked before the
/// body is parsed.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BootstrapAuthResponse>, BootstrapError> {
    let authorization = authorization_header(&headers);
    let response = state.bootstrap.auth(authorization.as_deref(), &body).await?;
    Ok(Json(response))
}

fn authorization_header(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    headers
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
}
