//! Telephony webhooks: call start and call end.
//!
//! Both return TwiML. The incoming-call document connects the call's audio
//! to the media stream endpoint and, once that stream ends, redirects the
//! provider to the end-of-call webhook which decides between hanging up and
//! dialing the callback number.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::signal::Disposition;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::twiml::{TWIML_CONTENT_TYPE, TwimlResponse, encode_component};

/// Caller id used when the provider omits `From`.
const UNKNOWN_CALLER: &str = "Unknown";

#[derive(Debug, Deserialize)]
pub struct IncomingCallQuery {
    pub project_id: Option<u64>,
    /// Knowledge base credential; defaults to the configured one
    pub api_key: Option<String>,
    /// Number to dial when the call ends without a hangup
    pub phone_number: Option<String>,
}

/// Provider webhook fields. Read from the body on POST, the query on GET.
#[derive(Debug, Default, Deserialize)]
pub struct CallerForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndStreamQuery {
    pub phone_number: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn twiml(body: String) -> Response {
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], body).into_response()
}

/// `GET|POST /incoming-call?project_id=..&api_key=..&phone_number=..`
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IncomingCallQuery>,
    form: Result<Form<CallerForm>, FormRejection>,
) -> AppResult<Response> {
    let project_id = query
        .project_id
        .ok_or_else(|| AppError::BadRequest("project_id is required".to_string()))?;
    let credential = non_empty(query.api_key)
        .or_else(|| state.config.knowledge_api_key.clone())
        .ok_or_else(|| AppError::BadRequest("api_key is required".to_string()))?;
    let phone_number = non_empty(query.phone_number)
        .or_else(|| state.config.callback_phone_number.clone())
        .unwrap_or_default();

    let host = state
        .config
        .public_host
        .clone()
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| AppError::BadRequest("cannot determine public host".to_string()))?;

    let caller = form
        .ok()
        .and_then(|Form(f)| non_empty(f.from))
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string());
    info!(caller = %caller, project_id, "Incoming call");

    let session_id = state
        .knowledge
        .open_session(&credential, project_id, &caller)
        .await;
    info!(session_id = %session_id, project_id, "Incoming call handled");

    let stream_url = format!(
        "wss://{host}/media-stream/project/{project_id}/session/{}/{}",
        encode_component(&session_id),
        encode_component(&credential)
    );
    let end_url = format!(
        "https://{host}/end-stream/{}?phone_number={}",
        encode_component(&session_id),
        encode_component(&phone_number)
    );

    let body = TwimlResponse::new()
        .pause(1)
        .connect_stream(&stream_url)
        .redirect(&end_url)
        .build();
    Ok(twiml(body))
}

/// `GET|POST /end-stream/{session_id}?phone_number=..`
pub async fn end_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<EndStreamQuery>,
) -> Response {
    let disposition = match state.signals.disposition(&session_id).await {
        Ok(disposition) => disposition,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Signal store read failed, assuming transfer");
            None
        }
    };
    info!(
        session_id = %session_id,
        state = disposition.map(|d| d.as_str()).unwrap_or("transfer"),
        "Ending stream"
    );

    let phone_number =
        non_empty(query.phone_number).or_else(|| state.config.callback_phone_number.clone());

    let body = match (disposition, phone_number) {
        (Some(Disposition::Hangup), _) => TwimlResponse::new().hangup(),
        (_, Some(number)) => TwimlResponse::new().dial_number(&number),
        (_, None) => {
            warn!(session_id = %session_id, "No callback number configured, hanging up");
            TwimlResponse::new().hangup()
        }
    };
    twiml(body.build())
}
