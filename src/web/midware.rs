use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    web::{log, Error, REQUEST_ID_HEADER},
    AppState,
};

/// Turns a `web::Error` stashed in the response extensions into the client JSON envelope
/// and logs every request.
pub async fn response_mapper(
    State(app_state): State<AppState>,
    req_method: Method,
    uri: Uri,
    resp: Response,
) -> Response {
    let req_id = resp
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|id| id.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let web_error = resp.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    let client_status_and_error = web_error.map(Error::status_code_and_client_error);

    log::log_request(
        &req_id,
        &req_method,
        &uri,
        client_status_and_error
            .as_ref()
            .map(|(status, _)| *status)
            .unwrap_or(resp.status()),
        web_error,
        client_status_and_error.as_ref().map(|(_, ce)| ce),
    );

    let Some((status, client_error)) = client_status_and_error else {
        return resp;
    };

    let mut client_error_body = json!({
        "success": false,
        "message": client_error.to_string(),
    });
    if status.is_server_error() {
        let detail = match web_error {
            Some(er) if app_state.expose_error_details => er.to_string(),
            _ => client_error.to_string(),
        };
        client_error_body["error"] = json!(detail);
    }

    let mut err_resp = (status, Json(client_error_body)).into_response();
    // The body is rebuilt, keep the request id the propagation layer already attached.
    if let Ok(id) = HeaderValue::from_str(&req_id) {
        err_resp.headers_mut().insert(REQUEST_ID_HEADER, id);
    }

    err_resp
}
