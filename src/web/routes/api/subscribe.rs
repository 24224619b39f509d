use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Form, Json,
};

use crate::{
    web::{
        types::{SubscribeRequest, SubscribeResponse},
        Error, WebResult,
    },
    AppState,
};

#[tracing::instrument(name = "Handling subscribe request", skip(app_state, payload))]
pub async fn subscribe(
    State(app_state): State<AppState>,
    SubscribeBody(payload): SubscribeBody,
) -> WebResult<(StatusCode, Json<SubscribeResponse>)> {
    let receipt = app_state
        .workflow
        .subscribe(payload.email.as_deref(), payload.preferences)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// A subscribe request sent either as JSON or as an url-encoded HTML form.
/// Anything that is not a form is parsed as JSON.
pub struct SubscribeBody(pub SubscribeRequest);

impl<S> FromRequest<S> for SubscribeBody
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let request = if is_form {
            let Form(request) = Form::<SubscribeRequest>::from_request(req, state)
                .await
                .map_err(|rejection| Error::InvalidBody(rejection.body_text()))?;
            request
        } else {
            let Json(request) = Json::<SubscribeRequest>::from_request(req, state)
                .await
                .map_err(|rejection| Error::InvalidBody(rejection.body_text()))?;
            request
        };

        Ok(Self(request))
    }
}
