use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use strum_macros::AsRefStr;

use crate::subscribe::{EmailError, SubscribeError};

pub type WebResult<T> = core::result::Result<T, Error>;

#[derive(Debug, AsRefStr, thiserror::Error)]
pub enum Error {
    #[error("no route matched the request")]
    RouteNotFound,
    #[error("request body rejected: {0}")]
    InvalidBody(String),

    #[error("subscribe error: {0}")]
    Subscribe(#[from] SubscribeError),
}

impl Error {
    pub fn status_code_and_client_error(&self) -> (StatusCode, ClientError) {
        use ClientError::*;

        match self {
            Error::RouteNotFound => (StatusCode::NOT_FOUND, RouteNotFound),
            Error::InvalidBody(_) => (
                StatusCode::BAD_REQUEST,
                InvalidInput("Invalid request body"),
            ),
            Error::Subscribe(sub_er) => match sub_er {
                SubscribeError::Validation(EmailError::Missing) => {
                    (StatusCode::BAD_REQUEST, InvalidInput("Email is required"))
                }
                SubscribeError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, InvalidInput("Invalid email format"))
                }
                SubscribeError::AlreadySubscribed => (
                    StatusCode::CONFLICT,
                    AlreadySubscribed("Email is already subscribed to the newsletter"),
                ),
                SubscribeError::DuplicateOnWrite => (
                    StatusCode::CONFLICT,
                    AlreadySubscribed("Email is already subscribed"),
                ),
                SubscribeError::Timeout { .. } | SubscribeError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, ServiceError)
                }
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{:<12} - into_response(Error: {self:?})", "INTO_RESP");

        // Construct a placeholder response, `response_mapper` builds the client body.
        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();

        // Insert the Error into response so that it can be retrieved later.
        res.extensions_mut().insert(Arc::new(self));

        res
    }
}

/// The part of an error a client gets to see.
#[derive(Debug, AsRefStr, derive_more::Display)]
pub enum ClientError {
    #[display("{_0}")]
    InvalidInput(&'static str),
    #[display("{_0}")]
    AlreadySubscribed(&'static str),
    #[display("Route not found")]
    RouteNotFound,
    #[display("Internal server error")]
    ServiceError,
}
