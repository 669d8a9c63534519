use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{error::OutputError, server::types::Message};

impl IntoResponse for OutputError {
    fn into_response(self) -> Response {
        let status = match &self {
            OutputError::NotFound(_) => StatusCode::NOT_FOUND,
            OutputError::AlreadyRunning(_) => StatusCode::CONFLICT,
            OutputError::ChannelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OutputError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            OutputError::SendFailed { .. } | OutputError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!("command error: {}", message);
        } else {
            warn!("command client error: {}", message);
        }

        let body = Json(Message {
            message,
            item: None::<()>,
        });

        (status, body).into_response()
    }
}
