use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::analysis::{ChatRequest, ChatResponse};
use crate::routes::{ApiError, ErrorBody};
use crate::services::vision::VisionError;

/// POST /api/v1/chat — relay a text prompt to the chat completions API.
///
/// A thin pass-through: upstream API errors keep their upstream status code.
pub async fn relay_prompt(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return ApiError::Validation(e.body_text()).into_response(),
    };
    if let Err(e) = request.validate() {
        return ApiError::Validation(e.to_string()).into_response();
    }

    match state.model.complete(&request.prompt).await {
        Ok(output_text) => Json(ChatResponse { output_text }).into_response(),
        Err(VisionError::Api { status, message }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(ErrorBody {
                    error: message,
                    details: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "prompt relay failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "An error occurred while processing your request.".to_string(),
                    details: None,
                }),
            )
                .into_response()
        }
    }
}
