use axum::{Json, extract::State};
use platform_api::ApiResult;
use serde_json::Value;

use crate::{http::AppState, routes::ApiJson, session::CurrentUser};

/// Opaque passthrough; the external service owns the conversation.
pub async fn relay(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Json<Value>> {
    let reply = state.chatbot.relay(payload).await?;
    Ok(Json(reply))
}
