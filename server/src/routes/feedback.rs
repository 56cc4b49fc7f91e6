use axum::{Json, extract::State, http::StatusCode};
use entity::activity;
use platform_api::ApiResult;
use serde::{Deserialize, Serialize};

use crate::{
    activity::{ANONYMOUS_ACTOR, record},
    http::AppState,
    routes::{ApiJson, require_non_empty},
    session::CurrentUser,
};

const PREVIEW_CHARS: usize = 100;

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub preview: String,
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

/// Transport requires a session, but the stored record carries the anonymous
/// sentinel instead of the submitter.
pub async fn submit(
    State(state): State<AppState>,
    _current: CurrentUser,
    ApiJson(body): ApiJson<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let category = require_non_empty("category", &body.category)?;
    let kind = require_non_empty("type", &body.kind)?;
    let content = require_non_empty("content", &body.content)?;

    let preview = preview(&content);
    record(
        &state.pool,
        activity::Action::Feedback,
        format!("{category}/{kind}: {preview}"),
        ANONYMOUS_ACTOR,
        None,
        None,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(FeedbackResponse { preview })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_passes_through() {
        assert_eq!(preview("all good"), "all good");
    }

    #[test]
    fn exactly_100_chars_is_untouched() {
        let content = "x".repeat(100);
        assert_eq!(preview(&content), content);
    }

    #[test]
    fn long_content_truncates_with_ellipsis() {
        let content = "y".repeat(140);
        let cut = preview(&content);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
        assert!(cut.starts_with(&"y".repeat(100)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "ä".repeat(120);
        let cut = preview(&content);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
    }
}
