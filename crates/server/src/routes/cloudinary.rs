//! Signed Cloudinary upload parameters for the asset picker.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::Deserialize;
use services::services::cloudinary::UploadSignature;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignRequest {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub public_id: Option<String>,
}

/// POST /api/cloudinary/sign
///
/// An empty body is valid: the signature is built from the configured
/// preset and the current time.
pub async fn sign(
    State(state): State<AppState>,
    payload: Option<ResponseJson<SignRequest>>,
) -> Result<ResponseJson<ApiResponse<UploadSignature>>, ApiError> {
    let ResponseJson(request) = payload.unwrap_or_default();
    let signature = state.cloudinary.sign_upload(
        request.timestamp,
        request.folder.as_deref(),
        request.public_id.as_deref(),
    );
    Ok(ResponseJson(ApiResponse::success(signature)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/cloudinary/sign", post(sign))
}
