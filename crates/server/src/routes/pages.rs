//! Page draft endpoints: load and merge-write the per-shop documents.

use std::collections::HashSet;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::page::{Page, PageDocument, SavePageRequest};
use db::models::shop::Shop;
use serde::Deserialize;
use utils::response::ApiResponse;
use utils::shop::is_valid_shop_domain;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop: Option<String>,
}

pub(crate) fn require_shop(query: &ShopQuery) -> Result<String, ApiError> {
    match query.shop.as_deref() {
        Some(shop) if is_valid_shop_domain(shop) => Ok(shop.to_string()),
        _ => Err(ApiError::BadRequest(
            "Invalid or missing shop parameter".to_string(),
        )),
    }
}

pub(crate) async fn require_installed_shop(
    state: &AppState,
    domain: &str,
) -> Result<Shop, ApiError> {
    Shop::find_by_domain(&state.db.pool, domain)
        .await?
        .filter(Shop::is_installed)
        .ok_or_else(|| ApiError::Forbidden("Shop is not installed".to_string()))
}

fn validate_blocks(payload: &SavePageRequest) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for block in &payload.blocks {
        if block.id.trim().is_empty() {
            return Err(ApiError::UnprocessableEntity(
                "block id must not be empty".to_string(),
            ));
        }
        if !seen.insert(block.id.as_str()) {
            return Err(ApiError::UnprocessableEntity(format!(
                "duplicate block id: {}",
                block.id
            )));
        }
    }
    Ok(())
}

/// GET /api/pages/{page_id}?shop=
///
/// A page that has never been saved reads as an empty draft.
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Query(query): Query<ShopQuery>,
) -> Result<ResponseJson<ApiResponse<PageDocument>>, ApiError> {
    let shop = require_shop(&query)?;
    require_installed_shop(&state, &shop).await?;

    let document = match Page::find(&state.db.pool, &shop, &page_id).await? {
        Some(page) => PageDocument::from(page),
        None => PageDocument::empty(),
    };
    Ok(ResponseJson(ApiResponse::success(document)))
}

/// POST /api/pages/{page_id}?shop=
///
/// Merge-writes the draft: `created_at` is preserved, `updated_at` set to
/// now.
pub async fn save_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Query(query): Query<ShopQuery>,
    ResponseJson(payload): ResponseJson<SavePageRequest>,
) -> Result<ResponseJson<ApiResponse<PageDocument>>, ApiError> {
    let shop = require_shop(&query)?;
    require_installed_shop(&state, &shop).await?;
    validate_blocks(&payload)?;

    let page = Page::upsert_draft(
        &state.db.pool,
        &shop,
        &page_id,
        payload.blocks,
        payload.metadata,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(PageDocument::from(page))))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/pages/{page_id}", get(get_page).post(save_page))
}
