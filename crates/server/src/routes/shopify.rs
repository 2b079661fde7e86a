//! Shopify OAuth flow and the publish endpoint.
//!
//! `install` redirects the merchant to Shopify's consent screen with a
//! random `state` nonce mirrored into a short-lived cookie; `callback`
//! verifies the HMAC and nonce before exchanging the grant code and
//! persisting the installation.

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::{Json as ResponseJson, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use db::models::shop::Shop;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use services::services::publish::PublishReceipt;
use services::services::shopify::verify_callback_hmac;
use ts_rs::TS;
use utils::response::ApiResponse;
use utils::shop::{is_valid_shop_domain, normalize_shop_domain};

use crate::{AppState, error::ApiError};

const STATE_COOKIE: &str = "shopify_oauth_state";
const STATE_COOKIE_TTL: time::Duration = time::Duration::seconds(300);

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub shop: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Nonce payload mirrored into the state cookie so the callback can tie
/// the response back to the browser that started the flow.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateCookie {
    value: String,
    user_id: Option<String>,
    created_at: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublishRequest {
    pub page_id: String,
    #[serde(default)]
    pub publish_to_theme_id: Option<i64>,
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// GET /api/shopify/install?shop=&userId=
pub async fn install(
    State(state): State<AppState>,
    Query(query): Query<InstallQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let shop = query
        .shop
        .as_deref()
        .and_then(normalize_shop_domain)
        .filter(|shop| is_valid_shop_domain(shop))
        .ok_or_else(|| ApiError::BadRequest("Invalid or missing shop parameter".to_string()))?;
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing user identifier".to_string()))?;

    let nonce = random_nonce();
    let payload = StateCookie {
        value: nonce.clone(),
        user_id: Some(user_id),
        created_at: chrono::Utc::now().timestamp_millis(),
    };
    let payload = serde_json::to_string(&payload)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let cookie = Cookie::build((STATE_COOKIE, payload))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(STATE_COOKIE_TTL)
        .build();

    let authorize = state.shopify.authorize_url(
        &shop,
        &state.config.shopify_scopes,
        &state.config.callback_url(),
        &nonce,
    );
    tracing::info!(shop = %shop, "starting oauth install");
    Ok((jar.add(cookie), Redirect::temporary(&authorize)))
}

/// GET /api/shopify/callback
///
/// The raw query is kept as ordered pairs because HMAC verification
/// needs every parameter Shopify sent, not just the ones we model.
pub async fn callback(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let raw_query = raw_query.unwrap_or_default();
    let params: Vec<(String, String)> = url::form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    let shop = param("shop")
        .filter(|shop| is_valid_shop_domain(shop))
        .ok_or_else(|| ApiError::BadRequest("Invalid or missing shop parameter".to_string()))?;
    let code = param("code")
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;
    let hmac = param("hmac")
        .ok_or_else(|| ApiError::BadRequest("Missing HMAC signature".to_string()))?;
    if !verify_callback_hmac(&params, &hmac, &state.config.shopify_api_secret) {
        return Err(ApiError::BadRequest("Invalid HMAC signature".to_string()));
    }

    let state_param = param("state")
        .ok_or_else(|| ApiError::BadRequest("Missing state parameter".to_string()))?;
    let cookie = jar
        .get(STATE_COOKIE)
        .ok_or_else(|| ApiError::BadRequest("Missing state cookie".to_string()))?;
    let stored: StateCookie = serde_json::from_str(cookie.value())
        .map_err(|_| ApiError::BadRequest("Failed to parse state cookie".to_string()))?;
    if stored.value != state_param {
        return Err(ApiError::BadRequest("State validation failed".to_string()));
    }
    let jar = jar.remove(Cookie::from(STATE_COOKIE));

    let grant = state
        .shopify
        .exchange_code(&shop, &code)
        .await
        .map_err(|err| {
            tracing::error!(shop = %shop, error = %err, "token exchange failed");
            ApiError::Internal("Failed to exchange access token".to_string())
        })?;
    let scopes: Vec<String> = grant
        .scope
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect();

    Shop::upsert_installation(&state.db.pool, &shop, &grant.access_token, scopes).await?;
    if let Some(user_id) = stored.user_id.filter(|id| !id.trim().is_empty()) {
        state.profiles.link_shop(&user_id, &shop).await?;
    }
    tracing::info!(shop = %shop, "shop installed");

    let redirect = format!(
        "{}?shop={}",
        state.config.app_redirect_url(),
        urlencoding::encode(&shop)
    );
    Ok((jar, Redirect::temporary(&redirect)))
}

/// POST /api/shopify/publish?shop=
pub async fn publish(
    State(state): State<AppState>,
    Query(query): Query<super::pages::ShopQuery>,
    ResponseJson(payload): ResponseJson<PublishRequest>,
) -> Result<ResponseJson<ApiResponse<PublishReceipt>>, ApiError> {
    let shop = super::pages::require_shop(&query)?;
    if payload.page_id.trim().is_empty() {
        return Err(ApiError::UnprocessableEntity("pageId is required".to_string()));
    }

    let receipt = state
        .publisher
        .publish(&shop, &payload.page_id, payload.publish_to_theme_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(receipt)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shopify/install", get(install))
        .route("/shopify/callback", get(callback))
        .route("/shopify/publish", post(publish))
}
