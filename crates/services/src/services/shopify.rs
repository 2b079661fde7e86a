//! Shopify Admin API client: OAuth handshake, theme listing, asset upload.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

const API_VERSION: &str = "2025-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Error)]
pub enum ShopifyError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
}

/// One theme of a storefront; the live theme carries role `"main"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
struct ThemesEnvelope {
    themes: Vec<Theme>,
}

/// Token grant returned by the OAuth code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct AssetEnvelope<'a> {
    asset: AssetPayload<'a>,
}

#[derive(Debug, Serialize)]
struct AssetPayload<'a> {
    key: &'a str,
    value: &'a str,
}

/// Authenticated client for the Shopify Admin REST API.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: Client,
    api_key: String,
    api_secret: String,
}

impl ShopifyClient {
    pub fn new(api_key: String, api_secret: String) -> Result<Self, ShopifyError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pagesmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShopifyError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            api_secret,
        })
    }

    /// OAuth authorize URL for the install redirect (offline access mode).
    pub fn authorize_url(&self, shop: &str, scopes: &str, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://{shop}/admin/oauth/authorize?client_id={client_id}&scope={scope}&redirect_uri={redirect_uri}&state={state}&access_mode=offline",
            client_id = self.api_key,
            scope = urlencoding::encode(scopes),
            redirect_uri = urlencoding::encode(redirect_uri),
            state = state,
        )
    }

    /// Exchanges an authorization code for a long-lived access token.
    pub async fn exchange_code(
        &self,
        shop: &str,
        code: &str,
    ) -> Result<AccessTokenGrant, ShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");
        let request = TokenExchangeRequest {
            client_id: &self.api_key,
            client_secret: &self.api_secret,
            code,
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_json(response).await
    }

    /// Lists the shop's themes.
    pub async fn list_themes(&self, shop: &str, token: &str) -> Result<Vec<Theme>, ShopifyError> {
        let url = format!("https://{shop}/admin/api/{API_VERSION}/themes.json");
        let response = self
            .http
            .get(&url)
            .header("X-Shopify-Access-Token", token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let envelope: ThemesEnvelope = Self::read_json(response).await?;
        Ok(envelope.themes)
    }

    /// Uploads one theme asset, replacing any existing asset at `key`.
    pub async fn upload_asset(
        &self,
        shop: &str,
        token: &str,
        theme_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), ShopifyError> {
        let url = format!("https://{shop}/admin/api/{API_VERSION}/themes/{theme_id}/assets.json");
        let response = self
            .http
            .put(&url)
            .header("X-Shopify-Access-Token", token)
            .json(&AssetEnvelope {
                asset: AssetPayload { key, value },
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::http_error(response).await)
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ShopifyError> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ShopifyError::Serde(e.to_string()))
        } else {
            Err(Self::http_error(response).await)
        }
    }

    async fn http_error(response: reqwest::Response) -> ShopifyError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ShopifyError::Http { status, body }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ShopifyError {
    ShopifyError::Transport(e.to_string())
}

/// Hex HMAC-SHA256 over the sorted `key=value` query pairs, excluding the
/// `hmac` and `signature` parameters. This is the digest Shopify signs
/// OAuth callbacks with.
pub fn callback_message(params: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .filter(|(key, _)| key != "hmac" && key != "signature")
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    pairs.sort();
    pairs.join("&")
}

/// Verifies the `hmac` query parameter of an OAuth callback in constant
/// time. Any malformed hex, missing digest, or mismatch yields `false`.
pub fn verify_callback_hmac(params: &[(String, String)], provided: &str, secret: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(callback_message(params).as_bytes());
    let digest = mac.finalize().into_bytes();

    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    digest.as_slice().ct_eq(provided.as_slice()).into()
}
