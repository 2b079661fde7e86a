//! Environment-driven configuration, validated once at startup.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Public base URL of this app, used for OAuth redirect URIs.
    pub app_url: String,
    pub shopify_api_key: String,
    pub shopify_api_secret: String,
    pub shopify_scopes: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    pub cloudinary_upload_preset: String,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: optional("BIND_ADDR", "127.0.0.1:3000"),
            database_url: optional("DATABASE_URL", "sqlite://pagesmith.db"),
            app_url: required("APP_URL")?,
            shopify_api_key: required("SHOPIFY_API_KEY")?,
            shopify_api_secret: required("SHOPIFY_API_SECRET")?,
            shopify_scopes: optional("SHOPIFY_SCOPES", "write_themes,read_themes"),
            cloudinary_cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_api_key: required("CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: required("CLOUDINARY_API_SECRET")?,
            cloudinary_upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
        })
    }

    /// OAuth callback endpoint on this app.
    pub fn callback_url(&self) -> String {
        format!("{}/api/shopify/callback", self.app_url.trim_end_matches('/'))
    }

    /// Post-install landing URL inside the app.
    pub fn app_redirect_url(&self) -> String {
        format!("{}/app", self.app_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_urls_strip_trailing_slashes() {
        let config = Config {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            app_url: "https://app.example.com/".into(),
            shopify_api_key: "key".into(),
            shopify_api_secret: "secret".into(),
            shopify_scopes: "write_themes".into(),
            cloudinary_cloud_name: "demo".into(),
            cloudinary_api_key: "ck".into(),
            cloudinary_api_secret: "cs".into(),
            cloudinary_upload_preset: "preset".into(),
        };
        assert_eq!(
            config.callback_url(),
            "https://app.example.com/api/shopify/callback"
        );
        assert_eq!(config.app_redirect_url(), "https://app.example.com/app");
    }
}
