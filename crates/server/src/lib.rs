//! HTTP server assembly: shared state and the top-level router.

use std::sync::Arc;

use axum::Router;
use db::DBService;
use services::services::cloudinary::CloudinaryService;
use services::services::profile::ProfileService;
use services::services::publish::PublishService;
use services::services::shopify::{ShopifyClient, ShopifyError};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;

pub use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: Arc<Config>,
    pub shopify: ShopifyClient,
    pub cloudinary: CloudinaryService,
    pub profiles: ProfileService,
    pub publisher: PublishService,
}

impl AppState {
    pub fn new(config: Config, db: DBService) -> Result<Self, ShopifyError> {
        let shopify = ShopifyClient::new(
            config.shopify_api_key.clone(),
            config.shopify_api_secret.clone(),
        )?;
        let cloudinary = CloudinaryService::new(
            config.cloudinary_cloud_name.clone(),
            config.cloudinary_api_key.clone(),
            config.cloudinary_api_secret.clone(),
            config.cloudinary_upload_preset.clone(),
        );
        let profiles = ProfileService::new(db.clone());
        let publisher = PublishService::new(db.clone(), shopify.clone());
        Ok(Self {
            db,
            config: Arc::new(config),
            shopify,
            cloudinary,
            profiles,
            publisher,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
