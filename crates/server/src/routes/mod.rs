use axum::Router;

use crate::AppState;

pub mod cloudinary;
pub mod health;
pub mod pages;
pub mod shopify;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(pages::router())
        .merge(shopify::router())
        .merge(cloudinary::router())
}
