//! Publish pipeline: snapshot a persisted draft into theme assets and
//! upload them to the connected store's theme.

use builder::generator::generate_section_assets;
use chrono::{DateTime, Utc};
use db::DBService;
use db::models::page::{Page, PublishedAssets};
use db::models::shop::Shop;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

use super::shopify::{ShopifyClient, ShopifyError, Theme};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("shop has not installed the app")]
    NotInstalled,
    #[error("no draft found for this page")]
    NoDraft,
    #[error("draft is empty, add blocks before publishing")]
    EmptyDraft,
    #[error("theme {requested} not found, available themes: {available}")]
    ThemeNotFound { requested: i64, available: String },
    #[error("shop has no themes")]
    NoThemes,
    #[error(transparent)]
    Shopify(#[from] ShopifyError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Returned to the caller and mirrored into the page's publish record.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub published_at: DateTime<Utc>,
    pub theme_id: i64,
    pub assets: PublishedAssets,
}

/// Runs the publish pipeline for one `(shop, page)` pair.
#[derive(Debug, Clone)]
pub struct PublishService {
    db: DBService,
    shopify: ShopifyClient,
}

impl PublishService {
    pub fn new(db: DBService, shopify: ShopifyClient) -> Self {
        Self { db, shopify }
    }

    /// Publishes the persisted draft of `page_id` to `publish_to_theme_id`,
    /// or to the shop's main theme when no explicit theme is requested.
    ///
    /// Preconditions are checked in order and the first failure wins. The
    /// two asset uploads are sequential and not transactional: a failure on
    /// the second upload leaves the first asset in place and writes no
    /// publish record.
    pub async fn publish(
        &self,
        shop_domain: &str,
        page_id: &str,
        publish_to_theme_id: Option<i64>,
    ) -> Result<PublishReceipt, PublishError> {
        let shop = Shop::find_by_domain(&self.db.pool, shop_domain)
            .await?
            .filter(Shop::is_installed)
            .ok_or(PublishError::NotInstalled)?;

        let page = Page::find(&self.db.pool, shop_domain, page_id)
            .await?
            .ok_or(PublishError::NoDraft)?;
        if page.blocks.0.is_empty() {
            return Err(PublishError::EmptyDraft);
        }

        let assets = generate_section_assets(page_id, &page.blocks.0);

        let themes = self.shopify.list_themes(shop_domain, &shop.access_token).await?;
        let theme = resolve_theme(publish_to_theme_id, &themes)?;

        self.shopify
            .upload_asset(
                shop_domain,
                &shop.access_token,
                theme.id,
                &assets.section_key,
                &assets.section_liquid,
            )
            .await?;
        self.shopify
            .upload_asset(
                shop_domain,
                &shop.access_token,
                theme.id,
                &assets.template_key,
                &assets.template_json,
            )
            .await?;

        let published = PublishedAssets {
            section: assets.section_key,
            template: assets.template_key,
        };
        let page = Page::record_publish(
            &self.db.pool,
            shop_domain,
            page_id,
            theme.id,
            published.clone(),
        )
        .await?;

        info!(
            shop = shop_domain,
            page_id,
            theme_id = theme.id,
            section = %published.section,
            "published page to theme"
        );

        Ok(PublishReceipt {
            published_at: page.published_at.unwrap_or_else(Utc::now),
            theme_id: theme.id,
            assets: published,
        })
    }
}

/// Resolves the upload target: an explicitly requested theme must exist,
/// otherwise the main theme wins, falling back to the first theme listed.
fn resolve_theme(requested: Option<i64>, themes: &[Theme]) -> Result<&Theme, PublishError> {
    if themes.is_empty() {
        return Err(PublishError::NoThemes);
    }
    match requested {
        Some(id) => themes.iter().find(|theme| theme.id == id).ok_or_else(|| {
            let available = themes
                .iter()
                .map(|theme| format!("{} ({})", theme.id, theme.name))
                .collect::<Vec<_>>()
                .join(", ");
            PublishError::ThemeNotFound {
                requested: id,
                available,
            }
        }),
        None => Ok(themes
            .iter()
            .find(|theme| theme.role == "main")
            .unwrap_or(&themes[0])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(id: i64, name: &str, role: &str) -> Theme {
        Theme {
            id,
            name: name.into(),
            role: role.into(),
        }
    }

    fn service(db: DBService) -> PublishService {
        let shopify = ShopifyClient::new("key".into(), "secret".into()).unwrap();
        PublishService::new(db, shopify)
    }

    #[test]
    fn resolve_prefers_the_main_theme() {
        let themes = vec![
            theme(1, "Draft", "unpublished"),
            theme(2, "Live", "main"),
        ];
        assert_eq!(resolve_theme(None, &themes).unwrap().id, 2);
    }

    #[test]
    fn resolve_falls_back_to_the_first_theme() {
        let themes = vec![
            theme(1, "Draft", "unpublished"),
            theme(2, "Other", "unpublished"),
        ];
        assert_eq!(resolve_theme(None, &themes).unwrap().id, 1);
    }

    #[test]
    fn resolve_requires_an_explicit_theme_to_exist() {
        let themes = vec![theme(1, "Draft", "unpublished")];
        assert_eq!(resolve_theme(Some(1), &themes).unwrap().id, 1);

        let err = resolve_theme(Some(9), &themes).unwrap_err();
        match err {
            PublishError::ThemeNotFound { requested, available } => {
                assert_eq!(requested, 9);
                assert!(available.contains("1 (Draft)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_fails_without_themes() {
        assert!(matches!(
            resolve_theme(None, &[]),
            Err(PublishError::NoThemes)
        ));
        assert!(matches!(
            resolve_theme(Some(1), &[]),
            Err(PublishError::NoThemes)
        ));
    }

    #[tokio::test]
    async fn publish_requires_an_installed_shop() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = service(db)
            .publish("foo.myshopify.com", "landing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotInstalled));
    }

    #[tokio::test]
    async fn publish_requires_a_nonempty_draft() {
        let db = DBService::new_in_memory().await.unwrap();
        db::models::shop::Shop::upsert_installation(
            &db.pool,
            "foo.myshopify.com",
            "token",
            vec![],
        )
        .await
        .unwrap();

        let svc = service(db.clone());
        let err = svc
            .publish("foo.myshopify.com", "landing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NoDraft));

        Page::upsert_draft(&db.pool, "foo.myshopify.com", "landing", vec![], None)
            .await
            .unwrap();
        let err = svc
            .publish("foo.myshopify.com", "landing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::EmptyDraft));
    }
}
