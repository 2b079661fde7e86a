use builder::schema::{BlockInstance, PageMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// Persisted page draft, keyed by `(shop_domain, page_id)`.
///
/// `created_at` is immutable once set; `updated_at` moves on every save.
/// The publish columns always reflect the most recent publish, not a
/// history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: Uuid,
    pub shop_domain: String,
    pub page_id: String,
    pub blocks: Json<Vec<BlockInstance>>,
    pub metadata: Option<Json<PageMetadata>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub published_theme_id: Option<i64>,
    pub published_assets: Option<Json<PublishedAssets>>,
}

/// Theme asset keys written by the most recent publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct PublishedAssets {
    pub section: String,
    pub template: String,
}

/// Wire shape of a page draft, as returned by `GET /api/pages/{pageId}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub blocks: Vec<BlockInstance>,
    pub metadata: Option<PageMetadata>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageDocument {
    /// The shape served when no document exists yet: an empty draft.
    pub fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            metadata: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<Page> for PageDocument {
    fn from(page: Page) -> Self {
        Self {
            blocks: page.blocks.0,
            metadata: page.metadata.map(|metadata| metadata.0),
            created_at: Some(page.created_at),
            updated_at: Some(page.updated_at),
        }
    }
}

/// Body of `POST /api/pages/{pageId}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SavePageRequest {
    pub blocks: Vec<BlockInstance>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

impl Page {
    pub async fn find(
        pool: &SqlitePool,
        shop_domain: &str,
        page_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            r#"SELECT id, shop_domain, page_id, blocks, metadata,
                created_at, updated_at, published_at, published_theme_id, published_assets
            FROM pages
            WHERE shop_domain = $1 AND page_id = $2"#,
        )
        .bind(shop_domain)
        .bind(page_id)
        .fetch_optional(pool)
        .await
    }

    /// Merge-writes a draft: blocks and metadata are replaced, `created_at`
    /// is preserved from an existing row, `updated_at` is always set to now.
    pub async fn upsert_draft(
        pool: &SqlitePool,
        shop_domain: &str,
        page_id: &str,
        blocks: Vec<BlockInstance>,
        metadata: Option<PageMetadata>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Page>(
            r#"INSERT INTO pages (id, shop_domain, page_id, blocks, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(shop_domain, page_id) DO UPDATE SET
                blocks = excluded.blocks,
                metadata = excluded.metadata,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id, shop_domain, page_id, blocks, metadata,
                created_at, updated_at, published_at, published_theme_id, published_assets"#,
        )
        .bind(id)
        .bind(shop_domain)
        .bind(page_id)
        .bind(Json(blocks))
        .bind(metadata.map(Json))
        .fetch_one(pool)
        .await
    }

    /// Records a successful publish on the page document.
    pub async fn record_publish(
        pool: &SqlitePool,
        shop_domain: &str,
        page_id: &str,
        theme_id: i64,
        assets: PublishedAssets,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Page>(
            r#"UPDATE pages SET
                published_at = CURRENT_TIMESTAMP,
                published_theme_id = $3,
                published_assets = $4
            WHERE shop_domain = $1 AND page_id = $2
            RETURNING id, shop_domain, page_id, blocks, metadata,
                created_at, updated_at, published_at, published_theme_id, published_assets"#,
        )
        .bind(shop_domain)
        .bind(page_id)
        .bind(theme_id)
        .bind(Json(assets))
        .fetch_one(pool)
        .await
    }
}
