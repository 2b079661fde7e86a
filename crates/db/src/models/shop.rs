use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use uuid::Uuid;

/// A connected storefront, created on a successful OAuth callback and
/// refreshed on reinstall. Never deleted by this system.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub domain: String,
    pub access_token: String,
    pub scopes: Json<Vec<String>>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Whether the shop holds a usable access token.
    pub fn is_installed(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub async fn find_by_domain(
        pool: &SqlitePool,
        domain: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Shop>(
            r#"SELECT id, domain, access_token, scopes, installed_at, updated_at
            FROM shops
            WHERE domain = $1"#,
        )
        .bind(domain)
        .fetch_optional(pool)
        .await
    }

    /// Records a completed OAuth handshake. Reinstalls keep the original
    /// `installed_at` and refresh the token, scopes, and `updated_at`.
    pub async fn upsert_installation(
        pool: &SqlitePool,
        domain: &str,
        access_token: &str,
        scopes: Vec<String>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Shop>(
            r#"INSERT INTO shops (id, domain, access_token, scopes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(domain) DO UPDATE SET
                access_token = excluded.access_token,
                scopes = excluded.scopes,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id, domain, access_token, scopes, installed_at, updated_at"#,
        )
        .bind(id)
        .bind(domain)
        .bind(access_token)
        .bind(Json(scopes))
        .fetch_one(pool)
        .await
    }
}
