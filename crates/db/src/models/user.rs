use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// A shop connected to a user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UserShop {
    pub domain: String,
    pub installed_at: DateTime<Utc>,
}

/// User profile: connected shops keyed by domain plus the most recently
/// connected one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub uid: String,
    pub shops: Json<BTreeMap<String, UserShop>>,
    pub last_connected_shop: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_uid(pool: &SqlitePool, uid: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, uid, shops, last_connected_shop, created_at, updated_at
            FROM users
            WHERE uid = $1"#,
        )
        .bind(uid)
        .fetch_optional(pool)
        .await
    }

    /// Links `domain` into the user's shop map and marks it as the last
    /// connected shop, creating the profile if absent.
    pub async fn link_shop(
        pool: &SqlitePool,
        uid: &str,
        domain: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut shops = Self::find_by_uid(pool, uid)
            .await?
            .map(|user| user.shops.0)
            .unwrap_or_default();
        shops.insert(
            domain.to_string(),
            UserShop {
                domain: domain.to_string(),
                installed_at: Utc::now(),
            },
        );

        let id = Uuid::new_v4();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, uid, shops, last_connected_shop)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(uid) DO UPDATE SET
                shops = excluded.shops,
                last_connected_shop = excluded.last_connected_shop,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id, uid, shops, last_connected_shop, created_at, updated_at"#,
        )
        .bind(id)
        .bind(uid)
        .bind(Json(shops))
        .bind(domain)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn link_shop_creates_and_extends_the_profile() {
        let db = DBService::new_in_memory().await.unwrap();

        let user = User::link_shop(&db.pool, "uid-1", "foo.myshopify.com")
            .await
            .unwrap();
        assert_eq!(user.last_connected_shop.as_deref(), Some("foo.myshopify.com"));
        assert!(user.shops.0.contains_key("foo.myshopify.com"));

        let user = User::link_shop(&db.pool, "uid-1", "bar.myshopify.com")
            .await
            .unwrap();
        assert_eq!(user.shops.0.len(), 2);
        assert_eq!(user.last_connected_shop.as_deref(), Some("bar.myshopify.com"));
    }
}
