//! Profile observation: an explicit subscribe/notify interface over user
//! records. Subscribers watch the latest snapshot for a uid; dropping the
//! receiver unsubscribes.

use std::sync::Arc;

use dashmap::DashMap;
use db::DBService;
use db::models::user::User;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProfileService {
    db: DBService,
    subscribers: Arc<DashMap<String, watch::Sender<Option<User>>>>,
}

impl ProfileService {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            subscribers: Arc::new(DashMap::new()),
        }
    }

    /// Observes profile changes for `uid`. The receiver starts at the
    /// current persisted snapshot (or `None`) and is updated on every
    /// profile write routed through this service.
    pub async fn observe(&self, uid: &str) -> Result<watch::Receiver<Option<User>>, sqlx::Error> {
        let current = User::find_by_uid(&self.db.pool, uid).await?;
        let sender = self
            .subscribers
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(None).0);
        sender.send_replace(current);
        Ok(sender.subscribe())
    }

    /// Links a shop into the user's profile and notifies observers.
    pub async fn link_shop(&self, uid: &str, shop_domain: &str) -> Result<User, sqlx::Error> {
        let user = User::link_shop(&self.db.pool, uid, shop_domain).await?;
        self.notify(uid, user.clone());
        Ok(user)
    }

    fn notify(&self, uid: &str, user: User) {
        if let Some(sender) = self.subscribers.get(uid) {
            if sender.receiver_count() == 0 {
                drop(sender);
                // Last observer is gone; prune the slot.
                self.subscribers.remove(uid);
                debug!(uid, "dropped profile subscription with no observers");
                return;
            }
            sender.send_replace(Some(user));
        }
    }
}
