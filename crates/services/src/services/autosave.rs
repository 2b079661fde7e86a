//! Persistence adapter: keeps one page document synchronized with a
//! [`BuilderStore`] through load-on-attach and debounced save-on-change.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use builder::schema::{BlockInstance, PageMetadata};
use builder::store::BuilderStore;
use chrono::{DateTime, Utc};
use db::models::page::{PageDocument, SavePageRequest};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use utils::response::ApiResponse;

/// Rapid edits within this window coalesce into one remote write.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Error)]
pub enum AutosaveError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
}

/// Surfaced session status. Cancelled attempts never transition it.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Loading,
    Saving,
    Saved,
    Error(String),
}

/// Remote side of the adapter. Implemented over HTTP in production and as
/// an in-memory double in tests.
#[async_trait]
pub trait PageBackend: Send + Sync {
    /// Fetches the persisted document. A page that has never been saved
    /// loads as an empty draft, not an error.
    async fn load(&self, shop: &str, page_id: &str) -> Result<PageDocument, AutosaveError>;

    /// Persists the block sequence, returning the document's new
    /// `updated_at`.
    async fn save(
        &self,
        shop: &str,
        page_id: &str,
        blocks: Vec<BlockInstance>,
        metadata: Option<PageMetadata>,
    ) -> Result<DateTime<Utc>, AutosaveError>;
}

/// One editing session for a `(shop, page)` pair.
///
/// Edits are applied synchronously to the in-memory store; when an edit
/// leaves unsaved changes, a save is scheduled after [`SAVE_DEBOUNCE`].
/// Scheduling a new save cancels the pending one, so only the most recent
/// attempt's outcome is ever applied. There are no retries: a failed load
/// or save is terminal until the next triggering edit.
pub struct AutosaveSession {
    shop: String,
    page_id: String,
    backend: Arc<dyn PageBackend>,
    store: Arc<Mutex<BuilderStore>>,
    status: watch::Sender<SaveStatus>,
    pending: Mutex<Option<CancellationToken>>,
    debounce: Duration,
}

impl AutosaveSession {
    pub fn new(shop: impl Into<String>, page_id: impl Into<String>, backend: Arc<dyn PageBackend>) -> Self {
        Self::with_debounce(shop, page_id, backend, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(
        shop: impl Into<String>,
        page_id: impl Into<String>,
        backend: Arc<dyn PageBackend>,
        debounce: Duration,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            shop: shop.into(),
            page_id: page_id.into(),
            backend,
            store: Arc::new(Mutex::new(BuilderStore::new())),
            status,
            pending: Mutex::new(None),
            debounce,
        }
    }

    /// Observes status transitions (idle/loading/saving/saved/error).
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Runs `f` against the store under the session lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&BuilderStore) -> R) -> R {
        let store = self.store.lock().expect("builder store lock poisoned");
        f(&store)
    }

    /// Fetches the remote document and hydrates the store. Failures are
    /// surfaced through the status channel and are not retried.
    pub async fn load(&self) {
        self.status.send_replace(SaveStatus::Loading);
        match self.backend.load(&self.shop, &self.page_id).await {
            Ok(document) => {
                let saved_at = document.updated_at.unwrap_or_else(Utc::now);
                let mut store = self.store.lock().expect("builder store lock poisoned");
                store.hydrate(document.blocks);
                store.mark_saved(saved_at);
                drop(store);
                self.status.send_replace(SaveStatus::Idle);
            }
            Err(e) => {
                warn!(shop = %self.shop, page_id = %self.page_id, error = %e, "failed to load page");
                self.status.send_replace(SaveStatus::Error(e.to_string()));
            }
        }
    }

    /// Applies a synchronous mutation and schedules a debounced save when
    /// the store reports unsaved changes.
    pub fn edit(&self, f: impl FnOnce(&mut BuilderStore)) {
        let has_changes = {
            let mut store = self.store.lock().expect("builder store lock poisoned");
            f(&mut store);
            store.has_changes()
        };
        if has_changes {
            self.schedule_save();
        }
    }

    /// Arms the single pending-save slot, cancelling any previous attempt.
    fn schedule_save(&self) {
        let token = CancellationToken::new();
        let previous = {
            let mut pending = self.pending.lock().expect("pending slot lock poisoned");
            pending.replace(token.clone())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let status = self.status.clone();
        let shop = self.shop.clone();
        let page_id = self.page_id.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let blocks = {
                let store = store.lock().expect("builder store lock poisoned");
                store.blocks().to_vec()
            };

            status.send_replace(SaveStatus::Saving);
            let result = tokio::select! {
                // A superseded in-flight save is discarded without a status
                // transition; the replacement attempt reports instead.
                _ = token.cancelled() => return,
                result = backend.save(&shop, &page_id, blocks, None) => result,
            };
            if token.is_cancelled() {
                return;
            }

            match result {
                Ok(updated_at) => {
                    store
                        .lock()
                        .expect("builder store lock poisoned")
                        .mark_saved(updated_at);
                    status.send_replace(SaveStatus::Saved);
                }
                Err(e) => {
                    warn!(shop = %shop, page_id = %page_id, error = %e, "failed to save page");
                    status.send_replace(SaveStatus::Error(e.to_string()));
                }
            }
        });
    }
}

/// HTTP implementation of [`PageBackend`] against the pages API.
#[derive(Debug, Clone)]
pub struct HttpPageBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPageBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AutosaveError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pagesmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AutosaveError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn page_url(&self, shop: &str, page_id: &str) -> String {
        format!(
            "{}/api/pages/{}?shop={}",
            self.base_url.trim_end_matches('/'),
            page_id,
            urlencoding::encode(shop),
        )
    }

    async fn read_envelope<T: for<'de> serde::Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AutosaveError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AutosaveError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AutosaveError::Serde(e.to_string()))?;
        envelope
            .data
            .ok_or_else(|| AutosaveError::Serde("response envelope carried no data".to_string()))
    }
}

#[async_trait]
impl PageBackend for HttpPageBackend {
    async fn load(&self, shop: &str, page_id: &str) -> Result<PageDocument, AutosaveError> {
        let response = self
            .http
            .get(self.page_url(shop, page_id))
            .send()
            .await
            .map_err(|e| AutosaveError::Transport(e.to_string()))?;
        Self::read_envelope(response).await
    }

    async fn save(
        &self,
        shop: &str,
        page_id: &str,
        blocks: Vec<BlockInstance>,
        metadata: Option<PageMetadata>,
    ) -> Result<DateTime<Utc>, AutosaveError> {
        let response = self
            .http
            .post(self.page_url(shop, page_id))
            .json(&SavePageRequest { blocks, metadata })
            .send()
            .await
            .map_err(|e| AutosaveError::Transport(e.to_string()))?;
        let document: PageDocument = Self::read_envelope(response).await?;
        Ok(document.updated_at.unwrap_or_else(Utc::now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use builder::schema::BlockType;

    use super::*;

    #[derive(Default)]
    struct MockBackend {
        saves: AtomicUsize,
        saved_blocks: Mutex<Vec<Vec<BlockInstance>>>,
        loaded: Mutex<Option<PageDocument>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl PageBackend for MockBackend {
        async fn load(&self, _shop: &str, _page_id: &str) -> Result<PageDocument, AutosaveError> {
            Ok(self
                .loaded
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(PageDocument::empty))
        }

        async fn save(
            &self,
            _shop: &str,
            _page_id: &str,
            blocks: Vec<BlockInstance>,
            _metadata: Option<PageMetadata>,
        ) -> Result<DateTime<Utc>, AutosaveError> {
            if self.fail_saves {
                return Err(AutosaveError::Http {
                    status: 500,
                    body: "save rejected".into(),
                });
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.saved_blocks.lock().unwrap().push(blocks);
            Ok(Utc::now())
        }
    }

    fn session(backend: Arc<MockBackend>) -> AutosaveSession {
        AutosaveSession::new("foo.myshopify.com", "landing", backend)
    }

    #[tokio::test(start_paused = true)]
    async fn edits_within_the_debounce_window_coalesce() {
        let backend = Arc::new(MockBackend::default());
        let session = session(Arc::clone(&backend));

        session.edit(|store| {
            store.add_block(BlockType::Heading, None);
        });
        // Second edit lands inside the debounce window.
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.edit(|store| {
            store.add_block(BlockType::Text, None);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
        let saved = backend.saved_blocks.lock().unwrap();
        assert_eq!(saved[0].len(), 2, "the single write reflects the second state");
        assert!(!session.with_store(|store| store.has_changes()));
    }

    #[tokio::test(start_paused = true)]
    async fn each_settled_window_writes_once() {
        let backend = Arc::new(MockBackend::default());
        let session = session(Arc::clone(&backend));

        session.edit(|store| {
            store.add_block(BlockType::Heading, None);
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.edit(|store| {
            store.add_block(BlockType::Text, None);
        });
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(backend.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_edits_schedule_no_save() {
        let backend = Arc::new(MockBackend::default());
        let session = session(Arc::clone(&backend));

        // Selection alone does not dirty the sequence.
        session.edit(|store| {
            store.select_block(Some("nope".into()));
        });
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(backend.saves.load(Ordering::SeqCst), 0);
        assert_eq!(*session.status().borrow(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn load_hydrates_and_clears_the_dirty_flag() {
        let backend = Arc::new(MockBackend::default());
        let saved_at = Utc::now();
        *backend.loaded.lock().unwrap() = Some(PageDocument {
            blocks: vec![builder::definitions::instance_with_defaults(BlockType::Button)],
            metadata: None,
            created_at: Some(saved_at),
            updated_at: Some(saved_at),
        });
        let session = session(Arc::clone(&backend));

        session.load().await;

        assert_eq!(*session.status().borrow(), SaveStatus::Idle);
        session.with_store(|store| {
            assert_eq!(store.blocks().len(), 1);
            assert!(!store.has_changes());
            assert_eq!(store.last_saved_at(), Some(saved_at));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_saves_surface_an_error_status() {
        let backend = Arc::new(MockBackend {
            fail_saves: true,
            ..MockBackend::default()
        });
        let session = session(Arc::clone(&backend));
        let status = session.status();

        session.edit(|store| {
            store.add_block(BlockType::Heading, None);
        });
        tokio::time::sleep(Duration::from_secs(3)).await;

        match &*status.borrow() {
            SaveStatus::Error(message) => assert!(message.contains("save rejected")),
            other => panic!("unexpected status: {other:?}"),
        }
        // The failed attempt is terminal: the store still reports changes.
        assert!(session.with_store(|store| store.has_changes()));
    }
}
