//! Application state for the HTTP server
//!
//! All outbound collaborators are owned here as injected trait objects with
//! process-wide lifetime, so tests can assemble a state from fakes.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{IdentityProvider, StaticTokenProvider};
use crate::chat::ChatService;
use crate::config::{AppConfig, Backend};
use crate::error::Result;
use crate::extraction::{Extractor, TextChunker};
use crate::index::Indexer;
use crate::providers::{
    CompletionClient, FsObjectStore, MemoryVectorIndex, ObjectStore, OpenAiCompatClient,
    VectorIndex,
};
use crate::quiz::QuizService;
use crate::retrieval::Retriever;
use crate::storage::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    db: Database,
    object_store: Arc<dyn ObjectStore>,
    vector_index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionClient>,
    identity: Arc<dyn IdentityProvider>,
    extractor: Extractor,
    chunker: TextChunker,
    retriever: Arc<Retriever>,
}

impl AppState {
    /// Create application state with providers selected by the configured
    /// backend, and start the background cleanup sweeper.
    pub async fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("initializing application state (backend: {:?})", config.backend);

        if let Some(parent) = config.storage.database_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::error::Error::Config(format!(
                    "failed to create data dir {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let db = Database::new(&config.storage.database_path)?;

        let (object_store, vector_index, identity): (
            Arc<dyn ObjectStore>,
            Arc<dyn VectorIndex>,
            Arc<dyn IdentityProvider>,
        ) = match config.backend {
            Backend::Local => {
                tracing::info!("using local backend (filesystem + in-memory index)");
                (
                    Arc::new(FsObjectStore::new(&config.storage)?),
                    Arc::new(MemoryVectorIndex::new()),
                    Arc::new(StaticTokenProvider::new(config.auth.static_tokens.clone())),
                )
            }
            Backend::Hosted => {
                #[cfg(feature = "gcp")]
                {
                    tracing::info!("using hosted backend (GCS + hosted vector index)");
                    (
                        Arc::new(crate::providers::GcsObjectStore::new(&config.storage).await?),
                        Arc::new(crate::providers::RestVectorIndex::new(&config.vector)?),
                        Arc::new(crate::auth::RemoteSessionProvider::new(&config.auth)?),
                    )
                }
                #[cfg(not(feature = "gcp"))]
                {
                    return Err(crate::error::Error::Config(
                        "hosted backend selected but the gcp feature is not enabled; \
                         rebuild with --features gcp"
                            .to_string(),
                    ));
                }
            }
        };

        let completion: Arc<dyn CompletionClient> =
            Arc::new(OpenAiCompatClient::new(&config.completion));
        tracing::info!("completion client ready (model: {})", completion.model());

        let state = Self::assemble(config, db, object_store, vector_index, completion, identity);
        state.spawn_cleanup_sweeper();
        Ok(state)
    }

    /// Assemble state from explicit providers (tests and embedders)
    pub fn with_providers(
        config: AppConfig,
        db: Database,
        object_store: Arc<dyn ObjectStore>,
        vector_index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionClient>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::assemble(config, db, object_store, vector_index, completion, identity)
    }

    fn assemble(
        config: AppConfig,
        db: Database,
        object_store: Arc<dyn ObjectStore>,
        vector_index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionClient>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let extractor = Extractor::new(&config.extraction);
        let chunker = TextChunker::new(&config.chunking);
        let retriever = Arc::new(Retriever::new(Arc::clone(&vector_index), config.vector.top_k));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                object_store,
                vector_index,
                completion,
                identity,
                extractor,
                chunker,
                retriever,
            }),
        }
    }

    /// Start the background task that retries deletion of orphaned vector
    /// entries left behind by failed document deletions.
    pub fn spawn_cleanup_sweeper(&self) {
        let state = self.clone();
        let interval = Duration::from_secs(self.inner.config.indexing.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = state.indexer().sweep_pending_cleanup(100).await {
                    tracing::warn!("cleanup sweeper pass failed: {}", e);
                }
            }
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner.object_store
    }

    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.inner.vector_index
    }

    pub fn completion(&self) -> &Arc<dyn CompletionClient> {
        &self.inner.completion
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }

    pub fn extractor(&self) -> &Extractor {
        &self.inner.extractor
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.inner.chunker
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.inner.retriever
    }

    /// Indexer over the configured vector index
    pub fn indexer(&self) -> Indexer {
        Indexer::new(
            Arc::clone(&self.inner.vector_index),
            self.inner.db.clone(),
            self.inner.config.indexing.worker_count(),
        )
    }

    /// Chat send flow over the configured providers
    pub fn chat_service(&self) -> ChatService {
        ChatService::new(
            self.inner.db.clone(),
            Arc::clone(&self.inner.retriever),
            Arc::clone(&self.inner.completion),
            self.inner.config.completion.max_tokens,
        )
    }

    /// Quiz generation flow over the configured providers
    pub fn quiz_service(&self) -> QuizService {
        QuizService::new(
            self.inner.db.clone(),
            Arc::clone(&self.inner.retriever),
            Arc::clone(&self.inner.completion),
            self.inner.config.completion.quiz_max_tokens,
        )
    }

    /// Lifetime of signed upload/download URLs
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.inner.config.storage.signed_url_ttl_secs)
    }
}
