//! Process-wide application state shared by every HTTP request.
//!
//! Holds the single SQLite connection behind a `Mutex` and the recipe
//! synthesizer, which is stateless and shared through an `Arc`.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::pipeline::synthesis::{
    CompletionError, HfChatClient, HfImageClient, ImageError, ImageSynthesis, RecipeSynthesizer,
    SynthesisSettings,
};

pub struct CoreState {
    db: Mutex<Connection>,
    synthesizer: Arc<RecipeSynthesizer>,
    /// Base for share links. `None` derives it from the request's Host.
    public_base_url: Option<String>,
}

impl CoreState {
    pub fn new(
        conn: Connection,
        synthesizer: Arc<RecipeSynthesizer>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            db: Mutex::new(conn),
            synthesizer,
            public_base_url,
        }
    }

    /// Open the configured database and build the live service clients.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.database_path)?;

        let completion = HfChatClient::new(
            &config.text_endpoint,
            &config.hf_token,
            config.request_timeout_secs,
        )?
        .with_streaming(config.stream_completion);

        let images: Option<Arc<dyn ImageSynthesis>> = if config.images_enabled {
            Some(Arc::new(HfImageClient::new(
                &config.image_endpoint,
                &config.hf_token,
                config.request_timeout_secs,
            )?))
        } else {
            None
        };

        let synthesizer = RecipeSynthesizer::new(
            Arc::new(completion),
            images,
            SynthesisSettings {
                model: config.text_model.clone(),
                max_tokens: config.max_tokens,
                min_ingredients: config.min_ingredients,
            },
        );

        Ok(Self::new(
            conn,
            Arc::new(synthesizer),
            config.public_base_url.clone(),
        ))
    }

    /// Borrow the database connection. Hold the guard only for synchronous
    /// work; never across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn synthesizer(&self) -> &RecipeSynthesizer {
        &self.synthesizer
    }

    /// Public link for a shared recipe. `request_host` is the Host header
    /// of the current request, used when no base URL is configured.
    pub fn share_url(&self, share_id: &Uuid, request_host: Option<&str>) -> String {
        let base = match (&self.public_base_url, request_host) {
            (Some(base), _) => base.clone(),
            (None, Some(host)) => format!("http://{host}"),
            (None, None) => "http://localhost".to_string(),
        };
        format!("{base}/api/shared/{share_id}")
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Text client setup failed: {0}")]
    TextClient(#[from] CompletionError),
    #[error("Image client setup failed: {0}")]
    ImageClient(#[from] ImageError),
}
