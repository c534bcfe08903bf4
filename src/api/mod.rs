//! HTTP API server for larder

mod auth;
pub mod error;
pub mod health;
mod inventory;
pub mod kitchens;
pub mod rate_limit;
mod shopping;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use auth::SessionToken;
pub use error::ApiError;

use crate::Result;
use crate::db::{DbPool, InventoryRepo, KitchenRepo, ShoppingRepo, UserRepo};
use crate::store::KitchenStore;
use crate::voice::{SpeechToText, TextToSpeech};
use rate_limit::SharedLimiter;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub users: UserRepo,
    pub kitchens: KitchenRepo,
    pub inventory: InventoryRepo,
    pub shopping: ShoppingRepo,
    /// Speech-to-text provider, when an API key is configured
    pub stt: Option<SpeechToText>,
    /// Text-to-speech provider, when an API key is configured
    pub tts: Option<TextToSpeech>,
    pub voice_enabled: bool,
    pub rate_limiter: Option<SharedLimiter>,
}

impl ApiState {
    /// Inventory and shopping list of one kitchen
    #[must_use]
    pub fn store(&self, kitchen_id: &str) -> KitchenStore {
        KitchenStore::new(&self.db, kitchen_id)
    }
}

/// Builder for [`ApiServer`]
pub struct ApiServerBuilder {
    db: DbPool,
    port: u16,
    static_dir: Option<PathBuf>,
    stt: Option<SpeechToText>,
    tts: Option<TextToSpeech>,
    voice_enabled: bool,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    #[must_use]
    pub const fn new(db: DbPool) -> Self {
        Self {
            db,
            port: crate::config::DEFAULT_PORT,
            static_dir: None,
            stt: None,
            tts: None,
            voice_enabled: true,
            rate_limit_rpm: None,
        }
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serve a frontend bundle, falling back to its `index.html`
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Configure voice providers
    #[must_use]
    pub fn voice(
        mut self,
        enabled: bool,
        stt: Option<SpeechToText>,
        tts: Option<TextToSpeech>,
    ) -> Self {
        self.voice_enabled = enabled;
        self.stt = stt;
        self.tts = tts;
        self
    }

    /// Limit requests per minute across all clients
    #[must_use]
    pub const fn rate_limit(mut self, requests_per_minute: Option<u32>) -> Self {
        self.rate_limit_rpm = requests_per_minute;
        self
    }

    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_rpm.map(rate_limit::create_limiter);
        let (stt, tts) = if self.voice_enabled {
            (self.stt, self.tts)
        } else {
            (None, None)
        };

        let state = Arc::new(ApiState {
            users: UserRepo::new(self.db.clone()),
            kitchens: KitchenRepo::new(self.db.clone()),
            inventory: InventoryRepo::new(self.db.clone()),
            shopping: ShoppingRepo::new(self.db.clone()),
            db: self.db,
            stt,
            tts,
            voice_enabled: self.voice_enabled,
            rate_limiter,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/auth", auth::router(self.state.clone()))
            .nest("/api/kitchens", kitchens::router(self.state.clone()))
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            voice = self.state.voice_enabled,
            stt = self.state.stt.is_some(),
            tts = self.state.tts.is_some(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
