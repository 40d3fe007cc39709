mod assistant;
mod config;
mod error;
mod format;
mod model;
mod store;
mod types;
mod web;

use std::sync::{Arc, Mutex, MutexGuard};

use actix_files as fs;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context;
use log::{error, info};
use tera::Tera;

use assistant::Assistant;
use config::Config;
use error::ApiError;
use model::GeminiModel;
use store::ChatStore;
use web::routes;

// App state structure
pub struct AppState {
    tera: Tera,
    assistant: Assistant,
    store: Mutex<ChatStore>,
}

impl AppState {
    pub fn new(tera: Tera, assistant: Assistant, store: ChatStore) -> Self {
        Self {
            tera,
            assistant,
            store: Mutex::new(store),
        }
    }

    /// Store access for handlers; a poisoned lock becomes a 500.
    pub fn lock_store(&self) -> Result<MutexGuard<'_, ChatStore>, ApiError> {
        self.store.lock().map_err(|e| {
            error!("Failed to lock chat store: {}", e);
            ApiError::Internal("Erro interno do servidor".to_string())
        })
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting study assistant");

    let config = Config::from_env()?;

    let model = Arc::new(GeminiModel::from_config(&config));

    // Initialize template engine
    let mut tera = Tera::new(&format!("{}/**/*", config.template_dir))
        .with_context(|| format!("failed to parse templates in {}", config.template_dir))?;
    tera.autoescape_on(vec![".html"]);

    let store = ChatStore::open(config.store_path.as_deref())
        .context("failed to open chat store")?;

    if !store.is_available() {
        info!("Running without session persistence");
    }

    let app_state = Data::new(AppState::new(tera, Assistant::new(model), store));

    let static_dir = config.static_dir.clone();
    info!("Listening on {}:{}", config.bind_address, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/static", static_dir.clone()))
    })
    .bind((config.bind_address.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.bind_address, config.port))?
    .run()
    .await
    .context("server error")
}
