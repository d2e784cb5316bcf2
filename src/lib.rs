pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod describe;
pub mod images;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::auth::{TokenError, TokenService};
use crate::describe::{DescriptionGenerator, GeminiClient};
use crate::images::{CloudinaryStore, ImageStore};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub images: Arc<dyn ImageStore>,
    pub describer: DescriptionGenerator,
}

impl AppState {
    /// Build state with the production image store and text generator.
    pub fn new(config: Config, db: DbPool) -> Result<Self, TokenError> {
        let tokens = TokenService::from_config(&config.auth)?;
        let images: Arc<dyn ImageStore> = Arc::new(CloudinaryStore::new(&config.images));
        let describer = match GeminiClient::from_config(&config.ai) {
            Some(client) => DescriptionGenerator::new(Arc::new(client)),
            None => DescriptionGenerator::fallback_only(),
        };

        Ok(Self {
            config,
            db,
            tokens,
            images,
            describer,
        })
    }

    /// Swap the image store (tests use an in-process fake)
    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = images;
        self
    }

    pub fn with_describer(mut self, describer: DescriptionGenerator) -> Self {
        self.describer = describer;
        self
    }
}
