use std::sync::Arc;

use sqlx::AnyPool;

use crate::config::AppConfig;
use crate::db;
use crate::generator::RecipeGenerator;
use crate::premium::checkout::{provider_from_config, CheckoutProvider};

#[derive(Clone)]
pub struct AppState {
    pub db: AnyPool,
    pub config: Arc<AppConfig>,
    pub generator: Arc<RecipeGenerator>,
    pub checkout: Arc<dyn CheckoutProvider>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database).await?;
        let generator = Arc::new(RecipeGenerator::from_config(&config.openai)?);
        let checkout = provider_from_config(&config.payments)?;

        Ok(Self {
            db,
            config: Arc::new(config),
            generator,
            checkout,
        })
    }

    pub fn from_parts(
        db: AnyPool,
        config: Arc<AppConfig>,
        generator: Arc<RecipeGenerator>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> Self {
        Self {
            db,
            config,
            generator,
            checkout,
        }
    }
}
