use std::sync::Arc;

use catalog::{ApiError, CancelToken, foods::SearchResults, remote::NutritionApi};
use tracing::{info, warn};

use crate::{
    auth::{AuthContext, FirebaseIdentity},
    config::Config,
    error::AppError,
    search::SearchInvoker,
};

pub type Auth = AuthContext<FirebaseIdentity>;

pub struct State {
    pub config: Config,
    pub api: Arc<NutritionApi>,
    pub auth: Arc<Auth>,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, AppError> {
        info!("Connecting to backend at {}", config.api.base_url);
        let api = Arc::new(NutritionApi::new(&config.api)?);

        let identity = FirebaseIdentity::new(config.firebase_api_key.clone(), config.api.timeout)?;
        if !identity.is_configured() {
            warn!("FIREBASE_API_KEY not set, sign in is disabled");
        }
        let auth = Arc::new(AuthContext::new(identity, Arc::clone(&api)));

        Ok(Arc::new(Self { config, api, auth }))
    }

    pub fn food_search(&self) -> FoodSearch {
        FoodSearch {
            api: Arc::clone(&self.api),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Backend food search, signed when a user is logged in.
pub struct FoodSearch {
    api: Arc<NutritionApi>,
    auth: Arc<Auth>,
}

impl SearchInvoker for FoodSearch {
    type Output = SearchResults;

    async fn search(
        &self,
        query: String,
        cancel: CancelToken,
    ) -> Result<SearchResults, ApiError> {
        let bearer = self.auth.id_token().await.unwrap_or_else(|e| {
            warn!("Searching without credentials: {e}");
            None
        });

        self.api
            .search_foods(&query, bearer.as_deref(), &cancel)
            .await
    }
}
