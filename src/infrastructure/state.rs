use std::sync::Arc;

use crate::infrastructure::{auth::JwtKeys, config::Config, repository::VocabularyRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repository: Arc<dyn VocabularyRepository>,
    pub jwt_keys: JwtKeys,
}

impl AppState {
    pub fn new(config: Arc<Config>, repository: Arc<dyn VocabularyRepository>) -> Self {
        let jwt_keys = JwtKeys::new(&config.auth.jwt_secret);
        Self {
            config,
            repository,
            jwt_keys,
        }
    }
}
