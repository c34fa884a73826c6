use crate::config::AppConfig;
use crate::database::{DbPool, EntitiesContext};

pub struct AppState {
    pub config: AppConfig,
    pub pool: DbPool,
}

impl AppState {
    /// A fresh unit of work for one request, honouring the read-only switch.
    pub fn context(&self) -> EntitiesContext {
        EntitiesContext::with_pool(self.pool.clone(), self.config.read_only)
    }
}
