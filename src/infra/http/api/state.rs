use std::sync::Arc;

use crate::application::queries::BlogQueries;
use crate::infra::db::PostgresProvider;

#[derive(Clone)]
pub struct ApiState {
    pub queries: BlogQueries,
    pub db: Option<Arc<PostgresProvider>>,
}

impl ApiState {
    pub fn new(queries: BlogQueries) -> Self {
        Self { queries, db: None }
    }

    pub fn with_database(mut self, db: Arc<PostgresProvider>) -> Self {
        self.db = Some(db);
        self
    }
}
