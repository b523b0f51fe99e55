use sea_orm::DatabaseConnection;

use crate::session::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, tokens: TokenKeys) -> Self {
        Self { orm, tokens }
    }
}
