use std::sync::Arc;

use skillmatch_db::Database;
use skillmatch_gateway::dispatcher::Dispatcher;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
}

pub type AppState = Arc<AppStateInner>;
