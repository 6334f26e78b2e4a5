use crate::db::Database;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub session_manager: SessionManager,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let session_manager = SessionManager::new(db.clone());
        Self {
            db,
            session_manager,
        }
    }
}
