//! Shared application state.

use std::sync::Arc;

use hearth_auth::AuthService;
use hearth_db::SurrealAccountRepository;
use surrealdb::engine::any::Any;

use crate::notify::OutboxNotifier;

pub type AccountStore = SurrealAccountRepository<Any>;
pub type Auth = AuthService<AccountStore, OutboxNotifier>;

/// State handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
}

impl AppState {
    pub fn new(auth: Auth) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}
