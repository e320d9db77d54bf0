//! Unit-of-work scoping for index sessions.
//!
//! A [`UnitOfWork`] ends by committing (or closing) the session of
//! every configured index name. Call [`UnitOfWork::complete`] to end it
//! on the blocking pool; otherwise dropping it does the same work in
//! place, including while unwinding from a panic.

use crate::core::storage::{ConfigurationRegistry, SessionRegistry};
use std::sync::Arc;

/// What happens to sessions when the unit of work ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeEnd {
    /// Publish pending writes, keep sessions open
    #[default]
    Commit,
    /// Publish pending writes and release writers
    Close,
}

pub struct UnitOfWork {
    sessions: Arc<SessionRegistry>,
    configurations: Arc<ConfigurationRegistry>,
    end: ScopeEnd,
    finished: bool,
}

impl UnitOfWork {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        configurations: Arc<ConfigurationRegistry>,
        end: ScopeEnd,
    ) -> Self {
        Self {
            sessions,
            configurations,
            end,
            finished: false,
        }
    }

    pub fn end(&self) -> ScopeEnd {
        self.end
    }

    /// End the unit of work off the async executor
    pub async fn complete(mut self) {
        self.finished = true;
        let sessions = Arc::clone(&self.sessions);
        let configurations = Arc::clone(&self.configurations);
        let end = self.end;

        let outcome =
            tokio::task::spawn_blocking(move || finish(&sessions, &configurations, end)).await;
        if let Err(e) = outcome {
            tracing::error!("Unit of work cleanup failed: {}", e);
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            finish(&self.sessions, &self.configurations, self.end);
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("end", &self.end)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Commit or close every configured index, logging failures
fn finish(sessions: &SessionRegistry, configurations: &ConfigurationRegistry, end: ScopeEnd) {
    for name in configurations.index_names() {
        let result = match end {
            ScopeEnd::Commit => sessions.commit(&name),
            ScopeEnd::Close => sessions.close_session(&name),
        };

        if let Err(e) = result {
            tracing::error!("Failed to end session on '{}': {}", name, e);
        }
    }
}
