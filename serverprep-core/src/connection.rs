use crate::{ProtocolSession, Result, ServerPreparedStatement, StatementOptions};
use std::{
    fmt::{self, Debug},
    sync::Arc,
};
use tokio::sync::{Mutex, MutexGuard};

/// Receives statement events of a pooled connection.
pub trait StatementEventListener: Send + Sync {
    fn statement_closed(&self, sql: &str);
}

/// A connection shared by any number of statements.
///
/// The protocol session sits behind a single mutex: every wire round trip of every
/// statement holds it for its whole duration.
pub struct Connection<S: ProtocolSession> {
    session: Mutex<S>,
    listener: Option<Arc<dyn StatementEventListener>>,
}

impl<S: ProtocolSession> Connection<S> {
    pub fn new(session: S) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(session),
            listener: None,
        })
    }

    /// Connection owned by a pool that wants to hear about statements closing.
    pub fn pooled(session: S, listener: Arc<dyn StatementEventListener>) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(session),
            listener: Some(listener),
        })
    }

    /// Exclusive access to the session, released when the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, S> {
        self.session.lock().await
    }

    pub fn listener(&self) -> Option<&Arc<dyn StatementEventListener>> {
        self.listener.as_ref()
    }

    pub async fn prepare_statement(
        self: &Arc<Self>,
        sql: impl Into<String>,
    ) -> Result<ServerPreparedStatement<S>> {
        self.prepare_statement_with(sql, Default::default()).await
    }

    pub async fn prepare_statement_with(
        self: &Arc<Self>,
        sql: impl Into<String>,
        options: StatementOptions,
    ) -> Result<ServerPreparedStatement<S>> {
        ServerPreparedStatement::new(self.clone(), sql, options).await
    }
}

impl<S: ProtocolSession> Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("pooled", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
