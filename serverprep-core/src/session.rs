use crate::{
    ErrorKind, Interrupt, ParameterSet, Result, Results, SQLSTATE_INTERRUPTED, SessionOptions,
    SqlError, StatementHandle,
};
use std::future::Future;

/// Wire level collaborator of the statement engine.
///
/// Implementations own the connection to the server and perform the actual round
/// trips. The engine calls them only while holding the connection lock, so they never
/// see two commands in flight.
pub trait ProtocolSession: Send {
    fn options(&self) -> &SessionOptions;

    /// Allocate a prepared statement on the server.
    fn prepare(
        &mut self,
        sql: &str,
        route_to_master: bool,
    ) -> impl Future<Output = Result<StatementHandle>> + Send;

    /// Execute the handle once with `parameters`, feeding the answers into `results`.
    fn execute_prepared(
        &mut self,
        route_to_master: bool,
        handle: &mut StatementHandle,
        results: &mut Results,
        parameters: &ParameterSet,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Send a whole batch in one round trip.
    ///
    /// Returns `false` when the batch cannot go through this path (for example because
    /// of long data or server capabilities) and nothing was sent.
    fn execute_batch(
        &mut self,
        route_to_master: bool,
        handle: &mut StatementHandle,
        results: &mut Results,
        sql: &str,
        parameters: &[ParameterSet],
        has_long_data: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Deallocate the handle on the server.
    fn release_prepared(
        &mut self,
        handle: &StatementHandle,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Called before every execution, the session applies per statement settings.
    fn prolog(&mut self, max_rows: u64) -> impl Future<Output = Result<()>> + Send {
        let _ = max_rows;
        async { Ok(()) }
    }

    /// Read and drop the results still pending on the wire.
    fn skip_more_results(
        &mut self,
        results: &mut Results,
    ) -> impl Future<Output = Result<()>> + Send {
        results.set_has_more_results(false);
        async { Ok(()) }
    }

    /// Bring the session back to a neutral state once a statement closed.
    fn reset(&mut self) {}

    /// Signal used to interrupt the command in flight.
    fn interrupt(&self) -> &Interrupt;

    fn is_interrupted(&self) -> bool {
        self.interrupt().is_triggered()
    }

    fn stop_if_interrupted(&self) -> Result<()> {
        if self.is_interrupted() {
            return Err(SqlError::new(ErrorKind::Interrupted, "Command was interrupted")
                .with_sql_state(SQLSTATE_INTERRUPTED)
                .into());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool;

    fn is_master_connection(&self) -> bool {
        true
    }

    fn auto_increment_increment(&self) -> i64 {
        1
    }

    fn server_thread_id(&self) -> i64 {
        -1
    }
}
