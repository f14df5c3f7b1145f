use crate::{
    AsValue, BatchQueue, Bindings, Connection, Error, ErrorKind, ExceptionTranslator,
    ExecutionContext, Interrupt, ParameterMetaData, ParameterSet, Prepared, ProtocolSession,
    Result, ResultSet, ResultSetMetaData, Results, SQLSTATE_CONNECTION_FAILURE,
    SQLSTATE_FEATURE_NOT_SUPPORTED, SQLSTATE_INTERRUPTED, SQLSTATE_INVALID_PARAMETER_INDEX,
    SqlError, StatementHandle, StatementOptions, Value, best_effort, truncate_long,
};
use futures::future::{Either, select};
use std::{
    fmt::{self, Display},
    future::Future,
    pin::pin,
    sync::Arc,
    time::Duration,
};

/// Statement prepared on the server, executed through the binary protocol.
///
/// Parameters are bound by 0-based position, rows are accumulated with
/// [`ServerPreparedStatement::add_batch`] and sent with
/// [`ServerPreparedStatement::execute_batch`]. Every round trip holds the lock of the
/// owning [`Connection`].
pub struct ServerPreparedStatement<S: ProtocolSession> {
    connection: Arc<Connection<S>>,
    sql: String,
    must_execute_on_master: bool,
    handle: Option<StatementHandle>,
    metadata: Option<ResultSetMetaData>,
    parameter_metadata: Option<ParameterMetaData>,
    parameter_count: usize,
    bindings: Bindings,
    index: u64,
    batch: BatchQueue,
    context: ExecutionContext,
    results: Option<Results>,
    translator: ExceptionTranslator,
}

impl<S: ProtocolSession> ServerPreparedStatement<S> {
    /// Prepare `sql` on the server.
    ///
    /// When the server refuses the statement it is closed locally and a
    /// [`ErrorKind::Prepare`] error is returned.
    pub async fn new(
        connection: Arc<Connection<S>>,
        sql: impl Into<String>,
        options: StatementOptions,
    ) -> Result<Self> {
        let sql = sql.into();
        let shared = connection.clone();
        let mut session = shared.lock().await;
        let mut statement = Self::unprepared(connection, sql, options, &*session);
        statement.prepare(&mut *session).await?;
        Ok(statement)
    }

    fn unprepared(
        connection: Arc<Connection<S>>,
        sql: String,
        options: StatementOptions,
        session: &S,
    ) -> Self {
        Self {
            connection,
            sql,
            must_execute_on_master: session.is_master_connection(),
            handle: None,
            metadata: None,
            parameter_metadata: None,
            parameter_count: 0,
            bindings: Bindings::new(),
            index: 0,
            batch: BatchQueue::new(),
            context: ExecutionContext::new(options),
            results: None,
            translator: ExceptionTranslator::new(
                session.server_thread_id(),
                session.options().dump_queries_on_exception,
            ),
        }
    }

    async fn prepare(&mut self, session: &mut S) -> Result<()> {
        match session
            .prepare(&self.sql, self.must_execute_on_master)
            .await
        {
            Ok(handle) => {
                log::debug!(
                    "Prepared statement {} with {} parameters: {}",
                    handle.statement_id,
                    handle.parameter_count(),
                    truncate_long!(self.sql)
                );
                self.parameter_count = handle.parameter_count();
                self.metadata = Some(ResultSetMetaData::new(handle.columns.clone()));
                self.parameter_metadata = Some(ParameterMetaData::new(handle.parameters.clone()));
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.close_locked(session).await;
                let error = self
                    .translator
                    .translate(ErrorKind::Prepare, e, Some(self.sql.as_str()), None);
                log::error!("{:#}", error);
                Err(error.into())
            }
        }
    }

    /// Independent copy of this statement prepared again on `connection`.
    ///
    /// Keeps the result set type, concurrency, generated keys and routing
    /// configuration, starts without bindings or batch rows.
    pub async fn clone_with(&self, connection: Arc<Connection<S>>) -> Result<Self> {
        let shared = connection.clone();
        let mut session = shared.lock().await;
        let options = StatementOptions {
            result_set_type: self.context.options.result_set_type,
            concurrency: self.context.options.concurrency,
            auto_generated_keys: self.context.options.auto_generated_keys,
            ..Default::default()
        };
        let mut clone = Self::unprepared(connection, self.sql.clone(), options, &*session);
        clone.must_execute_on_master = self.must_execute_on_master;
        clone.metadata = self.metadata.clone();
        clone.parameter_metadata = self.parameter_metadata.clone();
        if let Err(e) = clone.prepare(&mut *session).await {
            let error = SqlError::new(ErrorKind::Clone, "PreparedStatement could not be cloned")
                .with_cause(e);
            log::error!("{:#}", error);
            return Err(error.into());
        }
        Ok(clone)
    }

    fn check_closed(&self) -> Result<()> {
        if self.context.is_closed() {
            return Err(self
                .translator
                .create(
                    ErrorKind::Closed,
                    "Cannot do an operation on a closed statement",
                    None,
                )
                .into());
        }
        Ok(())
    }

    /// Bind `value` at the 0-based `position`, replacing the previous value.
    pub fn set_parameter(&mut self, position: usize, value: Value) -> Result<()> {
        self.check_closed()?;
        if position >= self.parameter_count {
            return Err(self.invalid_index(position.saturating_add(1), &value));
        }
        self.bindings.set(position, value);
        Ok(())
    }

    fn invalid_index(&self, position: impl Display, value: &Value) -> Error {
        let error = self.translator.create(
            ErrorKind::InvalidParameterIndex,
            format!(
                "Could not set parameter at position {} (value was {}), the query has {} parameters",
                position, value, self.parameter_count
            ),
            Some(SQLSTATE_INVALID_PARAMETER_INDEX),
        );
        log::error!("{:#}", error);
        error.into()
    }

    pub fn set_null(&mut self, position: usize) -> Result<()> {
        self.set_parameter(position, Value::Null)
    }

    pub fn clear_parameters(&mut self) {
        self.bindings.clear();
        self.index = 0;
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Queue the current bindings as a batch row.
    ///
    /// The bindings are left in place, so the next row only needs to rebind what
    /// changes.
    pub fn add_batch(&mut self) -> Result<()> {
        self.bindings
            .validate(self.parameter_count, &self.translator)?;
        self.batch
            .push(self.bindings.snapshot(self.parameter_count));
        Ok(())
    }

    /// Raw SQL cannot join the batch of a prepared statement, this always fails.
    pub fn add_batch_sql(&mut self, sql: &str) -> Result<()> {
        let error = self.translator.create(
            ErrorKind::Unsupported,
            format!(
                "Cannot do addBatch(String) on a prepared statement: {}",
                truncate_long!(sql)
            ),
            Some(SQLSTATE_FEATURE_NOT_SUPPORTED),
        );
        log::error!("{:#}", error);
        Err(error.into())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    pub fn batch(&self) -> &BatchQueue {
        &self.batch
    }

    /// Execute every queued row, returning one update count per row.
    ///
    /// Counts beyond `i32::MAX` are clamped, see
    /// [`ServerPreparedStatement::execute_large_batch`]. An empty queue returns
    /// immediately without reaching the server.
    pub async fn execute_batch(&mut self) -> Result<Vec<i32>> {
        self.check_closed()?;
        if self.batch.is_empty() {
            return Ok(Vec::new());
        }
        self.execute_batch_internal().await?;
        Ok(self
            .results
            .as_ref()
            .map(Results::update_counts)
            .unwrap_or_default())
    }

    pub async fn execute_large_batch(&mut self) -> Result<Vec<i64>> {
        self.check_closed()?;
        if self.batch.is_empty() {
            return Ok(Vec::new());
        }
        self.execute_batch_internal().await?;
        Ok(self
            .results
            .as_ref()
            .map(Results::large_update_counts)
            .unwrap_or_default())
    }

    async fn execute_batch_internal(&mut self) -> Result<()> {
        let size = self.batch.len();
        let connection = self.connection.clone();
        let mut session = connection.lock().await;
        match self.dispatch_batch(&mut *session, size).await {
            Ok(()) => {
                self.context.end_execution(session.interrupt());
                Ok(())
            }
            Err(e) => Err(self.batch_exception_epilogue(&*session, e, size)),
        }
    }

    async fn dispatch_batch(&mut self, session: &mut S, size: usize) -> Result<()> {
        self.execute_prologue(session).await?;
        let results = self.results.insert(Results::batch(
            &self.context.options,
            size,
            session.auto_increment_increment(),
        ));
        self.context.arm_timer(session.interrupt());
        let Some(handle) = self.handle.as_mut() else {
            return Err(not_prepared(&self.translator));
        };
        let route = self.must_execute_on_master;

        if session.options().supports_batch_fast_path()
            && session
                .execute_batch(
                    route,
                    handle,
                    results,
                    &self.sql,
                    self.batch.as_slice(),
                    self.batch.has_long_data(),
                )
                .await?
        {
            results.command_end();
            log::debug!("Batch of {} rows sent in one round trip", size);
            return Ok(());
        }

        let continue_on_error = session.options().continue_batch_on_error;
        let check_interrupt = self.context.is_timer_armed();
        let mut first_error: Option<Error> = None;
        for (i, row) in self.batch.iter().enumerate() {
            if let Err(e) = execute_row(session, route, handle, results, row, check_interrupt).await
            {
                results.add_stats_error();
                if !continue_on_error || !session.is_connected() || session.is_interrupted() {
                    return Err(e);
                }
                log::debug!("Batch row {} failed, continuing: {:#}", i + 1, e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        results.command_end();
        Ok(())
    }

    async fn execute_prologue(&mut self, session: &mut S) -> Result<()> {
        self.context.set_executing();
        self.check_closed()?;
        session.prolog(self.context.options.max_rows).await
    }

    /// Execute once with the current bindings.
    ///
    /// Returns `true` when the first result is a result set.
    pub async fn execute(&mut self) -> Result<bool> {
        self.execute_internal(self.context.options.fetch_size).await
    }

    pub async fn execute_internal(&mut self, fetch_size: u32) -> Result<bool> {
        self.check_closed()?;
        self.bindings
            .validate(self.parameter_count, &self.translator)?;
        let connection = self.connection.clone();
        let mut session = connection.lock().await;
        match self.execute_locked(&mut *session, fetch_size).await {
            Ok(has_result_set) => {
                self.context.end_execution(session.interrupt());
                Ok(has_result_set)
            }
            Err(e) => Err(self.execute_exception_epilogue(&*session, e)),
        }
    }

    async fn execute_locked(&mut self, session: &mut S, fetch_size: u32) -> Result<bool> {
        self.execute_prologue(session).await?;
        let parameters = self.bindings.snapshot(self.parameter_count);
        let results = self.results.insert(Results::single(
            &self.context.options,
            fetch_size,
            session.auto_increment_increment(),
            self.sql.clone(),
            parameters.clone(),
        ));
        self.context.arm_timer(session.interrupt());
        let Some(handle) = self.handle.as_mut() else {
            return Err(not_prepared(&self.translator));
        };
        let race = self.context.is_timer_armed();
        handle.reset_parameter_type_header();
        let interrupt = session.interrupt().clone();
        let command =
            session.execute_prepared(self.must_execute_on_master, handle, results, &parameters);
        if race {
            with_interrupt(&interrupt, command).await?;
        } else {
            command.await?;
        }
        results.command_end();
        Ok(results.result_set().is_some())
    }

    /// Execute and hand over the first result set, empty when the statement
    /// produced none.
    pub async fn execute_query(&mut self) -> Result<ResultSet> {
        if !self.execute().await? {
            return Ok(ResultSet::empty());
        }
        Ok(self
            .results
            .as_mut()
            .and_then(Results::release_result_set)
            .unwrap_or_default())
    }

    /// Execute and return the update count, -1 when the statement produced a result
    /// set.
    pub async fn execute_update(&mut self) -> Result<i64> {
        self.execute().await?;
        Ok(self.results.as_ref().map_or(-1, Results::update_count))
    }

    fn execute_exception_epilogue(&mut self, session: &S, error: Error) -> Error {
        if SqlError::find(&error).is_some_and(|e| e.kind == ErrorKind::Closed) {
            self.context.end_execution(session.interrupt());
            return error;
        }
        let query = self.to_string();
        let (kind, fallback_state) = if self.context.timed_out() || session.is_interrupted() {
            (ErrorKind::Timeout, Some(SQLSTATE_INTERRUPTED))
        } else if !session.is_connected() {
            (ErrorKind::Connection, Some(SQLSTATE_CONNECTION_FAILURE))
        } else {
            (ErrorKind::Execute, None)
        };
        let translated = self
            .translator
            .translate(kind, error, Some(query.as_str()), fallback_state);
        self.context.end_execution(session.interrupt());
        log::error!("{:#}", translated);
        translated.into()
    }

    fn batch_exception_epilogue(&mut self, session: &S, error: Error, size: usize) -> Error {
        let counts = self
            .results
            .as_ref()
            .map(Results::large_update_counts)
            .unwrap_or_default();
        let (kind, fallback_state) = if self.context.timed_out() || session.is_interrupted() {
            (ErrorKind::Timeout, Some(SQLSTATE_INTERRUPTED))
        } else if !session.is_connected() {
            (ErrorKind::Connection, Some(SQLSTATE_CONNECTION_FAILURE))
        } else {
            (ErrorKind::Batch, None)
        };
        let mut translated = self
            .translator
            .translate(kind, error, Some(self.sql.as_str()), fallback_state);
        translated.message = format!(
            "{} (batch of {} rows, {} executed)",
            translated.message,
            size,
            counts.len()
        );
        translated.update_counts = Some(counts);
        self.context.end_execution(session.interrupt());
        log::error!("{:#}", translated);
        translated.into()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn options(&self) -> &StatementOptions {
        &self.context.options
    }

    pub fn set_fetch_size(&mut self, fetch_size: u32) {
        self.context.options.fetch_size = fetch_size;
    }

    /// A zero duration disables the timeout.
    ///
    /// Executions with a timeout must run inside a Tokio runtime, the timer is a spawned
    /// task.
    pub fn set_query_timeout(&mut self, timeout: Duration) {
        self.context.options.query_timeout = (!timeout.is_zero()).then_some(timeout);
    }

    pub fn set_max_rows(&mut self, max_rows: u64) {
        self.context.options.max_rows = max_rows;
    }

    pub fn metadata(&self) -> Option<&ResultSetMetaData> {
        self.metadata.as_ref()
    }

    pub fn parameter_metadata(&self) -> Option<&ParameterMetaData> {
        self.parameter_metadata.as_ref()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Thread id of the server connection that prepared the statement, -1 when unknown.
    pub fn server_thread_id(&self) -> i64 {
        self.handle.as_ref().map_or(-1, |h| h.server_thread_id)
    }

    /// Outcome of the last execution.
    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    pub fn results_mut(&mut self) -> Option<&mut Results> {
        self.results.as_mut()
    }

    pub fn generated_keys(&self) -> Vec<i64> {
        self.results
            .as_ref()
            .map(Results::generated_keys)
            .unwrap_or_default()
    }

    pub fn is_executing(&self) -> bool {
        self.context.is_executing()
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_closed()
    }

    /// Release the statement. Never fails and does nothing the second time.
    pub async fn close(&mut self) {
        if self.context.is_closed() {
            return;
        }
        let connection = self.connection.clone();
        let mut session = connection.lock().await;
        self.close_locked(&mut *session).await;
    }

    async fn close_locked(&mut self, session: &mut S) {
        if self.context.is_closed() {
            return;
        }
        self.context.mark_closed();
        if let Some(results) = self.results.as_mut() {
            if results.fetch_size() != 0 && results.has_more_results() {
                best_effort(
                    "skipping the pending results",
                    session.skip_more_results(results),
                )
                .await;
            }
            results.close();
        }
        if let Some(handle) = self.handle.take() {
            best_effort(
                "releasing the prepared statement",
                session.release_prepared(&handle),
            )
            .await;
        }
        session.reset();
        if let Some(listener) = self.connection.listener() {
            listener.statement_closed(&self.sql);
        }
        log::debug!("Closed prepared statement: {}", truncate_long!(self.sql));
    }
}

async fn execute_row<S: ProtocolSession>(
    session: &mut S,
    route: bool,
    handle: &mut StatementHandle,
    results: &mut Results,
    row: &ParameterSet,
    check_interrupt: bool,
) -> Result<()> {
    if check_interrupt {
        session.stop_if_interrupted()?;
    }
    handle.reset_parameter_type_header();
    let interrupt = session.interrupt().clone();
    let command = session.execute_prepared(route, handle, results, row);
    if check_interrupt {
        with_interrupt(&interrupt, command).await
    } else {
        command.await
    }
}

/// Drive `command` until it completes or `interrupt` is triggered.
async fn with_interrupt<T>(
    interrupt: &Interrupt,
    command: impl Future<Output = Result<T>>,
) -> Result<T> {
    match select(pin!(command), pin!(interrupt.triggered())).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(SqlError::new(
            ErrorKind::Timeout,
            "Query execution was interrupted",
        )
        .with_sql_state(SQLSTATE_INTERRUPTED)
        .into()),
    }
}

fn not_prepared(translator: &ExceptionTranslator) -> Error {
    translator
        .create(ErrorKind::Closed, "Statement is not prepared", None)
        .into()
}

impl<S: ProtocolSession> Prepared for ServerPreparedStatement<S> {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.clear_parameters();
        Ok(self)
    }
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        self.bind_index(value, self.index)
    }
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        let value = value.as_value();
        let Ok(position) = usize::try_from(index) else {
            return Err(self.invalid_index(index.saturating_add(1), &value));
        };
        self.set_parameter(position, value)?;
        self.index = index + 1;
        Ok(self)
    }
}

impl<S: ProtocolSession> Display for ServerPreparedStatement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sql : '{}'", self.sql)?;
        if self.parameter_count > 0 {
            write!(
                f,
                ", parameters : {}",
                self.bindings.snapshot(self.parameter_count)
            )?;
        }
        Ok(())
    }
}

impl<S: ProtocolSession> fmt::Debug for ServerPreparedStatement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPreparedStatement")
            .field("sql", &self.sql)
            .field("parameter_count", &self.parameter_count)
            .field("batch", &self.batch.len())
            .field("closed", &self.context.is_closed())
            .finish_non_exhaustive()
    }
}
