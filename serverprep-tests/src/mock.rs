use serverprep_core::{
    ColumnDefinition, ColumnType, ErrorKind, Interrupt, ParameterSet, ProtocolSession, Result,
    ResultSet, Results, SessionOptions, SqlError, StatementEventListener, StatementHandle, Value,
};
use std::{
    future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Round trip observed by a [`MockSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prepare(String),
    Prolog(u64),
    Execute(u32, Vec<Value>),
    Batch(u32, usize),
    Release(u32),
    SkipMoreResults,
    Reset,
}

/// Scripted behaviour and recorded calls of a [`MockSession`].
#[derive(Debug)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub connected: bool,
    pub master: bool,
    pub thread_id: i64,
    /// Accept batches in one round trip.
    pub bulk: bool,
    pub fail_prepare: bool,
    pub fail_release: bool,
    /// Executions whose first parameter equals one of these fail with a duplicate key.
    pub failing: Vec<Value>,
    pub disconnect_on_failure: bool,
    /// Executions whose first parameter equals this never answer.
    pub blocking: Option<Value>,
    /// Insert id of the next insert, 0 reports none.
    pub next_insert_id: i64,
    pub auto_increment_increment: i64,
    /// Result sets announce more results pending on the wire.
    pub more_results: bool,
    next_statement_id: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            connected: true,
            master: true,
            thread_id: 42,
            bulk: false,
            fail_prepare: false,
            fail_release: false,
            failing: Vec::new(),
            disconnect_on_failure: false,
            blocking: None,
            next_insert_id: 0,
            auto_increment_increment: 1,
            more_results: false,
            next_statement_id: 1,
        }
    }
}

impl MockState {
    pub fn executions(&self) -> Vec<&[Value]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Execute(_, values) => Some(values.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }

    fn is_failing(&self, parameters: &[Value]) -> bool {
        parameters.first().is_some_and(|v| self.failing.contains(v))
    }

    fn is_blocking(&self, parameters: &[Value]) -> bool {
        parameters
            .first()
            .is_some_and(|v| self.blocking.as_ref() == Some(v))
    }

    fn duplicate_entry(&mut self, value: &Value) -> SqlError {
        if self.disconnect_on_failure {
            self.connected = false;
        }
        SqlError::new(
            ErrorKind::Execute,
            format!("Duplicate entry {} for key 'PRIMARY'", value),
        )
        .with_sql_state("23000")
        .with_error_code(1062)
    }

    fn record_success(&mut self, sql: &str, parameters: &[Value], results: &mut Results) {
        if is_query(sql) {
            let width = parameters.len().max(1);
            let labels = (1..=width).map(|i| format!("c{i}")).collect();
            let mut result_set = ResultSet::new(labels);
            result_set.push(if parameters.is_empty() {
                vec![Value::Int64(Some(1))].into_boxed_slice()
            } else {
                parameters.into()
            });
            results.add_result_set(result_set);
            results.set_has_more_results(self.more_results);
        } else {
            let insert_id = self.next_insert_id;
            if insert_id != 0 {
                self.next_insert_id += self.auto_increment_increment;
            }
            results.add_stats(1, insert_id);
        }
    }
}

/// Handle on the state of a session moved into a connection.
#[derive(Debug, Clone)]
pub struct MockProbe(Arc<Mutex<MockState>>);

impl MockProbe {
    pub fn get(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Protocol session answering from memory.
///
/// Queries (`SELECT ...`) return one row echoing the parameters, anything else reports
/// one affected row.
#[derive(Debug)]
pub struct MockSession {
    options: SessionOptions,
    state: MockProbe,
    interrupt: Interrupt,
}

impl MockSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: MockProbe(Default::default()),
            interrupt: Interrupt::new(),
        }
    }

    pub fn probe(&self) -> MockProbe {
        self.state.clone()
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

fn is_query(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|v| v.eq_ignore_ascii_case("select"))
}

fn closed_connection() -> SqlError {
    SqlError::new(ErrorKind::Connection, "Connection is closed").with_sql_state("08000")
}

impl ProtocolSession for MockSession {
    fn options(&self) -> &SessionOptions {
        &self.options
    }

    async fn prepare(&mut self, sql: &str, _route_to_master: bool) -> Result<StatementHandle> {
        let mut state = self.state.get();
        state.calls.push(Call::Prepare(sql.into()));
        if !state.connected {
            return Err(closed_connection().into());
        }
        if state.fail_prepare {
            return Err(SqlError::new(
                ErrorKind::Prepare,
                "You have an error in your SQL syntax",
            )
            .with_sql_state("42000")
            .with_error_code(1064)
            .into());
        }
        let id = state.next_statement_id;
        state.next_statement_id += 1;
        let parameters = (0..sql.matches('?').count())
            .map(|i| ColumnDefinition::new(format!("?{}", i + 1), ColumnType::VarString))
            .collect::<Vec<_>>();
        let columns = if is_query(sql) {
            (1..=parameters.len().max(1))
                .map(|i| ColumnDefinition::new(format!("c{i}"), ColumnType::VarString))
                .collect()
        } else {
            Vec::new()
        };
        Ok(StatementHandle::new(id, sql, parameters, columns).with_server_thread_id(state.thread_id))
    }

    async fn execute_prepared(
        &mut self,
        _route_to_master: bool,
        handle: &mut StatementHandle,
        results: &mut Results,
        parameters: &ParameterSet,
    ) -> Result<()> {
        let block = {
            let mut state = self.state.get();
            state
                .calls
                .push(Call::Execute(handle.statement_id, parameters.to_vec()));
            if !state.connected {
                return Err(closed_connection().into());
            }
            handle.set_parameter_type_header(
                parameters.iter().map(Value::column_type).collect::<Vec<_>>(),
            );
            if state.is_failing(parameters) {
                return Err(state.duplicate_entry(&parameters[0]).into());
            }
            if state.is_blocking(parameters) {
                true
            } else {
                state.record_success(&handle.sql, parameters, results);
                false
            }
        };
        if block {
            future::pending::<()>().await;
        }
        Ok(())
    }

    async fn execute_batch(
        &mut self,
        _route_to_master: bool,
        handle: &mut StatementHandle,
        results: &mut Results,
        sql: &str,
        parameters: &[ParameterSet],
        has_long_data: bool,
    ) -> Result<bool> {
        let mut state = self.state.get();
        if !state.bulk || has_long_data {
            return Ok(false);
        }
        state
            .calls
            .push(Call::Batch(handle.statement_id, parameters.len()));
        if !state.connected {
            return Err(closed_connection().into());
        }
        if let Some(row) = parameters.iter().find(|row| state.is_failing(row)) {
            return Err(state.duplicate_entry(&row[0]).into());
        }
        for row in parameters {
            state.record_success(sql, row, results);
        }
        Ok(true)
    }

    async fn release_prepared(&mut self, handle: &StatementHandle) -> Result<()> {
        let mut state = self.state.get();
        state.calls.push(Call::Release(handle.statement_id));
        if state.fail_release {
            return Err(closed_connection().into());
        }
        Ok(())
    }

    async fn prolog(&mut self, max_rows: u64) -> Result<()> {
        self.state.get().calls.push(Call::Prolog(max_rows));
        Ok(())
    }

    async fn skip_more_results(&mut self, results: &mut Results) -> Result<()> {
        self.state.get().calls.push(Call::SkipMoreResults);
        results.set_has_more_results(false);
        Ok(())
    }

    fn reset(&mut self) {
        self.state.get().calls.push(Call::Reset);
    }

    fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    fn is_connected(&self) -> bool {
        self.state.get().connected
    }

    fn is_master_connection(&self) -> bool {
        self.state.get().master
    }

    fn auto_increment_increment(&self) -> i64 {
        self.state.get().auto_increment_increment
    }

    fn server_thread_id(&self) -> i64 {
        self.state.get().thread_id
    }
}

/// Listener remembering the statements closed on a pooled connection.
#[derive(Debug, Default)]
pub struct ClosedStatements(Mutex<Vec<String>>);

impl ClosedStatements {
    pub fn get(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatementEventListener for ClosedStatements {
    fn statement_closed(&self, sql: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.into());
    }
}
