#[cfg(test)]
mod tests {
    use serverprep::{
        Connection, EXECUTE_FAILED, ErrorKind, Prepared, SQLSTATE_FEATURE_NOT_SUPPORTED,
        ServerPreparedStatement, SessionOptions, SqlError, Value,
    };
    use serverprep_tests::{Call, MockProbe, MockSession, init_logs, silent_logs};
    use std::sync::Arc;

    async fn prepare(
        options: SessionOptions,
    ) -> (ServerPreparedStatement<MockSession>, MockProbe) {
        let session = MockSession::new(options);
        let probe = session.probe();
        let statement = Connection::new(session)
            .prepare_statement("INSERT INTO t (id, name) VALUES (?, ?)")
            .await
            .expect("Failed to prepare");
        (statement, probe)
    }

    fn add_rows(statement: &mut ServerPreparedStatement<MockSession>, ids: &[i32]) {
        for id in ids {
            statement
                .bind_index(*id, 0)
                .and_then(|s| s.bind_index(format!("name {id}"), 1))
                .expect("Failed to bind");
            statement.add_batch().expect("Failed to add batch");
        }
    }

    #[tokio::test]
    async fn add_batch_keeps_bindings() {
        init_logs();
        let (mut statement, _) = prepare(Default::default()).await;
        statement
            .bind(1)
            .and_then(|s| s.bind("same"))
            .expect("Failed to bind");
        statement.add_batch().expect("Failed to add batch");
        statement.add_batch().expect("Failed to add batch");
        let rows = statement.batch().as_slice();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
        assert_eq!(
            &rows[0][..],
            [Value::Int32(Some(1)), Value::Varchar(Some("same".into()))]
        );
        assert_eq!(statement.bindings().len(), 2);
    }

    #[tokio::test]
    async fn add_batch_validates_bindings() {
        init_logs();
        let (mut statement, _) = prepare(Default::default()).await;
        statement.bind_index(1, 0).expect("Failed to bind");
        silent_logs! {
            let error = statement.add_batch().expect_err("Second parameter is missing");
            assert_eq!(
                SqlError::find(&error).map(|e| e.kind),
                Some(ErrorKind::MissingParameter)
            );
        }
        assert!(statement.batch().is_empty());
    }

    #[tokio::test]
    async fn add_batch_sql_is_rejected() {
        init_logs();
        let (mut statement, _) = prepare(Default::default()).await;
        silent_logs! {
            let error = statement
                .add_batch_sql("DELETE FROM t")
                .expect_err("Raw SQL must be rejected");
            let error = SqlError::find(&error).expect("Not a SqlError");
            assert_eq!(error.kind, ErrorKind::Unsupported);
            assert_eq!(error.sql_state(), Some(SQLSTATE_FEATURE_NOT_SUPPORTED));
        }
        assert!(statement.batch().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_does_not_reach_session() {
        init_logs();
        let (mut statement, probe) = prepare(Default::default()).await;
        add_rows(&mut statement, &[1, 2]);
        statement.clear_batch();
        assert!(statement.batch().is_empty());
        let calls = probe.get().calls.len();
        assert_eq!(statement.execute_batch().await.expect("Failed"), Vec::<i32>::new());
        assert_eq!(
            statement.execute_large_batch().await.expect("Failed"),
            Vec::<i64>::new()
        );
        assert_eq!(probe.get().calls.len(), calls);
        assert!(statement.results().is_none());
    }

    #[tokio::test]
    async fn fallback_executes_every_row() {
        init_logs();
        let (mut statement, probe) = prepare(Default::default()).await;
        add_rows(&mut statement, &[1, 2, 3]);
        let counts = statement.execute_batch().await.expect("Failed to execute");
        assert_eq!(counts, [1, 1, 1]);
        let state = probe.get();
        assert_eq!(state.executions().len(), 3);
        assert_eq!(state.executions()[2][0], Value::Int32(Some(3)));
        assert_eq!(state.count(|c| matches!(c, Call::Batch(..))), 0);
    }

    #[tokio::test]
    async fn continue_on_error_raises_after_dispatch() {
        init_logs();
        let (mut statement, probe) = prepare(SessionOptions {
            continue_batch_on_error: true,
            ..Default::default()
        })
        .await;
        probe.get().failing = vec![Value::Int32(Some(2))];
        add_rows(&mut statement, &[1, 2, 3]);
        silent_logs! {
            let error = statement
                .execute_large_batch()
                .await
                .expect_err("Row 2 should fail");
            let error = SqlError::find(&error).expect("Not a SqlError");
            assert_eq!(error.kind, ErrorKind::Batch);
            assert_eq!(error.error_code, 1062);
            assert_eq!(error.sql_state(), Some("23000"));
            assert_eq!(error.update_counts.as_deref(), Some(&[1, EXECUTE_FAILED, 1][..]));
        }
        assert_eq!(probe.get().executions().len(), 3);
        let results = statement.results().expect("Missing results");
        assert_eq!(results.large_update_counts(), [1, EXECUTE_FAILED, 1]);
        assert_eq!(results.succeeded_count(), 2);
        assert!(!statement.is_executing());
    }

    #[tokio::test]
    async fn stop_on_error_skips_remaining_rows() {
        init_logs();
        let (mut statement, probe) = prepare(SessionOptions {
            continue_batch_on_error: false,
            ..Default::default()
        })
        .await;
        probe.get().failing = vec![Value::Int32(Some(2))];
        add_rows(&mut statement, &[1, 2, 3]);
        silent_logs! {
            let error = statement
                .execute_batch()
                .await
                .expect_err("Row 2 should fail");
            let error = SqlError::find(&error).expect("Not a SqlError");
            assert_eq!(error.kind, ErrorKind::Batch);
            assert_eq!(error.update_counts.as_deref(), Some(&[1, EXECUTE_FAILED][..]));
        }
        let state = probe.get();
        assert_eq!(state.executions().len(), 2);
        assert!(
            !state
                .executions()
                .iter()
                .any(|row| row[0] == Value::Int32(Some(3)))
        );
    }

    #[tokio::test]
    async fn lost_connection_stops_batch() {
        init_logs();
        let (mut statement, probe) = prepare(Default::default()).await;
        {
            let mut state = probe.get();
            state.failing = vec![Value::Int32(Some(1))];
            state.disconnect_on_failure = true;
        }
        add_rows(&mut statement, &[1, 2]);
        silent_logs! {
            let error = statement.execute_batch().await.expect_err("Row 1 should fail");
            assert_eq!(
                SqlError::find(&error).map(|e| e.kind),
                Some(ErrorKind::Connection)
            );
        }
        assert_eq!(probe.get().executions().len(), 1);
    }

    #[tokio::test]
    async fn fast_path_skips_fallback() {
        init_logs();
        let (mut statement, probe) = prepare(SessionOptions {
            use_bulk_stmts: true,
            ..Default::default()
        })
        .await;
        probe.get().bulk = true;
        add_rows(&mut statement, &[1, 2, 3]);
        let counts = statement.execute_batch().await.expect("Failed to execute");
        assert_eq!(counts, [1, 1, 1]);
        let state = probe.get();
        assert_eq!(state.count(|c| matches!(c, Call::Batch(_, 3))), 1);
        assert_eq!(state.executions().len(), 0);
        drop(state);
        let parameters = statement
            .parameter_metadata()
            .expect("Missing parameter metadata");
        assert_eq!(parameters.parameter_count(), 2);
    }

    #[tokio::test]
    async fn fast_path_declined_falls_back() {
        init_logs();
        let (mut statement, probe) = prepare(SessionOptions {
            use_batch_multi_send: true,
            ..Default::default()
        })
        .await;
        probe.get().bulk = true;
        statement.bind(1).expect("Failed to bind");
        statement
            .bind(Arc::<[u8]>::from(&b"streamed"[..]))
            .expect("Failed to bind");
        statement.add_batch().expect("Failed to add batch");
        assert!(statement.batch().has_long_data());
        let counts = statement.execute_batch().await.expect("Failed to execute");
        assert_eq!(counts, [1]);
        let state = probe.get();
        assert_eq!(state.count(|c| matches!(c, Call::Batch(..))), 0);
        assert_eq!(state.executions().len(), 1);
    }

    #[tokio::test]
    async fn fast_path_disabled_by_options() {
        init_logs();
        let (mut statement, probe) = prepare(Default::default()).await;
        probe.get().bulk = true;
        add_rows(&mut statement, &[1, 2]);
        statement.execute_batch().await.expect("Failed to execute");
        assert_eq!(probe.get().executions().len(), 2);
    }

    #[tokio::test]
    async fn fast_path_failure_is_a_batch_error() {
        init_logs();
        let (mut statement, probe) = prepare(SessionOptions {
            use_bulk_stmts: true,
            ..Default::default()
        })
        .await;
        {
            let mut state = probe.get();
            state.bulk = true;
            state.failing = vec![Value::Int32(Some(3))];
        }
        add_rows(&mut statement, &[1, 2, 3]);
        silent_logs! {
            let error = statement.execute_batch().await.expect_err("Bulk should fail");
            let error = SqlError::find(&error).expect("Not a SqlError");
            assert_eq!(error.kind, ErrorKind::Batch);
            assert!(error.message.contains("batch of 3 rows"), "{}", error.message);
            assert_eq!(error.update_counts.as_deref(), Some(&[][..]));
        }
        assert_eq!(probe.get().executions().len(), 0);
    }

    #[tokio::test]
    async fn batch_survives_for_next_execution() {
        init_logs();
        let (mut statement, probe) = prepare(Default::default()).await;
        add_rows(&mut statement, &[1, 2]);
        statement.execute_batch().await.expect("Failed to execute");
        statement.execute_batch().await.expect("Failed to execute");
        assert_eq!(probe.get().executions().len(), 4);
        assert_eq!(statement.batch().len(), 2);
    }
}
