#[cfg(test)]
mod tests {
    use serverprep_core::{
        EXECUTE_FAILED, ParameterSet, ResultSet, Results, StatementOptions, Value,
    };

    #[test]
    fn update_counts_are_clamped() {
        let mut results = Results::batch(&Default::default(), 3, 1);
        results.add_stats(i64::from(i32::MAX) + 10, 0);
        results.add_stats_error();
        results.add_stats(2, 0);
        results.command_end();
        assert_eq!(results.update_counts(), [i32::MAX, EXECUTE_FAILED as i32, 2]);
        assert_eq!(
            results.large_update_counts(),
            [i64::from(i32::MAX) + 10, EXECUTE_FAILED, 2]
        );
        assert_eq!(results.executed_count(), 3);
        assert_eq!(results.succeeded_count(), 2);
        assert!(results.is_batch());
        assert_eq!(results.expected_size(), 3);
    }

    #[test]
    fn result_sets_visible_after_command_end() {
        let options = StatementOptions::default();
        let mut results = Results::single(&options, 0, 1, "SELECT ?", ParameterSet::default());
        let mut first = ResultSet::new(["a".to_string()].into());
        first.push(vec![Value::Int32(Some(1))].into_boxed_slice());
        results.add_result_set(first);
        results.add_result_set(ResultSet::new(["b".to_string()].into()));
        assert!(results.result_set().is_none());
        results.command_end();
        assert_eq!(results.update_count(), -1);
        assert_eq!(results.result_set().map(ResultSet::len), Some(1));
        assert!(results.next_result_set());
        assert_eq!(results.result_set().map(|r| r.labels().to_vec()), Some(vec!["b".to_string()]));
        assert!(!results.next_result_set());
        assert!(results.result_set().is_none());
        assert_eq!(results.sql(), Some("SELECT ?"));
    }

    #[test]
    fn generated_keys_need_flag() {
        let mut results = Results::batch(&Default::default(), 1, 2);
        results.add_stats(3, 100);
        assert!(results.generated_keys().is_empty());
        let options = StatementOptions::default().with_auto_generated_keys(true);
        let mut results = Results::batch(&options, 2, 2);
        results.add_stats(3, 100);
        results.add_stats(1, 0);
        assert_eq!(results.generated_keys(), [100, 102, 104]);
    }

    #[test]
    fn close_drops_result_sets() {
        let mut results = Results::single(&Default::default(), 5, 1, "SELECT 1", Default::default());
        results.add_result_set(ResultSet::empty());
        results.command_end();
        results.close();
        assert!(results.is_closed());
        assert!(results.result_set().is_none());
        assert_eq!(results.fetch_size(), 5);
    }
}
