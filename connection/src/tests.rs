//! Execution layer tests against a scripted in-memory driver

#[cfg(test)]
mod tests {
    use crate::classifier::ErrorTable;
    use crate::driver::{Backend, Driver, NativeConnection};
    use crate::errors::{ErrorKind, NativeError, NativeErrorKind};
    use crate::handle::{CallOptions, ExecutionDefaults, HandleState};
    use crate::pool::ConnectionPool;
    use async_trait::async_trait;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use query_builder::{CqlDialect, CreateMode, Filter, QueryBuilder, SqlDialect};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use type_mapping::{Record, Value};

    // ========================================
    // Scripted driver
    // ========================================

    #[derive(Default)]
    struct Script {
        responses: Mutex<VecDeque<Result<Vec<Record>, NativeError>>>,
        queries: Mutex<Vec<(String, Vec<Value>)>>,
        connects: AtomicUsize,
        closes: AtomicUsize,
        refuse_connect: AtomicBool,
        delay: Mutex<Option<Duration>>,
    }

    impl Script {
        fn respond(&self, response: Result<Vec<Record>, NativeError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn fail(&self, code: i32) {
            self.respond(Err(NativeError::code(code, format!("error {}", code))));
        }

        fn queries(&self) -> Vec<(String, Vec<Value>)> {
            self.queries.lock().unwrap().clone()
        }

        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    struct ScriptedDriver {
        script: Arc<Script>,
    }

    struct ScriptedConnection {
        script: Arc<Script>,
    }

    #[async_trait]
    impl Driver for ScriptedDriver {
        async fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError> {
            if self.script.refuse_connect.load(Ordering::SeqCst) {
                return Err(NativeError::new(NativeErrorKind::Disconnected, "connection refused"));
            }
            self.script.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedConnection {
                script: self.script.clone(),
            }))
        }
    }

    #[async_trait]
    impl NativeConnection for ScriptedConnection {
        async fn query(
            &mut self,
            query: &str,
            params: &[Value],
            _timeout: Duration,
        ) -> Result<Vec<Record>, NativeError> {
            self.script
                .queries
                .lock()
                .unwrap()
                .push((query.to_string(), params.to_vec()));
            let delay = *self.script.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.script.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn close(self: Box<Self>) -> Result<(), NativeError> {
            self.script.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn relational_pool(script: &Arc<Script>) -> ConnectionPool {
        let backend = Backend::new(
            "mysql",
            Arc::new(ScriptedDriver {
                script: script.clone(),
            }),
            Box::new(SqlDialect),
            ErrorTable::mysql(),
        )
        .close_on_operation_failure(true);
        ConnectionPool::with_backend(backend, ExecutionDefaults::default())
    }

    fn wide_column_pool(script: &Arc<Script>) -> ConnectionPool {
        let backend = Backend::new(
            "cassandra",
            Arc::new(ScriptedDriver {
                script: script.clone(),
            }),
            Box::new(CqlDialect),
            ErrorTable::cql(),
        );
        ConnectionPool::with_backend(backend, ExecutionDefaults::default())
    }

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn retry(n: u32) -> CallOptions {
        CallOptions::new().with_retry(n)
    }

    // ========================================
    // Retry budget
    // ========================================

    #[tokio::test]
    async fn test_operation_failure_exhausts_retry_budget() {
        let script = Arc::new(Script::default());
        for _ in 0..3 {
            script.fail(2006);
        }
        let pool = relational_pool(&script);

        let err = pool.execute("SELECT 1", &[], &retry(2)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OperationFailure);
        assert_eq!(script.queries().len(), 3);
        // relational backend reconnects after every transient failure
        assert_eq!(script.connects(), 3);
        assert_eq!(script.closes(), 3);
    }

    #[tokio::test]
    async fn test_operation_failure_then_success() {
        let script = Arc::new(Script::default());
        script.fail(2013);
        script.respond(Ok(vec![row(&[("n", Value::Int(1))])]));
        let pool = relational_pool(&script);

        let rows = pool.execute("SELECT 1 AS n", &[], &retry(1)).await.unwrap();

        assert_eq!(rows, vec![row(&[("n", Value::Int(1))])]);
        assert_eq!(script.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_retry_fails_on_first_transient_error() {
        let script = Arc::new(Script::default());
        script.fail(1040);
        let pool = relational_pool(&script);

        let err = pool.execute("SELECT 1", &[], &CallOptions::new()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OperationFailure);
        assert_eq!(script.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_programming_error_is_not_retried() {
        let script = Arc::new(Script::default());
        script.fail(1064);
        let pool = relational_pool(&script);

        let err = pool.execute("SELEC 1", &[], &retry(3)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(script.queries().len(), 1);
        assert_eq!(script.closes(), 0);
    }

    #[tokio::test]
    async fn test_missing_table_keeps_connection() {
        let script = Arc::new(Script::default());
        script.fail(1146);
        let pool = relational_pool(&script);

        let err = pool
            .filter("nope", &QueryBuilder::new(), &retry(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(script.closes(), 0);

        pool.execute("SELECT 1", &[], &CallOptions::new()).await.unwrap();
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_error_closes_connection() {
        let script = Arc::new(Script::default());
        script.fail(4242);
        let pool = relational_pool(&script);

        let err = pool.execute("SELECT 1", &[], &retry(3)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(script.queries().len(), 1);
        assert_eq!(script.closes(), 1);
        assert_eq!(pool.checkout().state(), HandleState::Disconnected);
    }

    #[tokio::test]
    async fn test_wide_column_keeps_connection_on_transient_failure() {
        let script = Arc::new(Script::default());
        script.respond(Err(NativeError::code(0x1200, "read timeout")));
        script.respond(Err(NativeError::code(0x1200, "read timeout")));
        let pool = wide_column_pool(&script);

        let err = pool.execute("SELECT * FROM t", &[], &retry(1)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OperationFailure);
        assert_eq!(script.queries().len(), 2);
        assert_eq!(script.connects(), 1);
        assert_eq!(script.closes(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_retried() {
        let script = Arc::new(Script::default());
        script.refuse_connect.store(true, Ordering::SeqCst);
        let pool = relational_pool(&script);

        let err = pool.execute("SELECT 1", &[], &retry(3)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connect);
        assert!(err.to_string().starts_with("ConnectError: "));
        assert!(script.queries().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_operation_failure() {
        let script = Arc::new(Script::default());
        *script.delay.lock().unwrap() = Some(Duration::from_millis(200));
        let pool = relational_pool(&script);

        let options = CallOptions::new().with_timeout(Duration::from_millis(10));
        let err = pool.execute("SELECT SLEEP(1)", &[], &options).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OperationFailure);
        assert_eq!(err.native().map(|e| e.kind.clone()), Some(NativeErrorKind::Timeout));
    }

    // ========================================
    // Verbs
    // ========================================

    #[tokio::test]
    async fn test_duplicate_entry_on_create() {
        let script = Arc::new(Script::default());
        script.fail(1062);
        let pool = relational_pool(&script);
        let data = row(&[("id", Value::Int(1))]);

        let err = pool
            .create("users", &data, CreateMode::Insert, &CallOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(script.queries()[0].0, "INSERT INTO `users` (`id`) VALUES (?)");
    }

    #[tokio::test]
    async fn test_conditional_insert_not_applied() {
        let script = Arc::new(Script::default());
        let not_applied = vec![row(&[("[applied]", Value::Bool(false))])];
        script.respond(Ok(not_applied.clone()));
        script.respond(Ok(not_applied));
        let pool = wide_column_pool(&script);
        let data = row(&[("id", Value::Int(1))]);

        let err = pool
            .create("ks.t", &data, CreateMode::Insert, &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        pool.create("ks.t", &data, CreateMode::Ignore, &CallOptions::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_limits_to_one_row() {
        let script = Arc::new(Script::default());
        script.respond(Ok(vec![row(&[("id", Value::Int(5))])]));
        let pool = relational_pool(&script);

        let found = pool
            .get("users", &[Filter::eq("id", 5)], &["id"], &CallOptions::new())
            .await
            .unwrap();

        assert_eq!(found, Some(row(&[("id", Value::Int(5))])));
        assert_eq!(
            script.queries()[0].0,
            "SELECT `id` FROM `users` WHERE `id` = ? LIMIT 1"
        );

        let missing = pool
            .get("users", &[Filter::eq("id", 6)], &[], &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_exist_projects_first_filter_field() {
        let script = Arc::new(Script::default());
        script.respond(Ok(vec![row(&[("email", Value::from("a@b.c"))])]));
        let pool = relational_pool(&script);
        let filters = vec![Filter::eq("email", "a@b.c"), Filter::gt("age", 1)];

        assert!(pool.exist("users", &filters, &CallOptions::new()).await.unwrap());
        assert_eq!(
            script.queries()[0].0,
            "SELECT `email` FROM `users` WHERE `email` = ? AND `age` > ? LIMIT 1"
        );
        assert!(!pool.exist("users", &filters, &CallOptions::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_exist_without_filters_never_connects() {
        let script = Arc::new(Script::default());
        let pool = relational_pool(&script);

        let err = pool.exist("users", &[], &CallOptions::new()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(script.connects(), 0);
    }

    #[tokio::test]
    async fn test_build_error_never_reaches_driver() {
        let script = Arc::new(Script::default());
        let pool = relational_pool(&script);
        let query = QueryBuilder::new().filter(Filter::is_in("id", Vec::<i64>::new()));

        let err = pool.filter("users", &query, &CallOptions::new()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Programming);
        assert!(script.queries().is_empty());
    }

    #[tokio::test]
    async fn test_execute_normalizes_offset_timestamps() {
        let script = Arc::new(Script::default());
        let pool = relational_pool(&script);
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap();

        pool.execute("SELECT ?", &[Value::from(local)], &CallOptions::new())
            .await
            .unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(script.queries()[0].1, vec![Value::DateTime(expected)]);
    }

    // ========================================
    // Pool
    // ========================================

    #[tokio::test]
    async fn test_pool_grows_and_reuses_fifo() {
        let script = Arc::new(Script::default());
        let pool = relational_pool(&script);

        let first = pool.checkout();
        let second = pool.checkout();
        assert_eq!(pool.created_count(), 2);
        assert_eq!(pool.idle_count(), 0);

        pool.checkin(first);
        pool.checkin(second);
        assert_eq!(pool.idle_count(), 2);

        assert_eq!(pool.checkout().id(), 1);
        assert_eq!(pool.checkout().id(), 2);
        assert_eq!(pool.created_count(), 2);
    }

    #[tokio::test]
    async fn test_handles_return_to_pool_after_errors() {
        let script = Arc::new(Script::default());
        script.fail(1064);
        let pool = relational_pool(&script);

        assert!(pool.execute("BAD", &[], &CallOptions::new()).await.is_err());
        pool.execute("SELECT 1", &[], &CallOptions::new()).await.unwrap();

        assert_eq!(pool.created_count(), 1);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_close_all_closes_idle_handles() {
        let script = Arc::new(Script::default());
        let pool = relational_pool(&script);
        pool.execute("SELECT 1", &[], &CallOptions::new()).await.unwrap();

        pool.close_all().await;

        assert_eq!(script.closes(), 1);
        assert_eq!(pool.idle_count(), 0);

        // the pool stays usable
        pool.execute("SELECT 1", &[], &CallOptions::new()).await.unwrap();
        assert_eq!(script.connects(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_call_discards_connection() {
        let script = Arc::new(Script::default());
        *script.delay.lock().unwrap() = Some(Duration::from_secs(5));
        let pool = relational_pool(&script);

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            pool.execute("SELECT SLEEP(5)", &[], &CallOptions::new()),
        )
        .await;
        assert!(outcome.is_err());

        assert_eq!(pool.idle_count(), 1);
        let handle = pool.checkout();
        assert_eq!(handle.state(), HandleState::Disconnected);
        assert!(!handle.is_in_flight());
        assert_eq!(script.closes(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_get_distinct_handles() {
        let script = Arc::new(Script::default());
        *script.delay.lock().unwrap() = Some(Duration::from_millis(20));
        let pool = Arc::new(relational_pool(&script));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                pool.execute("SELECT 1", &[], &CallOptions::new()).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(pool.created_count(), 4);
        assert_eq!(pool.idle_count(), 4);
    }
}
