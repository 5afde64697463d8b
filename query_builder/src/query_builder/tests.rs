//! Query builder utilities
//!
//! This module tests both dialects against exact query text.

#[cfg(test)]
mod tests {
    use crate::errors::BuildError;
    use crate::query_builder::{
        CqlDialect, CreateMode, Dialect, Filter, QueryBuilder, QueryPlan, SortOrder, SqlDialect,
    };
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use type_mapping::{Record, Value};

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn placeholder_count(plan: &QueryPlan) -> usize {
        plan.query.matches('?').count()
    }

    // ========================================
    // Relational dialect
    // ========================================

    #[test]
    fn test_sql_create_modes() {
        let data = record(&[("id", Value::Int(1)), ("name", Value::from("a"))]);

        let plan = SqlDialect.create("users", &data, CreateMode::Insert).unwrap();
        assert_eq!(plan.query, "INSERT INTO `users` (`id`, `name`) VALUES (?, ?)");
        assert_eq!(plan.params, vec![Value::Int(1), Value::from("a")]);

        let plan = SqlDialect.create("users", &data, CreateMode::Ignore).unwrap();
        assert!(plan.query.starts_with("INSERT IGNORE INTO `users`"));

        let plan = SqlDialect.create("db.users", &data, CreateMode::Replace).unwrap();
        assert!(plan.query.starts_with("REPLACE INTO `db`.`users`"));
    }

    #[test]
    fn test_sql_update_with_filters() {
        let data = record(&[("name", Value::from("b"))]);
        let filters = vec![Filter::eq("id", 7), Filter::gt("age", 18)];

        let plan = SqlDialect.update("users", &filters, &data).unwrap();
        assert_eq!(
            plan.query,
            "UPDATE `users` SET `name` = ? WHERE `id` = ? AND `age` > ?"
        );
        assert_eq!(
            plan.params,
            vec![Value::from("b"), Value::Int(7), Value::Int(18)]
        );
    }

    #[test]
    fn test_sql_update_without_filters_has_no_where() {
        let data = record(&[("flag", Value::Bool(true))]);
        let plan = SqlDialect.update("users", &[], &data).unwrap();
        assert_eq!(plan.query, "UPDATE `users` SET `flag` = ?");
    }

    #[test]
    fn test_sql_delete() {
        let plan = SqlDialect
            .delete("users", &[Filter::is_in("id", vec![1, 2, 3])])
            .unwrap();
        assert_eq!(plan.query, "DELETE FROM `users` WHERE `id` IN (?, ?, ?)");
        assert_eq!(plan.params.len(), 3);

        let plan = SqlDialect.delete("users", &[]).unwrap();
        assert_eq!(plan.query, "DELETE FROM `users`");
        assert!(plan.params.is_empty());
    }

    #[test]
    fn test_sql_select_full() {
        let query = QueryBuilder::new()
            .filter(Filter::is_in("id", vec![1, 2]))
            .filter(Filter::is_null("deleted_at"))
            .fields(["id", "name"])
            .order_by("-created_at")
            .order_by("name")
            .limit(10);

        let plan = SqlDialect.filter("users", &query).unwrap();
        assert_eq!(
            plan.query,
            "SELECT `id`, `name` FROM `users` WHERE `id` IN (?, ?) AND `deleted_at` IS NULL \
             ORDER BY `created_at` DESC, `name` ASC LIMIT 10"
        );
        assert_eq!(plan.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_sql_select_defaults() {
        let plan = SqlDialect.filter("users", &QueryBuilder::new()).unwrap();
        assert_eq!(plan.query, "SELECT * FROM `users`");
        assert!(plan.params.is_empty());
    }

    #[test]
    fn test_null_comparisons_take_no_parameter() {
        let query = QueryBuilder::new()
            .filter(Filter::is_not_null("email"))
            .filter(Filter::eq("parent", Value::Null));
        let plan = SqlDialect.filter("users", &query).unwrap();
        assert_eq!(
            plan.query,
            "SELECT * FROM `users` WHERE `email` IS NOT NULL AND `parent` IS NULL"
        );
        assert!(plan.params.is_empty());
    }

    #[test]
    fn test_identifiers_are_requoted() {
        let query = QueryBuilder::new().filter(Filter::eq("`t`.`col`", 1));
        let plan = SqlDialect.filter("`db`.users", &query).unwrap();
        assert_eq!(plan.query, "SELECT * FROM `db`.`users` WHERE `t`.`col` = ?");
    }

    #[test]
    fn test_limit_zero_means_unbounded() {
        let plan = SqlDialect
            .filter("users", &QueryBuilder::new().limit(0))
            .unwrap();
        assert_eq!(plan.query, "SELECT * FROM `users`");

        let plan = CqlDialect
            .filter("events", &QueryBuilder::new().limit(0))
            .unwrap();
        assert_eq!(plan.query, "SELECT * FROM events ALLOW FILTERING");
    }

    // ========================================
    // Wide-column dialect
    // ========================================

    #[test]
    fn test_cql_create_conditional_by_mode() {
        let data = record(&[("id", Value::Int(1))]);

        let insert = CqlDialect.create("ks.events", &data, CreateMode::Insert).unwrap();
        assert_eq!(
            insert.query,
            "INSERT INTO ks.events (\"id\") VALUES (?) IF NOT EXISTS"
        );

        let ignore = CqlDialect.create("ks.events", &data, CreateMode::Ignore).unwrap();
        assert_eq!(ignore.query, insert.query);

        let replace = CqlDialect.create("events", &data, CreateMode::Replace).unwrap();
        assert_eq!(replace.query, "INSERT INTO events (\"id\") VALUES (?)");
    }

    #[test]
    fn test_cql_update_and_delete() {
        let data = record(&[("score", Value::Float(1.5))]);
        let filters = vec![Filter::eq("id", 3)];

        let update = CqlDialect.update("ks.events", &filters, &data).unwrap();
        assert_eq!(
            update.query,
            "UPDATE ks.events SET \"score\" = ? WHERE \"id\" = ? IF EXISTS"
        );
        assert_eq!(update.params, vec![Value::Float(1.5), Value::Int(3)]);

        let delete = CqlDialect.delete("ks.events", &filters).unwrap();
        assert_eq!(delete.query, "DELETE FROM ks.events WHERE \"id\" = ?");
    }

    #[test]
    fn test_cql_select() {
        let query = QueryBuilder::new()
            .filter(Filter::gte("ts", 100))
            .order_by_field("ts", SortOrder::Desc)
            .limit(5);
        let plan = CqlDialect.filter("ks.events", &query).unwrap();
        assert_eq!(
            plan.query,
            "SELECT * FROM ks.events WHERE \"ts\" >= ? ORDER BY \"ts\" DESC LIMIT 5 ALLOW FILTERING"
        );
    }

    // ========================================
    // Shared invariants
    // ========================================

    #[test]
    fn test_placeholders_match_params() {
        let query = QueryBuilder::new()
            .filter(Filter::is_in("a", vec!["x", "y", "z"]))
            .filter(Filter::lt("b", 4))
            .filter(Filter::is_null("c"));
        let dialects: [&dyn Dialect; 2] = [&SqlDialect, &CqlDialect];

        for dialect in dialects {
            let plan = dialect.filter("t", &query).unwrap();
            assert_eq!(placeholder_count(&plan), plan.params.len(), "{}", dialect.name());
            assert_eq!(plan.params.len(), 4);
        }
    }

    #[test]
    fn test_builders_are_deterministic() {
        let data = record(&[("z", Value::Int(1)), ("a", Value::Int(2))]);
        let first = SqlDialect.create("t", &data, CreateMode::Insert).unwrap();
        let second = SqlDialect.create("t", &data, CreateMode::Insert).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.query, "INSERT INTO `t` (`a`, `z`) VALUES (?, ?)");
    }

    #[test]
    fn test_offset_timestamps_bound_as_utc() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let query = QueryBuilder::new()
            .filter(Filter::gt("ts", local))
            .filter(Filter::is_in("seen", vec![local]));
        let plan = SqlDialect.filter("t", &query).unwrap();
        assert_eq!(
            plan.params,
            vec![Value::DateTime(expected), Value::DateTime(expected)]
        );
    }

    #[test]
    fn test_invalid_in_operands() {
        let empty = QueryBuilder::new().filter(Filter::is_in("id", Vec::<i64>::new()));
        assert!(matches!(
            SqlDialect.filter("t", &empty),
            Err(BuildError::InvalidInOperand { .. })
        ));

        let scalar = QueryBuilder::new().filter(Filter::new("in", "id", 5).unwrap());
        assert!(matches!(
            CqlDialect.filter("t", &scalar),
            Err(BuildError::InvalidInOperand { .. })
        ));
    }

    #[test]
    fn test_unsupported_operator_rejected() {
        let err = Filter::new("LIKE", "name", "a%").unwrap_err();
        assert_eq!(err, BuildError::UnsupportedOperator("LIKE".to_string()));
        assert_eq!(err.to_string(), "Not support filter operator: LIKE");

        let filter = Filter::try_from(("in", "id", Value::from(vec![1, 2]))).unwrap();
        assert_eq!(filter, Filter::is_in("id", vec![1, 2]));
    }

    #[test]
    fn test_empty_assignments_rejected() {
        let empty = Record::new();
        assert!(matches!(
            SqlDialect.create("t", &empty, CreateMode::Insert),
            Err(BuildError::EmptyAssignments { statement: "create" })
        ));
        assert!(matches!(
            CqlDialect.update("t", &[], &empty),
            Err(BuildError::EmptyAssignments { statement: "update" })
        ));
    }

    #[test]
    fn test_create_mode_parsing() {
        assert_eq!("ignore".parse::<CreateMode>().unwrap(), CreateMode::Ignore);
        assert_eq!(CreateMode::default(), CreateMode::Insert);
        assert!("UPSERT".parse::<CreateMode>().is_err());
    }
}
