//! Tests for the trigger manager

use std::sync::Arc;

use verlock_core::{Connection, Value};
use verlock_driver_sqlite::SqliteConnection;

use super::*;
use crate::mock::MockConnection;
use crate::{ColumnDescriptor, StaticRouter};

fn descriptor(entity: &str, table: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(entity, table, "version")
}

fn registry(descriptors: &[(&str, &str)]) -> TriggerRegistry {
    descriptors
        .iter()
        .map(|(entity, table)| descriptor(entity, table))
        .collect()
}

fn names(changes: &[TriggerChange]) -> Vec<(&str, ChangeKind)> {
    changes
        .iter()
        .map(|c| (c.trigger_name.as_str(), c.kind))
        .collect()
}

mod create_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_registry_issues_no_statements() {
        let default = MockConnection::new("sqlite").into_arc();
        let orders = MockConnection::new("postgresql").into_arc();
        let connections = ConnectionSet::new()
            .with("default", default.clone())
            .with("orders", orders.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = TriggerRegistry::new();
        let report = manager.create_triggers(&mut registry, None).await;

        assert!(report.is_complete());
        assert_eq!(report.aliases().collect::<Vec<_>>(), vec!["default", "orders"]);
        assert!(report.results().values().all(|changes| changes.is_empty()));
        for mock in [&default, &orders] {
            assert!(mock.statements().is_empty());
            assert!(mock.queries().is_empty());
        }
    }

    #[tokio::test]
    async fn test_creates_routed_triggers_and_consumes_registry() {
        let default = MockConnection::new("sqlite").into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = registry(&[("Order", "orders"), ("Customer", "customers")]);
        let created = manager
            .create_triggers(&mut registry, None)
            .await
            .into_result()
            .unwrap();

        assert_eq!(
            names(&created["default"]),
            vec![
                ("concurrency_orders_version", ChangeKind::Created),
                ("concurrency_customers_version", ChangeKind::Created),
            ]
        );
        assert_eq!(created["default"][0].entity, "Order");
        assert!(registry.is_empty());

        // One list query, then drop + create per descriptor
        assert_eq!(default.queries().len(), 1);
        assert_eq!(default.statements().len(), 4);

        // Consumed: a second pass does nothing
        let again = manager.create_triggers(&mut registry, None).await;
        assert!(again.get("default").unwrap().is_empty());
        assert_eq!(default.statements().len(), 4);
    }

    #[tokio::test]
    async fn test_listed_triggers_are_skipped() {
        let default = MockConnection::new("mysql")
            .with_installed(&["concurrency_orders_version"])
            .into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = registry(&[("Order", "orders"), ("Customer", "customers")]);
        let report = manager.create_triggers(&mut registry, None).await;

        assert_eq!(
            names(report.get("default").unwrap()),
            vec![
                ("concurrency_orders_version", ChangeKind::AlreadyInstalled),
                ("concurrency_customers_version", ChangeKind::Created),
            ]
        );
        assert!(default.statements().iter().all(|s| !s.contains("orders")));
    }

    #[tokio::test]
    async fn test_excluded_alias_gets_nothing() {
        let default = MockConnection::new("sqlite").into_arc();
        let orders = MockConnection::new("postgresql").into_arc();
        let connections = ConnectionSet::new()
            .with("default", default.clone())
            .with("orders", orders.clone());
        let manager = TriggerManager::new(&connections)
            .with_router(StaticRouter::new("default").with_route("Order", "orders"));

        let mut registry = registry(&[("Order", "orders"), ("Customer", "customers")]);
        let report = manager.create_triggers(&mut registry, Some(&["default"][..])).await;

        assert!(report.is_complete());
        assert_eq!(report.aliases().collect::<Vec<_>>(), vec!["default"]);
        assert_eq!(
            names(report.get("default").unwrap()),
            vec![("concurrency_customers_version", ChangeKind::Created)]
        );
        assert!(default.statements().iter().all(|s| !s.contains("concurrency_orders")));
        assert!(orders.statements().is_empty());
        assert!(orders.queries().is_empty());

        // Only the processed descriptor is consumed
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all()[0].entity(), "Order");
    }

    #[tokio::test]
    async fn test_unsupported_engine_only_fails_its_alias() {
        let default = MockConnection::new("sqlite").into_arc();
        let legacy = MockConnection::new("oracle").into_arc();
        let connections = ConnectionSet::new()
            .with("default", default.clone())
            .with("legacy", legacy.clone());
        let manager = TriggerManager::new(&connections)
            .with_router(StaticRouter::new("default").with_route("Ledger", "legacy"));

        let mut registry = registry(&[("Ledger", "ledger"), ("Order", "orders")]);
        let report = manager.create_triggers(&mut registry, None).await;

        assert!(!report.is_complete());
        assert!(matches!(
            report.failure("legacy"),
            Some(TriggerError::UnsupportedEngine { engine }) if engine == "oracle"
        ));
        assert_eq!(
            names(report.get("default").unwrap()),
            vec![("concurrency_orders_version", ChangeKind::Created)]
        );
        assert!(legacy.statements().is_empty());

        // Nothing is consumed after a failure
        assert_eq!(registry.len(), 2);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.alias(), Some("legacy"));
    }

    #[tokio::test]
    async fn test_statement_failure_stops_alias_and_keeps_earlier_work() {
        let default = MockConnection::new("sqlite")
            .failing_on("CREATE TRIGGER concurrency_b_version")
            .into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = registry(&[("A", "a"), ("B", "b"), ("C", "c")]);
        let report = manager.create_triggers(&mut registry, None).await;

        assert_eq!(
            names(report.get("default").unwrap()),
            vec![("concurrency_a_version", ChangeKind::Created)]
        );
        let failure = report.failure("default").unwrap();
        assert!(failure.statement().unwrap().starts_with("CREATE TRIGGER concurrency_b_version"));
        assert!(default.statements().iter().all(|s| !s.contains("concurrency_c_version")));

        assert_eq!(registry.len(), 3);
        assert!(registry.all()[0].exists());
        assert!(!registry.all()[1].exists());
    }

    #[tokio::test]
    async fn test_unknown_target_alias_fails() {
        let connections = ConnectionSet::new().with("default", MockConnection::new("sqlite").into_arc());
        let manager = TriggerManager::new(&connections);

        let mut registry = registry(&[("Order", "orders")]);
        let report = manager
            .create_triggers(&mut registry, Some(&["default", "missing"][..]))
            .await;

        assert!(matches!(
            report.failure("missing"),
            Some(TriggerError::UnknownConnection { alias }) if alias == "missing"
        ));
        assert_eq!(report.get("default").unwrap().len(), 1);
        assert_eq!(registry.len(), 1);
    }
}

mod drop_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_drop_keeps_registry_and_clears_flag() {
        let default = MockConnection::new("postgresql").into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = registry(&[("Order", "orders")]);
        registry.iter_mut().for_each(|d| d.set_exists(true));

        let dropped = manager
            .drop_triggers(&mut registry, None)
            .await
            .into_result()
            .unwrap();

        assert_eq!(
            names(&dropped["default"]),
            vec![("concurrency_orders_version", ChangeKind::Dropped)]
        );
        assert_eq!(
            default.statements(),
            vec![
                "DROP TRIGGER IF EXISTS concurrency_orders_version ON orders".to_string(),
                "DROP FUNCTION IF EXISTS func_concurrency_orders_version()".to_string(),
            ]
        );
        assert_eq!(registry.len(), 1);
        assert!(!registry.all()[0].exists());
        // Dropping needs no list query
        assert!(default.queries().is_empty());
    }

    #[tokio::test]
    async fn test_drop_respects_routing() {
        let default = MockConnection::new("sqlite").into_arc();
        let orders = MockConnection::new("mysql").into_arc();
        let connections = ConnectionSet::new()
            .with("default", default.clone())
            .with("orders", orders.clone());
        let manager = TriggerManager::new(&connections)
            .with_router(StaticRouter::new("default").with_route("Order", "orders"));

        let mut registry = registry(&[("Order", "orders"), ("Customer", "customers")]);
        let report = manager.drop_triggers(&mut registry, Some(&["orders"][..])).await;

        assert_eq!(
            names(report.get("orders").unwrap()),
            vec![("concurrency_orders_version", ChangeKind::Dropped)]
        );
        assert!(default.statements().is_empty());
        assert_eq!(registry.len(), 2);
    }
}

mod list_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_per_alias() {
        let default = MockConnection::new("sqlite")
            .with_installed(&["zz_audit", "concurrency_orders_version"])
            .into_arc();
        let legacy = MockConnection::new("oracle").into_arc();
        let connections = ConnectionSet::new()
            .with("default", default.clone())
            .with("legacy", legacy.clone());
        let manager = TriggerManager::new(&connections);

        let listing = manager.list_triggers(None).await;
        assert_eq!(
            listing.get("default").unwrap(),
            &vec!["concurrency_orders_version".to_string(), "zz_audit".to_string()]
        );
        assert_eq!(listing.get("legacy"), Some(&Vec::new()));
        assert!(matches!(
            listing.failure("legacy"),
            Some(TriggerError::UnsupportedEngine { .. })
        ));
        assert!(default.statements().is_empty());
    }

    #[tokio::test]
    async fn test_list_duplicate_targets_run_once() {
        let default = MockConnection::new("sqlite").into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);

        let listing = manager.list_triggers(Some(&["default", "default"][..])).await;
        assert!(listing.is_complete());
        assert_eq!(default.queries().len(), 1);
    }
}

mod preview_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_preview_executes_nothing() {
        let default = MockConnection::new("mysql").into_arc();
        let connections = ConnectionSet::new().with("default", default.clone());
        let manager = TriggerManager::new(&connections);
        let registry = registry(&[("Order", "orders")]);

        let preview = manager.preview(&registry, None, false).into_result().unwrap();
        let (change, statements) = &preview["default"][0];
        assert_eq!(change.kind, ChangeKind::Created);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("CREATE TRIGGER concurrency_orders_version"));

        let preview = manager.preview(&registry, None, true).into_result().unwrap();
        assert_eq!(
            preview["default"][0].1,
            vec!["DROP TRIGGER IF EXISTS concurrency_orders_version".to_string()]
        );

        assert!(default.statements().is_empty());
        assert!(default.queries().is_empty());
        assert_eq!(registry.len(), 1);
    }
}

mod sqlite_end_to_end_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn database() -> Arc<SqliteConnection> {
        let conn = Arc::new(SqliteConnection::open_in_memory().unwrap());
        conn.execute_batch(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, version INTEGER NOT NULL DEFAULT 0, total INTEGER);
             CREATE TABLE customers (customer_id INTEGER PRIMARY KEY, revision INTEGER NOT NULL DEFAULT 0, name TEXT);
             INSERT INTO orders (id, total) VALUES (1, 10);
             INSERT INTO customers (customer_id, name) VALUES (7, 'Ada');",
        )
        .await
        .unwrap();
        conn
    }

    fn declared() -> TriggerRegistry {
        [
            ColumnDescriptor::new("Order", "orders", "version"),
            ColumnDescriptor::new("Customer", "customers", "revision").with_primary_key("customer_id"),
        ]
        .into_iter()
        .collect()
    }

    async fn scalar(conn: &SqliteConnection, sql: &str) -> i64 {
        let result = conn.query(sql, &[]).await.unwrap();
        result.rows[0].get(0).and_then(Value::as_i64).unwrap()
    }

    #[tokio::test]
    async fn test_create_list_drop_cycle() {
        let conn = database().await;
        let connections = ConnectionSet::new().with("default", conn.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = declared();
        manager
            .create_triggers(&mut registry, None)
            .await
            .into_result()
            .unwrap();
        assert!(registry.is_empty());

        let listed = manager.list_triggers(None).await.into_result().unwrap();
        assert_eq!(
            listed["default"],
            vec!["concurrency_customers_revision", "concurrency_orders_version"]
        );

        conn.execute("UPDATE orders SET total = 20 WHERE id = 1", &[]).await.unwrap();
        conn.execute("UPDATE customers SET name = 'Grace' WHERE customer_id = 7", &[])
            .await
            .unwrap();
        conn.execute("UPDATE customers SET name = 'Ada' WHERE customer_id = 7", &[])
            .await
            .unwrap();
        assert_eq!(scalar(&conn, "SELECT version FROM orders WHERE id = 1").await, 1);
        assert_eq!(
            scalar(&conn, "SELECT revision FROM customers WHERE customer_id = 7").await,
            2
        );

        // The declaring layer re-registers on the next start
        let mut registry = declared();
        let dropped = manager
            .drop_triggers(&mut registry, None)
            .await
            .into_result()
            .unwrap();
        assert_eq!(dropped["default"].len(), 2);

        let listed = manager.list_triggers(None).await.into_result().unwrap();
        assert!(listed["default"].is_empty());

        conn.execute("UPDATE orders SET total = 30 WHERE id = 1", &[]).await.unwrap();
        assert_eq!(scalar(&conn, "SELECT version FROM orders WHERE id = 1").await, 1);
    }

    #[tokio::test]
    async fn test_recreate_after_restart_is_skipped() {
        let conn = database().await;
        let connections = ConnectionSet::new().with("default", conn.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry = declared();
        let _ = manager.create_triggers(&mut registry, None).await.into_result().unwrap();

        let mut registry = declared();
        let report = manager.create_triggers(&mut registry, None).await.into_result().unwrap();
        assert!(
            report["default"]
                .iter()
                .all(|change| change.kind == ChangeKind::AlreadyInstalled)
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_shared_trigger_name_later_descriptor_wins() {
        let conn = database().await;
        let connections = ConnectionSet::new().with("default", conn.clone());
        let manager = TriggerManager::new(&connections);

        let mut registry: TriggerRegistry = [
            ColumnDescriptor::new("Order", "orders", "version").with_trigger_name("shared"),
            ColumnDescriptor::new("Customer", "customers", "revision")
                .with_primary_key("customer_id")
                .with_trigger_name("shared"),
        ]
        .into_iter()
        .collect();
        let report = manager.create_triggers(&mut registry, None).await.into_result().unwrap();
        assert_eq!(
            names(&report["default"]),
            vec![("shared", ChangeKind::Created), ("shared", ChangeKind::Created)]
        );

        conn.execute("UPDATE orders SET total = 20 WHERE id = 1", &[]).await.unwrap();
        conn.execute("UPDATE customers SET name = 'Grace' WHERE customer_id = 7", &[])
            .await
            .unwrap();
        assert_eq!(scalar(&conn, "SELECT version FROM orders WHERE id = 1").await, 0);
        assert_eq!(
            scalar(&conn, "SELECT revision FROM customers WHERE customer_id = 7").await,
            1
        );

        let listed = manager.list_triggers(None).await.into_result().unwrap();
        assert_eq!(listed["default"], vec!["shared"]);
    }
}
