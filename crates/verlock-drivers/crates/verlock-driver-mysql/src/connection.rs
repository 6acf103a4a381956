//! MySQL connection implementation

use async_trait::async_trait;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, Row as MySqlRow};
use std::sync::atomic::{AtomicBool, Ordering};
use verlock_core::{
    ColumnMeta, Connection, QueryResult, Result, Row, StatementResult, Value, VerlockError,
};

/// MySQL connection wrapper
pub struct MySqlConnection {
    pool: Pool,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Connect to a MySQL database
    pub async fn connect(
        host: &str,
        port: u16,
        database: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        tracing::info!(host = %host, port = %port, database = ?database, "connecting to MySQL database");

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(host)
            .tcp_port(port);

        if let Some(db) = database {
            opts_builder = opts_builder.db_name(Some(db));
        }
        if let Some(u) = user {
            opts_builder = opts_builder.user(Some(u));
        }
        if let Some(p) = password {
            opts_builder = opts_builder.pass(Some(p));
        }

        let constraints = PoolConstraints::new(1, 1).ok_or_else(|| {
            VerlockError::Connection(
                "Failed to configure MySQL pool constraints (min=1, max=1)".into(),
            )
        })?;
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);
        opts_builder = opts_builder.pool_opts(pool_opts);

        let pool = Pool::new(Opts::from(opts_builder));
        // Verify connectivity by acquiring and releasing a connection
        let _conn = pool.get_conn().await.map_err(|e| {
            VerlockError::Connection(format!("Failed to connect to MySQL: {}", e))
        })?;

        tracing::info!(host = %host, port = %port, "MySQL connection established");
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    async fn get_conn(&self) -> Result<Conn> {
        self.pool.get_conn().await.map_err(|e| {
            VerlockError::Connection(format!("Failed to get MySQL connection: {}", e))
        })
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let mut conn = self.get_conn().await?;

        // Trigger DDL is not accepted by the binary protocol on every server
        // version, so unparameterised statements go through the text protocol
        let outcome = if params.is_empty() {
            conn.query_drop(sql).await
        } else {
            conn.exec_drop(sql, to_mysql_params(params)).await
        };
        outcome.map_err(|e| VerlockError::Query(format!("Failed to execute statement: {}", e)))?;

        let affected_rows = conn.affected_rows();
        tracing::debug!(affected_rows = affected_rows, "statement executed");
        Ok(StatementResult::new(affected_rows))
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let mut conn = self.get_conn().await?;

        let mysql_rows: Vec<MySqlRow> = if params.is_empty() {
            conn.query(sql).await
        } else {
            conn.exec(sql, to_mysql_params(params)).await
        }
        .map_err(|e| VerlockError::Query(format!("Failed to execute query: {}", e)))?;

        let mut columns = Vec::new();
        let mut column_names = Vec::new();
        let mut column_types = Vec::new();

        if let Some(first_row) = mysql_rows.first() {
            for (idx, col) in first_row.columns_ref().iter().enumerate() {
                let name = col.name_str().to_string();
                column_names.push(name.clone());
                column_types.push(col.column_type());
                columns.push(ColumnMeta {
                    name,
                    data_type: format!("{:?}", col.column_type()),
                    ordinal: idx,
                });
            }
        }

        let mut rows = Vec::with_capacity(mysql_rows.len());
        for mysql_row in mysql_rows {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, col_type) in column_types.iter().enumerate() {
                let mysql_val: mysql_async::Value =
                    mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                values.push(mysql_value_to_value(mysql_val, *col_type));
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing MySQL connection");
        self.closed.store(true, Ordering::SeqCst);
        self.pool
            .clone()
            .disconnect()
            .await
            .map_err(|e| VerlockError::Connection(format!("Failed to close MySQL pool: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn to_mysql_params(params: &[Value]) -> Params {
    Params::Positional(params.iter().map(value_to_mysql).collect())
}

fn value_to_mysql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::Int(if *b { 1 } else { 0 }),
        Value::Int16(i) => mysql_async::Value::Int(*i as i64),
        Value::Int32(i) => mysql_async::Value::Int(*i as i64),
        Value::Int64(i) => mysql_async::Value::Int(*i),
        Value::Float32(f) => mysql_async::Value::Float(*f),
        Value::Float64(f) => mysql_async::Value::Double(*f),
        Value::String(s) => mysql_async::Value::Bytes(s.as_bytes().to_vec()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b.clone()),
    }
}

/// Convert mysql_async Value to our Value type, using column type metadata
/// to interpret byte strings from the text protocol.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT => {
                    s.parse::<f32>().map(Value::Float32).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => {
            if u <= i64::MAX as u64 {
                Value::Int64(u as i64)
            } else {
                Value::String(u.to_string())
            }
        }
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        // Temporal values only show up in catalog listings here; keep their text form
        other => Value::String(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_protocol_integers_are_parsed() {
        let value = mysql_value_to_value(
            mysql_async::Value::Bytes(b"42".to_vec()),
            ColumnType::MYSQL_TYPE_LONG,
        );
        assert_eq!(value, Value::Int64(42));
    }

    #[test]
    fn test_text_columns_stay_strings() {
        let value = mysql_value_to_value(
            mysql_async::Value::Bytes(b"concurrency_orders_version".to_vec()),
            ColumnType::MYSQL_TYPE_VAR_STRING,
        );
        assert_eq!(value, Value::String("concurrency_orders_version".into()));
    }

    #[test]
    fn test_non_utf8_bytes_are_preserved() {
        let value = mysql_value_to_value(
            mysql_async::Value::Bytes(vec![0xff, 0xfe]),
            ColumnType::MYSQL_TYPE_BLOB,
        );
        assert_eq!(value, Value::Bytes(vec![0xff, 0xfe]));
    }

    #[test]
    fn test_large_unsigned_falls_back_to_string() {
        let value = mysql_value_to_value(mysql_async::Value::UInt(u64::MAX), ColumnType::MYSQL_TYPE_LONGLONG);
        assert_eq!(value, Value::String(u64::MAX.to_string()));
    }

    #[test]
    fn test_value_to_mysql() {
        assert_eq!(value_to_mysql(&Value::Bool(true)), mysql_async::Value::Int(1));
        assert_eq!(value_to_mysql(&Value::Null), mysql_async::Value::NULL);
        assert_eq!(
            value_to_mysql(&Value::String("a".into())),
            mysql_async::Value::Bytes(b"a".to_vec())
        );
    }
}
