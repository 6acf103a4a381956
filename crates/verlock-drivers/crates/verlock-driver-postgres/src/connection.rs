//! PostgreSQL connection implementation

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_postgres::{
    Client, NoTls, Row as PgRow,
    types::{ToSql, Type},
};
use verlock_core::{
    ColumnMeta, Connection, QueryResult, Result, Row, StatementResult, Value, VerlockError,
};

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail()
        && !detail.trim().is_empty()
    {
        message.push_str(&format!(" (detail: {})", detail));
    }

    if let Some(hint) = db_error.hint()
        && !hint.trim().is_empty()
    {
        message.push_str(&format!(" (hint: {})", hint));
    }

    match db_error.code().code() {
        "42501" => format!("insufficient privilege: {}", message),
        "42P01" => format!("undefined table: {}", message),
        "42601" => format!("syntax error: {}", message),
        code => format!("{} (code: {})", message, code),
    }
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    client: Arc<Mutex<Client>>,
    closed: Arc<AtomicBool>,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    pub async fn connect(
        host: &str,
        port: u16,
        database: &str,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        tracing::info!(host = %host, port = %port, database = %database, "connecting to PostgreSQL database");

        let mut config = tokio_postgres::Config::new();
        config.host(host).port(port).dbname(database);
        if let Some(u) = user {
            config.user(u);
        }
        if let Some(p) = password {
            config.password(p);
        }

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            VerlockError::Connection(format!(
                "Failed to connect to PostgreSQL: {}",
                format_postgres_error(&e)
            ))
        })?;

        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
            closed_flag.store(true, Ordering::SeqCst);
        });

        tracing::info!(host = %host, port = %port, database = %database, "PostgreSQL connection established");
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            closed,
        })
    }
}

/// Convert a value into a parameter matching the server-side type of the placeholder
fn to_pg_param(value: &Value, target_type: &Type) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::String(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Float32(f) if *target_type == Type::FLOAT8 => Box::new(*f as f64),
        Value::Float32(f) => Box::new(*f),
        Value::Float64(f) if *target_type == Type::FLOAT4 => Box::new(*f as f32),
        Value::Float64(f) => Box::new(*f),
        Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
            let v = value.as_i64().unwrap_or_default();
            if *target_type == Type::INT2 {
                Box::new(v as i16)
            } else if *target_type == Type::INT4 {
                Box::new(v as i32)
            } else if *target_type == Type::TEXT || *target_type == Type::VARCHAR {
                Box::new(v.to_string())
            } else {
                Box::new(v)
            }
        }
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let client = self.client.lock().await;

        // Simple-query protocol for unparameterised SQL so dollar-quoted
        // function bodies are passed through untouched
        if params.is_empty() {
            client.batch_execute(sql).await.map_err(|e| {
                VerlockError::Query(format!(
                    "Failed to execute statement: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tracing::debug!("statement executed");
            return Ok(StatementResult::new(0));
        }

        let statement = client.prepare(sql).await.map_err(|e| {
            VerlockError::Query(format!(
                "Failed to prepare statement: {}",
                format_postgres_error(&e)
            ))
        })?;

        let pg_params: Vec<Box<dyn ToSql + Sync + Send>> = params
            .iter()
            .zip(statement.params())
            .map(|(value, target_type)| to_pg_param(value, target_type))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = pg_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows_affected = client
            .execute(&statement, &param_refs)
            .await
            .map_err(|e| {
                VerlockError::Query(format!(
                    "Failed to execute statement: {}",
                    format_postgres_error(&e)
                ))
            })?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult::new(rows_affected))
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let client = self.client.lock().await;

        let statement = client.prepare(sql).await.map_err(|e| {
            VerlockError::Query(format!("Failed to prepare query: {}", format_postgres_error(&e)))
        })?;

        let pg_params: Vec<Box<dyn ToSql + Sync + Send>> = params
            .iter()
            .zip(statement.params())
            .map(|(value, target_type)| to_pg_param(value, target_type))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = pg_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let pg_rows = client.query(&statement, &param_refs).await.map_err(|e| {
            VerlockError::Query(format!("Failed to execute query: {}", format_postgres_error(&e)))
        })?;

        let mut columns = Vec::new();
        let mut column_names = Vec::new();
        for (idx, col) in statement.columns().iter().enumerate() {
            let name = col.name().to_string();
            column_names.push(name.clone());
            columns.push(ColumnMeta {
                name,
                data_type: col.type_().name().to_string(),
                ordinal: idx,
            });
        }

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let values = (0..columns.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect();
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
        tracing::info!("closing PostgreSQL connection");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(Value::Int16)
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(Value::Float32)
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        // text, varchar, bpchar, name and anything else with a text representation
        _ => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
