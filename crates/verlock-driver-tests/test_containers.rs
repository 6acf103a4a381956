//! Docker container management for integration tests.
//!
//! Each server is started lazily on first request and reused by every test in
//! the process. The lock is held across startup so concurrent tests never
//! start a second container.

use once_cell::sync::Lazy;
use std::env;
use std::path::Path;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::{mysql::Mysql, postgres::Postgres};
use tokio::sync::Mutex;

/// Connection details of a running test server
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication (empty for the MySQL root user)
    pub password: String,
}

struct RunningContainer<I: testcontainers::Image> {
    #[allow(dead_code)]
    inner: ContainerAsync<I>,
    info: ContainerInfo,
}

static POSTGRES_CONTAINER: Lazy<Mutex<Option<RunningContainer<Postgres>>>> =
    Lazy::new(|| Mutex::new(None));

static MYSQL_CONTAINER: Lazy<Mutex<Option<RunningContainer<Mysql>>>> =
    Lazy::new(|| Mutex::new(None));

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

/// Whether tests should use servers managed outside the test process
///
/// Set `VERLOCK_TEST_MANUAL_CONTAINERS=1` and point the tests at them with
/// `VERLOCK_TEST_POSTGRES_PORT` / `VERLOCK_TEST_MYSQL_PORT`.
pub fn use_manual_containers() -> bool {
    env_flag("VERLOCK_TEST_MANUAL_CONTAINERS")
}

/// Whether container-backed tests can run at all
///
/// False when `VERLOCK_TEST_SKIP_CONTAINERS=1` is set, or when neither
/// `DOCKER_HOST` nor a local Docker socket is present.
pub fn containers_available() -> bool {
    if env_flag("VERLOCK_TEST_SKIP_CONTAINERS") {
        return false;
    }
    if use_manual_containers() || env::var_os("DOCKER_HOST").is_some() {
        return true;
    }
    let mut sockets = vec![Path::new("/var/run/docker.sock").to_path_buf()];
    if let Some(home) = env::var_os("HOME") {
        sockets.push(Path::new(&home).join(".docker/run/docker.sock"));
    }
    sockets.iter().any(|socket| socket.exists())
}

fn manual_port(name: &str, default: u16) -> anyhow::Result<u16> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}='{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Get or start the PostgreSQL server
///
/// Runs the testcontainers-modules default image (user, password and
/// database all `postgres`) on a random host port.
pub async fn postgres_container() -> anyhow::Result<ContainerInfo> {
    if use_manual_containers() {
        return Ok(ContainerInfo {
            host: "127.0.0.1".to_string(),
            port: manual_port("VERLOCK_TEST_POSTGRES_PORT", 5432)?,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        });
    }

    let mut guard = POSTGRES_CONTAINER.lock().await;
    if let Some(ref container) = *guard {
        return Ok(container.info.clone());
    }

    tracing::info!("starting PostgreSQL test container");
    let container = Postgres::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start postgres container: {}", e))?;
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get postgres port: {}", e))?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
    };
    tracing::info!(port, "PostgreSQL test container started");

    *guard = Some(RunningContainer {
        inner: container,
        info: info.clone(),
    });
    Ok(info)
}

/// Get or start the MySQL server
///
/// Runs the testcontainers-modules default image (root user, empty password,
/// `test` database) on a random host port.
pub async fn mysql_container() -> anyhow::Result<ContainerInfo> {
    if use_manual_containers() {
        return Ok(ContainerInfo {
            host: "127.0.0.1".to_string(),
            port: manual_port("VERLOCK_TEST_MYSQL_PORT", 3306)?,
            database: "test".to_string(),
            username: "root".to_string(),
            password: String::new(),
        });
    }

    let mut guard = MYSQL_CONTAINER.lock().await;
    if let Some(ref container) = *guard {
        return Ok(container.info.clone());
    }

    tracing::info!("starting MySQL test container");
    let container = Mysql::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mysql container: {}", e))?;
    let port = container
        .get_host_port_ipv4(3306)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mysql port: {}", e))?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "test".to_string(),
        username: "root".to_string(),
        password: String::new(),
    };
    tracing::info!(port, "MySQL test container started");

    *guard = Some(RunningContainer {
        inner: container,
        info: info.clone(),
    });
    Ok(info)
}
