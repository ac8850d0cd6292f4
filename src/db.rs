use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{any::AnyPoolOptions, migrate::Migrator, AnyConnection, AnyPool};
use time::OffsetDateTime;

use crate::config::DatabaseConfig;

static SQLITE_MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");
static MYSQL_MIGRATOR: Migrator = sqlx::migrate!("./migrations/mysql");

/// Backend behind the `Any` pool. Queries stick to the SQL both accept
/// (`?` placeholders, no `RETURNING`, unix-second timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    MySql,
}

impl DatabaseKind {
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else {
            anyhow::bail!("unsupported database url scheme (expected sqlite: or mysql:)")
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        }
    }
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let mut options = AnyPoolOptions::new().max_connections(cfg.max_connections);
    // every in-memory SQLite connection is its own database, so pin to one
    if cfg.url.contains(":memory:") {
        options = options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = options
        .connect(&cfg.url)
        .await
        .with_context(|| format!("connect to {} database", cfg.kind.as_str()))?;
    tracing::info!(backend = cfg.kind.as_str(), "database pool ready");
    Ok(pool)
}

pub async fn migrate(pool: &AnyPool, kind: DatabaseKind) -> anyhow::Result<()> {
    let migrator = match kind {
        DatabaseKind::Sqlite => &SQLITE_MIGRATOR,
        DatabaseKind::MySql => &MYSQL_MIGRATOR,
    };
    migrator
        .run(pool)
        .await
        .with_context(|| format!("run {} migrations", kind.as_str()))?;
    tracing::info!(backend = kind.as_str(), "migrations applied");
    Ok(())
}

pub async fn ping(pool: &AnyPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Id of the row just inserted on `conn`. Must run on the same connection
/// (or transaction) as the `INSERT`; the `Any` driver does not report it.
pub async fn last_insert_id(conn: &mut AnyConnection) -> Result<i64, sqlx::Error> {
    let sql = if conn.backend_name().eq_ignore_ascii_case("mysql") {
        "SELECT CAST(LAST_INSERT_ID() AS SIGNED)"
    } else {
        "SELECT last_insert_rowid()"
    };
    sqlx::query_scalar::<_, i64>(sql).fetch_one(conn).await
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub fn to_datetime(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
