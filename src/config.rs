use anyhow::Context;
use serde::Deserialize;

use crate::db::DatabaseKind;

const DEV_SECRET_KEY: &str = "your-secret-key-change-this";
const SQLITE_FALLBACK_URL: &str = "sqlite://recipe_db.sqlite?mode=rwc";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub kind: DatabaseKind,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_url: String,
    pub webhook_secret: Option<String>,
    pub currency: String,
    pub monthly_price_cents: i64,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub openai: OpenAiConfig,
    pub payments: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so resolution can be
    /// tested without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT").or_else(|| get("APP_PORT")) {
            Some(p) => p.trim().parse::<u16>().context("PORT must be a valid port")?,
            None => 5000,
        };

        let url = resolve_database_url(&get);
        let database = DatabaseConfig {
            kind: DatabaseKind::from_url(&url)?,
            url,
            max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), 10),
        };

        let secret = get("SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY not set; using the development default");
            DEV_SECRET_KEY.into()
        });
        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "recipe-suggest".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "recipe-suggest-users".into()),
            ttl_minutes: parse_or(get("JWT_TTL_MINUTES"), 60 * 24),
        };

        let openai = OpenAiConfig {
            api_key: get("OPENAI_API_KEY"),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".into()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
            timeout_secs: parse_or(get("OPENAI_TIMEOUT_SECS"), 60),
        };

        let payments = PaymentConfig {
            enabled: get("ENABLE_PAYMENTS").map(|v| is_truthy(&v)).unwrap_or(false),
            api_key: get("PAYMENT_API_KEY"),
            api_url: get("PAYMENT_API_URL")
                .unwrap_or_else(|| "https://api.checkout.example/v1/checkouts".into()),
            webhook_secret: get("PAYMENT_WEBHOOK_SECRET"),
            currency: get("PAYMENT_CURRENCY").unwrap_or_else(|| "USD".into()),
            monthly_price_cents: parse_or(get("PREMIUM_MONTHLY_PRICE_CENTS"), 999),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database,
            jwt,
            openai,
            payments,
        })
    }
}

/// Explicit URL first, then discrete MySQL settings, then a local SQLite file.
fn resolve_database_url<F>(get: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("DATABASE_URL") {
        return url;
    }
    if let (Some(host), Some(user), Some(password)) =
        (get("MYSQL_HOST"), get("MYSQL_USER"), get("MYSQL_PASSWORD"))
    {
        let database = get("MYSQL_DATABASE").unwrap_or_else(|| "recipe_db".into());
        let port = get("MYSQL_PORT").unwrap_or_else(|| "3306".into());
        return format!(
            "mysql://{}:{}@{}:{}/{}",
            urlencoding::encode(&user),
            urlencoding::encode(&password),
            host,
            port,
            urlencoding::encode(&database)
        );
    }
    tracing::info!("no database configured; using local SQLite file");
    SQLITE_FALLBACK_URL.into()
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
