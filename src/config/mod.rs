use serde::Deserialize;
use std::env;

// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub cors: CorsConfig,
    pub pagination: PaginationConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `pretty` or `json`
    pub log_format: String,
}

// Database settings. Without a url the in-memory store is used.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Redis settings. Without a url the listing cache is off.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub listing_ttl_seconds: u64,
}

// JWT settings
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub my_events_limit: u32,
}

impl Config {
    /// Defaults, then `eventhub.toml`, then `EVENTHUB__SECTION__KEY`,
    /// then the conventional flat variables (`PORT`, `DATABASE_URL`, ...).
    pub fn load() -> Result<Self, config::ConfigError> {
        let origins = env::var("CORS_ORIGINS").ok().map(|raw| {
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        });

        config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "eventhub=debug,tower_http=debug")?
            .set_default("app.log_format", "pretty")?
            .set_default("database.pool_size", 20)?
            .set_default("redis.listing_ttl_seconds", 30)?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.expires_in_hours", 24 * 7)?
            .set_default("security.bcrypt_cost", bcrypt::DEFAULT_COST)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("pagination.default_limit", 12)?
            .set_default("pagination.my_events_limit", 10)?
            .add_source(config::File::with_name("eventhub").required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("app.host", env::var("HOST").ok())?
            .set_override_option("app.port", env::var("PORT").ok())?
            .set_override_option("app.environment", env::var("ENVIRONMENT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .set_override_option("app.log_format", env::var("LOG_FORMAT").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("database.pool_size", env::var("DB_POOL_SIZE").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", env::var("JWT_SECRET").ok())?
            .set_override_option("jwt.expires_in_hours", env::var("JWT_EXPIRES_IN_HOURS").ok())?
            .set_override_option("security.bcrypt_cost", env::var("BCRYPT_COST").ok())?
            .set_override_option("cors.allowed_origins", origins)?
            .build()?
            .try_deserialize()
    }

    /// In-memory configuration with cheap hashing, used by tests and demos.
    pub fn for_tests() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                rust_log: "eventhub=debug".to_string(),
                log_format: "pretty".to_string(),
            },
            database: DatabaseConfig { url: None, pool_size: 1 },
            redis: RedisConfig { url: None, listing_ttl_seconds: 30 },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                expires_in_hours: 1,
            },
            security: SecurityConfig { bcrypt_cost: 4 },
            cors: CorsConfig { allowed_origins: vec!["http://localhost:3000".to_string()] },
            pagination: PaginationConfig { default_limit: 12, my_events_limit: 10 },
        }
    }
}
