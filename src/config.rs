//! Runtime configuration
//!
//! Every knob is read from the environment once at startup. Connection URLs
//! can be supplied whole (`DATABASE_URL`, `REDIS_URL`) or assembled from
//! their component variables, matching how the deployment environments set
//! them.

use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Process-wide settings for the engine, façade, and worker
#[derive(Debug, Clone)]
pub struct Settings {
    // Engine store (PostgreSQL)
    pub postgres_server: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub database_url: Option<String>,
    pub database_pool_size: u32,

    // External record store (MySQL)
    pub external_db_host: String,
    pub external_db_port: u16,
    pub external_db_user: String,
    pub external_db_password: String,
    pub external_db_name: String,

    // Job queue (Redis)
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: u8,
    pub redis_url: Option<String>,
    pub queue_name: String,
    pub max_workers: usize,
    pub job_timeout: Duration,
    pub keep_result: Duration,

    // AWS (blob storage + LLM inference)
    pub aws_region: String,
    pub aws_s3_bucket: String,
    pub model_id: String,

    // External API keys and service endpoints
    pub persona_api_key: Option<String>,
    pub sift_api_key: Option<String>,
    pub ofac_api_url: String,
    pub registry_api_url: String,

    // Auth
    pub secret_key: String,
    pub access_token_expire_minutes: i64,

    // Shared-resource bounds
    pub llm_max_concurrency: usize,
    pub raster_max_concurrency: usize,

    pub log_level: String,
}

impl Settings {
    /// Load settings from the environment
    pub fn from_env() -> Self {
        Self {
            postgres_server: env_or("POSTGRES_SERVER", "localhost"),
            postgres_user: env_or("POSTGRES_USER", "postgres"),
            postgres_password: env_or("POSTGRES_PASSWORD", ""),
            postgres_db: env_or("POSTGRES_DB", "verification"),
            database_url: env_opt("DATABASE_URL"),
            database_pool_size: env_parse("DATABASE_POOL_SIZE", 10),

            external_db_host: env_or("EXTERNAL_DB_HOST", "localhost"),
            external_db_port: env_parse("EXTERNAL_DB_PORT", 3306),
            external_db_user: env_or("EXTERNAL_DB_USER", "root"),
            external_db_password: env_or("EXTERNAL_DB_PASSWORD", ""),
            external_db_name: env_or("EXTERNAL_DB_NAME", "platform"),

            redis_host: env_or("REDIS_HOST", "localhost"),
            redis_port: env_parse("REDIS_PORT", 6379),
            redis_password: env_opt("REDIS_PASSWORD"),
            redis_db: env_parse("REDIS_DB", 0),
            redis_url: env_opt("REDIS_URL"),
            queue_name: env_or("ARQ_QUEUE_NAME", "verification_queue"),
            max_workers: env_parse("ARQ_MAX_WORKERS", 4),
            job_timeout: Duration::from_secs(env_parse("ARQ_JOB_TIMEOUT", 3600)),
            keep_result: Duration::from_secs(env_parse("ARQ_KEEP_RESULT", 86400)),

            aws_region: env_or("AWS_REGION", "us-west-2"),
            aws_s3_bucket: env_or("AWS_S3_BUCKET", "verification-system-documents"),
            model_id: env_or("MODEL_ID", "anthropic.claude-3-sonnet-20240229-v1:0"),

            persona_api_key: env_opt("PERSONA_API_KEY"),
            sift_api_key: env_opt("SIFT_API_KEY"),
            ofac_api_url: env_or("OFAC_API_URL", "http://localhost:8084"),
            registry_api_url: env_or("REGISTRY_API_URL", "https://api.opencorporates.com/v0.4"),

            secret_key: env_or("SECRET_KEY", "change-me"),
            access_token_expire_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 11520),

            llm_max_concurrency: env_parse("LLM_MAX_CONCURRENCY", 10),
            raster_max_concurrency: env_parse("RASTER_MAX_CONCURRENCY", 2),

            log_level: env_or("LOG_LEVEL", "info"),
        }
    }

    /// PostgreSQL connection URL for the engine store
    pub fn postgres_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}/{}",
            self.postgres_user, self.postgres_password, self.postgres_server, self.postgres_db
        )
    }

    /// MySQL connection URL for the external record store
    pub fn external_db_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.external_db_user,
            self.external_db_password,
            self.external_db_host,
            self.external_db_port,
            self.external_db_name
        )
    }

    /// Redis connection URL for the job queue
    pub fn redis_connection_url(&self) -> String {
        if let Some(url) = &self.redis_url {
            return url.clone();
        }
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis_host, self.redis_port, self.redis_db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis_host, self.redis_port, self.redis_db
            ),
        }
    }
}
