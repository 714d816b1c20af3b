use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage_backend: StorageBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub media_backend: MediaBackend,
    pub minio: MinioConfig,
    pub local_media: LocalMediaConfig,
    pub pages: PagesConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

/// Which persistence stack backs pages, feedback and rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Postgres for pages and feedback, Redis for rate-limit counters.
    Postgres,
    /// Process-local maps. Data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Where uploaded photos end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaBackend {
    /// S3-compatible bucket with public-read objects.
    Minio,
    /// Files under a local directory, served by this process at `/media`.
    Local,
}

impl FromStr for MediaBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minio" | "s3" => Ok(Self::Minio),
            "local" | "fs" => Ok(Self::Local),
            other => Err(format!("unknown media backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub photos_bucket: String,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalMediaConfig {
    pub dir: PathBuf,
    /// Prefix for photo URLs handed to clients, e.g. `http://localhost:5000/media`.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct PagesConfig {
    /// Lifetime of a page, measured from `createdAt`.
    pub ttl: Duration,
    /// How often the background sweeper deletes expired pages.
    pub sweep_interval: Duration,
    pub max_photos: usize,
    pub max_photo_bytes: usize,
    pub json_body_limit: usize,
}

impl PagesConfig {
    /// Upper bound for a multipart creation request: every photo at full
    /// size plus room for the text fields.
    pub fn upload_body_limit(&self) -> usize {
        self.max_photos
            .saturating_mul(self.max_photo_bytes)
            .saturating_add(self.json_body_limit)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    pub max_requests: u32,
    /// Take the client address from `X-Forwarded-For` instead of the socket.
    pub trust_proxy: bool,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:5173,https://goodmemories-frontend.onrender.com";

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup, falling
    /// back to defaults for anything missing or unparsable.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());

        let port: u16 = var("SERVER_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        let storage_backend = var("STORAGE_BACKEND")
            .and_then(|s| s.parse().ok())
            .unwrap_or(StorageBackend::Postgres);

        Config {
            server: ServerConfig {
                host: string("SERVER_HOST", "0.0.0.0"),
                port,
                environment: string("ENVIRONMENT", "development"),
            },
            storage_backend,
            // Memory mode runs without any external service unless told otherwise.
            media_backend: var("MEDIA_BACKEND")
                .and_then(|s| s.parse().ok())
                .unwrap_or(match storage_backend {
                    StorageBackend::Postgres => MediaBackend::Minio,
                    StorageBackend::Memory => MediaBackend::Local,
                }),
            database: DatabaseConfig {
                host: string("DB_HOST", "localhost"),
                port: var("DB_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5432),
                user: string("DB_USER", "postgres"),
                password: string("DB_PASSWORD", "postgres"),
                database: string("DB_NAME", "purethanks"),
                ssl_mode: string("DB_SSL_MODE", "disable"),
                max_connections: var("DB_MAX_CONNS")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(10),
            },
            redis: RedisConfig {
                host: string("REDIS_HOST", "localhost"),
                port: var("REDIS_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(6379),
                password: var("REDIS_PASSWORD"),
                db: var("REDIS_DB").and_then(|p| p.parse().ok()).unwrap_or(0),
            },
            minio: MinioConfig {
                endpoint: string("MINIO_ENDPOINT", "http://localhost:9000"),
                access_key: string("MINIO_ACCESS_KEY", "minioadmin"),
                secret_key: string("MINIO_SECRET_KEY", "minioadmin"),
                region: string("MINIO_REGION", "us-east-1"),
                photos_bucket: string("MINIO_PHOTOS_BUCKET", "ourmemory"),
                public_url: var("MINIO_PUBLIC_URL"),
            },
            local_media: LocalMediaConfig {
                dir: PathBuf::from(string("MEDIA_DIR", "./media")),
                public_url: string("MEDIA_PUBLIC_URL", &format!("http://localhost:{}/media", port))
                    .trim_end_matches('/')
                    .to_string(),
            },
            pages: PagesConfig {
                ttl: Duration::from_secs(parsed("PAGE_TTL_SECS").unwrap_or(24 * 60 * 60)),
                sweep_interval: Duration::from_secs(
                    parsed("EXPIRY_SWEEP_INTERVAL_SECS")
                        .filter(|s| *s > 0)
                        .unwrap_or(60),
                ),
                max_photos: 5,
                max_photo_bytes: parsed("MAX_PHOTO_BYTES").unwrap_or(10 * 1024 * 1024) as usize,
                json_body_limit: 10 * 1024 * 1024,
            },
            rate_limit: RateLimitConfig {
                enabled: var("RATE_LIMIT_ENABLED")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                window: Duration::from_secs(
                    parsed("RATE_LIMIT_WINDOW_SECS")
                        .filter(|s| *s > 0)
                        .unwrap_or(15 * 60), // 15 minutes
                ),
                max_requests: var("RATE_LIMIT_MAX_REQUESTS")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(100),
                trust_proxy: var("RATE_LIMIT_TRUST_PROXY")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(
                    &var("CORS_ALLOWED_ORIGINS")
                        .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
                ),
            },
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database,
            self.database.ssl_mode
        )
    }

    pub fn redis_url(&self) -> String {
        match &self.redis.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
