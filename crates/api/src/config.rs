use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use keychain_core::kernel::ExternalKernel;
use keychain_core::layout::StorageLayout;
use keychain_core::retention::RetentionPolicy;

/// Settings for the external CAD kernel process.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Program to spawn (default: `keychain-cad`).
    pub program: String,
    /// Extra arguments, parsed from whitespace-separated `CAD_KERNEL_ARGS`.
    pub args: Vec<String>,
    /// Wall-clock limit per build in seconds (default: `240`).
    pub timeout_secs: u64,
}

impl KernelConfig {
    pub fn build_kernel(&self) -> ExternalKernel {
        ExternalKernel::new(
            self.program.clone(),
            self.args.clone(),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins from comma-separated `CORS_ORIGINS`. A single `*`
    /// allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Working directories.
    pub layout: StorageLayout,
    /// Seconds between retention sweeps (default: `3600`).
    pub sweep_interval_secs: u64,
    /// Files older than this many seconds are swept (default: `3600`).
    pub sweep_max_age_secs: u64,
    /// CAD kernel process settings.
    pub kernel: KernelConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default               |
    /// |---------------------------|-----------------------|
    /// | `HOST`                    | `0.0.0.0`             |
    /// | `PORT`                    | `8000`                |
    /// | `CORS_ORIGINS`            | `*`                   |
    /// | `REQUEST_TIMEOUT_SECS`    | `300`                 |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `10`                  |
    /// | `BASE_MODELS_DIR`         | `base_models`         |
    /// | `UPLOADS_DIR`             | `/tmp/temp_uploads`   |
    /// | `CACHE_DIR`               | `/tmp/cache`          |
    /// | `PREVIEW_DIR`             | `/tmp/preview_models` |
    /// | `SWEEP_INTERVAL_SECS`     | `3600`                |
    /// | `SWEEP_MAX_AGE_SECS`      | `3600`                |
    /// | `CAD_KERNEL_PROGRAM`      | `keychain-cad`        |
    /// | `CAD_KERNEL_ARGS`         | (none)                |
    /// | `CAD_KERNEL_TIMEOUT_SECS` | `240`                 |
    ///
    /// Panics on unparsable numeric values, and on a zero sweep interval, so
    /// misconfiguration fails fast.
    pub fn from_env() -> Self {
        let host = env_string("HOST", "0.0.0.0");
        let port: u16 = env_parse("PORT", 8000);

        let cors_origins: Vec<String> = env_string("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let layout = StorageLayout {
            base_models_dir: PathBuf::from(env_string("BASE_MODELS_DIR", "base_models")),
            uploads_dir: PathBuf::from(env_string("UPLOADS_DIR", "/tmp/temp_uploads")),
            cache_dir: PathBuf::from(env_string("CACHE_DIR", "/tmp/cache")),
            preview_dir: PathBuf::from(env_string("PREVIEW_DIR", "/tmp/preview_models")),
        };

        let kernel = KernelConfig {
            program: env_string("CAD_KERNEL_PROGRAM", "keychain-cad"),
            args: env_string("CAD_KERNEL_ARGS", "")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            timeout_secs: env_parse("CAD_KERNEL_TIMEOUT_SECS", 240),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 300),
            shutdown_timeout_secs: env_parse("SHUTDOWN_TIMEOUT_SECS", 10),
            layout,
            sweep_interval_secs: require_nonzero(
                "SWEEP_INTERVAL_SECS",
                env_parse("SWEEP_INTERVAL_SECS", 3600),
            ),
            sweep_max_age_secs: env_parse("SWEEP_MAX_AGE_SECS", 3600),
            kernel,
        }
    }

    /// True if CORS should allow any origin.
    pub fn cors_allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }

    /// Retention policy for the in-process sweeper: uploads and cache.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            dirs: vec![
                self.layout.uploads_dir.clone(),
                self.layout.cache_dir.clone(),
            ],
            max_age: Duration::from_secs(self.sweep_max_age_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

fn require_nonzero(key: &str, value: u64) -> u64 {
    if value == 0 {
        panic!("{key} must be greater than zero");
    }
    value
}
