use std::env;
use std::path::PathBuf;

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = "downloaded_csvs";

/// Connection settings for the object store.
///
/// Explicit keys are optional: when either is missing the client falls back to
/// the ambient AWS credential chain (profile, env, instance metadata).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket used when the caller does not name one (`S3_BUCKET`)
    pub bucket: Option<String>,

    /// Custom endpoint, e.g. MinIO (`S3_ENDPOINT`)
    pub endpoint_url: Option<String>,

    /// Region (`AWS_REGION`, then `AWS_DEFAULT_REGION`, default: "us-east-1")
    pub region: String,

    /// Static access key (`S3_ACCESS_KEY`)
    pub access_key: Option<String>,

    /// Static secret key (`S3_SECRET_KEY`)
    pub secret_key: Option<String>,

    /// Path-style addressing (`S3_FORCE_PATH_STYLE`, default: true when an endpoint is set)
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            endpoint_url: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            force_path_style: false,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint_url = non_empty("S3_ENDPOINT");

        Self {
            bucket: non_empty("S3_BUCKET"),

            region: non_empty("AWS_REGION")
                .or_else(|| non_empty("AWS_DEFAULT_REGION"))
                .unwrap_or(default.region),

            access_key: non_empty("S3_ACCESS_KEY"),

            secret_key: non_empty("S3_SECRET_KEY"),

            force_path_style: non_empty("S3_FORCE_PATH_STYLE")
                .map(|v| parse_flag(&v))
                .unwrap_or(endpoint_url.is_some()),

            endpoint_url,
        }
    }

    /// Both halves of a static key pair, if configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// `true`, `1`, `yes` and `on` (any case) enable a flag; anything else disables it.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Local settings for a compile run.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Scratch directory for downloaded objects (`CSV_STAGING_DIR`, default: "downloaded_csvs")
    pub staging_dir: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
        }
    }
}

impl CompilerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            staging_dir: lookup("CSV_STAGING_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| Self::default().staging_dir),
        }
    }
}
