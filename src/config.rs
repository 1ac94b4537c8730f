//! Configuration of the presign server.
//!
//! The configuration is read once at startup, either from the process
//! environment or from a YAML, TOML or JSON file, and is immutable after.

use std::{
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use url::Url;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Lifetime of a signed upload url when none is configured.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 600;
/// Longest lifetime S3 accepts for a presigned url.
pub const MAX_EXPIRES_IN_SECS: u64 = 7 * 24 * 60 * 60;
/// Address the server listens on when none is configured.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

const ENV_REGION: &str = "AWS_REGION";
const ENV_BUCKET: &str = "S3_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "CDN_BASE_URL";
const ENV_ENDPOINT: &str = "S3_ENDPOINT";
const ENV_EXPIRES_IN: &str = "PRESIGN_EXPIRES_IN";
const ENV_CORS: &str = "PRESIGN_CORS";
const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";

/// Process wide configuration of the presign server.
///
/// The `Debug` output never contains the secret access key.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct PresignConfig {
    #[serde(default = "default_region")]
    region: String,
    bucket: String,
    #[serde(default)]
    access_key_id: Option<String>,
    #[serde(default)]
    secret_access_key: Option<String>,
    #[serde(default)]
    public_base_url: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default = "default_expires_in_secs")]
    expires_in_secs: u64,
    #[serde(default = "default_cors")]
    cors: bool,
    #[serde(default = "default_bind_address")]
    bind_address: String,
}

impl std::fmt::Debug for PresignConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[redacted]"),
            )
            .field("public_base_url", &self.public_base_url)
            .field("endpoint", &self.endpoint)
            .field("expires_in_secs", &self.expires_in_secs)
            .field("cors", &self.cors)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

fn default_expires_in_secs() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

fn default_cors() -> bool {
    true
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_owned()
}

impl PresignConfig {
    /// Create a configuration for `bucket` in `region` with defaults for all
    /// other settings.
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
            endpoint: None,
            expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
            cors: true,
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
        }
    }

    /// Use static credentials instead of the SDK default chain.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Serve public urls from `public_base_url`, e.g. a CDN.
    pub fn with_public_base_url(mut self, public_base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(public_base_url.into());
        self
    }

    /// Use a custom S3 compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the lifetime of signed upload urls in seconds.
    pub fn with_expires_in_secs(mut self, expires_in_secs: u64) -> Self {
        self.expires_in_secs = expires_in_secs;
        self
    }

    /// Enable or disable CORS headers.
    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    /// Set the address the server listens on.
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration from variables resolved by `lookup`.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let bucket = var(ENV_BUCKET).ok_or_else(|| ConfigError::missing(ENV_BUCKET))?;
        let mut config = Self::new(bucket, var(ENV_REGION).unwrap_or_else(default_region));
        config.access_key_id = var(ENV_ACCESS_KEY_ID);
        config.secret_access_key = var(ENV_SECRET_ACCESS_KEY);
        config.public_base_url = var(ENV_PUBLIC_BASE_URL);
        config.endpoint = var(ENV_ENDPOINT);

        if let Some(value) = var(ENV_EXPIRES_IN) {
            config.expires_in_secs = value
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_EXPIRES_IN, "expected whole seconds"))?;
        }
        if let Some(value) = var(ENV_CORS) {
            config.cors = value
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_CORS, "expected `true` or `false`"))?;
        }
        if let Some(value) = var(ENV_BIND_ADDRESS) {
            config.bind_address = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from a file. The format is picked from the
    /// file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = PathBuf::from(path.as_ref());
        let format = FileFormat::from_path(&path)?;
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let config = Self::from_contents(&contents, format)?;
        tracing::info!(path = %path.display(), ?format, "loaded configuration file");
        Ok(config)
    }

    /// Parse the configuration from a string in the given format.
    pub fn from_contents(contents: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            FileFormat::Json => serde_json::from_str(contents).map_err(ConfigError::parse)?,
            FileFormat::Yaml => serde_yaml::from_str(contents).map_err(ConfigError::parse)?,
            FileFormat::Toml => toml::from_str(contents).map_err(ConfigError::parse)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the server cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::missing("bucket"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::missing("region"));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigError::invalid(
                "credentials",
                "access key id and secret access key must be set together",
            ));
        }
        if self.expires_in_secs == 0 || self.expires_in_secs > MAX_EXPIRES_IN_SECS {
            return Err(ConfigError::invalid(
                "expires_in_secs",
                format!("must be between 1 and {} seconds", MAX_EXPIRES_IN_SECS),
            ));
        }
        if let Some(base_url) = self.public_base_url() {
            check_http_url("public_base_url", base_url)?;
        }
        if let Some(endpoint) = self.endpoint() {
            check_http_url("endpoint", endpoint)?;
        }
        Ok(())
    }

    /// Region of the bucket.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Bucket uploads are stored in.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Static credentials, if configured. Otherwise the SDK default
    /// credential chain is used.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.access_key_id
            .as_deref()
            .zip(self.secret_access_key.as_deref())
    }

    /// Public base url override, ignoring blank values.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Custom S3 compatible endpoint, ignoring blank values.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// How long a signed upload url stays valid.
    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in_secs)
    }

    /// Whether CORS headers are sent.
    pub fn cors(&self) -> bool {
        self.cors
    }

    /// Address the server listens on.
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// The url an object with `key` can be retrieved from once uploaded.
    ///
    /// Uses the public base url when configured, then the custom endpoint in
    /// path style, and otherwise the virtual hosted S3 url of the bucket.
    pub fn public_url(&self, key: &str) -> String {
        if let Some(base_url) = self.public_base_url() {
            format!("{}/{}", base_url.trim_end_matches('/'), key)
        } else if let Some(endpoint) = self.endpoint() {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

fn check_http_url(setting: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::invalid(setting, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::invalid(
            setting,
            format!("unsupported scheme `{}`", scheme),
        )),
    }
}

/// The file format the configuration is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FileFormat {
    /// Json file format
    Json,
    /// Yaml file format
    Yaml,
    /// Toml file format
    Toml,
}

impl FileFormat {
    /// Determine the file format from the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Errors that can occur while loading the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required setting is absent.
    Missing {
        /// Name of the setting.
        setting: String,
    },
    /// A setting has a value the server cannot use.
    Invalid {
        /// Name of the setting.
        setting: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The configuration file could not be read.
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Reason the read failed.
        reason: String,
    },
    /// The configuration file has an extension that is not supported.
    UnknownFormat {
        /// Path of the configuration file.
        path: PathBuf,
    },
    /// The configuration file could not be parsed.
    Parse {
        /// Reason the parse failed.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(setting: impl Into<String>) -> Self {
        Self::Missing {
            setting: setting.into(),
        }
    }

    pub(crate) fn invalid(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    fn parse(err: impl Display) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing { setting } => {
                write!(f, "required setting `{}` is not configured", setting)
            }
            ConfigError::Invalid { setting, reason } => {
                write!(f, "setting `{}` is invalid: {}", setting, reason)
            }
            ConfigError::Io { path, reason } => {
                write!(f, "could not read `{}`: {}", path.display(), reason)
            }
            ConfigError::UnknownFormat { path } => {
                write!(f, "unsupported configuration file `{}`", path.display())
            }
            ConfigError::Parse { reason } => {
                write!(f, "could not parse configuration: {}", reason)
            }
        }
    }
}

impl Error for ConfigError {}
