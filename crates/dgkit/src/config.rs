//! Deployment configuration.
//!
//! [`Config`] is the immutable record every operation in this crate takes: the
//! server location, the schema source, the JWT claims field and signing secret,
//! and the footer appended to the schema before it is published.
//!
//! [`Settings`] is the serializable form loaded from a TOML file and `DGKIT__*`
//! environment variables (see [`loader::load_settings`]).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DgkitError, DgkitResult};

/// Delay between two schema submissions while the server is lazy-loading.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Claims namespace Dgraph looks up by default.
pub const DEFAULT_CLAIMS_NAMESPACE: &str = "https://dgraph.io/jwt/claims";

// ============================================================================
// Config
// ============================================================================

/// Connection and schema settings for one Dgraph deployment.
#[derive(Clone)]
pub struct Config {
    /// Server base URL without port (e.g. `http://localhost`).
    pub url: String,
    /// Server HTTP port.
    pub port: u16,
    /// Schema source: a GraphQL schema file or a `.js` schema module.
    pub schema: PathBuf,
    /// JWT payload field that carries the claims value.
    pub claims: String,
    /// HS256 signing secret.
    pub secret: String,
    /// Text appended to the loaded schema before it is published.
    pub schema_footer: SchemaFooter,
    /// Lazy-load retry behaviour of the schema publisher.
    pub retry: RetryPolicy,
    /// Lifetime of issued tokens. `None` issues tokens without `exp`.
    pub token_ttl: Option<Duration>,
}

impl Config {
    /// Creates a configuration with an empty footer and the default retry policy.
    pub fn new(
        url: impl Into<String>,
        port: u16,
        schema: impl Into<PathBuf>,
        claims: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            port,
            schema: schema.into(),
            claims: claims.into(),
            secret: secret.into(),
            schema_footer: SchemaFooter::none(),
            retry: RetryPolicy::default(),
            token_ttl: None,
        }
    }

    /// Sets the schema footer.
    #[must_use]
    pub fn with_schema_footer(mut self, footer: SchemaFooter) -> Self {
        self.schema_footer = footer;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the token lifetime.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Returns `<url>:<port>`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }

    /// Returns `<url>:<port>/<path>`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Admin endpoint used for schema updates.
    #[must_use]
    pub fn admin_url(&self) -> String {
        self.endpoint("admin")
    }

    /// GraphQL data endpoint.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        self.endpoint("graphql")
    }

    /// Alter endpoint used for dropping data.
    #[must_use]
    pub fn alter_url(&self) -> String {
        self.endpoint("alter")
    }

    /// Renders the schema footer for this configuration.
    #[must_use]
    pub fn footer(&self) -> String {
        self.schema_footer.render(self)
    }

    /// Checks that the configuration can be used against a server.
    ///
    /// # Errors
    /// Returns `DgkitError::Config` describing the first invalid field.
    pub fn validate(&self) -> DgkitResult<()> {
        if self.url.trim().is_empty() {
            return Err(DgkitError::config("url must not be empty"));
        }
        if self.port == 0 {
            return Err(DgkitError::config("port must be > 0"));
        }
        url::Url::parse(&self.base_url())
            .map_err(|e| DgkitError::config(format!("invalid url {}: {e}", self.base_url())))?;
        if self.schema.as_os_str().is_empty() {
            return Err(DgkitError::config("schema must name a file"));
        }
        if self.claims.is_empty() {
            return Err(DgkitError::config("claims must not be empty"));
        }
        if self.secret.is_empty() {
            return Err(DgkitError::config("secret must not be empty"));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(DgkitError::config("retry.max_attempts must be > 0"));
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("claims", &self.claims)
            .field("secret", &"<redacted>")
            .field("schema_footer", &self.schema_footer)
            .field("retry", &self.retry)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

// ============================================================================
// Schema Footer
// ============================================================================

type FooterFn = dyn Fn(&Config) -> String + Send + Sync;

/// A function of the whole configuration producing text appended to the schema.
#[derive(Clone)]
pub struct SchemaFooter(Arc<FooterFn>);

impl SchemaFooter {
    /// Wraps an arbitrary footer function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Config) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Footer that appends nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::new(|_| String::new())
    }

    /// Footer that appends a fixed text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| text.clone())
    }

    /// Footer that appends the `# Dgraph.Authorization` line matching the
    /// tokens issued by [`crate::token::token`].
    #[must_use]
    pub fn authorization() -> Self {
        Self::new(authorization_footer)
    }

    /// Footer rendering `self` followed by `next`.
    #[must_use]
    pub fn then(self, next: SchemaFooter) -> Self {
        Self::new(move |config| {
            let mut out = self.render(config);
            out.push_str(&next.render(config));
            out
        })
    }

    /// Renders the footer.
    #[must_use]
    pub fn render(&self, config: &Config) -> String {
        (self.0)(config)
    }
}

impl Default for SchemaFooter {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for SchemaFooter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchemaFooter(..)")
    }
}

/// Renders the `# Dgraph.Authorization` schema line for HS256 tokens carried
/// in the `Authorization` header.
#[must_use]
pub fn authorization_footer(config: &Config) -> String {
    let auth = serde_json::json!({
        "VerificationKey": config.secret,
        "Header": "Authorization",
        "Namespace": config.claims,
        "Algo": "HS256",
    });
    format!("\n# Dgraph.Authorization {auth}\n")
}

// ============================================================================
// Retry Policy
// ============================================================================

/// How the schema publisher waits for a lazy-loading server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Upper bound on submissions. `None` retries until the server is ready.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Returns `true` if another attempt is allowed after `attempts` submissions.
    #[must_use]
    pub fn allows_another(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            max_attempts: None,
        }
    }
}

// ============================================================================
// Settings (file / environment form)
// ============================================================================

/// Serializable configuration, as found in `dgkit.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub schema: PathBuf,
    #[serde(default = "default_claims")]
    pub claims: String,
    #[serde(default)]
    pub secret: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub token_ttl_secs: Option<u64>,
    #[serde(default)]
    pub footer: FooterSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Settings {
    /// Converts the settings into a validated [`Config`].
    ///
    /// # Errors
    /// Returns `DgkitError::Config` if validation fails.
    pub fn into_config(self) -> DgkitResult<Config> {
        let mut config = Config::new(self.url, self.port, self.schema, self.claims, self.secret)
            .with_schema_footer(self.footer.to_footer())
            .with_retry(self.retry.to_policy());
        if let Some(secs) = self.token_ttl_secs {
            config = config.with_token_ttl(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("claims", &self.claims)
            .field("secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("footer", &self.footer)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Footer selection in the settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FooterSettings {
    /// Append the `# Dgraph.Authorization` line.
    #[serde(default)]
    pub authorization: bool,
    /// Literal text appended before the authorization line.
    #[serde(default)]
    pub text: Option<String>,
}

impl FooterSettings {
    fn to_footer(&self) -> SchemaFooter {
        let mut footer = match &self.text {
            Some(text) => SchemaFooter::text(text.clone()),
            None => SchemaFooter::none(),
        };
        if self.authorization {
            footer = footer.then(SchemaFooter::authorization());
        }
        footer
    }
}

/// Retry settings in the settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RetrySettings {
    fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay_ms(),
            max_attempts: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_claims() -> String {
    DEFAULT_CLAIMS_NAMESPACE.to_string()
}

fn default_retry_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX)
}

pub mod loader {
    use super::Settings;
    use crate::error::DgkitResult;
    use ::config::{Config, Environment, File, FileFormat};
    use std::path::{Path, PathBuf};

    /// Default settings file looked up in the working directory.
    pub const DEFAULT_SETTINGS_FILE: &str = "dgkit.toml";

    /// Loads settings from a TOML file (or `dgkit.toml` when present) layered
    /// with `DGKIT__*` environment variables, e.g. `DGKIT__PORT=9080` or
    /// `DGKIT__RETRY__DELAY_MS=500`.
    ///
    /// A relative `schema` path is resolved against the settings file's
    /// directory.
    pub fn load_settings(path: Option<&Path>) -> DgkitResult<Settings> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        let mut builder = Config::builder();
        if let Some(p) = &file {
            builder = builder.add_source(File::from(p.as_path()).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix("DGKIT")
                .try_parsing(true)
                .separator("__"),
        );
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(dir) = file.as_deref().and_then(Path::parent)
            && settings.schema.is_relative()
            && !settings.schema.as_os_str().is_empty()
        {
            settings.schema = dir.join(&settings.schema);
        }
        tracing::debug!(settings = ?settings, "settings loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::new(
            "http://localhost",
            8080,
            "schema.graphql",
            "https://dgraph.io/jwt/claims",
            "s3cr3t",
        )
    }

    #[test]
    fn test_endpoints() {
        let config = test_config();
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.admin_url(), "http://localhost:8080/admin");
        assert_eq!(config.graphql_url(), "http://localhost:8080/graphql");
        assert_eq!(config.alter_url(), "http://localhost:8080/alter");
    }

    #[test]
    fn test_trailing_slash_in_url_is_ignored() {
        let mut config = test_config();
        config.url = "http://localhost/".to_string();
        assert_eq!(config.graphql_url(), "http://localhost:8080/graphql");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_footer_is_function_of_config() {
        let config = test_config()
            .with_schema_footer(SchemaFooter::new(|c| format!("# port {}", c.port)));
        assert_eq!(config.footer(), "# port 8080");
    }

    #[test]
    fn test_footer_composition_keeps_order() {
        let config = test_config().with_schema_footer(
            SchemaFooter::text("type Extra { id: ID! }\n").then(SchemaFooter::text("# end\n")),
        );
        assert_eq!(config.footer(), "type Extra { id: ID! }\n# end\n");
    }

    #[test]
    fn test_authorization_footer() {
        let footer = authorization_footer(&test_config());
        assert!(footer.starts_with("\n# Dgraph.Authorization {"));
        assert!(footer.ends_with("}\n"));

        let json = footer
            .trim()
            .trim_start_matches("# Dgraph.Authorization ")
            .to_string();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["VerificationKey"], "s3cr3t");
        assert_eq!(value["Namespace"], "https://dgraph.io/jwt/claims");
        assert_eq!(value["Header"], "Authorization");
        assert_eq!(value["Algo"], "HS256");
    }

    #[test]
    fn test_retry_policy_default_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(2000));
        assert!(policy.allows_another(1_000_000));
    }

    #[test]
    fn test_retry_settings_default_delay() {
        assert_eq!(default_retry_delay_ms(), 2000);
        assert_eq!(RetrySettings::default().to_policy().delay, DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_retry_policy_budget() {
        let policy = RetryPolicy {
            delay: Duration::ZERO,
            max_attempts: Some(3),
        };
        assert!(policy.allows_another(2));
        assert!(!policy.allows_another(3));
    }

    #[test]
    fn test_validate() {
        assert!(test_config().validate().is_ok());

        let mut config = test_config();
        config.secret.clear();
        assert!(matches!(config.validate(), Err(DgkitError::Config { .. })));

        let mut config = test_config();
        config.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let config = test_config().with_retry(RetryPolicy {
            delay: Duration::ZERO,
            max_attempts: Some(0),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_into_config() {
        let settings = Settings {
            url: "http://dgraph".to_string(),
            port: 9080,
            schema: PathBuf::from("schema.graphql"),
            claims: "user".to_string(),
            secret: "secret".to_string(),
            token_ttl_secs: Some(60),
            footer: FooterSettings {
                authorization: true,
                text: Some("# footer".to_string()),
            },
            retry: RetrySettings {
                delay_ms: 10,
                max_attempts: Some(5),
            },
        };
        let config = settings.into_config().unwrap();
        assert_eq!(config.base_url(), "http://dgraph:9080");
        assert_eq!(config.token_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.retry.delay, Duration::from_millis(10));
        assert_eq!(config.retry.max_attempts, Some(5));

        let footer = config.footer();
        assert!(footer.starts_with("# footer\n# Dgraph.Authorization"));
    }
}
