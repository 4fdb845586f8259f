//! Schema publishing and data dropping against the admin endpoints.
//!
//! Publishing goes through these states:
//!
//! ```text
//! Loading ──► Submitting ──► Success
//!                 ▲    │
//!                 │    ├──► Fatal
//!                 │    ▼
//!                 └─ Retry   (server still lazy-loading, wait retry.delay)
//! ```
//!
//! A submission is retried only when the server answers with exactly one error
//! whose message starts with [`LAZY_LOAD_MARKER`]. Any other error ends the
//! publish with the first error's message. Without `retry.max_attempts` the
//! loop waits for the server indefinitely.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::client::{GraphQLError, GraphQLResponse, handle_response};
use crate::config::Config;
use crate::error::{DgkitError, DgkitResult};
use crate::schema::SchemaSource;

/// Message prefix of the transient error returned while a schema is loading.
pub const LAZY_LOAD_MARKER: &str = "failed to lazy-load GraphQL schema";

/// Mutation replacing the GraphQL schema.
pub const UPDATE_SCHEMA_MUTATION: &str = r#"mutation($schema: String!) {
  updateGQLSchema(input: { set: { schema: $schema } }) {
    gqlSchema {
      schema
    }
  }
}"#;

/// States of a schema publish, as reported in the `state` log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    /// Reading the schema source and appending the footer.
    Loading,
    /// Posting the mutation to `/admin`.
    Submitting,
    /// Waiting `retry.delay` before the next submission.
    Retry,
    /// The server accepted the schema.
    Success,
    /// The publish ended with an error.
    Fatal,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Submitting => "submitting",
            Self::Retry => "retry",
            Self::Success => "success",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// How the admin endpoint answered one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No errors: the schema is live.
    Accepted,
    /// A single lazy-load error: try again later.
    LazyLoading,
    /// Anything else; carries the first error's message.
    Rejected(String),
}

impl SubmitOutcome {
    /// Classifies the `errors` list of an admin response.
    #[must_use]
    pub fn classify(errors: &[GraphQLError]) -> Self {
        match errors {
            [] => Self::Accepted,
            [only] if only.message.starts_with(LAZY_LOAD_MARKER) => Self::LazyLoading,
            [first, ..] => Self::Rejected(first.message.clone()),
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Number of submissions made, including the accepted one.
    pub attempts: u32,
    /// The schema text as submitted, footer included.
    pub schema: String,
}

#[derive(Serialize)]
struct SchemaVariables<'a> {
    schema: &'a str,
}

/// Client for the `/admin` and `/alter` endpoints of one deployment.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    config: Config,
}

impl AdminClient {
    /// Creates a client with its own HTTP connection pool.
    pub fn new(config: Config) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Creates a client sharing an existing HTTP connection pool.
    pub fn with_http(http: reqwest::Client, config: Config) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads the configured schema source and appends the footer.
    ///
    /// The source is read again on every call.
    ///
    /// # Errors
    /// Returns the schema error of the source; it is logged first.
    pub async fn load_schema_text(&self) -> DgkitResult<String> {
        let source = SchemaSource::from_path(&self.config.schema);
        let mut schema = source.read().await.inspect_err(|e| {
            tracing::error!(source = %source.path().display(), error = %e, "failed to load schema");
        })?;
        schema.push_str(&self.config.footer());
        Ok(schema)
    }

    /// Loads the schema and submits it until the server accepts it.
    ///
    /// # Errors
    /// Returns schema errors from loading, `SchemaRejected` when the server
    /// refuses the schema, `RetriesExhausted` when the retry budget runs out,
    /// and transport or status errors unchanged.
    pub async fn publish_schema(&self) -> DgkitResult<PublishReport> {
        tracing::debug!(state = %PublishState::Loading, schema = %self.config.schema.display(), "publish");
        let schema = self.load_schema_text().await?;
        tracing::info!(url = %self.config.admin_url(), schema = %schema, "publishing schema");
        self.submit_schema(schema).await
    }

    /// Submits an already loaded schema, retrying while the server lazy-loads.
    ///
    /// # Errors
    /// See [`AdminClient::publish_schema`].
    pub async fn submit_schema(&self, schema: String) -> DgkitResult<PublishReport> {
        let url = self.config.admin_url();
        let retry = self.config.retry;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            tracing::debug!(state = %PublishState::Submitting, attempt = attempts, "publish");

            let response: GraphQLResponse<Value> = self
                .post_graphql(&url, UPDATE_SCHEMA_MUTATION, &SchemaVariables { schema: &schema })
                .await
                .inspect_err(|e| {
                    tracing::debug!(state = %PublishState::Fatal, error = %e, "publish");
                })?;

            match SubmitOutcome::classify(response.errors()) {
                SubmitOutcome::Accepted => {
                    tracing::info!(state = %PublishState::Success, attempts, "schema accepted");
                    return Ok(PublishReport { attempts, schema });
                }
                SubmitOutcome::LazyLoading => {
                    tracing::warn!(errors = ?response.errors(), attempt = attempts, "server still lazy-loading schema");
                    if !retry.allows_another(attempts) {
                        tracing::error!(state = %PublishState::Fatal, attempts, "retry budget exhausted");
                        return Err(DgkitError::RetriesExhausted { attempts });
                    }
                    let delay_ms = u64::try_from(retry.delay.as_millis()).unwrap_or(u64::MAX);
                    tracing::debug!(state = %PublishState::Retry, delay_ms, "publish");
                    tokio::time::sleep(retry.delay).await;
                }
                SubmitOutcome::Rejected(message) => {
                    tracing::error!(state = %PublishState::Fatal, errors = ?response.errors(), "schema rejected");
                    return Err(DgkitError::SchemaRejected { message });
                }
            }
        }
    }

    /// Drops all data, keeping the schema.
    ///
    /// # Errors
    /// Returns `Http` on transport failures and `Status` on a non-success
    /// status.
    pub async fn drop_data(&self) -> DgkitResult<()> {
        let url = self.config.alter_url();
        tracing::info!(url = %url, "dropping all data");
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "drop_op": "DATA" }))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            return Err(DgkitError::Status { status, body });
        }
        Ok(())
    }

    async fn post_graphql<V: Serialize>(
        &self,
        url: &str,
        query: &str,
        variables: &V,
    ) -> DgkitResult<GraphQLResponse<Value>> {
        let resp = self
            .http
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        handle_response(resp).await
    }
}

/// Publishes the configured schema, see [`AdminClient::publish_schema`].
///
/// # Errors
/// See [`AdminClient::publish_schema`].
pub async fn publish_schema(config: &Config) -> DgkitResult<PublishReport> {
    AdminClient::new(config.clone()).publish_schema().await
}

/// Drops all data, see [`AdminClient::drop_data`].
///
/// # Errors
/// See [`AdminClient::drop_data`].
pub async fn drop_data(config: &Config) -> DgkitResult<()> {
    AdminClient::new(config.clone()).drop_data().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_no_errors() {
        assert_eq!(SubmitOutcome::classify(&[]), SubmitOutcome::Accepted);
    }

    #[test]
    fn test_classify_lazy_load() {
        let errors = [GraphQLError::new(
            "failed to lazy-load GraphQL schema: still in progress",
        )];
        assert_eq!(SubmitOutcome::classify(&errors), SubmitOutcome::LazyLoading);
    }

    #[test]
    fn test_classify_other_error() {
        let errors = [GraphQLError::new("resolving updateGQLSchema failed")];
        assert_eq!(
            SubmitOutcome::classify(&errors),
            SubmitOutcome::Rejected("resolving updateGQLSchema failed".to_string())
        );
    }

    #[test]
    fn test_classify_multiple_errors_is_fatal() {
        let errors = [
            GraphQLError::new("failed to lazy-load GraphQL schema"),
            GraphQLError::new("something else"),
        ];
        assert_eq!(
            SubmitOutcome::classify(&errors),
            SubmitOutcome::Rejected("failed to lazy-load GraphQL schema".to_string())
        );
    }

    #[test]
    fn test_marker_must_be_prefix() {
        let errors = [GraphQLError::new(
            "error: failed to lazy-load GraphQL schema",
        )];
        assert!(matches!(
            SubmitOutcome::classify(&errors),
            SubmitOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_state_log_names() {
        assert_eq!(PublishState::Loading.to_string(), "loading");
        assert_eq!(PublishState::Retry.to_string(), "retry");
        assert_eq!(PublishState::Fatal.to_string(), "fatal");
    }
}
