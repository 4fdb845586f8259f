//! GraphQL-over-HTTP client for the data endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{DgkitError, DgkitResult};
use crate::token::token;

/// One entry of a GraphQL `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Creates an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

/// A GraphQL response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLResponse<T = Value> {
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
}

impl<T> GraphQLResponse<T> {
    /// Returns the reported errors, empty when there are none.
    #[must_use]
    pub fn errors(&self) -> &[GraphQLError] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Returns `true` when the server reported at least one error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }
}

#[derive(Serialize)]
struct GraphQLRequest<'a, V> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<V>,
}

/// Client for the `/graphql` endpoint authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl GraphQLClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), endpoint, token)
    }

    /// Creates a client sharing an existing HTTP connection pool.
    pub fn with_http(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Value of the `Authorization` header sent with every request.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Sends a query and returns the whole response, errors included.
    ///
    /// # Errors
    /// Returns `Http` on transport failures, `Status` on a non-success status
    /// without a GraphQL body and `InvalidResponse` if the body is not JSON.
    pub async fn raw_request<V, T>(
        &self,
        query: &str,
        variables: Option<V>,
    ) -> DgkitResult<GraphQLResponse<T>>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&GraphQLRequest { query, variables })
            .send()
            .await?;
        handle_response(resp).await
    }

    /// Sends a query and returns its `data`.
    ///
    /// # Errors
    /// Returns `GraphQL` with every reported error when the response carries
    /// any, plus the errors of [`GraphQLClient::raw_request`].
    pub async fn request<V, T>(&self, query: &str, variables: V) -> DgkitResult<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self.raw_request::<V, T>(query, Some(variables)).await?;
        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            return Err(DgkitError::GraphQL { errors });
        }
        response
            .data
            .ok_or_else(|| DgkitError::invalid_response("response has neither data nor errors"))
    }
}

/// Reads a GraphQL response body.
///
/// GraphQL servers often answer errors with a non-2xx status and a regular
/// `errors` body; that body is returned as-is so callers see the messages.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> DgkitResult<GraphQLResponse<T>> {
    let status = resp.status();
    let body = resp.text().await?;

    match serde_json::from_str::<GraphQLResponse<T>>(&body) {
        Ok(parsed) if status.is_success() || parsed.has_errors() => Ok(parsed),
        Ok(_) => Err(DgkitError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(_) if !status.is_success() => Err(DgkitError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(DgkitError::invalid_response(format!(
            "failed to parse response JSON: {e}"
        ))),
    }
}

/// Builds a client for the configured data endpoint using an existing token.
pub fn tokenized_client(token: impl Into<String>, config: &Config) -> GraphQLClient {
    GraphQLClient::new(config.graphql_url(), token)
}

/// Issues a token for `claims` and builds a client carrying it.
///
/// # Errors
/// Returns `DgkitError::Token` if the token cannot be signed.
pub fn client(claims: &str, config: &Config) -> DgkitResult<GraphQLClient> {
    Ok(tokenized_client(token(claims, config)?, config))
}

/// Fixes the configuration and returns a factory from claims to clients.
///
/// Clients produced by the factory share one HTTP connection pool.
pub fn scoped_client(
    config: &Config,
) -> impl Fn(&str) -> DgkitResult<GraphQLClient> + Send + Sync + 'static {
    let config = config.clone();
    let http = reqwest::Client::new();
    move |claims: &str| {
        let token = token(claims, &config)?;
        Ok(GraphQLClient::with_http(
            http.clone(),
            config.graphql_url(),
            token,
        ))
    }
}
