//! Error types for schema loading, token issuing and server calls.

use std::path::PathBuf;

use crate::client::GraphQLError;

/// Type alias for results of this crate.
pub type DgkitResult<T> = Result<T, DgkitError>;

/// Errors that can occur while talking to a Dgraph deployment.
#[derive(Debug, thiserror::Error)]
pub enum DgkitError {
    /// A schema or include file could not be read.
    #[error("Failed to read schema file {}: {source}", .path.display())]
    SchemaRead {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An `#include` line does not name a file.
    #[error("Invalid include in {}: {line:?}", .path.display())]
    InvalidInclude {
        /// The file containing the directive.
        path: PathBuf,
        /// The offending line.
        line: String,
    },

    /// A schema file includes itself, directly or transitively.
    #[error("Include cycle detected at {}", .path.display())]
    IncludeCycle {
        /// The file that was reached twice.
        path: PathBuf,
    },

    /// A schema module could not be evaluated.
    #[error("Failed to evaluate schema module {}: {message}", .path.display())]
    Script {
        /// The module path.
        path: PathBuf,
        /// Description of the evaluation failure.
        message: String,
    },

    /// Failed to sign or verify a token.
    #[error("Token error: {message}")]
    Token {
        /// Description of the token error.
        message: String,
    },

    /// Transport-level failure from the HTTP client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// The response body was not a GraphQL response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the parse failure.
        message: String,
    },

    /// A GraphQL request returned errors.
    #[error("GraphQL error: {}", join_messages(.errors))]
    GraphQL {
        /// All errors reported by the server.
        errors: Vec<GraphQLError>,
    },

    /// The admin endpoint rejected the schema.
    #[error("{message}")]
    SchemaRejected {
        /// Message of the first reported error.
        message: String,
    },

    /// The server kept lazy-loading for the whole retry budget.
    #[error("Schema still lazy-loading after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl DgkitError {
    /// Creates a new `SchemaRead` error.
    #[must_use]
    pub fn schema_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SchemaRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new `Script` error.
    #[must_use]
    pub fn script(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Script {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Token` error.
    #[must_use]
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if the error came from reading the schema sources.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaRead { .. }
                | Self::InvalidInclude { .. }
                | Self::IncludeCycle { .. }
                | Self::Script { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for DgkitError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::token(err.to_string())
    }
}

impl From<::config::ConfigError> for DgkitError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_display_joins_messages() {
        let err = DgkitError::GraphQL {
            errors: vec![
                GraphQLError::new("first problem"),
                GraphQLError::new("second problem"),
            ],
        };
        assert_eq!(err.to_string(), "GraphQL error: first problem; second problem");
    }

    #[test]
    fn test_schema_rejected_displays_message_verbatim() {
        let err = DgkitError::SchemaRejected {
            message: "input:3: Type Foo not defined".to_string(),
        };
        assert_eq!(err.to_string(), "input:3: Type Foo not defined");
    }

    #[test]
    fn test_is_schema_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(DgkitError::schema_read("a.graphql", io).is_schema_error());
        assert!(DgkitError::script("a.js", "boom").is_schema_error());
        assert!(!DgkitError::token("bad").is_schema_error());
    }
}
