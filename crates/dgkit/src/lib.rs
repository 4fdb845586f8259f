//! # dgkit
//!
//! Helpers for configuring and testing a Dgraph deployment.
//!
//! This crate provides:
//! - HS256 access tokens carrying a claims value ([`token`])
//! - GraphQL clients bound to such a token ([`client`])
//! - Schema loading with `#include` expansion and `.js` schema modules ([`schema`])
//! - Schema publishing that waits out the server's lazy-loading ([`admin`])
//!
//! ## Example
//!
//! ```ignore
//! use dgkit::{Config, SchemaFooter, admin, client};
//!
//! let config = Config::new("http://localhost", 8080, "schema/schema.graphql", "user", "secret")
//!     .with_schema_footer(SchemaFooter::authorization());
//!
//! admin::publish_schema(&config).await?;
//!
//! let alice = client::client("alice", &config)?;
//! let data: serde_json::Value = alice.request("{ queryUser { id } }", serde_json::json!({})).await?;
//! ```

pub mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod schema;
pub mod token;

pub use admin::{AdminClient, PublishReport, PublishState, drop_data, publish_schema};
pub use client::{
    GraphQLClient, GraphQLError, GraphQLResponse, client, scoped_client, tokenized_client,
};
pub use config::{Config, RetryPolicy, SchemaFooter, Settings};
pub use error::{DgkitError, DgkitResult};
pub use schema::{SchemaSource, load_schema, quote};
pub use token::{decode_token, token};
