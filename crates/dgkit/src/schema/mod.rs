//! Schema loading.
//!
//! A schema source is either a plain GraphQL schema file or a `.js` schema
//! module. Plain files may start with a block of `#include <path>` lines,
//! which are expanded depth-first, in order, before the file's own text:
//!
//! ```text
//! #include types/user.graphql
//! #include types/post.graphql
//! type Query { ... }
//! ```
//!
//! Only the leading block is expanded. An `#include` after the first other
//! line stays in the output as literal text.
//!
//! Nothing here is cached: every call reads the current file contents.

pub mod script;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::error::{DgkitError, DgkitResult};

/// Directive that pulls another schema file into the current one.
pub const INCLUDE_DIRECTIVE: &str = "#include";

/// File extension marking an executable schema module.
pub const SCRIPT_EXTENSION: &str = "js";

/// Where the schema text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// A GraphQL schema file, possibly with leading includes.
    Text(PathBuf),
    /// A JavaScript module whose `module.exports` is the schema text.
    Script(PathBuf),
}

impl SchemaSource {
    /// Classifies a path by its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_script = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION));
        if is_script {
            Self::Script(path)
        } else {
            Self::Text(path)
        }
    }

    /// Returns the source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Text(path) | Self::Script(path) => path,
        }
    }

    /// Produces the current schema text.
    ///
    /// Script modules are re-read and evaluated in a new interpreter on every
    /// call.
    ///
    /// # Errors
    /// Returns a schema error if a file cannot be read or a module fails.
    pub async fn read(&self) -> DgkitResult<String> {
        match self {
            Self::Text(path) => load_schema(path).await,
            Self::Script(path) => script::load_module(path).await,
        }
    }
}

/// Loads a schema file, expanding its leading `#include` block.
///
/// # Errors
/// Returns `SchemaRead` for missing or unreadable files, `InvalidInclude` for
/// an include without a path and `IncludeCycle` when a file includes itself.
pub async fn load_schema(path: impl AsRef<Path>) -> DgkitResult<String> {
    load_recursive(path.as_ref().to_path_buf(), Vec::new()).await
}

type LoadFuture = Pin<Box<dyn Future<Output = DgkitResult<String>> + Send>>;

fn load_recursive(path: PathBuf, mut stack: Vec<PathBuf>) -> LoadFuture {
    Box::pin(async move {
        let data = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DgkitError::schema_read(&path, e))?;

        let identity = tokio::fs::canonicalize(&path)
            .await
            .unwrap_or_else(|_| path.clone());
        if stack.contains(&identity) {
            return Err(DgkitError::IncludeCycle { path });
        }
        stack.push(identity);

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut header = String::new();
        for line in data.lines() {
            let Some(target) = include_target(line) else {
                break;
            };
            if target.is_empty() {
                return Err(DgkitError::InvalidInclude {
                    path,
                    line: line.to_string(),
                });
            }
            let included = dir.join(target);
            tracing::debug!(from = %path.display(), include = %included.display(), "resolving include");
            header.push_str(&load_recursive(included, stack.clone()).await?);
            header.push('\n');
        }

        header.push_str(&data);
        Ok(header)
    })
}

/// Returns the path named by an include line, or `None` for any other line.
///
/// The directive must be followed by whitespace or end the line.
fn include_target(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(INCLUDE_DIRECTIVE)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Quotes `txt` for use as a string literal inside a rule that is itself
/// written inside a double-quoted schema string, such as an `@auth` rule:
///
/// ```
/// # use dgkit::schema::quote;
/// let rule = format!("{{ queryUser(filter: {{ name: {{ eq: {} }} }}) {{ id }} }}", quote("alice"));
/// assert_eq!(rule, r#"{ queryUser(filter: { name: { eq: \"alice\" } }) { id } }"#);
/// ```
///
/// Backslashes and quotes inside `txt` are escaped for both levels.
#[must_use]
pub fn quote(txt: &str) -> String {
    let inner = format!("\"{}\"", escape(txt));
    escape(&inner)
}

fn escape(txt: &str) -> String {
    let mut out = String::with_capacity(txt.len());
    for c in txt.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
