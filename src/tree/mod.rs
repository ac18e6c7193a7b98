//! Hierarchical JSON storage behind the score store.
//!
//! A tree maps `/`-separated paths to JSON values. Reading a path returns the
//! whole subtree below it, and writing a path replaces that subtree.

use std::sync::Arc;

use serde_json::Value;

use crate::config::DatabaseConfig;

mod memory;
mod rest;
mod sql;

pub use memory::MemoryTree;
pub use rest::RestTree;
pub use sql::SqlTree;

/// Characters that may not appear in a path segment.
const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("remote tree request failed: {0}")]
    Remote(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed value at {path:?}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("invalid tree path {path:?}")]
    InvalidPath { path: String },
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;

#[rocket::async_trait]
pub trait Tree: Send + Sync {
    /// Returns the subtree stored at `path`, or `None` if nothing is stored there.
    async fn get(&self, path: &str) -> TreeResult<Option<Value>>;

    /// Replaces the subtree at `path` with `value`. Writing `null` removes it.
    async fn set(&self, path: &str, value: Value) -> TreeResult<()>;
}

/// Opens the tree named by the database url.
pub async fn connect(config: &DatabaseConfig) -> TreeResult<Arc<dyn Tree>> {
    let url = config.url.as_str();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Arc::new(RestTree::new(url, config.auth.clone())))
    } else if url == "memory:" {
        log::warn!("Using a volatile in-memory score tree");
        Ok(Arc::new(MemoryTree::new()))
    } else {
        Ok(Arc::new(SqlTree::connect(url).await?))
    }
}

/// Splits a path into its segments, ignoring empty ones.
pub fn segments(path: &str) -> TreeResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    if segments.iter().any(|segment| segment.contains(FORBIDDEN)) {
        return Err(TreeError::InvalidPath {
            path: path.to_owned(),
        });
    }
    Ok(segments)
}

/// Returns the part of `node` found at `segments`.
pub(crate) fn descend(node: Value, segments: &[&str]) -> Option<Value> {
    let mut node = node;
    for segment in segments {
        node = match node {
            Value::Object(mut children) => children.remove(*segment)?,
            _ => return None,
        };
    }
    Some(node).filter(|node| !is_empty(node))
}

/// Writes `value` into `node` at `segments`, creating parents as needed
/// and pruning parents left empty by a removal.
pub(crate) fn place(node: &mut Value, segments: &[&str], value: Value) {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            *node = value;
            return;
        }
    };

    if !node.is_object() {
        *node = Value::Object(Default::default());
    }
    if let Value::Object(children) = node {
        let child = children
            .entry(first.to_string())
            .or_insert(Value::Null);
        place(child, rest, value);
        if is_empty(child) {
            children.remove(*first);
        }
    }
}

fn is_empty(node: &Value) -> bool {
    match node {
        Value::Null => true,
        Value::Object(children) => children.is_empty(),
        _ => false,
    }
}
