use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;

use super::*;

/// A tree that lives in process memory. Everything is lost on shutdown.
#[derive(Default)]
pub struct MemoryTree {
    root: RwLock<Value>,
    writes: AtomicUsize,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[rocket::async_trait]
impl Tree for MemoryTree {
    async fn get(&self, path: &str) -> TreeResult<Option<Value>> {
        let segments = segments(path)?;
        let root = self.root.read().await;
        Ok(descend(root.clone(), &segments))
    }

    async fn set(&self, path: &str, value: Value) -> TreeResult<()> {
        let segments = segments(path)?;
        let mut root = self.root.write().await;
        place(&mut root, &segments, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
