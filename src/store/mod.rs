use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, info, warn};
use serde_json::Value;

use crate::{
    leaderboard::Leaderboard,
    score::{Course, CourseTimes, Device, ScoreRecord, SortDirection, Submission, SubmissionError},
    tree::{Tree, TreeError},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] SubmissionError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("malformed score data at {path:?}")]
    Malformed { path: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Score records kept under one collection of a [`Tree`], one child per player key.
pub struct ScoreStore {
    tree: Arc<dyn Tree>,
    root: String,
}

impl ScoreStore {
    pub fn new(tree: Arc<dyn Tree>, root: impl Into<String>) -> Self {
        Self {
            tree,
            root: root.into(),
        }
    }

    fn record_path(&self, key: &str) -> String {
        format!("{}/{}", self.root, key)
    }

    /// Reads every record and sorts them by their time on `course`.
    pub async fn list(&self, course: Course, direction: SortDirection) -> StoreResult<Leaderboard> {
        let collection = match self.tree.get(&self.root).await? {
            Some(collection) => collection,
            None => return Ok(Leaderboard::default()),
        };

        // The tree hands back collections whose keys are all numbers as arrays
        let children: Vec<(String, Value)> = match collection {
            Value::Object(children) => children.into_iter().collect(),
            Value::Array(children) => children
                .into_iter()
                .enumerate()
                .filter(|(_, child)| !child.is_null())
                .map(|(index, child)| (index.to_string(), child))
                .collect(),
            _ => {
                return Err(StoreError::Malformed {
                    path: self.root.clone(),
                })
            }
        };

        let mut leaderboard = Leaderboard::default();
        for (key, child) in children {
            match parse_record(&key, child) {
                Some(record) => leaderboard.add(record),
                None => warn!("Skipping malformed score record {}", self.record_path(&key)),
            }
        }
        leaderboard.sort_by_course(course, direction);
        debug!("Listed {} score records by {}", leaderboard.len(), course.field());

        Ok(leaderboard)
    }

    /// Merges a submission into the player's record and writes the result back.
    ///
    /// The read and the write are two separate tree calls. Two submissions for the
    /// same player that overlap can both read the old record, and the one written
    /// last wins, even if the other one held a better time.
    pub async fn submit(
        &self,
        name: &str,
        device: Device,
        times: CourseTimes,
    ) -> StoreResult<ScoreRecord> {
        let submission = Submission::new(name, device, times)?;
        let path = self.record_path(&submission.key);

        let previous = match self.tree.get(&path).await? {
            Some(value) => Some(
                parse_record(&submission.key, value)
                    .ok_or_else(|| StoreError::Malformed { path: path.clone() })?,
            ),
            None => None,
        };

        let record = ScoreRecord::merged(previous.as_ref(), &submission, now_millis());
        let value = serde_json::to_value(&record)
            .map_err(|_| StoreError::Malformed { path: path.clone() })?;
        self.tree.set(&path, value).await?;

        info!("Saved score record {}", path);
        Ok(record)
    }
}

/// Reads a stored record, taking its key from where it is stored.
fn parse_record(key: &str, value: Value) -> Option<ScoreRecord> {
    if !value.is_object() {
        return None;
    }
    let mut record: ScoreRecord = serde_json::from_value(value).ok()?;
    record.key = key.to_owned();
    Some(record)
}
