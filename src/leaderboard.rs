use rocket::serde::{Deserialize, Serialize};

use crate::score::{Course, ScoreRecord, SortDirection};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Leaderboard {
    scores: Vec<ScoreRecord>,
}

impl Leaderboard {
    pub fn new(scores: Vec<ScoreRecord>) -> Self {
        Self { scores }
    }

    pub fn add(&mut self, record: ScoreRecord) {
        self.scores.push(record);
    }

    /// Orders the records by their time on `course`.
    /// A record without a time on that course counts as infinitely slow.
    /// The sort is stable, so ties keep their current order.
    pub fn sort_by_course(&mut self, course: Course, direction: SortDirection) {
        let time = |record: &ScoreRecord| record.times.get(course).unwrap_or(f64::INFINITY);
        self.scores.sort_by(|a, b| {
            let order = time(a).total_cmp(&time(b));
            match direction {
                SortDirection::Ascending => order,
                SortDirection::Descending => order.reverse(),
            }
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }
}
