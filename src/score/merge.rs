use super::*;

fn best(previous: Option<CourseTime>, submitted: Option<CourseTime>) -> Option<CourseTime> {
    match (previous, submitted.filter(|time| time.is_finite())) {
        (Some(previous), Some(submitted)) => Some(previous.min(submitted)),
        (previous, None) => previous,
        (None, submitted) => submitted,
    }
}

impl CourseTimes {
    /// Keeps the lowest time per course. Courses missing from `submitted` carry over.
    pub fn best_of(&self, submitted: &CourseTimes) -> CourseTimes {
        CourseTimes {
            c1: best(self.c1, submitted.c1),
            c2: best(self.c2, submitted.c2),
            c3: best(self.c3, submitted.c3),
            c4: best(self.c4, submitted.c4),
            c5: best(self.c5, submitted.c5),
        }
    }
}

impl ScoreRecord {
    /// Builds the record to store after `submission`.
    /// Name and device always come from the submission; times only ever improve.
    pub fn merged(
        previous: Option<&ScoreRecord>,
        submission: &Submission,
        updated_at: i64,
    ) -> ScoreRecord {
        let times = match previous {
            Some(previous) => previous.times.best_of(&submission.times),
            None => CourseTimes::default().best_of(&submission.times),
        };

        ScoreRecord {
            key: submission.key.clone(),
            name: submission.name.clone(),
            device: submission.device,
            updated_at,
            times,
        }
    }
}
