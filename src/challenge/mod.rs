//! Challenges: the bot asks something of a user, then waits a bounded amount of time for a
//! qualifying reply or reaction.
//!
//! Waiting is kept apart from scoring.  The plugins suspend on a Discord collector through
//! [`await_within`], which always resolves to a single [`Outcome`].  The `resolve_*` functions in
//! the submodules then turn the (store document, outcome) pair into a verdict without touching
//! Discord, which is what the tests exercise.

use std::{collections::BTreeSet, future::Future, time::Duration};

pub mod experiment;
pub mod riddle;

/// How a suspended challenge ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// A qualifying event arrived in time
    Completed(T),
    /// The deadline passed first
    TimedOut,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::TimedOut => Outcome::TimedOut,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Outcome::Completed(value),
            None => Outcome::TimedOut,
        }
    }
}

/// Suspend until `event` yields or `timeout` elapses, whichever is first.
///
/// Hitting the deadline drops `event`, which cancels the wait (e.g. unregisters a collector).  An
/// event source that ends without yielding anything is treated like a timeout.
pub async fn await_within<T>(
    timeout: Duration,
    event: impl Future<Output = Option<T>>,
) -> Outcome<T> {
    match tokio::time::timeout(timeout, event).await {
        Ok(value) => value.into(),
        Err(_elapsed) => Outcome::TimedOut,
    }
}

/// Minimum effort a message must show to count as an answer.  Unset limits always pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageRequirement {
    pub min_words: Option<usize>,
    pub min_chars: Option<usize>,
}

impl MessageRequirement {
    pub fn is_satisfied_by(&self, content: &str) -> bool {
        let words_ok = self
            .min_words
            .map_or(true, |min| content.split_whitespace().count() >= min);
        let chars_ok = self
            .min_chars
            .map_or(true, |min| content.trim().chars().count() >= min);

        words_ok && chars_ok
    }

    /// Human readable summary for the challenge prompt, if there is anything to say.
    pub fn describe(&self) -> Option<String> {
        match (self.min_words, self.min_chars) {
            (None, None) => None,
            (Some(words), None) => Some(format!("at least {} words", words)),
            (None, Some(chars)) => Some(format!("at least {} characters", chars)),
            (Some(words), Some(chars)) => Some(format!(
                "at least {} words and {} characters",
                words, chars
            )),
        }
    }
}

/// A named reward for reaching a cumulative count.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Milestone {
    pub count: u64,
    pub name: String,
}

impl Milestone {
    pub fn list(milestones: &[(u64, &str)]) -> Vec<Self> {
        milestones
            .iter()
            .map(|&(count, name)| Milestone {
                count,
                name: name.to_owned(),
            })
            .collect()
    }
}

/// Milestones reached at `count` that are not yet in `held`, in table order.
///
/// Every reached milestone is considered, not only the one matching `count` exactly, so a jump
/// over several thresholds awards all of them and re-checking an unchanged count awards nothing.
pub fn unclaimed_milestones<'a>(
    milestones: &'a [Milestone],
    count: u64,
    held: &BTreeSet<String>,
) -> Vec<&'a str> {
    milestones
        .iter()
        .filter(|m| m.count <= count && !held.contains(&m.name))
        .map(|m| m.name.as_str())
        .collect()
}

/// Milestones whose threshold lies in `(before, after]`, i.e. crossed by going from `before` to
/// `after`.
pub fn crossed_milestones(milestones: &[Milestone], before: u64, after: u64) -> Vec<&str> {
    milestones
        .iter()
        .filter(|m| before < m.count && m.count <= after)
        .map(|m| m.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn science() -> Vec<Milestone> {
        Milestone::list(&[
            (5, "Science Enthusiast"),
            (10, "Lab Veteran"),
            (20, "Mad Scientist"),
        ])
    }

    #[test]
    fn min_words_needs_the_full_count() {
        let req = MessageRequirement {
            min_words: Some(5),
            min_chars: None,
        };

        assert!(!req.is_satisfied_by("the cake is a"));
        assert!(req.is_satisfied_by("the cake is a lie"));
        assert!(req.is_satisfied_by("  the   cake\nis a   lie  "));
    }

    #[test]
    fn both_limits_must_pass() {
        let req = MessageRequirement {
            min_words: Some(2),
            min_chars: Some(10),
        };

        assert!(!req.is_satisfied_by("antidisestablishment")); // long, one word
        assert!(!req.is_satisfied_by("a b")); // two words, short
        assert!(req.is_satisfied_by("hello there"));
    }

    #[test]
    fn no_limits_accepts_anything() {
        assert!(MessageRequirement::default().is_satisfied_by(""));
        assert_eq!(MessageRequirement::default().describe(), None);
    }

    #[test]
    fn unclaimed_skips_held_and_unreached() {
        let held = BTreeSet::from(["Science Enthusiast".to_owned()]);

        assert_eq!(unclaimed_milestones(&science(), 4, &BTreeSet::new()), Vec::<&str>::new());
        assert_eq!(unclaimed_milestones(&science(), 12, &held), vec!["Lab Veteran"]);
        assert_eq!(
            unclaimed_milestones(&science(), 25, &BTreeSet::new()),
            vec!["Science Enthusiast", "Lab Veteran", "Mad Scientist"]
        );
    }

    #[test]
    fn crossed_handles_jumps() {
        assert_eq!(crossed_milestones(&science(), 4, 5), vec!["Science Enthusiast"]);
        assert_eq!(crossed_milestones(&science(), 5, 6), Vec::<&str>::new());
        assert_eq!(
            crossed_milestones(&science(), 0, 20),
            vec!["Science Enthusiast", "Lab Veteran", "Mad Scientist"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn await_within_times_out() {
        let never = std::future::pending::<Option<()>>();
        let outcome = await_within(Duration::from_secs(30), never).await;
        assert_eq!(outcome, Outcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn await_within_returns_early_event() {
        let soon = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some("✅")
        };
        assert_eq!(
            await_within(Duration::from_secs(30), soon).await,
            Outcome::Completed("✅")
        );
    }

    #[tokio::test]
    async fn exhausted_source_counts_as_timeout() {
        let closed = async { None::<u8> };
        let outcome = await_within(Duration::from_secs(30), closed).await;
        assert_eq!(outcome, Outcome::TimedOut);
    }
}
