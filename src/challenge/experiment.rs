use crate::{
    challenge::{unclaimed_milestones, MessageRequirement, Milestone, Outcome},
    persistent_state::{UserBook, UserRecord},
};
use serenity::all::UserId;

/// An experiment the bot can hand out.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Experiment {
    pub prompt: String,
    #[serde(flatten)]
    pub kind: ExperimentKind,
}

/// What completes an experiment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperimentKind {
    /// The subject reacts to the prompt with `emoji`
    Reaction { emoji: String },
    /// The subject replies in the same channel with a message meeting the limits
    Message {
        #[serde(default)]
        min_words: Option<usize>,
        #[serde(default)]
        min_chars: Option<usize>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExperimentVerdict {
    Completed {
        experiments_completed: u64,
        new_achievements: Vec<String>,
    },
    TimedOut,
}

impl ExperimentKind {
    pub fn requirement(&self) -> Option<MessageRequirement> {
        match *self {
            ExperimentKind::Reaction { .. } => None,
            ExperimentKind::Message {
                min_words,
                min_chars,
            } => Some(MessageRequirement {
                min_words,
                min_chars,
            }),
        }
    }
}

/// Award every achievement `record` has reached but does not hold yet.  Returns the new ones.
///
/// Calling this again without a change in `experiments_completed` returns nothing.
pub fn check_achievements(record: &mut UserRecord, milestones: &[Milestone]) -> Vec<String> {
    let reached = record.experiments_completed;
    let earned: Vec<String> = unclaimed_milestones(milestones, reached, &record.achievements)
        .into_iter()
        .map(str::to_owned)
        .collect();

    record.achievements.extend(earned.iter().cloned());
    earned
}

/// Score a finished experiment.  A timeout leaves `book` untouched; a user's record is only
/// created by their first completed experiment.
pub fn resolve_experiment<T>(
    book: &mut UserBook,
    user_id: UserId,
    milestones: &[Milestone],
    outcome: &Outcome<T>,
) -> ExperimentVerdict {
    if !outcome.is_completed() {
        return ExperimentVerdict::TimedOut;
    }

    let record = book.entry(user_id);
    record.experiments_completed += 1;
    let new_achievements = check_achievements(record, milestones);

    ExperimentVerdict::Completed {
        experiments_completed: record.experiments_completed,
        new_achievements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Experiments;

    fn milestones() -> Vec<Milestone> {
        Experiments::default().achievements
    }

    fn subject() -> UserId {
        UserId::new(7)
    }

    #[test]
    fn fifth_experiment_earns_science_enthusiast_once() {
        let mut book = UserBook::default();
        book.entry(subject()).experiments_completed = 4;

        let verdict =
            resolve_experiment(&mut book, subject(), &milestones(), &Outcome::Completed(()));
        assert_eq!(
            verdict,
            ExperimentVerdict::Completed {
                experiments_completed: 5,
                new_achievements: vec!["Science Enthusiast".to_owned()],
            }
        );

        let verdict =
            resolve_experiment(&mut book, subject(), &milestones(), &Outcome::Completed(()));
        assert_eq!(
            verdict,
            ExperimentVerdict::Completed {
                experiments_completed: 6,
                new_achievements: Vec::new(),
            }
        );
        assert_eq!(book.get(subject()).unwrap().achievements.len(), 1);
    }

    #[test]
    fn check_achievements_is_idempotent() {
        let mut record = UserRecord {
            experiments_completed: 10,
            ..Default::default()
        };

        let first = check_achievements(&mut record, &milestones());
        let second = check_achievements(&mut record, &milestones());

        assert_eq!(first, vec!["Science Enthusiast", "Lab Veteran"]);
        assert!(second.is_empty());
        assert_eq!(record.achievements.len(), 2);
    }

    #[test]
    fn batch_increment_fires_every_crossed_threshold() {
        let mut record = UserRecord {
            experiments_completed: 20,
            ..Default::default()
        };

        assert_eq!(
            check_achievements(&mut record, &milestones()),
            vec!["Science Enthusiast", "Lab Veteran", "Mad Scientist"]
        );
    }

    #[test]
    fn timeout_creates_no_record() {
        let mut book = UserBook::default();

        let outcome = Outcome::<()>::TimedOut;
        let verdict = resolve_experiment(&mut book, subject(), &milestones(), &outcome);

        assert_eq!(verdict, ExperimentVerdict::TimedOut);
        assert!(book.get(subject()).is_none());
    }

    #[test]
    fn first_completion_creates_record() {
        let mut book = UserBook::default();

        resolve_experiment(&mut book, subject(), &milestones(), &Outcome::Completed(()));

        assert_eq!(book.get(subject()).unwrap().experiments_completed, 1);
    }

    #[test]
    fn only_message_experiments_have_requirements() {
        let reaction = ExperimentKind::Reaction {
            emoji: "🔴".to_owned(),
        };
        let message = ExperimentKind::Message {
            min_words: Some(5),
            min_chars: None,
        };

        assert_eq!(reaction.requirement(), None);
        let requirement = message.requirement().unwrap();
        assert!(!requirement.is_satisfied_by("one two three four"));
        assert!(requirement.is_satisfied_by("one two three four five"));
    }
}
