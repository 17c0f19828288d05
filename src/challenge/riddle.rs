use crate::{
    challenge::{crossed_milestones, Milestone, Outcome},
    persistent_state::JsonDocument,
};
use rand::seq::IteratorRandom;
use serenity::all::UserId;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Riddle {
    pub question: String,
    /// Any of these counts as correct
    pub answers: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RiddleScore {
    #[serde(default)]
    pub correct_count: u64,
    #[serde(default)]
    pub wrong_count: u64,
    /// Questions of riddles this user has already been scored on
    #[serde(default)]
    pub used_riddles: BTreeSet<String>,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct RiddleBook(pub HashMap<UserId, RiddleScore>);

/// An answer the user typed, plus whether they then confirmed it with ✅.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAnswer {
    pub text: String,
    pub confirmation: Outcome<()>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RiddleVerdict {
    Correct {
        score: RiddleScore,
        /// Roles whose threshold this answer crossed
        new_roles: Vec<String>,
    },
    Wrong {
        score: RiddleScore,
    },
    /// No answer in time.  Counts as wrong.
    TimedOut {
        score: RiddleScore,
    },
    /// An answer came in but was never confirmed.  Nothing is recorded.
    Discarded,
}

impl Riddle {
    pub fn accepts(&self, answer: &str) -> bool {
        let answer = normalize(answer);
        self.answers.iter().any(|a| normalize(a) == answer)
    }

    /// Riddles are identified by their question.
    pub fn key(&self) -> &str {
        &self.question
    }
}

// Case, whitespace and punctuation around words don't matter.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A random riddle the user has not been scored on yet.
pub fn pick_riddle<'a>(
    pool: &'a [Riddle],
    used: &BTreeSet<String>,
    rng: &mut impl rand::Rng,
) -> Option<&'a Riddle> {
    pool.iter()
        .filter(|riddle| !used.contains(riddle.key()))
        .choose(rng)
}

impl RiddleBook {
    pub fn score(&self, user_id: UserId) -> RiddleScore {
        self.0.get(&user_id).cloned().unwrap_or_default()
    }

    /// Count one correct or wrong answer for `user_id`.
    pub fn update_riddle_score(&mut self, user_id: UserId, correct: bool) -> &mut RiddleScore {
        let score = self.0.entry(user_id).or_default();
        if correct {
            score.correct_count += 1;
        } else {
            score.wrong_count += 1;
        }
        score
    }
}

/// Score a finished riddle challenge.
///
/// * no answer in time: wrong
/// * answer but no ✅ in time: discarded, nothing recorded
/// * confirmed answer: correct or wrong, and the riddle is marked as used either way
pub fn resolve_riddle(
    book: &mut RiddleBook,
    user_id: UserId,
    riddle: &Riddle,
    outcome: Outcome<CandidateAnswer>,
    role_milestones: &[Milestone],
) -> RiddleVerdict {
    let answer = match outcome {
        Outcome::TimedOut => {
            let score = book.update_riddle_score(user_id, false);
            score.used_riddles.insert(riddle.key().to_owned());
            return RiddleVerdict::TimedOut {
                score: score.clone(),
            };
        }
        Outcome::Completed(CandidateAnswer {
            confirmation: Outcome::TimedOut,
            ..
        }) => return RiddleVerdict::Discarded,
        Outcome::Completed(answer) => answer,
    };

    let correct = riddle.accepts(&answer.text);
    let score = book.update_riddle_score(user_id, correct);
    score.used_riddles.insert(riddle.key().to_owned());

    if correct {
        let new_roles = crossed_milestones(
            role_milestones,
            score.correct_count - 1,
            score.correct_count,
        )
        .into_iter()
        .map(str::to_owned)
        .collect();

        RiddleVerdict::Correct {
            score: score.clone(),
            new_roles,
        }
    } else {
        RiddleVerdict::Wrong {
            score: score.clone(),
        }
    }
}

impl JsonDocument<RiddleBook> {
    pub async fn score(&self, user_id: UserId) -> RiddleScore {
        self.load().await.score(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Riddles;
    use rand::{rngs::StdRng, SeedableRng};

    fn piano() -> Riddle {
        Riddle {
            question: "What has keys but can't open locks?".to_owned(),
            answers: vec!["a piano".to_owned(), "piano".to_owned()],
        }
    }

    fn solver() -> UserId {
        UserId::new(3)
    }

    fn answered(text: &str, confirmation: Outcome<()>) -> Outcome<CandidateAnswer> {
        Outcome::Completed(CandidateAnswer {
            text: text.to_owned(),
            confirmation,
        })
    }

    fn roles() -> Vec<Milestone> {
        Riddles::default().roles
    }

    #[test]
    fn answers_are_forgiving() {
        let riddle = piano();
        assert!(riddle.accepts("Piano"));
        assert!(riddle.accepts("  A   piano!  "));
        assert!(!riddle.accepts("organ"));
    }

    #[test]
    fn punctuation_around_words_is_ignored() {
        let riddle = piano();
        assert!(riddle.accepts("piano !"));
        assert!(riddle.accepts("piano,"));
        assert!(riddle.accepts("\"a piano\"..."));
        assert!(!riddle.accepts("pia no"));
    }

    #[test]
    fn correct_score_increments_only_correct() {
        let mut book = RiddleBook::default();
        book.update_riddle_score(solver(), false);

        let score = book.update_riddle_score(solver(), true).clone();

        assert_eq!(score.correct_count, 1);
        assert_eq!(score.wrong_count, 1);
    }

    #[tokio::test]
    async fn stored_score_round_trips_through_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc: JsonDocument<RiddleBook> =
            JsonDocument::new(dir.path().join("riddle_scores.json"));

        let before = doc.score(solver()).await;
        doc.update(|book| {
            book.update_riddle_score(solver(), true);
        })
        .await
        .unwrap();
        let after = doc.score(solver()).await;

        assert_eq!(after.correct_count, before.correct_count + 1);
        assert_eq!(after.wrong_count, before.wrong_count);
    }

    #[test]
    fn confirmed_correct_answer_scores() {
        let mut book = RiddleBook::default();

        let verdict = resolve_riddle(
            &mut book,
            solver(),
            &piano(),
            answered("piano", Outcome::Completed(())),
            &roles(),
        );

        let (score, new_roles) = match verdict {
            RiddleVerdict::Correct { score, new_roles } => (score, new_roles),
            other => panic!("expected a correct verdict, got {:?}", other),
        };
        assert_eq!(score.correct_count, 1);
        assert!(score.used_riddles.contains(piano().key()));
        assert!(new_roles.is_empty());
    }

    #[test]
    fn unconfirmed_answer_is_discarded_without_score_change() {
        let mut book = RiddleBook::default();
        book.update_riddle_score(solver(), true);
        let before = book.score(solver());

        let verdict = resolve_riddle(
            &mut book,
            solver(),
            &piano(),
            answered("piano", Outcome::TimedOut),
            &roles(),
        );

        assert_eq!(verdict, RiddleVerdict::Discarded);
        assert_eq!(book.score(solver()), before);
    }

    #[test]
    fn no_answer_counts_as_wrong() {
        let mut book = RiddleBook::default();

        let verdict = resolve_riddle(&mut book, solver(), &piano(), Outcome::TimedOut, &roles());

        let score = match verdict {
            RiddleVerdict::TimedOut { score } => score,
            other => panic!("expected a timeout verdict, got {:?}", other),
        };
        assert_eq!(score.correct_count, 0);
        assert_eq!(score.wrong_count, 1);
    }

    #[test]
    fn confirmed_wrong_answer_counts_as_wrong() {
        let mut book = RiddleBook::default();

        let verdict = resolve_riddle(
            &mut book,
            solver(),
            &piano(),
            answered("harpsichord", Outcome::Completed(())),
            &roles(),
        );

        assert!(matches!(verdict, RiddleVerdict::Wrong { score } if score.wrong_count == 1));
    }

    #[test]
    fn fifth_correct_answer_earns_a_role() {
        let mut book = RiddleBook::default();
        for _ in 0..4 {
            book.update_riddle_score(solver(), true);
        }

        let verdict = resolve_riddle(
            &mut book,
            solver(),
            &piano(),
            answered("a piano", Outcome::Completed(())),
            &roles(),
        );

        assert!(matches!(
            verdict,
            RiddleVerdict::Correct { new_roles, .. } if new_roles == vec!["Riddle Apprentice"]
        ));
    }

    #[test]
    fn used_riddles_are_not_picked_again() {
        let pool = Riddles::default().pool;
        let mut rng = StdRng::seed_from_u64(7);
        let mut used = BTreeSet::new();

        for _ in 0..pool.len() {
            let riddle = pick_riddle(&pool, &used, &mut rng).unwrap();
            assert!(used.insert(riddle.key().to_owned()));
        }

        assert!(pick_riddle(&pool, &used, &mut rng).is_none());
    }
}
