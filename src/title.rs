//! Titles: vanity roles a member may claim once per cooldown window.
//!
//! The pool is shared by the whole server and drawn without replacement.  Once a title has been
//! handed to anyone it is gone for good; there is no way to put it back.

use rand::seq::IteratorRandom;
use serenity::all::UserId;
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoleAssignment {
    pub username: String,
    pub role_name: String,
    /// UNIX timestamp in seconds
    pub assigned_at: u64,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct TitleBook {
    /// Latest assignment per user
    #[serde(default)]
    pub assignments: HashMap<UserId, RoleAssignment>,
    /// Every title ever handed out
    #[serde(default)]
    pub taken: BTreeSet<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TitleGrant {
    Assigned {
        title: String,
        /// The title the user held before, which they lose
        previous: Option<String>,
    },
    /// Too soon; try again after this long
    CoolingDown(Duration),
    /// Every title in the pool has been taken
    Exhausted,
}

pub fn cooldown_from_days(days: u64) -> Duration {
    Duration::from_secs(days * SECS_PER_DAY)
}

impl TitleBook {
    /// Time left before `user_id` may claim another title, if any.
    pub fn remaining_cooldown(
        &self,
        user_id: UserId,
        now: u64,
        cooldown: Duration,
    ) -> Option<Duration> {
        let last = self.assignments.get(&user_id)?;
        let elapsed = Duration::from_secs(now.saturating_sub(last.assigned_at));
        cooldown.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    pub fn can_assign(&self, user_id: UserId, now: u64, cooldown: Duration) -> bool {
        self.remaining_cooldown(user_id, now, cooldown).is_none()
    }

    /// Titles from `pool` nobody has been given yet.
    pub fn available<'a>(&'a self, pool: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        pool.iter()
            .map(String::as_str)
            .filter(|title| !self.taken.contains(*title))
    }

    /// Hand `user_id` a random untaken title, if the cooldown allows it.
    pub fn assign(
        &mut self,
        user_id: UserId,
        username: &str,
        pool: &[String],
        now: u64,
        cooldown: Duration,
        rng: &mut impl rand::Rng,
    ) -> TitleGrant {
        if !self.can_assign(user_id, now, cooldown) {
            let left = self
                .remaining_cooldown(user_id, now, cooldown)
                .unwrap_or_default();
            return TitleGrant::CoolingDown(left);
        }

        let Some(title) = self.available(pool).choose(rng).map(str::to_owned) else {
            return TitleGrant::Exhausted;
        };

        self.taken.insert(title.clone());
        let previous = self
            .assignments
            .insert(
                user_id,
                RoleAssignment {
                    username: username.to_owned(),
                    role_name: title.clone(),
                    assigned_at: now,
                },
            )
            .map(|old| old.role_name);

        TitleGrant::Assigned { title, previous }
    }
}

/// Coarse duration for chat messages, e.g. `3d 4h` or `42m`.
pub fn format_cooldown(left: Duration) -> String {
    let secs = left.as_secs();
    let (days, hours, minutes) = (
        secs / SECS_PER_DAY,
        secs % SECS_PER_DAY / 3600,
        secs % 3600 / 60,
    );

    match (days, hours) {
        (0, 0) => format!("{}m", minutes.max(1)),
        (0, _) => format!("{}h {}m", hours, minutes),
        _ => format!("{}d {}h", days, hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const WEEK: u64 = 7 * SECS_PER_DAY;
    const START: u64 = 1_700_000_000;

    fn pool() -> Vec<String> {
        ["Test Subject", "Cake Connoisseur", "Turret Whisperer"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn cooldown() -> Duration {
        cooldown_from_days(7)
    }

    #[test]
    fn first_assignment_is_always_allowed() {
        assert!(TitleBook::default().can_assign(UserId::new(1), START, cooldown()));
    }

    #[test]
    fn second_assignment_waits_a_week() {
        let mut book = TitleBook::default();
        let mut rng = StdRng::seed_from_u64(1);
        let user = UserId::new(1);

        let first = book.assign(user, "glados", &pool(), START, cooldown(), &mut rng);
        assert!(matches!(first, TitleGrant::Assigned { previous: None, .. }));

        assert!(!book.can_assign(user, START + WEEK - 1, cooldown()));
        assert_eq!(
            book.assign(user, "glados", &pool(), START + 60, cooldown(), &mut rng),
            TitleGrant::CoolingDown(Duration::from_secs(WEEK - 60))
        );

        assert!(book.can_assign(user, START + WEEK, cooldown()));
        assert!(book.can_assign(user, START + WEEK + 1, cooldown()));
        let second = book.assign(user, "glados", &pool(), START + WEEK + 1, cooldown(), &mut rng);
        let TitleGrant::Assigned { previous, .. } = second else {
            panic!("expected a second title");
        };
        assert!(previous.is_some());
    }

    #[test]
    fn cooldown_is_per_user() {
        let mut book = TitleBook::default();
        let mut rng = StdRng::seed_from_u64(2);

        book.assign(UserId::new(1), "chell", &pool(), START, cooldown(), &mut rng);

        assert!(book.can_assign(UserId::new(2), START, cooldown()));
    }

    #[test]
    fn titles_are_never_offered_twice() {
        let mut book = TitleBook::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = BTreeSet::new();

        for user in 1..=3 {
            match book.assign(UserId::new(user), "subject", &pool(), START, cooldown(), &mut rng) {
                TitleGrant::Assigned { title, .. } => assert!(seen.insert(title)),
                other => panic!("expected a title, got {:?}", other),
            }
        }

        assert_eq!(book.available(&pool()).count(), 0);
        assert_eq!(
            book.assign(UserId::new(4), "subject", &pool(), START, cooldown(), &mut rng),
            TitleGrant::Exhausted
        );
    }

    #[test]
    fn cooled_down_user_still_cannot_reuse_their_old_title() {
        let mut book = TitleBook::default();
        let mut rng = StdRng::seed_from_u64(4);
        let pool = vec!["Only Title".to_owned()];
        let user = UserId::new(1);

        book.assign(user, "wheatley", &pool, START, cooldown(), &mut rng);

        assert_eq!(
            book.assign(user, "wheatley", &pool, START + WEEK + 1, cooldown(), &mut rng),
            TitleGrant::Exhausted
        );
    }

    #[test]
    fn cooldown_formatting() {
        assert_eq!(format_cooldown(Duration::from_secs(30)), "1m");
        assert_eq!(format_cooldown(Duration::from_secs(5 * 3600 + 12 * 60)), "5h 12m");
        assert_eq!(format_cooldown(Duration::from_secs(3 * SECS_PER_DAY + 4 * 3600)), "3d 4h");
    }
}
