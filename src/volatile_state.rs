use serenity::all::{ChannelId, GuildId, UserId};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use tokio::time::Instant;

/// State which is lost across sessions
pub struct VolatileState {
    pub challenges: ActiveChallenges,
    /// When a human last said anything, for the silence watcher
    pub last_activity: Option<Instant>,
    /// Voice channel the bot is playing music in, per guild
    pub music_sessions: HashMap<GuildId, ChannelId>,
    pub silence_watch_started: bool,
}

/// Users currently in the middle of an experiment or riddle.
#[derive(Clone, Default)]
pub struct ActiveChallenges(Arc<Mutex<HashSet<UserId>>>);

/// Held for the duration of a challenge.  Frees the user's slot when dropped.
pub struct ChallengeSlot {
    active: ActiveChallenges,
    user_id: UserId,
}

impl VolatileState {
    pub async fn new() -> Self {
        Self {
            challenges: ActiveChallenges::default(),
            last_activity: None,
            music_sessions: HashMap::new(),
            silence_watch_started: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Some(Instant::now());
    }
}

impl ActiveChallenges {
    /// Claim the slot for `user_id`.  `None` if they already have a challenge running.
    pub fn begin(&self, user_id: UserId) -> Option<ChallengeSlot> {
        let mut active = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(user_id) {
            return None;
        }

        Some(ChallengeSlot {
            active: self.clone(),
            user_id,
        })
    }

    /// Whether `user_id` is in the middle of a challenge.
    pub fn contains(&self, user_id: UserId) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&user_id)
    }
}

impl Drop for ChallengeSlot {
    fn drop(&mut self) {
        self.active
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_challenge_per_user() {
        let challenges = ActiveChallenges::default();
        let user = UserId::new(1);

        let slot = challenges.begin(user).unwrap();
        assert!(challenges.begin(user).is_none());
        assert!(challenges.begin(UserId::new(2)).is_some());
        assert!(challenges.contains(user));

        drop(slot);
        assert!(!challenges.contains(user));
        assert!(challenges.begin(user).is_some());
    }
}
