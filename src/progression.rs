//! Message-count driven ranks.
//!
//! Every counted message bumps the author's total.  The total maps onto an ordered table of rank
//! roles, and a member should wear exactly one of them: the highest one they qualify for.

use crate::{
    member::MemberView,
    persistent_state::{JsonDocument, MessageCounts, RankBook},
};
use anyhow::Result;
use serenity::all::{RoleId, UserId};
use std::collections::{BTreeMap, HashMap};

/// One row of the rank table as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RankTier {
    /// Messages needed to reach this rank
    pub messages: u64,
    /// Name of the role representing this rank
    pub role: String,
}

/// Rank roles ordered by the message count that unlocks them.
pub struct RankTable(BTreeMap<u64, String>);

/// Role edits needed to move a member onto a rank.
#[derive(Debug, PartialEq, Eq)]
pub struct RankChange {
    /// Role to add.  `None` when the role does not exist in the guild yet and must be created.
    pub grant: Option<RoleId>,
    /// Other rank roles, and the default role, to take away afterwards.
    pub revoke: Vec<RoleId>,
}

impl RankTable {
    pub fn new(tiers: &[RankTier]) -> Self {
        Self(
            tiers
                .iter()
                .map(|tier| (tier.messages, tier.role.clone()))
                .collect(),
        )
    }

    /// The highest rank whose threshold is at most `count`.
    pub fn resolve_rank(&self, count: u64) -> Option<&str> {
        self.0
            .range(..=count)
            .next_back()
            .map(|(_, role)| role.as_str())
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }
}

/// Work out how to put `member` on `new_rank`.
///
/// `None` if the member already wears the rank.  Otherwise the rank is granted first, then every
/// other managed rank the member wears is revoked, then the default role if they have it.
/// `guild_roles` maps role names to ids for the roles that exist in the guild.
pub fn plan_rank_change(
    table: &RankTable,
    new_rank: &str,
    member: &impl MemberView,
    guild_roles: &HashMap<String, RoleId>,
    default_role: Option<RoleId>,
) -> Option<RankChange> {
    let grant = guild_roles.get(new_rank).copied();
    if grant.is_some_and(|role_id| member.has_role(role_id)) {
        return None;
    }

    let mut revoke: Vec<RoleId> = table
        .roles()
        .filter(|&role| role != new_rank)
        .filter_map(|role| guild_roles.get(role).copied())
        .filter(|&role_id| member.has_role(role_id))
        .collect();

    if let Some(default_role) = default_role {
        if member.has_role(default_role) && Some(default_role) != grant {
            revoke.push(default_role);
        }
    }

    Some(RankChange { grant, revoke })
}

impl JsonDocument<MessageCounts> {
    /// Count one more message from `user_id`.  Returns the new total.
    pub async fn record_activity(&self, user_id: UserId) -> Result<u64> {
        self.update(|counts| {
            let count = counts.0.entry(user_id).or_insert(0);
            *count += 1;
            *count
        })
        .await
    }
}

impl JsonDocument<RankBook> {
    /// Record `rank` as the one announced for `user_id`.  Returns the rank recorded before, so a
    /// caller seeing `rank` back knows the promotion was already announced.
    pub async fn claim_rank(&self, user_id: UserId, rank: &str) -> Result<Option<String>> {
        self.update(|ranks| ranks.0.insert(user_id, rank.to_owned()))
            .await
    }

    /// Put back what [`claim_rank`](Self::claim_rank) replaced.
    pub async fn restore_rank(&self, user_id: UserId, previous: Option<String>) -> Result<()> {
        self.update(|ranks| match previous {
            Some(rank) => {
                ranks.0.insert(user_id, rank);
            }
            None => {
                ranks.0.remove(&user_id);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Progression, member::testing::FakeMember};

    fn table() -> RankTable {
        RankTable::new(&Progression::default().ranks)
    }

    /// Guild where every rank role exists, with ids 1.. in table order, plus a default role 99.
    fn guild_roles() -> HashMap<String, RoleId> {
        table()
            .roles()
            .enumerate()
            .map(|(i, role)| (role.to_owned(), RoleId::new(i as u64 + 1)))
            .collect()
    }

    const DEFAULT_ROLE: u64 = 99;

    fn apply(member: &mut FakeMember, change: &RankChange) {
        member.roles.push(change.grant.expect("role exists"));
        member.roles.retain(|r| !change.revoke.contains(r));
    }

    #[test]
    fn below_first_threshold_has_no_rank() {
        assert_eq!(table().resolve_rank(0), None);
    }

    #[test]
    fn exact_and_between_thresholds() {
        let table = table();
        assert_eq!(table.resolve_rank(1), Some("Mildly Interesting"));
        assert_eq!(table.resolve_rank(9), Some("Mildly Interesting"));
        assert_eq!(table.resolve_rank(10), Some("Infinite Curiosity"));
        assert_eq!(table.resolve_rank(387), Some("Cosmic Anomaly"));
        assert_eq!(table.resolve_rank(388), Some("Lab Rat Extraordinaire"));
        assert_eq!(table.resolve_rank(1_000_000), Some("Godlike Algorithm"));
    }

    #[test]
    fn resolve_rank_is_monotonic() {
        let table = table();
        let order: Vec<&str> = table.roles().collect();
        let position = |count| {
            table
                .resolve_rank(count)
                .map(|rank| order.iter().position(|&r| r == rank).unwrap() as i64)
                .unwrap_or(-1)
        };

        for count in 0..2100 {
            assert!(position(count) <= position(count + 1), "count {}", count);
        }
    }

    #[test]
    fn already_holding_rank_is_a_no_op() {
        let member = FakeMember::with_roles(1, &[2, DEFAULT_ROLE]);
        let change = plan_rank_change(
            &table(),
            "Infinite Curiosity",
            &member,
            &guild_roles(),
            Some(RoleId::new(DEFAULT_ROLE)),
        );
        assert_eq!(change, None);
    }

    #[test]
    fn promotion_strips_lower_ranks_and_default_role() {
        let mut member = FakeMember::with_roles(1, &[1, 4, DEFAULT_ROLE, 500]);
        let change = plan_rank_change(
            &table(),
            "Infinite Curiosity",
            &member,
            &guild_roles(),
            Some(RoleId::new(DEFAULT_ROLE)),
        )
        .unwrap();

        assert_eq!(change.grant, Some(RoleId::new(2)));
        assert_eq!(
            change.revoke,
            vec![RoleId::new(1), RoleId::new(4), RoleId::new(DEFAULT_ROLE)]
        );

        apply(&mut member, &change);
        // Unmanaged role 500 survives, exactly one rank remains.
        assert_eq!(member.roles, vec![RoleId::new(500), RoleId::new(2)]);
    }

    #[test]
    fn missing_role_must_be_created() {
        let member = FakeMember::with_roles(1, &[]);
        let change =
            plan_rank_change(&table(), "Mildly Interesting", &member, &HashMap::new(), None)
                .unwrap();

        assert_eq!(
            change,
            RankChange {
                grant: None,
                revoke: Vec::new()
            }
        );
    }

    #[test]
    fn walking_up_the_table_leaves_one_rank() {
        let table = table();
        let roles = guild_roles();
        let managed: Vec<RoleId> = roles.values().copied().collect();
        let mut member = FakeMember::with_roles(1, &[DEFAULT_ROLE]);

        for count in [1, 10, 11, 25, 100, 2000] {
            let rank = table.resolve_rank(count).unwrap();
            if let Some(change) =
                plan_rank_change(&table, rank, &member, &roles, Some(RoleId::new(DEFAULT_ROLE)))
            {
                apply(&mut member, &change);
            }
            let held = member.roles.iter().filter(|r| managed.contains(r)).count();
            assert_eq!(held, 1, "count {}", count);
            assert!(!member.has_role(RoleId::new(DEFAULT_ROLE)));
        }
    }

    #[tokio::test]
    async fn record_activity_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let counts: JsonDocument<MessageCounts> =
            JsonDocument::new(dir.path().join("message_counts.json"));
        let user = UserId::new(5);

        assert_eq!(counts.record_activity(user).await.unwrap(), 1);
        assert_eq!(counts.record_activity(user).await.unwrap(), 2);

        let stored = counts.load().await;
        assert_eq!(stored.0.get(&user), Some(&2));
        assert_eq!(stored.0.get(&UserId::new(6)), None);
    }

    #[tokio::test]
    async fn claim_rank_reports_the_previous_rank() {
        let dir = tempfile::tempdir().unwrap();
        let ranks: JsonDocument<RankBook> =
            JsonDocument::new(dir.path().join("user_progression.json"));
        let user = UserId::new(5);

        let previous = ranks.claim_rank(user, "Mildly Interesting").await.unwrap();
        assert_eq!(previous, None);
        assert_eq!(
            ranks.claim_rank(user, "Infinite Curiosity").await.unwrap(),
            Some("Mildly Interesting".to_owned())
        );

        assert_eq!(
            ranks.load().await.0.get(&user).map(String::as_str),
            Some("Infinite Curiosity")
        );
    }

    #[tokio::test]
    async fn back_to_back_claims_announce_once() {
        let dir = tempfile::tempdir().unwrap();
        let ranks: JsonDocument<RankBook> =
            JsonDocument::new(dir.path().join("user_progression.json"));
        let user = UserId::new(5);

        let (first, second) = tokio::join!(
            ranks.claim_rank(user, "Error 404"),
            ranks.claim_rank(user, "Error 404"),
        );
        let announced = [first.unwrap(), second.unwrap()]
            .iter()
            .filter(|previous| previous.as_deref() != Some("Error 404"))
            .count();

        assert_eq!(announced, 1);
    }

    #[tokio::test]
    async fn restore_rank_undoes_a_claim() {
        let dir = tempfile::tempdir().unwrap();
        let ranks: JsonDocument<RankBook> =
            JsonDocument::new(dir.path().join("user_progression.json"));
        let user = UserId::new(5);

        let previous = ranks.claim_rank(user, "Error 404").await.unwrap();
        ranks.restore_rank(user, previous).await.unwrap();
        assert!(ranks.load().await.0.get(&user).is_none());

        ranks.claim_rank(user, "Error 404").await.unwrap();
        let previous = ranks.claim_rank(user, "Persistent Error").await.unwrap();
        ranks.restore_rank(user, previous).await.unwrap();
        assert_eq!(
            ranks.load().await.0.get(&user).map(String::as_str),
            Some("Error 404")
        );
    }
}
