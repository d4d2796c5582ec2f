// src/store/memory.rs
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{PollStore, StorageResult, VoteWrite};
use crate::error::StorageError;
use crate::models::{Poll, PollInput, Vote};

#[derive(Debug, Default)]
struct Tables {
    polls: HashMap<Uuid, Poll>,
    votes: HashMap<(Uuid, String), Vote>,
}

/// Process-local store used when no database is configured.
///
/// One lock guards both tables, and it is never held across an await. Every
/// mutation leaves the tables consistent before it can unwind, so a poisoned
/// lock is recovered rather than surfaced.
#[derive(Debug, Default)]
pub struct MemoryPollStore {
    tables: Mutex<Tables>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn vote_count(&self) -> usize {
        self.lock().votes.len()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn insert_poll(&self, poll: &Poll) -> StorageResult<()> {
        let mut tables = self.lock();
        if tables.polls.contains_key(&poll.id) {
            return Err(StorageError::new(format!(
                "duplicate key value violates unique constraint \"polls_pkey\": {}",
                poll.id
            )));
        }
        tables.polls.insert(poll.id, poll.clone());
        Ok(())
    }

    async fn get_poll(&self, id: Uuid) -> StorageResult<Option<Poll>> {
        Ok(self.lock().polls.get(&id).cloned())
    }

    async fn list_polls_by_owner(&self, user_id: &str) -> StorageResult<Vec<Poll>> {
        let tables = self.lock();
        let mut polls: Vec<Poll> = tables
            .polls
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn update_poll(&self, id: Uuid, input: &PollInput) -> StorageResult<bool> {
        let mut tables = self.lock();
        match tables.polls.get_mut(&id) {
            Some(poll) => {
                poll.question = input.question.clone();
                poll.options = input.options.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_poll(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.lock();
        if tables.polls.remove(&id).is_none() {
            return Ok(false);
        }
        tables.votes.retain(|(poll_id, _), _| *poll_id != id);
        Ok(true)
    }

    async fn upsert_vote(&self, vote: &Vote) -> StorageResult<VoteWrite> {
        let mut tables = self.lock();
        let Some(poll) = tables.polls.get(&vote.poll_id) else {
            return Ok(VoteWrite::PollMissing);
        };
        let option_count = poll.options.len();
        if vote.option_index as usize >= option_count {
            return Ok(VoteWrite::OptionOutOfRange { option_count });
        }
        tables
            .votes
            .insert((vote.poll_id, vote.user_id.clone()), vote.clone());
        Ok(VoteWrite::Recorded)
    }

    async fn votes_for_poll(&self, poll_id: Uuid) -> StorageResult<Vec<Vote>> {
        let tables = self.lock();
        Ok(tables
            .votes
            .values()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn poll(owner: &str) -> Poll {
        Poll {
            id: Uuid::new_v4(),
            question: "Best color?".to_string(),
            options: vec!["Red".to_string(), "Blue".to_string()],
            user_id: owner.to_string(),
            created_at: Utc::now(),
        }
    }

    fn vote(poll_id: Uuid, user: &str, option_index: u32) -> Vote {
        Vote {
            poll_id,
            user_id: user.to_string(),
            option_index,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_voter() {
        let store = MemoryPollStore::new();
        let p = poll("alice");
        store.insert_poll(&p).await.unwrap();

        store.upsert_vote(&vote(p.id, "bob", 0)).await.unwrap();
        store.upsert_vote(&vote(p.id, "bob", 1)).await.unwrap();
        store.upsert_vote(&vote(p.id, "carol", 0)).await.unwrap();

        let votes = store.votes_for_poll(p.id).await.unwrap();
        assert_eq!(votes.len(), 2);
        let bob = votes.iter().find(|v| v.user_id == "bob").unwrap();
        assert_eq!(bob.option_index, 1);
    }

    #[tokio::test]
    async fn vote_on_missing_poll_is_rejected() {
        let store = MemoryPollStore::new();
        let outcome = store.upsert_vote(&vote(Uuid::new_v4(), "bob", 0)).await.unwrap();
        assert_eq!(outcome, VoteWrite::PollMissing);
        assert_eq!(store.vote_count(), 0);
    }

    #[tokio::test]
    async fn vote_past_live_options_is_not_written() {
        let store = MemoryPollStore::new();
        let p = poll("alice");
        store.insert_poll(&p).await.unwrap();

        let outcome = store.upsert_vote(&vote(p.id, "bob", 2)).await.unwrap();
        assert_eq!(outcome, VoteWrite::OptionOutOfRange { option_count: 2 });
        assert_eq!(store.vote_count(), 0);

        let outcome = store.upsert_vote(&vote(p.id, "bob", 1)).await.unwrap();
        assert_eq!(outcome, VoteWrite::Recorded);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let store = MemoryPollStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.tables.lock().unwrap();
            panic!("poison the lock");
        }));
        assert!(store.tables.is_poisoned());
        assert_eq!(store.vote_count(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_only_its_own_votes() {
        let store = MemoryPollStore::new();
        let doomed = poll("alice");
        let kept = poll("alice");
        store.insert_poll(&doomed).await.unwrap();
        store.insert_poll(&kept).await.unwrap();
        store.upsert_vote(&vote(doomed.id, "bob", 0)).await.unwrap();
        store.upsert_vote(&vote(kept.id, "bob", 1)).await.unwrap();

        assert!(store.delete_poll(doomed.id).await.unwrap());
        assert!(!store.delete_poll(doomed.id).await.unwrap());
        assert!(store.votes_for_poll(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.votes_for_poll(kept.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_listing_is_newest_first() {
        let store = MemoryPollStore::new();
        let mut older = poll("alice");
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = poll("alice");
        store.insert_poll(&older).await.unwrap();
        store.insert_poll(&newer).await.unwrap();
        store.insert_poll(&poll("bob")).await.unwrap();

        let listed = store.list_polls_by_owner("alice").await.unwrap();
        assert_eq!(
            listed.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
    }

    #[tokio::test]
    async fn update_preserves_identity_fields() {
        let store = MemoryPollStore::new();
        let p = poll("alice");
        store.insert_poll(&p).await.unwrap();

        let input = PollInput {
            question: "Best shade?".to_string(),
            options: vec!["Teal".to_string(), "Navy".to_string(), "Sky".to_string()],
        };
        assert!(store.update_poll(p.id, &input).await.unwrap());
        assert!(!store.update_poll(Uuid::new_v4(), &input).await.unwrap());

        let stored = store.get_poll(p.id).await.unwrap().unwrap();
        assert_eq!(stored.question, "Best shade?");
        assert_eq!(stored.options.len(), 3);
        assert_eq!(stored.user_id, p.user_id);
        assert_eq!(stored.created_at, p.created_at);
    }
}
