// src/store/mod.rs
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{Poll, PollInput, Vote};

pub mod memory;
pub mod postgres;

pub use memory::MemoryPollStore;
pub use postgres::PgPollStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a vote upsert. The option bound is checked in the same atomic
/// step as the write, against the poll as it is at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWrite {
    Recorded,
    PollMissing,
    OptionOutOfRange { option_count: usize },
}

/// Durable home of polls and votes.
///
/// Implementations must make `upsert_vote` a single atomic step keyed on
/// `(poll_id, user_id)` that also rejects an index past the poll's live
/// options, and `delete_poll` must remove the poll and its votes
/// together or not at all.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(&self, poll: &Poll) -> StorageResult<()>;

    async fn get_poll(&self, id: Uuid) -> StorageResult<Option<Poll>>;

    /// Newest first.
    async fn list_polls_by_owner(&self, user_id: &str) -> StorageResult<Vec<Poll>>;

    /// Replaces question and options. Returns false when the poll is gone.
    async fn update_poll(&self, id: Uuid, input: &PollInput) -> StorageResult<bool>;

    /// Returns false when the poll is gone.
    async fn delete_poll(&self, id: Uuid) -> StorageResult<bool>;

    async fn upsert_vote(&self, vote: &Vote) -> StorageResult<VoteWrite>;

    async fn votes_for_poll(&self, poll_id: Uuid) -> StorageResult<Vec<Vote>>;
}
