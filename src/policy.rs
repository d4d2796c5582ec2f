// src/policy.rs
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PollError;
use crate::models::Poll;

/// Decides whether a poll currently accepts votes. Runs before the vote upsert.
#[async_trait]
pub trait VotingPolicy: Send + Sync {
    async fn check_open(&self, poll: &Poll) -> Result<(), PollError>;
}

/// Every poll accepts votes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

#[async_trait]
impl VotingPolicy for AlwaysOpen {
    async fn check_open(&self, _poll: &Poll) -> Result<(), PollError> {
        Ok(())
    }
}

/// Rejects votes on an explicit set of closed polls.
#[derive(Debug, Default)]
pub struct ClosedPolls {
    closed: RwLock<HashSet<Uuid>>,
}

// A set insert or remove cannot leave the set half-written, so a poisoned
// lock still holds a valid set and is recovered.
impl ClosedPolls {
    pub fn close(&self, id: Uuid) {
        self.closed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    pub fn reopen(&self, id: Uuid) {
        self.closed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn is_closed(&self, id: &Uuid) -> bool {
        self.closed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

#[async_trait]
impl VotingPolicy for ClosedPolls {
    async fn check_open(&self, poll: &Poll) -> Result<(), PollError> {
        if self.is_closed(&poll.id) {
            return Err(PollError::Conflict("Poll is closed for voting".to_string()));
        }
        Ok(())
    }
}
