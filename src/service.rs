// src/service.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::authz::{authorize, Action};
use crate::cache::{poll_key, results_key, CacheInvalidator, POLL_LISTING_KEY};
use crate::error::{PollError, StorageError};
use crate::identity::{Identity, IdentityResolver};
use crate::models::{OptionTally, Poll, PollResults, Vote};
use crate::policy::VotingPolicy;
use crate::store::{PollStore, VoteWrite};
use crate::validation::{validate_poll_id, validate_poll_input, validate_vote_input};

const POLL_NOT_FOUND: &str = "Poll not found";

/// Poll and vote operations.
///
/// Every operation validates its input first, then resolves the caller, then
/// checks ownership where it mutates, and only then touches the store.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
    cache: Arc<dyn CacheInvalidator>,
    policy: Arc<dyn VotingPolicy>,
}

impl PollService {
    pub fn new(
        store: Arc<dyn PollStore>,
        cache: Arc<dyn CacheInvalidator>,
        policy: Arc<dyn VotingPolicy>,
    ) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    async fn require_identity(&self, resolver: &dyn IdentityResolver) -> Result<Identity, PollError> {
        match resolver.current_user().await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => {
                warn!("Rejected unauthenticated request");
                Err(PollError::Authentication)
            }
            Err(e) => {
                error!("Session lookup failed: {e}");
                Err(e.into())
            }
        }
    }

    async fn load_poll(&self, id: Uuid) -> Result<Poll, PollError> {
        self.store
            .get_poll(id)
            .await
            .map_err(log_storage_error)?
            .ok_or_else(|| PollError::NotFound(POLL_NOT_FOUND.to_string()))
    }

    #[instrument(skip(self, resolver, question, options))]
    pub async fn create_poll(
        &self,
        resolver: &dyn IdentityResolver,
        question: &str,
        options: &[String],
    ) -> Result<Poll, PollError> {
        let input = validate_poll_input(question, options)?;
        let owner = self.require_identity(resolver).await?;

        let poll = Poll {
            id: Uuid::new_v4(),
            question: input.question,
            options: input.options,
            user_id: owner.id,
            created_at: Utc::now(),
        };
        self.store.insert_poll(&poll).await.map_err(log_storage_error)?;

        self.cache.invalidate(POLL_LISTING_KEY);
        info!(poll_id = %poll.id, owner = %poll.user_id, "Poll created");
        Ok(poll)
    }

    #[instrument(skip(self))]
    pub async fn get_poll_by_id(&self, id: &str) -> Result<Poll, PollError> {
        let id = validate_poll_id(id)?;
        self.load_poll(id).await
    }

    #[instrument(skip(self, resolver))]
    pub async fn get_user_polls(&self, resolver: &dyn IdentityResolver) -> Result<Vec<Poll>, PollError> {
        let owner = self.require_identity(resolver).await?;
        let polls = self
            .store
            .list_polls_by_owner(&owner.id)
            .await
            .map_err(log_storage_error)?;
        Ok(polls)
    }

    #[instrument(skip(self, resolver, question, options))]
    pub async fn update_poll(
        &self,
        resolver: &dyn IdentityResolver,
        id: &str,
        question: &str,
        options: &[String],
    ) -> Result<(), PollError> {
        let id = validate_poll_id(id)?;
        let input = validate_poll_input(question, options)?;
        let actor = self.require_identity(resolver).await?;

        let existing = self.load_poll(id).await?;
        authorize(&actor, &existing.user_id, Action::Update).inspect_err(|_| {
            warn!(poll_id = %id, actor = %actor.id, "Update forbidden");
        })?;

        // Gone between lookup and write.
        if !self.store.update_poll(id, &input).await.map_err(log_storage_error)? {
            return Err(PollError::NotFound(POLL_NOT_FOUND.to_string()));
        }

        self.cache.invalidate(POLL_LISTING_KEY);
        self.cache.invalidate(&poll_key(id));
        self.cache.invalidate(&results_key(id));
        info!(poll_id = %id, "Poll updated");
        Ok(())
    }

    #[instrument(skip(self, resolver))]
    pub async fn delete_poll(&self, resolver: &dyn IdentityResolver, id: &str) -> Result<(), PollError> {
        let id = validate_poll_id(id)?;
        let actor = self.require_identity(resolver).await?;

        let existing = self.load_poll(id).await?;
        authorize(&actor, &existing.user_id, Action::Delete).inspect_err(|_| {
            warn!(poll_id = %id, actor = %actor.id, "Delete forbidden");
        })?;

        if !self.store.delete_poll(id).await.map_err(log_storage_error)? {
            return Err(PollError::NotFound(POLL_NOT_FOUND.to_string()));
        }

        self.cache.invalidate(POLL_LISTING_KEY);
        self.cache.invalidate(&poll_key(id));
        self.cache.invalidate(&results_key(id));
        info!(poll_id = %id, actor = %actor.id, admin = actor.is_admin(), "Poll deleted");
        Ok(())
    }

    #[instrument(skip(self, resolver))]
    pub async fn submit_vote(
        &self,
        resolver: &dyn IdentityResolver,
        poll_id: &str,
        option_index: i64,
    ) -> Result<(), PollError> {
        let input = validate_vote_input(poll_id, option_index)?;
        let voter = self.require_identity(resolver).await?;

        let poll = self.load_poll(input.poll_id).await?;
        self.policy.check_open(&poll).await?;

        // Options may have changed since the client loaded the poll.
        if input.option_index as usize >= poll.options.len() {
            return Err(option_out_of_range(input.option_index, poll.options.len()));
        }

        let vote = Vote {
            poll_id: input.poll_id,
            user_id: voter.id,
            option_index: input.option_index,
            created_at: Utc::now(),
        };
        // The store re-checks the bound atomically with the write.
        match self.store.upsert_vote(&vote).await.map_err(log_storage_error)? {
            VoteWrite::Recorded => {}
            VoteWrite::PollMissing => return Err(PollError::NotFound(POLL_NOT_FOUND.to_string())),
            VoteWrite::OptionOutOfRange { option_count } => {
                warn!(poll_id = %vote.poll_id, option_count, "Options changed before the vote landed");
                return Err(option_out_of_range(vote.option_index, option_count));
            }
        }

        self.cache.invalidate(&results_key(input.poll_id));
        info!(poll_id = %vote.poll_id, voter = %vote.user_id, option = vote.option_index, "Vote recorded");
        Ok(())
    }

    /// Per-option counts. Votes pointing past the live option list are not counted.
    #[instrument(skip(self))]
    pub async fn get_poll_results(&self, id: &str) -> Result<PollResults, PollError> {
        let id = validate_poll_id(id)?;
        let poll = self.load_poll(id).await?;
        let votes = self.store.votes_for_poll(id).await.map_err(log_storage_error)?;

        let mut counts = vec![0i64; poll.options.len()];
        for vote in &votes {
            if let Some(count) = counts.get_mut(vote.option_index as usize) {
                *count += 1;
            }
        }

        let tallies: Vec<OptionTally> = poll
            .options
            .iter()
            .zip(counts)
            .map(|(option, votes)| OptionTally {
                option: option.clone(),
                votes,
            })
            .collect();
        let total_votes = tallies.iter().map(|t| t.votes).sum();

        Ok(PollResults {
            poll,
            tallies,
            total_votes,
        })
    }
}

fn option_out_of_range(option_index: u32, option_count: usize) -> PollError {
    PollError::validation(format!(
        "Option index {option_index} is out of range for {option_count} options"
    ))
}

fn log_storage_error(e: StorageError) -> PollError {
    error!("Storage error: {e}");
    e.into()
}
