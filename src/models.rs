// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub poll_id: Uuid,
    pub user_id: String,
    pub option_index: u32,
    pub created_at: DateTime<Utc>,
}

/// Question and options after trimming and bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollInput {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteInput {
    pub poll_id: Uuid,
    pub option_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option: String,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResults {
    pub poll: Poll,
    pub tallies: Vec<OptionTally>,
    pub total_votes: i64,
}

#[derive(Debug, Deserialize)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_index: i64,
}
