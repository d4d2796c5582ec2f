// src/store/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{PollStore, StorageResult, VoteWrite};
use crate::error::StorageError;
use crate::models::{Poll, PollInput, Vote};

#[derive(Debug, sqlx::FromRow)]
struct PollRow {
    id: Uuid,
    question: String,
    options: Json<Vec<String>>,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl From<PollRow> for Poll {
    fn from(row: PollRow) -> Self {
        Poll {
            id: row.id,
            question: row.question,
            options: row.options.0,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    poll_id: Uuid,
    user_id: String,
    option_index: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = StorageError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let option_index = u32::try_from(row.option_index)
            .map_err(|_| StorageError::new(format!("negative option_index {}", row.option_index)))?;
        Ok(Vote {
            poll_id: row.poll_id,
            user_id: row.user_id,
            option_index,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgPollStore {
    pool: PgPool,
}

impl PgPollStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PollStore for PgPollStore {
    #[instrument(skip(self, poll), fields(poll_id = %poll.id))]
    async fn insert_poll(&self, poll: &Poll) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO polls (id, question, options, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(poll.id)
        .bind(&poll.question)
        .bind(Json(&poll.options))
        .bind(&poll.user_id)
        .bind(poll.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_poll(&self, id: Uuid) -> StorageResult<Option<Poll>> {
        let row = sqlx::query_as::<_, PollRow>(
            r#"
            SELECT id, question, options, user_id, created_at
            FROM polls
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Poll::from))
    }

    #[instrument(skip(self))]
    async fn list_polls_by_owner(&self, user_id: &str) -> StorageResult<Vec<Poll>> {
        let rows = sqlx::query_as::<_, PollRow>(
            r#"
            SELECT id, question, options, user_id, created_at
            FROM polls
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Poll::from).collect())
    }

    #[instrument(skip(self, input))]
    async fn update_poll(&self, id: Uuid, input: &PollInput) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE polls
            SET question = $2, options = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.question)
        .bind(Json(&input.options))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_poll(&self, id: Uuid) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Votes first, inside the same transaction as the poll row.
        let votes = sqlx::query("DELETE FROM votes WHERE poll_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let polls = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if polls.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        debug!(votes_removed = votes.rows_affected(), "Poll deleted");
        Ok(true)
    }

    #[instrument(skip(self, vote), fields(poll_id = %vote.poll_id, user_id = %vote.user_id))]
    async fn upsert_vote(&self, vote: &Vote) -> StorageResult<VoteWrite> {
        let option_index = i32::try_from(vote.option_index)
            .map_err(|_| StorageError::new(format!("option_index {} out of range", vote.option_index)))?;

        // FOR SHARE blocks a concurrent options update until this write lands,
        // and the bound is re-checked against the row it then sees.
        let result = sqlx::query(
            r#"
            INSERT INTO votes (poll_id, user_id, option_index, created_at)
            SELECT p.id, $2, $3, $4
            FROM polls p
            WHERE p.id = $1 AND jsonb_array_length(p.options) > $3
            FOR SHARE
            ON CONFLICT (poll_id, user_id) DO UPDATE
            SET option_index = EXCLUDED.option_index,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(vote.poll_id)
        .bind(&vote.user_id)
        .bind(option_index)
        .bind(vote.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(VoteWrite::Recorded);
        }

        let option_count: Option<i32> =
            sqlx::query_scalar("SELECT jsonb_array_length(options) FROM polls WHERE id = $1")
                .bind(vote.poll_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match option_count {
            None => VoteWrite::PollMissing,
            Some(count) => VoteWrite::OptionOutOfRange {
                option_count: usize::try_from(count).unwrap_or(0),
            },
        })
    }

    #[instrument(skip(self))]
    async fn votes_for_poll(&self, poll_id: Uuid) -> StorageResult<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT poll_id, user_id, option_index, created_at
            FROM votes
            WHERE poll_id = $1
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vote::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    // Runs only against a live database: DATABASE_URL=postgres://... cargo test
    async fn test_store() -> Option<PgPollStore> {
        let database_url = env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("connect test database");
        crate::db::run_migrations(&pool).await.expect("apply migrations");
        Some(PgPollStore::new(pool))
    }

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

    #[test]
    fn store_is_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<PgPollStore>();
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let Some(store) = test_store().await else {
            return;
        };
        let p = poll("alice");
        store.insert_poll(&p).await.expect("insert");

        let fetched = store.get_poll(p.id).await.expect("get").expect("present");
        assert_eq!(fetched.question, p.question);
        assert_eq!(fetched.options, p.options);
        assert_eq!(fetched.user_id, "alice");

        store.delete_poll(p.id).await.expect("cleanup");
    }

    #[tokio::test]
    async fn concurrent_upserts_collapse_to_one_row() {
        let Some(store) = test_store().await else {
            return;
        };
        let p = poll("alice");
        store.insert_poll(&p).await.expect("insert");

        let first = vote(p.id, "bob", 0);
        let second = vote(p.id, "bob", 1);
        let (a, b) = tokio::join!(store.upsert_vote(&first), store.upsert_vote(&second));
        assert_eq!(a.expect("first upsert"), VoteWrite::Recorded);
        assert_eq!(b.expect("second upsert"), VoteWrite::Recorded);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE poll_id = $1 AND user_id = $2")
                .bind(p.id)
                .bind("bob")
                .fetch_one(store.pool())
                .await
                .expect("count rows");
        assert_eq!(count, 1);

        store.delete_poll(p.id).await.expect("cleanup");
    }

    #[tokio::test]
    async fn upsert_rejects_index_past_live_options() {
        let Some(store) = test_store().await else {
            return;
        };
        let p = poll("alice");
        store.insert_poll(&p).await.expect("insert");

        let outcome = store.upsert_vote(&vote(p.id, "bob", 2)).await.expect("upsert");
        assert_eq!(outcome, VoteWrite::OptionOutOfRange { option_count: 2 });
        assert!(store.votes_for_poll(p.id).await.expect("votes").is_empty());

        let missing = store
            .upsert_vote(&vote(Uuid::new_v4(), "bob", 0))
            .await
            .expect("upsert on missing poll");
        assert_eq!(missing, VoteWrite::PollMissing);

        store.delete_poll(p.id).await.expect("cleanup");
    }

    #[tokio::test]
    async fn delete_removes_votes_in_same_transaction() {
        let Some(store) = test_store().await else {
            return;
        };
        let p = poll("alice");
        store.insert_poll(&p).await.expect("insert");
        store.upsert_vote(&vote(p.id, "bob", 1)).await.expect("vote");

        assert!(store.delete_poll(p.id).await.expect("delete"));
        assert!(store.get_poll(p.id).await.expect("get").is_none());
        assert!(store.votes_for_poll(p.id).await.expect("votes").is_empty());
        assert!(!store.delete_poll(p.id).await.expect("second delete"));
    }
}
