//! Vote ledger.
//!
//! A user casts at most one vote per election, and only for a candidate of
//! that election.

use std::collections::HashMap;

use crate::services::identity::Actor;
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::vote,
    repositories::{ElectionRepository, VoteRepository},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Vote ledger service.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    election_repo: ElectionRepository,
    id_gen: IdGenerator,
}

/// Input for casting a vote.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteInput {
    #[validate(length(max = 64))]
    #[serde(default)]
    pub election_id: String,

    #[validate(length(max = 64))]
    #[serde(default)]
    pub candidate_id: String,
}

/// A recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    pub id: String,
    pub user_id: String,
    pub election_id: String,
    pub candidate_id: String,
    pub timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl From<vote::Model> for VoteView {
    fn from(vote: vote::Model) -> Self {
        Self {
            id: vote.id,
            user_id: vote.user_id,
            election_id: vote.election_id,
            candidate_id: vote.candidate_id,
            timestamp: vote.created_at,
        }
    }
}

/// Whether a user voted in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCheck {
    pub has_voted: bool,
    pub vote: Option<VoteView>,
}

/// One candidate's standing in an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_id: String,
    pub candidate_name: String,
    pub party: String,
    pub color: String,
    pub votes: u64,
    pub percentage: f64,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository, election_repo: ElectionRepository) -> Self {
        Self {
            vote_repo,
            election_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote for `actor`.
    pub async fn cast_vote(&self, actor: &Actor, input: CastVoteInput) -> AppResult<VoteView> {
        input.validate()?;

        let election_id = input.election_id.trim();
        let candidate_id = input.candidate_id.trim();
        if election_id.is_empty() || candidate_id.is_empty() {
            return Err(AppError::Validation(
                "Election ID and candidate ID are required".to_string(),
            ));
        }

        self.election_repo.get_by_id(election_id).await?;

        let candidate = self
            .election_repo
            .find_candidate(candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate not found: {candidate_id}")))?;

        if candidate.election_id != election_id {
            return Err(AppError::InvalidReference(format!(
                "Candidate {candidate_id} does not stand in election {election_id}"
            )));
        }

        let vote = self
            .vote_repo
            .create_exclusive(vote::Model {
                id: self.id_gen.generate(),
                user_id: actor.user_id.clone(),
                election_id: election_id.to_string(),
                candidate_id: candidate_id.to_string(),
                created_at: Utc::now().into(),
            })
            .await?;

        tracing::info!(
            vote_id = %vote.id,
            user_id = %vote.user_id,
            election_id = %vote.election_id,
            "Vote cast"
        );

        Ok(vote.into())
    }

    /// Whether `user_id` voted in an election, and how.
    pub async fn has_voted(&self, user_id: &str, election_id: &str) -> AppResult<VoteCheck> {
        let vote = self
            .vote_repo
            .find_by_user_and_election(user_id, election_id)
            .await?;

        Ok(VoteCheck {
            has_voted: vote.is_some(),
            vote: vote.map(Into::into),
        })
    }

    /// Number of votes a candidate received.
    pub async fn count_votes(&self, candidate_id: &str) -> AppResult<u64> {
        self.vote_repo.count_by_candidate(candidate_id).await
    }

    /// Per-candidate results of an election, including candidates without votes.
    pub async fn election_results(&self, election_id: &str) -> AppResult<Vec<CandidateResult>> {
        self.election_repo.get_by_id(election_id).await?;

        let candidates = self.election_repo.find_candidates(election_id).await?;
        let tally: HashMap<String, u64> = self
            .vote_repo
            .tally_by_election(election_id)
            .await?
            .into_iter()
            .map(|t| (t.candidate_id, u64::try_from(t.votes).unwrap_or(0)))
            .collect();

        let counted: Vec<(_, u64)> = candidates
            .into_iter()
            .map(|c| {
                let votes = tally.get(&c.id).copied().unwrap_or(0);
                (c, votes)
            })
            .collect();
        let total: u64 = counted.iter().map(|(_, votes)| votes).sum();

        Ok(counted
            .into_iter()
            .map(|(c, votes)| CandidateResult {
                candidate_id: c.id,
                candidate_name: c.name,
                party: c.party,
                color: c.color,
                votes,
                percentage: percentage(votes, total),
            })
            .collect())
    }

    /// Every vote `user_id` has cast, newest first.
    pub async fn list_user_votes(&self, user_id: &str) -> AppResult<Vec<VoteView>> {
        Ok(self
            .vote_repo
            .find_by_user(user_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Number of votes in the system. Admin only.
    pub async fn total_votes(&self, actor: &Actor) -> AppResult<u64> {
        actor.require_admin()?;
        self.vote_repo.count_all().await
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        votes as f64 / total as f64 * 100.0
    }
}
