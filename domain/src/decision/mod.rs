//! Collaborative decisions
//!
//! A [`DecisionRequest`](request::DecisionRequest) names the participants whose
//! votes are required. Each participant answers with an
//! [`AgentVote`](vote::AgentVote), and the
//! [`VotingStrategyEngine`](engine::VotingStrategyEngine) reduces the votes
//! under a [`VotingPolicy`](policy::VotingPolicy) into one
//! [`DecisionResult`](result::DecisionResult).

pub mod category;
pub mod engine;
pub mod policy;
pub mod request;
pub mod result;
pub mod vote;
