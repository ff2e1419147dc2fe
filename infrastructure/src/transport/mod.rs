//! Vote transports
//!
//! - [`StaticVoteTransport`]: canned payloads per participant, for offline
//!   runs and replaying recorded votes
//! - `HttpVoteTransport` (feature `http-transport`): POSTs to each
//!   participant's vote endpoint

#[cfg(feature = "http-transport")]
mod http;
mod static_votes;

#[cfg(feature = "http-transport")]
pub use http::{HttpVoteTransport, VOTE_PATH};
pub use static_votes::StaticVoteTransport;
