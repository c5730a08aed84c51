// League data providers: the trait the history pipeline consumes plus the
// HTTP and in-memory implementations.

pub mod memory;
pub mod sleeper;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{BracketMatch, League, Matchup, NflState, Roster, User};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("{what} not found")]
    NotFound { what: String },
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Read-only access to one provider's league data.
///
/// Implementations own transport concerns (timeouts, retries). The history
/// pipeline treats every error as "that unit is unavailable".
#[async_trait]
pub trait DataSource: Send + Sync {
    /// League snapshot, or `None` when the provider has no such league.
    async fn league(&self, league_id: &str) -> Result<Option<League>>;

    async fn users(&self, league_id: &str) -> Result<Vec<User>>;

    async fn rosters(&self, league_id: &str) -> Result<Vec<Roster>>;

    async fn matchups(&self, league_id: &str, week: u32) -> Result<Vec<Matchup>>;

    /// Winners bracket, when the league ran a bracketed playoff.
    async fn winners_bracket(&self, league_id: &str) -> Result<Option<Vec<BracketMatch>>>;

    async fn nfl_state(&self) -> Result<NflState>;

    /// A next-season league whose backlink points at `league_id`, if any.
    async fn find_successor(&self, _league_id: &str) -> Result<Option<League>> {
        Ok(None)
    }
}
