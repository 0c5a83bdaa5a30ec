// Error conditions raised by detail lookups.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("player not found: {query}")]
    PlayerNotFound { query: String },

    #[error("team not found: {team_id}")]
    TeamNotFound { team_id: u32 },
}
