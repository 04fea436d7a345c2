pub mod nfl_api;

pub use nfl_api::{GameResult, GameSet, NflApiClient, StatsError, Team, TeamCache};

use async_trait::async_trait;

/// Source of historical game results used to score bets
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Resolve a team name, location or full name to the provider's team id
    async fn get_team_id(&self, team_name: &str) -> Result<u32, StatsError>;

    /// The team's `n` most recent completed games, oldest first
    async fn get_recent_games(&self, team_id: u32, n: usize) -> Result<GameSet, StatsError>;

    /// Completed games between the two teams in `season`
    async fn get_head_to_head(
        &self,
        team_id: u32,
        opponent_id: u32,
        season: i32,
    ) -> Result<GameSet, StatsError>;

    /// Season used for head-to-head comparisons
    fn last_completed_season(&self) -> i32;
}
