use super::StatsProvider;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.balldontlie.io/nfl/v1";
// A team plays at most ~21 games a season, so one page covers it
const GAMES_PER_PAGE: &str = "100";

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("team list is empty, unable to fetch team data")]
    TeamListUnavailable,
    #[error("team '{0}' not found")]
    TeamNotFound(String),
    #[error("stats API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("stats API returned error: {0}")]
    Status(StatusCode),
}

/// NFL team as listed by the stats API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub full_name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

impl Team {
    /// Case-insensitive match on short name or location, or containment in the full name
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.name.to_lowercase() == query
            || self.location.to_lowercase() == query
            || self.full_name.to_lowercase().contains(&query)
    }
}

/// First team in `teams` matching `name`
pub fn find_team<'a>(teams: &'a [Team], name: &str) -> Option<&'a Team> {
    teams.iter().find(|team| team.matches(name))
}

/// A single game between two teams. Scores are `None` until the game is played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: u64,
    pub date: String, // ISO 8601, sorts chronologically
    pub season: i32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

pub type GameSet = Vec<GameResult>;

impl GameResult {
    pub fn is_completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// Id of the side with the strictly greater score; `None` for ties and unplayed games
    pub fn winner(&self) -> Option<u32> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) if home > away => Some(self.home_team_id),
            (Some(home), Some(away)) if away > home => Some(self.away_team_id),
            _ => None,
        }
    }
}

/// The last `n` games of `games` by date, oldest first
pub fn most_recent(mut games: GameSet, n: usize) -> GameSet {
    games.sort_by(|a, b| a.date.cmp(&b.date));
    let skip = games.len().saturating_sub(n);
    games.into_iter().skip(skip).collect()
}

/// Games played between `team_id` and `opponent_id`, in input order
pub fn head_to_head(games: GameSet, team_id: u32, opponent_id: u32) -> GameSet {
    games
        .into_iter()
        .filter(|game| game.involves(team_id) && game.involves(opponent_id))
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiTeamRef {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    id: u64,
    #[serde(default)]
    date: String,
    season: i32,
    home_team: ApiTeamRef,
    visitor_team: ApiTeamRef,
    home_team_score: Option<i32>,
    visitor_team_score: Option<i32>,
}

impl From<ApiGame> for GameResult {
    fn from(game: ApiGame) -> Self {
        Self {
            id: game.id,
            date: game.date,
            season: game.season,
            home_team_id: game.home_team.id,
            away_team_id: game.visitor_team.id,
            home_score: game.home_team_score,
            away_score: game.visitor_team_score,
        }
    }
}

/// Lazily populated team list owned by one client.
///
/// Rosters don't change within a session, so the list is fetched at most once
/// unless [`TeamCache::invalidate`] is called. Empty lists are never stored.
#[derive(Debug, Default)]
pub struct TeamCache {
    teams: RwLock<Option<Arc<Vec<Team>>>>,
}

impl TeamCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Arc<Vec<Team>>> {
        self.teams.read().await.clone()
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<Team>>, StatsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Team>, StatsError>>,
    {
        if let Some(teams) = self.get().await {
            return Ok(teams);
        }

        let mut slot = self.teams.write().await;
        if let Some(teams) = slot.as_ref() {
            return Ok(teams.clone());
        }

        let teams = Arc::new(fetch().await?);
        if !teams.is_empty() {
            *slot = Some(teams.clone());
        }
        Ok(teams)
    }

    pub async fn invalidate(&self) {
        *self.teams.write().await = None;
    }
}

/// NFL season a date falls in; the season starts in September
pub fn nfl_season_for(date: NaiveDate) -> i32 {
    if date.month() >= 9 {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Most recent NFL season whose playoffs are over on `date`.
///
/// The Super Bowl is played in early February, so through January the
/// previous season is still running.
pub fn last_completed_season_for(date: NaiveDate) -> i32 {
    if date.month() == 1 {
        date.year() - 2
    } else {
        date.year() - 1
    }
}

pub struct NflApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    current_season: i32,
    last_season: i32,
    teams: TeamCache,
}

impl NflApiClient {
    pub fn new(api_key: String) -> Self {
        let today = Utc::now().date_naive();
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            current_season: nfl_season_for(today),
            last_season: last_completed_season_for(today),
            teams: TeamCache::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_seasons(mut self, current_season: i32, last_season: i32) -> Self {
        self.current_season = current_season;
        self.last_season = last_season;
        self
    }

    pub fn current_season(&self) -> i32 {
        self.current_season
    }

    pub fn last_season(&self) -> i32 {
        self.last_season
    }

    pub fn team_cache(&self) -> &TeamCache {
        &self.teams
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StatsError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StatsError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    /// Fetch every team from the API, bypassing the cache
    pub async fn fetch_teams(&self) -> Result<Vec<Team>, StatsError> {
        let teams: ApiList<Team> = self.get_json("teams", &[]).await?;
        debug!(count = teams.data.len(), "Fetched NFL teams");
        Ok(teams.data)
    }

    pub async fn get_teams(&self) -> Result<Arc<Vec<Team>>, StatsError> {
        self.teams.get_or_fetch(|| self.fetch_teams()).await
    }

    /// Completed games in `season` involving any of `team_ids`
    async fn fetch_completed_games(
        &self,
        team_ids: &[u32],
        season: i32,
    ) -> Result<GameSet, StatsError> {
        let mut query: Vec<(&str, String)> = team_ids
            .iter()
            .map(|id| ("team_ids[]", id.to_string()))
            .collect();
        query.push(("seasons[]", season.to_string()));
        query.push(("per_page", GAMES_PER_PAGE.to_string()));

        let games: ApiList<ApiGame> = self.get_json("games", &query).await?;
        Ok(games
            .data
            .into_iter()
            .map(GameResult::from)
            .filter(GameResult::is_completed)
            .collect())
    }
}

#[async_trait]
impl StatsProvider for NflApiClient {
    async fn get_team_id(&self, team_name: &str) -> Result<u32, StatsError> {
        let teams = self.get_teams().await?;
        if teams.is_empty() {
            return Err(StatsError::TeamListUnavailable);
        }

        find_team(&teams, team_name)
            .map(|team| team.id)
            .ok_or_else(|| StatsError::TeamNotFound(team_name.to_string()))
    }

    async fn get_recent_games(&self, team_id: u32, n: usize) -> Result<GameSet, StatsError> {
        let mut games = self
            .fetch_completed_games(&[team_id], self.current_season)
            .await?;

        // Early in a season, top up from the previous one
        if games.len() < n {
            let previous = self
                .fetch_completed_games(&[team_id], self.current_season - 1)
                .await?;
            games.extend(previous);
        }

        Ok(most_recent(games, n))
    }

    async fn get_head_to_head(
        &self,
        team_id: u32,
        opponent_id: u32,
        season: i32,
    ) -> Result<GameSet, StatsError> {
        let games = self
            .fetch_completed_games(&[team_id, opponent_id], season)
            .await?;

        Ok(head_to_head(games, team_id, opponent_id))
    }

    fn last_completed_season(&self) -> i32 {
        self.last_season
    }
}
