use crate::api::{GameResult, StatsError, StatsProvider};
use crate::models::{Bet, BetAnalysis, ParlayAnalysisResult, ParlayBet, Recommendation};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_RECENT_WEIGHT: f64 = 0.60;
pub const DEFAULT_H2H_WEIGHT: f64 = 0.40;
pub const DEFAULT_RECENT_GAMES: usize = 5;
pub const DEFAULT_STRONG_THRESHOLD: u8 = 75;
pub const DEFAULT_POSSIBLE_THRESHOLD: u8 = 50;
pub const DEFAULT_ALTERNATIVE_THRESHOLD: u8 = 72;
pub const DEFAULT_STATS_TIMEOUT: Duration = Duration::from_secs(5);

/// Weights and thresholds used to turn game history into a confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pub recent_weight: f64,
    pub h2h_weight: f64,
    pub recent_games: usize,
    pub strong_threshold: u8,
    pub possible_threshold: u8,
    /// Parlays scoring below this get the alternative suggestion
    pub alternative_threshold: u8,
    /// Upper bound on the stats lookups for one bet
    pub stats_timeout: Duration,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            recent_weight: DEFAULT_RECENT_WEIGHT,
            h2h_weight: DEFAULT_H2H_WEIGHT,
            recent_games: DEFAULT_RECENT_GAMES,
            strong_threshold: DEFAULT_STRONG_THRESHOLD,
            possible_threshold: DEFAULT_POSSIBLE_THRESHOLD,
            alternative_threshold: DEFAULT_ALTERNATIVE_THRESHOLD,
            stats_timeout: DEFAULT_STATS_TIMEOUT,
        }
    }
}

impl ScoringPolicy {
    pub fn recommend(&self, score: u8) -> Recommendation {
        if score >= self.strong_threshold {
            Recommendation::Strong
        } else if score >= self.possible_threshold {
            Recommendation::Possible
        } else {
            Recommendation::Skip
        }
    }

    pub fn should_suggest_alternative(&self, overall_score: u8) -> bool {
        overall_score < self.alternative_threshold
    }
}

/// Why a detailed analysis couldn't be produced
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("team lookup failed: {0}")]
    TeamNotFound(String),
    #[error("stats unavailable: {0}")]
    StatsUnavailable(#[source] StatsError),
    #[error("stats lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl From<StatsError> for ScoringError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::TeamNotFound(name) => ScoringError::TeamNotFound(name),
            StatsError::TeamListUnavailable => {
                ScoringError::TeamNotFound("no team list available".to_string())
            }
            other => ScoringError::StatsUnavailable(other),
        }
    }
}

/// Percentage (0-100) of `games` won by `team_id`; 0 when there are no games
pub fn win_percentage(games: &[GameResult], team_id: u32) -> f64 {
    if games.is_empty() {
        return 0.0;
    }
    let wins = games
        .iter()
        .filter(|game| game.winner() == Some(team_id))
        .count();
    100.0 * wins as f64 / games.len() as f64
}

/// Mean confidence across all legs, rounded; 0 for an empty parlay
pub fn overall_confidence(analyses: &[BetAnalysis]) -> u8 {
    if analyses.is_empty() {
        return 0;
    }
    let total: u32 = analyses.iter().map(|a| a.confidence_score as u32).sum();
    (total as f64 / analyses.len() as f64).round() as u8
}

/// Whether to show the alternative suggestion under the default policy
pub fn should_suggest_alternative(overall_score: u8) -> bool {
    ScoringPolicy::default().should_suggest_alternative(overall_score)
}

pub struct ConfidenceScorer {
    stats: Arc<dyn StatsProvider>,
    policy: ScoringPolicy,
}

impl ConfidenceScorer {
    pub fn new(stats: Arc<dyn StatsProvider>) -> Self {
        Self {
            stats,
            policy: ScoringPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Analyze a bet, substituting the fallback analysis when stats can't be used
    pub async fn analyze(&self, bet: &Bet) -> BetAnalysis {
        match self.try_analyze(bet).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(
                    team = %bet.team,
                    opponent = %bet.opponent,
                    error = %e,
                    "Falling back to basic odds analysis"
                );
                BetAnalysis::fallback()
            }
        }
    }

    /// Analyze a bet from recent form and head-to-head history
    pub async fn try_analyze(&self, bet: &Bet) -> Result<BetAnalysis, ScoringError> {
        let timeout = self.policy.stats_timeout;
        let (recent_form, h2h) = tokio::time::timeout(timeout, self.fetch_form(bet))
            .await
            .map_err(|_| ScoringError::Timeout(timeout))??;

        debug!(
            team = %bet.team,
            recent_form,
            h2h,
            "Fetched form for bet"
        );
        Ok(self.score(&bet.opponent, recent_form, h2h))
    }

    async fn fetch_form(&self, bet: &Bet) -> Result<(f64, f64), ScoringError> {
        let team_id = self.stats.get_team_id(&bet.team).await?;
        let opponent_id = self.stats.get_team_id(&bet.opponent).await?;

        let recent = self
            .stats
            .get_recent_games(team_id, self.policy.recent_games)
            .await?;
        let h2h = self
            .stats
            .get_head_to_head(team_id, opponent_id, self.stats.last_completed_season())
            .await?;

        Ok((win_percentage(&recent, team_id), win_percentage(&h2h, team_id)))
    }

    /// Turn recent-form and head-to-head win percentages into an analysis
    pub fn score(&self, opponent: &str, recent_form: f64, h2h: f64) -> BetAnalysis {
        let weighted = recent_form * self.policy.recent_weight + h2h * self.policy.h2h_weight;
        let confidence_score = weighted.round().clamp(0.0, 100.0) as u8;

        let games = self.policy.recent_games;
        let recent_wins = (recent_form * games as f64 / 100.0).round() as u32;
        let mut factors = vec![format!("Won {} of last {} games", recent_wins, games)];

        if h2h > 50.0 {
            factors.push(format!(
                "Won {}% vs {} last season",
                h2h.round() as u32,
                opponent
            ));
        } else if h2h < 50.0 {
            factors.push(format!("Struggled vs {} last season", opponent));
        }

        BetAnalysis {
            confidence_score,
            factors,
            recommendation: self.policy.recommend(confidence_score),
        }
    }

    /// Analyze every leg concurrently; results keep the order of `individual_bets`
    pub async fn analyze_parlay(&self, parlay: &ParlayBet) -> ParlayAnalysisResult {
        let individual_analyses =
            join_all(parlay.individual_bets.iter().map(|bet| self.analyze(bet))).await;

        let overall_score = overall_confidence(&individual_analyses);
        ParlayAnalysisResult {
            overall_score,
            should_show_alternative: self.policy.should_suggest_alternative(overall_score),
            individual_analyses,
        }
    }
}
