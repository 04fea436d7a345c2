use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const FALLBACK_SCORE: u8 = 50;
pub const FALLBACK_FACTORS: [&str; 2] = ["Basic odds analysis only", "Unable to fetch detailed stats"];

/// The market a single leg is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Moneyline,
    Spread,
    #[serde(alias = "over_under")]
    Total,
    #[serde(other)]
    Other,
}

/// A single leg of a parlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub team: String,
    pub opponent: String,
    pub bet_type: BetType,
    pub odds: i32, // American odds format (e.g., -110, +150)
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl Bet {
    pub fn moneyline(team: impl Into<String>, opponent: impl Into<String>, odds: i32) -> Self {
        Self {
            team: team.into(),
            opponent: opponent.into(),
            bet_type: BetType::Moneyline,
            odds,
            details: serde_json::Map::new(),
        }
    }
}

/// A bundle of bets; the order of `individual_bets` is the analysis order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParlayBet {
    #[serde(default)]
    pub total_odds: Option<i32>,
    pub individual_bets: Vec<Bet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Strong,
    Possible,
    Skip,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::Strong => "STRONG",
            Recommendation::Possible => "POSSIBLE",
            Recommendation::Skip => "SKIP",
        };
        f.write_str(label)
    }
}

/// Confidence assessment for one bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetAnalysis {
    pub confidence_score: u8, // 0-100
    pub factors: Vec<String>,
    pub recommendation: Recommendation,
}

impl BetAnalysis {
    /// Analysis used when detailed stats can't be obtained for a bet
    pub fn fallback() -> Self {
        Self {
            confidence_score: FALLBACK_SCORE,
            factors: FALLBACK_FACTORS.iter().map(|f| f.to_string()).collect(),
            recommendation: Recommendation::Possible,
        }
    }
}

/// Parlay-level result; `individual_analyses[i]` belongs to `individual_bets[i]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParlayAnalysisResult {
    pub overall_score: u8,
    pub individual_analyses: Vec<BetAnalysis>,
    pub should_show_alternative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayAnalysisRequest {
    pub parlay: ParlayBet,
    pub wallet_address: String,
}

/// A persisted analysis, keyed by the submitting wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub wallet_address: String,
    pub total_odds: Option<i32>,
    pub bets: Vec<Bet>,
    pub overall_score: u8,
    pub individual_analyses: Vec<BetAnalysis>,
    pub should_show_alternative: bool,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(wallet_address: String, parlay: ParlayBet, result: &ParlayAnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_address,
            total_odds: parlay.total_odds,
            bets: parlay.individual_bets,
            overall_score: result.overall_score,
            individual_analyses: result.individual_analyses.clone(),
            should_show_alternative: result.should_show_alternative,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bet_deserializes_without_details() {
        let bet: Bet = serde_json::from_value(json!({
            "team": "Eagles",
            "opponent": "Cowboys",
            "bet_type": "moneyline",
            "odds": -110
        }))
        .unwrap();
        assert_eq!(bet, Bet::moneyline("Eagles", "Cowboys", -110));
    }

    #[test]
    fn test_unknown_bet_type_is_other() {
        let bet_type: BetType = serde_json::from_value(json!("player_prop")).unwrap();
        assert_eq!(bet_type, BetType::Other);
        let bet_type: BetType = serde_json::from_value(json!("over_under")).unwrap();
        assert_eq!(bet_type, BetType::Total);
    }

    #[test]
    fn test_recommendation_serializes_upper_case() {
        let analysis = BetAnalysis::fallback();
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["recommendation"], "POSSIBLE");
        assert_eq!(value["confidence_score"], 50);
        assert_eq!(Recommendation::Skip.to_string(), "SKIP");
    }

    #[test]
    fn test_total_odds_may_be_null() {
        let parlay: ParlayBet = serde_json::from_value(json!({ "individual_bets": [] })).unwrap();
        assert_eq!(parlay.total_odds, None);
    }
}
