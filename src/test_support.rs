//! Fakes shared by the unit tests.

use crate::api::nfl_api::{head_to_head, most_recent};
use crate::api::{GameResult, GameSet, StatsError, StatsProvider};
use crate::scrapers::ocr::{OcrError, TextRecognizer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub const EAGLES: u32 = 1;
pub const COWBOYS: u32 = 2;
pub const GIANTS: u32 = 3;
pub const LAST_SEASON: i32 = 2023;

pub fn game(id: u64, home: u32, away: u32, home_score: i32, away_score: i32) -> GameResult {
    GameResult {
        id,
        date: format!("2023-10-{:02}T17:00:00.000Z", id % 28 + 1),
        season: LAST_SEASON,
        home_team_id: home,
        away_team_id: away,
        home_score: Some(home_score),
        away_score: Some(away_score),
    }
}

/// In-memory stats provider: Eagles unbeaten, Giants struggling
pub struct FakeStats {
    pub teams: Vec<(&'static str, u32)>,
    pub recent: HashMap<u32, GameSet>,
    pub season_games: GameSet,
    pub delay: Option<Duration>,
}

impl Default for FakeStats {
    fn default() -> Self {
        let recent = HashMap::from([
            (
                EAGLES,
                vec![
                    game(1, EAGLES, GIANTS, 28, 14),
                    game(2, COWBOYS, EAGLES, 10, 21),
                    game(3, EAGLES, COWBOYS, 31, 7),
                    game(4, GIANTS, EAGLES, 3, 17),
                    game(5, EAGLES, GIANTS, 24, 20),
                ],
            ),
            (
                GIANTS,
                vec![
                    game(1, EAGLES, GIANTS, 28, 14),
                    game(4, GIANTS, EAGLES, 3, 17),
                    game(5, EAGLES, GIANTS, 24, 20),
                    game(6, GIANTS, COWBOYS, 20, 13),
                    game(7, COWBOYS, GIANTS, 35, 0),
                ],
            ),
        ]);

        Self {
            teams: vec![("Eagles", EAGLES), ("Cowboys", COWBOYS), ("Giants", GIANTS)],
            recent,
            season_games: vec![
                game(10, EAGLES, COWBOYS, 28, 23),
                game(11, COWBOYS, EAGLES, 17, 20),
                game(12, EAGLES, GIANTS, 33, 25),
                game(13, GIANTS, EAGLES, 10, 27),
            ],
            delay: None,
        }
    }
}

#[async_trait]
impl StatsProvider for FakeStats {
    async fn get_team_id(&self, team_name: &str) -> Result<u32, StatsError> {
        self.teams
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(team_name.trim()))
            .map(|(_, id)| *id)
            .ok_or_else(|| StatsError::TeamNotFound(team_name.to_string()))
    }

    async fn get_recent_games(&self, team_id: u32, n: usize) -> Result<GameSet, StatsError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let games = self.recent.get(&team_id).cloned().unwrap_or_default();
        Ok(most_recent(games, n))
    }

    async fn get_head_to_head(
        &self,
        team_id: u32,
        opponent_id: u32,
        _season: i32,
    ) -> Result<GameSet, StatsError> {
        Ok(head_to_head(self.season_games.clone(), team_id, opponent_id))
    }

    fn last_completed_season(&self) -> i32 {
        LAST_SEASON
    }
}

/// OCR stand-in that returns fixed text, or fails when `text` is `None`
pub struct FakeOcr {
    pub text: Option<String>,
}

#[async_trait]
impl TextRecognizer for FakeOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        if image.is_empty() {
            return Err(OcrError::EmptyImage);
        }
        self.text
            .clone()
            .ok_or_else(|| OcrError::EngineFailed("unreadable image".to_string()))
    }
}

pub const SAMPLE_SLIP: &str = "\
3 Leg Parlay
+596
© Philadelphia Eagles
Moneyline
Philadelphia Eagles @ Dallas Cowboys
-150
© Giants
Moneyline
Giants @ Commanders
+240
© Kansas City Chiefs
Moneyline
Las Vegas Raiders @ Kansas City Chiefs
-300
Wager $10.00 @ Payout $69.60
";
