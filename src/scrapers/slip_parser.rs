//! Reconstructs parlay legs from the OCR text of a betting-slip screenshot.
//!
//! Every non-empty line is classified once into a [`SlipLine`]. Picks, matchups
//! and leg odds are then paired by their position among lines of the same kind:
//! the i-th pick, the i-th matchup and the i-th leg odds form leg i.

use crate::models::{Bet, ParlayBet};

/// Glyph OCR produces for the check mark next to a selected team
pub const PICK_MARKER: char = '©';
const MATCHUP_SEPARATOR: char = '@';
const PAYOUT_LABEL: &str = "Payout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlipLine {
    /// The team the bettor selected
    Pick(String),
    /// `"<away> @ <home>"`
    Matchup { away: String, home: String },
    /// Signed American odds; the first one on a slip is the parlay total
    Odds(i32),
    Other,
}

impl SlipLine {
    /// Classify one trimmed line. A line that fits several kinds is a pick
    /// first, then a matchup, then odds.
    pub fn classify(line: &str) -> Self {
        let line = line.trim();

        if line.contains(PICK_MARKER) {
            let team = line.replace(PICK_MARKER, "");
            return SlipLine::Pick(team.trim().to_string());
        }

        if line.contains(MATCHUP_SEPARATOR) && !line.contains(PAYOUT_LABEL) {
            if let Some((away, home)) = line.split_once(MATCHUP_SEPARATOR) {
                let (away, home) = (away.trim(), home.trim());
                if !away.is_empty() && !home.is_empty() {
                    return SlipLine::Matchup {
                        away: away.to_string(),
                        home: home.to_string(),
                    };
                }
            }
        }

        parse_odds(line).map_or(SlipLine::Other, SlipLine::Odds)
    }
}

/// Leading sign plus every digit on the line: `"+1,250"` -> `1250`
fn parse_odds(line: &str) -> Option<i32> {
    let sign = line.chars().next().filter(|c| *c == '+' || *c == '-')?;
    let digits: String = line.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    format!("{}{}", sign, digits).parse().ok()
}

/// Something about a leg's pairing that may have produced a wrong bet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingFlag {
    /// The pick is neither side of its matchup; the home side was used as the opponent
    UnmatchedPick {
        leg: usize,
        picked: String,
        away: String,
        home: String,
    },
    /// No pick line lines up with this matchup, so the leg was dropped
    MissingPick {
        leg: usize,
        away: String,
        home: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSlip {
    pub parlay: ParlayBet,
    pub flags: Vec<PairingFlag>,
}

/// Classify every non-empty line of `raw_text`, in order
pub fn classify_lines(raw_text: &str) -> Vec<SlipLine> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(SlipLine::classify)
        .collect()
}

/// Parse slip text into a parlay. Never fails: unusable text yields fewer legs
/// and possibly no total odds.
pub fn parse(raw_text: &str) -> ParlayBet {
    parse_detailed(raw_text).parlay
}

/// Like [`parse`], also reporting legs whose pairing looked wrong
pub fn parse_detailed(raw_text: &str) -> ParsedSlip {
    let mut picks = Vec::new();
    let mut matchups = Vec::new();
    let mut total_odds = None;
    let mut leg_odds = Vec::new();

    for line in classify_lines(raw_text) {
        match line {
            SlipLine::Pick(team) => picks.push(team),
            SlipLine::Matchup { away, home } => matchups.push((away, home)),
            SlipLine::Odds(odds) if total_odds.is_none() => total_odds = Some(odds),
            SlipLine::Odds(odds) => leg_odds.push(odds),
            SlipLine::Other => {}
        }
    }

    let mut individual_bets = Vec::new();
    let mut flags = Vec::new();

    // zip drops matchups that have no leg odds
    for (leg, ((away, home), odds)) in matchups.into_iter().zip(leg_odds).enumerate() {
        let Some(picked) = picks.get(leg) else {
            flags.push(PairingFlag::MissingPick { leg, away, home });
            continue;
        };

        let opponent = if *picked == home {
            away
        } else {
            if *picked != away {
                flags.push(PairingFlag::UnmatchedPick {
                    leg,
                    picked: picked.clone(),
                    away,
                    home: home.clone(),
                });
            }
            home
        };

        individual_bets.push(Bet::moneyline(picked.clone(), opponent, odds));
    }

    ParsedSlip {
        parlay: ParlayBet {
            total_odds,
            individual_bets,
        },
        flags,
    }
}
