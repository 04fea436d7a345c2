/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Total payout per unit staked, e.g. +150 -> 2.5, -200 -> 1.5
pub fn american_odds_to_decimal(odds: i32) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else {
        1.0 + 100.0 / odds.abs() as f64
    }
}

/// Decimal odds of all legs combined; 1.0 for no legs
pub fn combined_decimal_odds(leg_odds: &[i32]) -> f64 {
    leg_odds
        .iter()
        .map(|odds| american_odds_to_decimal(*odds))
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_odds_to_probability() {
        let prob = american_odds_to_probability(150);
        assert!((prob - 0.4).abs() < 0.01);
        let prob = american_odds_to_probability(-150);
        assert!((prob - 0.6).abs() < 0.01);
        let prob = american_odds_to_probability(100);
        assert!((prob - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_combined_decimal_odds() {
        assert!((american_odds_to_decimal(150) - 2.5).abs() < 1e-9);
        assert!((american_odds_to_decimal(-200) - 1.5).abs() < 1e-9);
        // Two -110 legs pay roughly +264
        let combined = combined_decimal_odds(&[-110, -110]);
        assert!((combined - 3.64).abs() < 0.01);
        assert_eq!(combined_decimal_odds(&[]), 1.0);
    }
}
