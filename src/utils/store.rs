use crate::models::AnalysisRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

/// Records returned per wallet by the history endpoint
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Document store for finished analyses
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist a record, returning its id
    async fn save(&self, record: AnalysisRecord) -> Result<String, StoreError>;

    /// Up to `limit` records for the wallet, newest first
    async fn find_by_wallet(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, StoreError>;
}

fn newest_for_wallet(
    records: impl Iterator<Item = AnalysisRecord>,
    wallet_address: &str,
    limit: usize,
) -> Vec<AnalysisRecord> {
    let mut matching: Vec<AnalysisRecord> = records
        .filter(|record| record.wallet_address == wallet_address)
        .collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matching.truncate(limit);
    matching
}

/// Append-only JSON lines file, one record per line
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AnalysisStore for JsonFileStore {
    async fn save(&self, record: AnalysisRecord) -> Result<String, StoreError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(record.id)
    }

    async fn find_by_wallet(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<AnalysisRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping unreadable record");
                    None
                }
            });

        Ok(newest_for_wallet(records, wallet_address, limit))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save(&self, record: AnalysisRecord) -> Result<String, StoreError> {
        let id = record.id.clone();
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn find_by_wallet(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(newest_for_wallet(
            records.iter().cloned(),
            wallet_address,
            limit,
        ))
    }
}

/// Save analysis records to CSV, one row per record
pub fn save_records_to_csv(records: &[AnalysisRecord], filename: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    writer.write_record([
        "Timestamp",
        "Wallet",
        "Total Odds",
        "Legs",
        "Overall Score",
        "Show Alternative",
        "Picks",
    ])?;

    for record in records {
        let picks = record
            .bets
            .iter()
            .zip(&record.individual_analyses)
            .map(|(bet, analysis)| {
                format!(
                    "{} vs {} ({:+}) {}",
                    bet.team, bet.opponent, bet.odds, analysis.confidence_score
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            record.timestamp.to_rfc3339(),
            record.wallet_address.clone(),
            record
                .total_odds
                .map(|odds| format!("{:+}", odds))
                .unwrap_or_default(),
            record.bets.len().to_string(),
            record.overall_score.to_string(),
            record.should_show_alternative.to_string(),
            picks,
        ])?;
    }

    writer.flush().context("Failed to write CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bet, BetAnalysis, ParlayAnalysisResult, ParlayBet};
    use chrono::{Duration, Utc};

    fn record(wallet: &str, minutes_ago: i64, score: u8) -> AnalysisRecord {
        let parlay = ParlayBet {
            total_odds: Some(264),
            individual_bets: vec![Bet::moneyline("Eagles", "Cowboys", -150)],
        };
        let result = ParlayAnalysisResult {
            overall_score: score,
            individual_analyses: vec![BetAnalysis::fallback()],
            should_show_alternative: score < 72,
        };
        let mut record = AnalysisRecord::new(wallet.to_string(), parlay, &result);
        record.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("analyses.jsonl"));

        assert!(store.find_by_wallet("wallet-a", HISTORY_LIMIT).await.unwrap().is_empty());

        let older = record("wallet-a", 10, 40);
        let newer = record("wallet-a", 1, 80);
        let other = record("wallet-b", 5, 60);
        let id = store.save(older.clone()).await.unwrap();
        assert_eq!(id, older.id);
        store.save(newer.clone()).await.unwrap();
        store.save(other).await.unwrap();

        let found = store.find_by_wallet("wallet-a", HISTORY_LIMIT).await.unwrap();
        assert_eq!(found, vec![newer.clone(), older]);

        let limited = store.find_by_wallet("wallet-a", 1).await.unwrap();
        assert_eq!(limited, vec![newer]);
    }

    #[tokio::test]
    async fn test_json_file_store_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.jsonl");
        let store = JsonFileStore::new(&path);

        store.save(record("wallet-a", 0, 70)).await.unwrap();
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n");
        std::fs::write(&path, contents).unwrap();

        let found = store.find_by_wallet("wallet-a", HISTORY_LIMIT).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_limits_results() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store.save(record("wallet-a", i, 50)).await.unwrap();
        }
        assert_eq!(store.len().await, 25);

        let found = store.find_by_wallet("wallet-a", HISTORY_LIMIT).await.unwrap();
        assert_eq!(found.len(), HISTORY_LIMIT);
        assert!(found.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_save_records_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        save_records_to_csv(&[record("wallet-a", 0, 50)], &path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Timestamp,Wallet,Total Odds"));
        let row = lines.next().unwrap();
        assert!(row.contains("wallet-a"));
        assert!(row.contains("+264"));
        assert!(row.contains("Eagles vs Cowboys (-150) 50"));
    }
}
