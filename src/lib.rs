pub mod api;
pub mod config;
pub mod models;
pub mod routes;
pub mod scrapers;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::*;
pub use models::*;
pub use scrapers::*;
pub use utils::*;

use models::{AnalysisRecord, ParlayAnalysisRequest, ParlayAnalysisResult};
use scrapers::ocr::TextRecognizer;
use std::sync::Arc;
use tracing::info;
use utils::confidence::ConfidenceScorer;
use utils::store::{AnalysisStore, StoreError};

/// Everything a request handler needs
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<ConfidenceScorer>,
    pub store: Arc<dyn AnalysisStore>,
    pub ocr: Arc<dyn TextRecognizer>,
}

/// Score a parlay and persist the result under the requesting wallet
pub async fn analyze_and_record(
    state: &AppState,
    request: ParlayAnalysisRequest,
) -> Result<ParlayAnalysisResult, StoreError> {
    let result = state.scorer.analyze_parlay(&request.parlay).await;

    let record = AnalysisRecord::new(request.wallet_address, request.parlay, &result);
    let id = state.store.save(record).await?;
    info!(
        record_id = %id,
        overall_score = result.overall_score,
        legs = result.individual_analyses.len(),
        "Saved parlay analysis"
    );

    Ok(result)
}
