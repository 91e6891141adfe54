//! Turns a frozen `Snapshot` into the request handed to the reasoning gateway.
//!
//! Output is a pure function of the snapshot: struct-ordered JSON, no maps,
//! no clocks, no randomness.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ingest::types::SourceKind;
use crate::snapshot::{Snapshot, SourceOutcome};

/// Fixed analytical instructions embedded in every request.
pub const RUBRIC: &str = "\
Role: Act as an experienced financial analyst specialising in precious metals and macroeconomics.

Task: Produce a well-founded gold price forecast for the horizons 1 day, 1 week and 3 weeks, based only on data sections 1 to 4 below.

Analysis steps:
Step 1: Analyse the news sources (sections 1 and 2). Classify every item as [BULLISH], [BEARISH] or [NEUTRAL] and give it a relevance score from 1 to 10.
Step 2: Evaluate the economic calendar (section 3). Flag the events (e.g. Fed meetings, inflation prints) that are high-impact for gold.
Step 3: Combine the news sentiment with the price data (section 4). Point out divergences, e.g. a rising VIX while gold falls.
Step 4: Give a directional forecast with rationale for each horizon.

Output format:
- Short summary of the current market mood.
- A table of the most important drivers with sentiment and weight.
- Forecast:
  * 1 day: [direction + rationale]
  * 1 week: [direction + rationale]
  * 3 weeks: [direction + rationale]
- Disclaimer: state that this is not investment advice.

Sections marked as failed could not be collected for this run; treat them as missing, not as neutral.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub snapshot: Snapshot,
    pub rubric: String,
}

/// Build the request for a snapshot. Identical snapshots give identical requests.
pub fn assemble(snapshot: Snapshot) -> AnalysisRequest {
    AnalysisRequest {
        snapshot,
        rubric: RUBRIC.to_string(),
    }
}

fn section_status(outcome: &SourceOutcome) -> String {
    match outcome.error() {
        None => "ok".to_string(),
        Some(e) => format!("failed ({e})"),
    }
}

/// JSON body of one data section; failed list sources read as `[]`.
fn section_body(outcome: &SourceOutcome) -> String {
    match outcome.payload() {
        Some(payload) => {
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| "null".to_string())
        }
        None if outcome.source() == SourceKind::PageQuote => "null".to_string(),
        None => "[]".to_string(),
    }
}

impl AnalysisRequest {
    /// Full text sent to the model: rubric, then the four numbered data sections.
    pub fn prompt(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(&self.rubric);
        out.push_str("\n\nData basis (collected ");
        out.push_str(&self.snapshot.collected_at().to_rfc3339());
        out.push_str("):\n");
        for (i, outcome) in self.snapshot.outcomes().iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} [{}]\n{}\n",
                i + 1,
                outcome.source().title(),
                section_status(outcome),
                section_body(outcome)
            ));
        }
        out
    }

    /// Compact JSON form of the whole request.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Short stable digest of the prompt, for correlating logs without logging content.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.prompt().as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}
