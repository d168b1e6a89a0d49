//! Final pipeline report

use super::{ArgumentSet, AuditReport, ResearchReport, Verdict};
use serde::{Deserialize, Serialize};

/// Everything one pipeline run produced
///
/// Built once at the end of a successful run; a failed run produces none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Claim as submitted, never the refined working claim
    pub claim: String,
    /// Latest research output
    pub researcher: ResearchReport,
    /// Latest audit output
    pub skeptic: AuditReport,
    pub adversary: ArgumentSet,
    pub judge: Verdict,
    /// Audit → research loops taken
    pub retries: u32,
}
