use crate::chain::{ChainMaintainer, ChainReport, RepairOutcome};
use crate::error::Result;
use crate::storage::DynRecordStore;

/// Verifies or rebuilds a gallery's chain after partial failures.
#[derive(Clone)]
pub struct HealChainOperation {
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct HealChainOperationRequest {
    pub gallery: String,
    /// When false only the findings are reported.
    pub repair: bool,
}

#[derive(Debug, Clone)]
pub enum HealChainOperationOutcome {
    Checked(ChainReport),
    Repaired(RepairOutcome),
}

impl HealChainOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self {
            chain: ChainMaintainer::new(records),
        }
    }

    pub async fn run(&self, request: HealChainOperationRequest) -> Result<HealChainOperationOutcome> {
        if !request.repair {
            let report = self.chain.check(&request.gallery).await?;
            if !report.is_sound() {
                tracing::warn!(
                    "Chain of {} has {} issues",
                    request.gallery,
                    report.issues.len()
                );
            }
            return Ok(HealChainOperationOutcome::Checked(report));
        }

        let outcome = self.chain.repair(&request.gallery).await?;
        Ok(HealChainOperationOutcome::Repaired(outcome))
    }
}
