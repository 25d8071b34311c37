//! Merge Reconciler.
//!
//! Pure function of its inputs. Per index, an `OK` record beats any non-`OK`
//! record, and among records of equal standing the later pass wins. Costs are
//! summed over every record seen for the index.

use harvest_common::{FailureReason, MergedRecord, RecordStatus, TargetRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{error, warn};

/// A target left unresolved after every pass, handed to a later run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualFailure {
    pub index: u32,
    pub address: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<FailureReason>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// One record per index, ascending.
    pub records: Vec<MergedRecord>,
    pub residual: Vec<ResidualFailure>,
    /// Indices in `1..=total` with no record in any pass. Always empty for a
    /// pipeline run; non-empty means the inputs were incomplete.
    pub missing: Vec<u32>,
}

impl MergeOutcome {
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn total_cost(&self) -> f64 {
        self.records.iter().map(|r| r.cost_total).sum()
    }
}

pub fn merge(
    pass1: &[TargetRecord],
    pass2: &[TargetRecord],
    pass3: &[TargetRecord],
    total: u32,
) -> MergeOutcome {
    let mut best: BTreeMap<u32, &TargetRecord> = BTreeMap::new();
    let mut costs: BTreeMap<u32, f64> = BTreeMap::new();

    for record in pass1.iter().chain(pass2).chain(pass3) {
        if record.index == 0 || record.index > total {
            warn!(
                "Ignoring record for index {} outside 1..={}",
                record.index, total
            );
            continue;
        }

        *costs.entry(record.index).or_default() += record.cost;
        match best.entry(record.index) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if supersedes(record, slot.get()) {
                    slot.insert(record);
                }
            }
        }
    }

    let records: Vec<MergedRecord> = best
        .iter()
        .map(|(index, record)| {
            MergedRecord::from_record(record, costs.get(index).copied().unwrap_or_default())
        })
        .collect();

    let residual = records
        .iter()
        .filter(|r| !r.is_ok())
        .map(|r| ResidualFailure {
            index: r.index,
            address: r.address.clone(),
            status: r.status,
            error_detail: r.error_detail,
        })
        .collect();

    let missing: Vec<u32> = (1..=total).filter(|i| !best.contains_key(i)).collect();
    if !missing.is_empty() {
        error!("{} target(s) have no record in any pass", missing.len());
    }

    MergeOutcome {
        records,
        residual,
        missing,
    }
}

fn supersedes(candidate: &TargetRecord, current: &TargetRecord) -> bool {
    match (candidate.is_ok(), current.is_ok()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.pass >= current.pass,
    }
}
