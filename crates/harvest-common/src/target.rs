use serde::{Deserialize, Serialize};

/// One unit of work: a stable 1-based index and the address to fetch.
///
/// The index is the identity used for ordering and deduplication across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub index: u32,
    pub address: String,
}

impl Target {
    pub fn new(index: u32, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
        }
    }
}
