use async_trait::async_trait;
use harvest_common::{CostToken, EffortConfig, FetchError};

/// One request to the fetch service.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub address: String,
    pub effort: EffortConfig,
}

impl FetchRequest {
    pub fn new(address: impl Into<String>, effort: EffortConfig) -> Self {
        Self {
            address: address.into(),
            effort,
        }
    }
}

/// Raw content returned by the fetch service.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub content: String,
    /// Upstream status code of the fetched page (e.g. 200).
    pub status: u16,
    pub cost: CostToken,
}

/// A failed fetch, with whatever the service charged for it.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub error: FetchError,
    pub cost: CostToken,
}

impl FetchFailure {
    pub fn charged(error: FetchError, cost: CostToken) -> Self {
        Self { error, cost }
    }
}

impl From<FetchError> for FetchFailure {
    fn from(error: FetchError) -> Self {
        Self::charged(error, CostToken::none())
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// The FetchBackend trait is the interface to the remote rendering/proxy service.
///
/// Implementations are shared by concurrently running sessions, so every method
/// takes `&self`.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Fetch one address with the given effort. No retries happen here.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchFailure>;

    /// Remaining account credits, when the service exposes them.
    async fn remaining_credits(&self) -> Result<u64, FetchError> {
        Err(FetchError::NotSupported("remaining_credits".into()))
    }
}
