use harvest_common::Target;
use tracing::warn;

/// Ordered list of targets to resolve, indexed from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetQueue {
    targets: Vec<Target>,
}

impl TargetQueue {
    /// Builds the queue from raw addresses, keeping only http(s) URLs.
    /// Indices are assigned in input order after filtering.
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets = Vec::new();
        let mut skipped = 0usize;
        for raw in addresses {
            let address = raw.as_ref().trim();
            if is_fetchable(address) {
                let index = targets.len() as u32 + 1;
                targets.push(Target::new(index, address));
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!("Skipped {} entries that are not http(s) URLs", skipped);
        }
        Self { targets }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.targets.len() as u32
    }
}

pub fn is_fetchable(address: &str) -> bool {
    url::Url::parse(address)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}
