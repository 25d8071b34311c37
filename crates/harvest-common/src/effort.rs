use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Canonical effort tiers, ordered from cheapest to most patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cheap probe of a neutral page, used only to warm a session identity.
    Warmup,
    Plain,
    Patient,
    Heavy,
    Deep,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Warmup => "warmup",
            Tier::Plain => "plain",
            Tier::Patient => "patient",
            Tier::Heavy => "heavy",
            Tier::Deep => "deep",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch parameters for a single attempt.
///
/// Built fresh per attempt; the session-affinity id is attached by whoever owns the
/// session (a Pass 1 session, the rescue pass, or a deep-rescue warm-up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortConfig {
    pub tier: Tier,
    pub timeout: Duration,
    pub render_wait: Duration,
    pub auto_scroll: bool,
    pub cost_budget: Option<u32>,
    pub wait_for_selector: Option<String>,
    pub session: Option<String>,
}

impl EffortConfig {
    pub fn new(tier: Tier, timeout: Duration) -> Self {
        Self {
            tier,
            timeout,
            render_wait: Duration::ZERO,
            auto_scroll: false,
            cost_budget: None,
            wait_for_selector: None,
            session: None,
        }
    }

    pub fn with_render_wait(mut self, wait: Duration) -> Self {
        self.render_wait = wait;
        self
    }

    pub fn with_auto_scroll(mut self, enabled: bool) -> Self {
        self.auto_scroll = enabled;
        self
    }

    pub fn with_cost_budget(mut self, budget: Option<u32>) -> Self {
        self.cost_budget = budget;
        self
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.wait_for_selector = selector;
        self
    }

    pub fn without_selector(mut self) -> Self {
        self.wait_for_selector = None;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}
