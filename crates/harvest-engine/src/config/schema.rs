use super::loader::ConfigError;
use harvest_common::{EffortConfig, Tier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub effort: EffortTiers,
    #[serde(default)]
    pub deep: DeepConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.session_size == 0 {
            return Err(ConfigError::Invalid("scheduler.session_size must be > 0".into()));
        }
        if self.scheduler.max_concurrent_sessions == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.max_concurrent_sessions must be > 0".into(),
            ));
        }
        if self.escalation.max_attempts == 0 {
            return Err(ConfigError::Invalid("escalation.max_attempts must be > 0".into()));
        }
        if self.pacing.think_time_min_ms > self.pacing.think_time_max_ms {
            return Err(ConfigError::Invalid(
                "pacing.think_time_min_ms exceeds think_time_max_ms".into(),
            ));
        }
        if self.deep.selector.trim().is_empty() {
            return Err(ConfigError::Invalid("deep.selector must not be empty".into()));
        }
        if self.extraction.fields.is_empty() {
            return Err(ConfigError::Invalid("extraction.fields is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Targets per session (S).
    #[serde(default = "default_session_size")]
    pub session_size: usize,
    /// Sessions running at once (K).
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            session_size: default_session_size(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

fn default_session_size() -> usize {
    10
}

fn default_max_concurrent_sessions() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_think_time_min_ms")]
    pub think_time_min_ms: u64,
    #[serde(default = "default_think_time_max_ms")]
    pub think_time_max_ms: u64,
    /// Backoff before retry n is `backoff_step_ms * n`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    #[serde(default = "default_rescue_gap_ms")]
    pub rescue_gap_ms: u64,
    #[serde(default = "default_deep_gap_ms")]
    pub deep_gap_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            think_time_min_ms: default_think_time_min_ms(),
            think_time_max_ms: default_think_time_max_ms(),
            backoff_step_ms: default_backoff_step_ms(),
            rescue_gap_ms: default_rescue_gap_ms(),
            deep_gap_ms: default_deep_gap_ms(),
        }
    }
}

fn default_think_time_min_ms() -> u64 {
    800
}

fn default_think_time_max_ms() -> u64 {
    2500
}

fn default_backoff_step_ms() -> u64 {
    2000
}

fn default_rescue_gap_ms() -> u64 {
    800
}

fn default_deep_gap_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortTierConfig {
    pub timeout_ms: u64,
    #[serde(default)]
    pub render_wait_ms: u64,
    #[serde(default)]
    pub auto_scroll: bool,
    #[serde(default)]
    pub cost_budget: Option<u32>,
    #[serde(default)]
    pub wait_for_selector: Option<String>,
}

impl EffortTierConfig {
    pub fn to_effort(&self, tier: Tier) -> EffortConfig {
        EffortConfig::new(tier, Duration::from_millis(self.timeout_ms))
            .with_render_wait(Duration::from_millis(self.render_wait_ms))
            .with_auto_scroll(self.auto_scroll)
            .with_cost_budget(self.cost_budget)
            .with_selector(self.wait_for_selector.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortTiers {
    #[serde(default = "default_plain")]
    pub plain: EffortTierConfig,
    #[serde(default = "default_patient")]
    pub patient: EffortTierConfig,
    #[serde(default = "default_heavy")]
    pub heavy: EffortTierConfig,
    #[serde(default = "default_deep")]
    pub deep: EffortTierConfig,
    #[serde(default = "default_warmup")]
    pub warmup: EffortTierConfig,
}

impl Default for EffortTiers {
    fn default() -> Self {
        Self {
            plain: default_plain(),
            patient: default_patient(),
            heavy: default_heavy(),
            deep: default_deep(),
            warmup: default_warmup(),
        }
    }
}

impl EffortTiers {
    pub fn effort(&self, tier: Tier) -> EffortConfig {
        let cfg = match tier {
            Tier::Warmup => &self.warmup,
            Tier::Plain => &self.plain,
            Tier::Patient => &self.patient,
            Tier::Heavy => &self.heavy,
            Tier::Deep => &self.deep,
        };
        cfg.to_effort(tier)
    }

    /// Pass 1 escalation ladder: plain, then patient, then heavy.
    pub fn ladder(&self) -> Vec<EffortConfig> {
        [Tier::Plain, Tier::Patient, Tier::Heavy]
            .into_iter()
            .map(|tier| self.effort(tier))
            .collect()
    }
}

const PRODUCT_TITLE_SELECTOR: &str = "h1.ui-pdp-title";

fn default_plain() -> EffortTierConfig {
    EffortTierConfig {
        timeout_ms: 90_000,
        render_wait_ms: 0,
        auto_scroll: false,
        cost_budget: Some(30),
        wait_for_selector: Some(PRODUCT_TITLE_SELECTOR.into()),
    }
}

fn default_patient() -> EffortTierConfig {
    EffortTierConfig {
        timeout_ms: 120_000,
        render_wait_ms: 10_000,
        auto_scroll: true,
        cost_budget: Some(30),
        wait_for_selector: Some(PRODUCT_TITLE_SELECTOR.into()),
    }
}

fn default_heavy() -> EffortTierConfig {
    EffortTierConfig {
        timeout_ms: 150_000,
        render_wait_ms: 15_000,
        auto_scroll: true,
        cost_budget: Some(60),
        wait_for_selector: Some(PRODUCT_TITLE_SELECTOR.into()),
    }
}

fn default_deep() -> EffortTierConfig {
    EffortTierConfig {
        timeout_ms: 150_000,
        render_wait_ms: 20_000,
        auto_scroll: true,
        cost_budget: Some(90),
        wait_for_selector: Some(PRODUCT_TITLE_SELECTOR.into()),
    }
}

fn default_warmup() -> EffortTierConfig {
    EffortTierConfig {
        timeout_ms: 30_000,
        render_wait_ms: 0,
        auto_scroll: false,
        cost_budget: Some(5),
        wait_for_selector: None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepConfig {
    /// Neutral, always-available page fetched before each strategy branch.
    #[serde(default = "default_warmup_address")]
    pub warmup_address: String,
    /// Selector the selector-wait branch waits for when the deep tier sets none.
    #[serde(default = "default_deep_selector")]
    pub selector: String,
    /// Fixed render wait for the selector-free fallback branch.
    #[serde(default = "default_fallback_wait_ms")]
    pub fallback_wait_ms: u64,
}

impl Default for DeepConfig {
    fn default() -> Self {
        Self {
            warmup_address: default_warmup_address(),
            selector: default_deep_selector(),
            fallback_wait_ms: default_fallback_wait_ms(),
        }
    }
}

fn default_warmup_address() -> String {
    "https://www.mercadolibre.com.ar/".to_string()
}

fn default_deep_selector() -> String {
    PRODUCT_TITLE_SELECTOR.to_string()
}

fn default_fallback_wait_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// Regex; capture group 1 (or the whole match) is the value.
    pub pattern: String,
    #[serde(default)]
    pub digits_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_primary_field")]
    pub primary_field: String,
    #[serde(default = "default_not_found")]
    pub not_found: String,
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldRule>,
    #[serde(default = "default_blocked_markers")]
    pub blocked_markers: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            primary_field: default_primary_field(),
            not_found: default_not_found(),
            fields: default_fields(),
            blocked_markers: default_blocked_markers(),
        }
    }
}

fn default_primary_field() -> String {
    "title".to_string()
}

fn default_not_found() -> String {
    "n/a".to_string()
}

fn default_fields() -> Vec<FieldRule> {
    let rule = |name: &str, pattern: &str, digits_only: bool| FieldRule {
        name: name.to_string(),
        pattern: pattern.to_string(),
        digits_only,
    };
    vec![
        rule(
            "title",
            r#"(?s)<h1[^>]*class="[^"]*ui-pdp-title[^"]*"[^>]*>(.*?)</h1>"#,
            false,
        ),
        rule(
            "price",
            r#"(?s)<span[^>]*class="[^"]*andes-money-amount__fraction[^"]*"[^>]*>(.*?)</span>"#,
            true,
        ),
        rule(
            "competitor",
            r#"(?s)<h2[^>]*class="[^"]*ui-seller-data-header__title[^"]*"[^>]*>(.*?)</h2>"#,
            false,
        ),
        rule(
            "price_in_installments",
            r#"(?s)<div[^>]*class="[^"]*ui-pdp-price__subtitles[^"]*"[^>]*>(.*?)</div>"#,
            false,
        ),
        rule(
            "image",
            r#"(?s)<img[^>]*class="[^"]*ui-pdp-image[^"]*"[^>]*src="([^"]+)""#,
            false,
        ),
    ]
}

fn default_blocked_markers() -> Vec<String> {
    vec!["Este producto no está disponible. Elige otra variante.".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub asp: bool,
    #[serde(default = "default_true")]
    pub render_js: bool,
    #[serde(default = "default_country")]
    pub country: Option<String>,
    #[serde(default = "default_proxy_pool")]
    pub proxy_pool: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            api_key_env: default_api_key_env(),
            asp: true,
            render_js: true,
            country: default_country(),
            proxy_pool: default_proxy_pool(),
            lang: default_lang(),
        }
    }
}

impl ServiceConfig {
    /// Resolves the API key from the config file, then from the named env var.
    pub fn credential(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                env: self.api_key_env.clone(),
            })
    }
}

fn default_endpoint() -> String {
    "https://api.scrapfly.io".to_string()
}

fn default_api_key_env() -> String {
    "SCRAPFLY_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_country() -> Option<String> {
    Some("ar".to_string())
}

fn default_proxy_pool() -> Option<String> {
    Some("public_residential_pool".to_string())
}

fn default_lang() -> Vec<String> {
    vec!["es-AR".to_string(), "es".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also write each pass's raw records.
    #[serde(default = "default_true")]
    pub audit: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            audit: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./database")
}
