//! Configuration types for transaction extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Credentials are read separately from
//! the environment: [`GenerativeCredential`] is required for the scanning
//! path, [`BackendSettings`] is optional and only degrades the data backend
//! when absent.

use crate::error::ScanError;
use crate::taxonomy::Taxonomy;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Default provider name passed to `ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for an [`crate::ExtractionEngine`].
///
/// # Example
/// ```rust
/// use zenfin_scan::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_timeout_secs(20)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 1);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai"). If None, uses [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction wants the same JSON for the same receipt, so the model is
    /// kept close to deterministic.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 1024.
    pub max_tokens: usize,

    /// Retries on a transient transport error. Default: 1. Clamped to 0..=1.
    pub max_retries: u32,

    /// Delay before the retry in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Maximum receipts in flight during a batch scan. Default: 4.
    pub concurrency: usize,

    /// Category vocabulary composed into the instruction context.
    pub taxonomy: Taxonomy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 30,
            concurrency: 4,
            taxonomy: Taxonomy::default(),
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("categories", &self.taxonomy.categories.len())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn provider_name_or_default(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.config.taxonomy = taxonomy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ScanError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(ScanError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ScanError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.taxonomy.categories.is_empty() {
            return Err(ScanError::InvalidConfig(
                "taxonomy must list at least one category".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// API key for the generative service.
#[derive(Clone)]
pub struct GenerativeCredential {
    pub api_key: String,
    /// Environment variable the key was read from.
    pub source: &'static str,
}

impl fmt::Debug for GenerativeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerativeCredential")
            .field("api_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl GenerativeCredential {
    pub const PRIMARY_VAR: &'static str = "GEMINI_API_KEY";
    pub const FALLBACK_VAR: &'static str = "API_KEY";

    /// Read `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScanError> {
        for var in [Self::PRIMARY_VAR, Self::FALLBACK_VAR] {
            if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
                return Ok(Self {
                    api_key: key,
                    source: var,
                });
            }
        }
        Err(ScanError::MissingCredential {
            var: Self::PRIMARY_VAR,
            fallback: Self::FALLBACK_VAR,
        })
    }
}

/// Connection settings for the hosted data/auth backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl BackendSettings {
    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    ///
    /// Returns `None` (and logs a warning) when either is missing; the backend
    /// is then disabled rather than failing startup.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("SUPABASE_URL").filter(|v| !v.trim().is_empty());
        let anon_key = lookup("SUPABASE_ANON_KEY").filter(|v| !v.trim().is_empty());
        match (url, anon_key) {
            (Some(url), Some(anon_key)) => Some(Self { url, anon_key }),
            _ => {
                warn!("Backend credentials not found (SUPABASE_URL / SUPABASE_ANON_KEY); backend disabled");
                None
            }
        }
    }
}
