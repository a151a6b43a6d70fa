//! # zenfin-scan
//!
//! Turn a spoken or photographed financial record into a structured
//! transaction using a multimodal language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! transcript ─────────────────────────┐
//!                                     ├─ 2. Model   instruction context + task prompt
//! receipt ── 1. Input  base64 / path ─┘             (timeout, one retry)
//!                                        3. Clean   strip ```json fences
//!                                        4. Decode  JSON → TransactionDraft
//! ```
//!
//! The instruction context (category taxonomy, recurrence and payment-method
//! rules, output schema) is built once per [`ExtractionEngine`] and sent with
//! every call. Failures never escape the engine: the plain methods return
//! `None`, the `try_*` methods return the typed [`ExtractionFailure`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zenfin_scan::{ExtractionConfig, ExtractionEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY (or API_KEY) from the environment.
//!     let engine = ExtractionEngine::from_config(ExtractionConfig::default())?;
//!     if let Some(draft) = engine.extract_from_text("Paguei 50 reais de internet via pix").await {
//!         println!("{}", serde_json::to_string_pretty(&draft)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `zenfin` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod draft;
pub mod engine;
pub mod entry;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod taxonomy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BackendSettings, ExtractionConfig, ExtractionConfigBuilder, GenerativeCredential};
pub use draft::{Recurrence, RuleViolation, TransactionDraft, TransactionType};
pub use engine::ExtractionEngine;
pub use entry::{process_entry, EntryKind, ProcessEntryRequest, UploadedFile};
pub use error::{EntryError, ExtractionFailure, GenerationError, InputResolutionError, ScanError};
pub use pipeline::input::{classify_image_input, resolve_image_input, ImageInput, ImagePayload};
pub use pipeline::llm::{GenerativeModel, ProviderModel};
pub use pipeline::postprocess::strip_code_fences;
pub use taxonomy::Taxonomy;
