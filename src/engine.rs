//! The extraction engine: transcript or image in, [`TransactionDraft`] out.
//!
//! The engine owns the generative-model handle and the instruction context,
//! both fixed at construction. Each operation is a single independent call;
//! many may run at once on a shared `Arc<ExtractionEngine>`.
//!
//! Every public operation comes in two forms:
//!
//! * `try_*` returns `Result<_, ExtractionFailure>` with the typed cause;
//! * the plain form logs the cause and returns `None`. This is the boundary
//!   past which no extraction error travels.

use crate::config::{ExtractionConfig, GenerativeCredential, DEFAULT_PROVIDER};
use crate::draft::{Recurrence, TransactionDraft};
use crate::error::{ExtractionFailure, ScanError};
use crate::pipeline::llm::{self, GenerativeModel, ProviderModel};
use crate::pipeline::{encode, input, postprocess};
use crate::prompts;
use edgequake_llm::{ChatMessage, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns unstructured financial input into transaction drafts.
pub struct ExtractionEngine {
    model: Arc<dyn GenerativeModel>,
    instruction: String,
    config: ExtractionConfig,
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("model", &"<dyn GenerativeModel>")
            .field("instruction_len", &self.instruction.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionEngine {
    /// Build an engine around an existing model handle.
    pub fn new(model: Arc<dyn GenerativeModel>, config: ExtractionConfig) -> Self {
        let instruction = prompts::instruction_context(&config.taxonomy);
        Self {
            model,
            instruction,
            config,
        }
    }

    /// Build an engine, creating the LLM provider from `config` and the environment.
    ///
    /// Fails with [`ScanError::MissingCredential`] when Gemini is selected, no
    /// pre-built provider is configured, and neither `GEMINI_API_KEY` nor
    /// `API_KEY` is set.
    pub fn from_config(config: ExtractionConfig) -> Result<Self, ScanError> {
        let provider = resolve_provider(&config)?;
        info!(
            "Extraction engine ready: provider={}, model={}",
            config.provider_name_or_default(),
            config.model_or_default()
        );
        Ok(Self::new(Arc::new(ProviderModel::new(provider)), config))
    }

    /// The system message sent with every call.
    pub fn instruction_context(&self) -> &str {
        &self.instruction
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    // ── Text ─────────────────────────────────────────────────────────────

    /// Extract a draft from a voice transcript. `None` on any failure.
    pub async fn extract_from_text(&self, transcript: &str) -> Option<TransactionDraft> {
        self.try_extract_from_text(transcript)
            .await
            .map_err(|e| warn!("Text extraction failed: {}", e))
            .ok()
    }

    /// Extract a draft from a voice transcript, keeping the failure cause.
    pub async fn try_extract_from_text(
        &self,
        transcript: &str,
    ) -> Result<TransactionDraft, ExtractionFailure> {
        if transcript.trim().is_empty() {
            return Err(ExtractionFailure::EmptyInput);
        }
        let messages = vec![
            ChatMessage::system(self.instruction.as_str()),
            ChatMessage::user(prompts::voice_task_prompt(transcript)),
        ];
        self.run_draft(&messages).await
    }

    // ── Image ────────────────────────────────────────────────────────────

    /// Extract a draft from image bytes of the given MIME type. `None` on any failure.
    pub async fn extract_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Option<TransactionDraft> {
        self.try_extract_from_image(image, mime_type)
            .await
            .map_err(|e| warn!("Image extraction failed: {}", e))
            .ok()
    }

    /// Extract a draft from image bytes, keeping the failure cause.
    pub async fn try_extract_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<TransactionDraft, ExtractionFailure> {
        self.run_image(image, mime_type, prompts::IMAGE_TASK_NOTE)
            .await
    }

    // ── Receipt ──────────────────────────────────────────────────────────

    /// Scan a receipt given as a data URI, bare base64, or file path.
    /// `None` on any failure, including an unreadable input.
    pub async fn scan_receipt(&self, image_input: &str) -> Option<TransactionDraft> {
        self.try_scan_receipt(image_input)
            .await
            .map_err(|e| warn!("Receipt scan failed: {}", e))
            .ok()
    }

    /// Scan a receipt, keeping the failure cause.
    pub async fn try_scan_receipt(
        &self,
        image_input: &str,
    ) -> Result<TransactionDraft, ExtractionFailure> {
        let payload = input::resolve_image_input(image_input).await?;
        self.run_image(&payload.data, &payload.mime_type, prompts::RECEIPT_TASK_PROMPT)
            .await
    }

    /// Scan many receipts concurrently, at most `config.concurrency` at a time.
    ///
    /// Results are returned in input order; each scan succeeds or fails on its own.
    pub async fn scan_receipts(&self, inputs: &[String]) -> Vec<Option<TransactionDraft>> {
        debug!(
            "Scanning {} receipts, concurrency {}",
            inputs.len(),
            self.config.concurrency
        );
        stream::iter(inputs.iter().map(|i| self.scan_receipt(i)))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    // ── Recurrence ───────────────────────────────────────────────────────

    /// Ask the model whether a transcript describes a recurring transaction.
    ///
    /// Any failure, or a reply without a `recurrence` field, yields
    /// [`Recurrence::Unique`].
    pub async fn classify_recurrence(&self, transcript: &str) -> Recurrence {
        #[derive(Deserialize)]
        struct Reply {
            recurrence: Option<Recurrence>,
        }

        if transcript.trim().is_empty() {
            return Recurrence::Unique;
        }
        let messages = vec![
            ChatMessage::system(self.instruction.as_str()),
            ChatMessage::user(format!(
                "{}\n\n{}",
                prompts::RECURRENCE_TASK_PROMPT,
                prompts::voice_task_prompt(transcript)
            )),
        ];
        let reply = match llm::generate_with_retry(self.model.as_ref(), &messages, &self.config).await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Recurrence classification failed: {}", e);
                return Recurrence::Unique;
            }
        };
        match postprocess::decode_reply::<Reply>(&reply) {
            Ok(Reply {
                recurrence: Some(r),
            }) => r,
            Ok(_) => Recurrence::Unique,
            Err(e) => {
                warn!("Recurrence reply undecodable: {}", e);
                Recurrence::Unique
            }
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn run_image(
        &self,
        image: &[u8],
        mime_type: &str,
        task: &str,
    ) -> Result<TransactionDraft, ExtractionFailure> {
        let attachment = encode::encode_image(image, mime_type);
        let messages = vec![
            ChatMessage::system(self.instruction.as_str()),
            ChatMessage::user_with_images(task, vec![attachment]),
        ];
        self.run_draft(&messages).await
    }

    async fn run_draft(
        &self,
        messages: &[ChatMessage],
    ) -> Result<TransactionDraft, ExtractionFailure> {
        let reply = llm::generate_with_retry(self.model.as_ref(), messages, &self.config).await?;
        let draft = postprocess::decode_draft(&reply)?;

        if let Some(violation) = draft.fixed_obligation_violation(&self.config.taxonomy) {
            warn!(
                "Draft for fixed obligation '{}' breaks the recurrence rule: {:?}",
                draft.category, violation
            );
        }
        if !draft.category.is_empty() && !self.config.taxonomy.contains(&draft.category) {
            debug!("Category '{}' is outside the taxonomy", draft.category);
        }
        Ok(draft)
    }
}

/// Create the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is, no credential check.
/// 2. **Named provider + model** — `config.provider_name` / `config.model`,
///    defaulting to Gemini. For Gemini the generative credential must be
///    present; other providers report their own missing keys.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ScanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let name = config.provider_name_or_default();
    let model = config.model_or_default();

    if name == DEFAULT_PROVIDER {
        let credential = GenerativeCredential::from_env()?;
        debug!("Using generative credential from {}", credential.source);
    }

    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        ScanError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}
