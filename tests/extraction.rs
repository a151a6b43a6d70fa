//! Integration tests for zenfin-scan.
//!
//! The engine runs against a scripted in-process model, so no network or API
//! key is needed. Each test queues the raw replies a real model might send and
//! checks what comes out of the pipeline.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use zenfin_scan::{
    process_entry, resolve_image_input, EntryError, ExtractionConfig, ExtractionEngine,
    ExtractionFailure, GenerationError, GenerativeModel, ProcessEntryRequest, Recurrence,
    TransactionType,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays queued replies in order; answers `{}` once the queue is empty.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<&str, GenerationError>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<&str, GenerationError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("{}".to_string()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Route library logs to the test harness; `RUST_LOG=zenfin_scan=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine_with(model: Arc<ScriptedModel>) -> ExtractionEngine {
    init_tracing();
    let config = ExtractionConfig::builder()
        .retry_backoff_ms(0)
        .build()
        .expect("valid config");
    ExtractionEngine::new(model, config)
}

const INTERNET_PIX: &str = r#"```json
{
    "description": "Internet",
    "amount": 50.0,
    "type": "EXPENSE",
    "category": "Internet",
    "date": "2025-03-10",
    "paymentMethod": null,
    "recurrence": "RECURRING"
}
```"#;

const RESTAURANT_CARD: &str = r#"{"description":"Jantar no Outback","amount":120.5,"type":"EXPENSE",
"category":"Bares e Restaurantes","date":"2025-03-09","paymentMethod":"Cartão de Crédito",
"recurrence":"UNIQUE"}"#;

const NO_AMOUNT: &str = r#"{"description":"Algo no mercado","type":"EXPENSE","category":"Mercado",
"date":"2025-03-09","paymentMethod":"Pix","recurrence":"UNIQUE"}"#;

// ── Text extraction ──────────────────────────────────────────────────────────

#[tokio::test]
async fn internet_via_pix_is_recurring_without_payment_method() {
    let model = ScriptedModel::new(vec![Ok(INTERNET_PIX)]);
    let engine = engine_with(Arc::clone(&model));

    let draft = engine
        .extract_from_text("Paguei 50 reais de internet via pix")
        .await
        .expect("draft");

    assert_eq!(draft.amount, Some(50.0));
    assert_eq!(draft.kind, TransactionType::Expense);
    assert_eq!(draft.category, "Internet");
    assert_eq!(draft.recurrence, Recurrence::Recurring);
    assert_eq!(draft.payment_method, None);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn eventual_expense_keeps_payment_method() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(RESTAURANT_CARD)]));

    let draft = engine
        .extract_from_text("Gastei 120,50 no Outback no cartão de crédito")
        .await
        .expect("draft");

    assert_eq!(draft.recurrence, Recurrence::Unique);
    assert_eq!(draft.payment_method.as_deref(), Some("Cartão de Crédito"));
}

#[tokio::test]
async fn non_json_reply_yields_none() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(
        "Claro! Você gastou 50 reais com internet.",
    )]));

    assert!(engine.extract_from_text("Paguei 50 de internet").await.is_none());
}

#[tokio::test]
async fn non_json_reply_cause_is_inspectable() {
    let engine = engine_with(ScriptedModel::new(vec![Ok("```json\nnot json\n```")]));

    let err = engine
        .try_extract_from_text("Paguei 50 de internet")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionFailure::Undecodable { .. }), "{err:?}");
}

#[tokio::test]
async fn out_of_taxonomy_category_is_tolerated() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(
        r#"{"description":"Uber","amount":23,"type":"EXPENSE","category":"Mobilidade"}"#,
    )]));

    let draft = engine.extract_from_text("Uber 23 reais").await.expect("draft");
    assert_eq!(draft.category, "Mobilidade");
}

#[tokio::test]
async fn undated_receipt_with_nulls_still_decodes() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(
        r#"{"description":"Padaria","amount":18.9,"type":"EXPENSE","category":null,"date":null,"paymentMethod":null}"#,
    )]));

    let draft = engine
        .scan_receipt("data:image/jpeg;base64,AAAA")
        .await
        .expect("draft");
    assert_eq!(draft.amount, Some(18.9));
    assert!(draft.date.is_empty());
    assert!(draft.category.is_empty());
}

#[tokio::test]
async fn unrecognised_type_falls_back_to_expense() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(
        r#"{"description":"Mercado","amount":"1.234,50","type":"DESPESA","recurrence":"MENSAL"}"#,
    )]));

    let draft = engine.extract_from_text("Mercado 1234,50").await.expect("draft");
    assert_eq!(draft.kind, TransactionType::Expense);
    assert_eq!(draft.recurrence, Recurrence::Unique);
    assert_eq!(draft.amount, Some(1234.5));
}

// ── Retry and timeout ────────────────────────────────────────────────────────

#[tokio::test]
async fn transient_failure_then_success() {
    let model = ScriptedModel::new(vec![
        Err(GenerationError::Transient("503 Service Unavailable".into())),
        Ok(RESTAURANT_CARD),
    ]);
    let engine = engine_with(Arc::clone(&model));

    let draft = engine.extract_from_text("Jantar 120,50").await;
    assert!(draft.is_some());
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn only_one_retry() {
    let model = ScriptedModel::new(vec![
        Err(GenerationError::Transient("503".into())),
        Err(GenerationError::Transient("503".into())),
        Ok(RESTAURANT_CARD),
    ]);
    let engine = engine_with(Arc::clone(&model));

    let err = engine.try_extract_from_text("Jantar").await.unwrap_err();
    assert!(matches!(err, ExtractionFailure::Remote { attempts: 2, .. }), "{err:?}");
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn slow_model_times_out_to_none() {
    let model = ScriptedModel::with_delay(vec![Ok(RESTAURANT_CARD)], Duration::from_secs(3));
    let config = ExtractionConfig::builder()
        .api_timeout_secs(1)
        .max_retries(0)
        .build()
        .unwrap();
    let engine = ExtractionEngine::new(model, config);

    let err = engine.try_extract_from_text("Jantar").await.unwrap_err();
    assert!(matches!(err, ExtractionFailure::Timeout { secs: 1 }), "{err:?}");
}

// ── Images and receipts ──────────────────────────────────────────────────────

#[tokio::test]
async fn image_extraction_decodes_reply() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(RESTAURANT_CARD)]));

    let draft = engine
        .extract_from_image(&[0xFF, 0xD8, 0xFF], "image/png")
        .await
        .expect("draft");
    assert_eq!(draft.amount, Some(120.5));
}

#[tokio::test]
async fn receipt_from_data_uri() {
    let model = ScriptedModel::new(vec![Ok(
        r#"{"description":"Padaria Pão Quente","amount":"18,90","date":"2025-03-08","category":"Alimentação","paymentMethod":null}"#,
    )]);
    let engine = engine_with(Arc::clone(&model));

    let draft = engine
        .scan_receipt("data:image/png;base64,AAAA")
        .await
        .expect("draft");
    assert_eq!(draft.amount, Some(18.9));
    assert_eq!(draft.kind, TransactionType::Expense);
    assert_eq!(draft.recurrence, Recurrence::Unique);
}

#[tokio::test]
async fn unreadable_receipt_is_none_without_calling_model() {
    let model = ScriptedModel::new(vec![Ok(RESTAURANT_CARD)]);
    let engine = engine_with(Arc::clone(&model));

    let err = engine
        .try_scan_receipt("/definitely/not/a/receipt.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionFailure::Input(_)), "{err:?}");
    assert!(engine.scan_receipt("data:image/jpeg;base64,***").await.is_none());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn receipts_scanned_concurrently_in_order() {
    let model = ScriptedModel::with_delay(
        vec![Ok(RESTAURANT_CARD), Ok("garbage"), Ok(INTERNET_PIX)],
        Duration::from_millis(50),
    );
    let engine = engine_with(Arc::clone(&model));
    let inputs: Vec<String> = (0..3).map(|_| "data:image/jpeg;base64,AAAA".to_string()).collect();

    let drafts = engine.scan_receipts(&inputs).await;

    assert_eq!(drafts.len(), 3);
    assert_eq!(drafts.iter().filter(|d| d.is_some()).count(), 2);
    assert!(model.peak_in_flight.load(Ordering::SeqCst) > 1);
}

// ── Input adapter ────────────────────────────────────────────────────────────

#[tokio::test]
async fn data_uri_bytes_equal_bare_payload() {
    let payload = resolve_image_input("data:image/png;base64,AAAA").await.unwrap();
    assert_eq!(payload.data, STANDARD.decode("AAAA").unwrap());
    assert_eq!(payload.mime_type, "image/jpeg");
}

#[tokio::test]
async fn long_base64_without_comma_is_inline() {
    let bytes = vec![7u8; 600];
    let b64 = STANDARD.encode(&bytes);
    assert!(b64.len() > 500 && !b64.contains(','));

    let payload = resolve_image_input(&b64).await.unwrap();
    assert_eq!(payload.data, bytes);
}

#[tokio::test]
async fn short_input_is_read_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\x89PNG fake").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let payload = resolve_image_input(&path).await.unwrap();
    assert_eq!(payload.data, b"\x89PNG fake".to_vec());
    assert_eq!(payload.mime_type, "image/jpeg");
}

// ── Entry contract ───────────────────────────────────────────────────────────

#[tokio::test]
async fn entry_missing_amount_is_distinct_from_failed_extraction() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(NO_AMOUNT), Ok("nada")]));

    let missing = process_entry(&engine, ProcessEntryRequest::voice("Comprei algo no mercado"))
        .await
        .unwrap_err();
    let failed = process_entry(&engine, ProcessEntryRequest::voice("???"))
        .await
        .unwrap_err();

    assert_eq!(missing, EntryError::AmountMissing);
    assert_eq!(failed, EntryError::ExtractionFailed);
    assert_ne!(missing.code(), failed.code());
    assert_ne!(missing.detail(), failed.detail());
}

#[tokio::test]
async fn entry_accepts_null_date_and_unknown_type() {
    let engine = engine_with(ScriptedModel::new(vec![
        Ok(r#"{"description":"Padaria","amount":18.9,"date":null}"#),
        Ok(r#"{"description":"Mercado","amount":42,"type":"DESPESA"}"#),
    ]));

    let undated = process_entry(&engine, ProcessEntryRequest::image(vec![1, 2, 3], "image/jpeg"))
        .await
        .expect("undated receipt accepted");
    assert!(undated.date.is_empty());

    let spoken = process_entry(&engine, ProcessEntryRequest::voice("Gastei 42 no mercado"))
        .await
        .expect("unknown type accepted");
    assert_eq!(spoken.kind, TransactionType::Expense);
    assert_eq!(spoken.amount, Some(42.0));
}

#[tokio::test]
async fn image_entry_uses_uploaded_file() {
    let engine = engine_with(ScriptedModel::new(vec![Ok(RESTAURANT_CARD)]));

    let draft = process_entry(
        &engine,
        ProcessEntryRequest::image(vec![1, 2, 3], "image/webp"),
    )
    .await
    .unwrap();
    assert_eq!(draft.description, "Jantar no Outback");
}

#[tokio::test]
async fn entry_without_content_is_invalid() {
    let model = ScriptedModel::new(vec![]);
    let engine = engine_with(Arc::clone(&model));

    let voice_without_text = ProcessEntryRequest {
        entry_type: "voice".into(),
        text_content: None,
        file: None,
    };
    let err = process_entry(&engine, voice_without_text).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    let unknown = ProcessEntryRequest {
        entry_type: "video".into(),
        text_content: Some("x".into()),
        file: None,
    };
    let err = process_entry(&engine, unknown).await.unwrap_err();
    assert!(matches!(err, EntryError::InvalidEntry { .. }));
    assert_eq!(model.calls(), 0);
}

// ── Recurrence ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn recurrence_classification() {
    let engine = engine_with(ScriptedModel::new(vec![
        Ok(r#"{"recurrence":"RECURRING"}"#),
        Err(GenerationError::Permanent("401".into())),
    ]));

    assert_eq!(
        engine.classify_recurrence("Academia todo mês").await,
        Recurrence::Recurring
    );
    assert_eq!(
        engine.classify_recurrence("Academia todo mês").await,
        Recurrence::Unique
    );
}

// ── Shared engine ────────────────────────────────────────────────────────────

#[tokio::test]
async fn shared_engine_serves_concurrent_requests() {
    let model = ScriptedModel::with_delay(
        vec![Ok(INTERNET_PIX), Ok(RESTAURANT_CARD)],
        Duration::from_millis(50),
    );
    let engine = Arc::new(engine_with(Arc::clone(&model)));

    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.extract_from_text("internet 50").await })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.extract_from_text("jantar 120").await })
    };

    assert!(a.await.unwrap().is_some());
    assert!(b.await.unwrap().is_some());
    assert_eq!(model.calls(), 2);
}
