//! Instruction context and task prompts sent to the generative model.
//!
//! The instruction context is the only place the category vocabulary, the
//! business rules and the JSON output schema are written down. It is built once
//! per engine from a [`Taxonomy`] and sent as the system message of every call;
//! the task prompts below are the per-call user message.
//!
//! Prompts are in Portuguese because the vocabulary, the transcripts and the
//! receipts are.

use crate::taxonomy::Taxonomy;

/// Task note sent with an uploaded image.
pub const IMAGE_TASK_NOTE: &str =
    "Extraia os dados. O campo paymentMethod é opcional para contas fixas.";

/// Task prompt sent with a scanned receipt.
pub const RECEIPT_TASK_PROMPT: &str = r#"Extraia os dados do recibo.
Retorne JSON puro com as chaves:
- description: Nome do local
- amount: Valor total (float)
- date: YYYY-MM-DD
- category: Categoria sugerida
- paymentMethod: Método detectado (OPCIONAL, pode ser nulo)"#;

/// Task prompt for the standalone recurrence question.
pub const RECURRENCE_TASK_PROMPT: &str =
    r#"Recorrência? UNIQUE ou RECURRING. Responda apenas JSON: {"recurrence": "UNIQUE" ou "RECURRING"}"#;

/// Compose the instruction context for `taxonomy`.
pub fn instruction_context(taxonomy: &Taxonomy) -> String {
    let fixed = if taxonomy.fixed_obligations.is_empty() {
        "Aluguel, Luz, Internet, Assinaturas".to_string()
    } else {
        taxonomy.fixed_obligations.join(", ")
    };

    format!(
        r#"Você é o motor de processamento financeiro do ZenFinanceiro AI.
Extraia dados de transações. Categorias: {categories}.

REGRAS DE NEGÓCIO:
1. Se a transação for um compromisso fixo/recorrente (ex: {fixed}):
   - Defina "recurrence" como "RECURRING".
   - O campo "paymentMethod" deve ser NULL ou omitido, pois contas fixas não exigem método imediato.
2. Para gastos eventuais:
   - Tente identificar o "paymentMethod" ({methods}, etc).

Retorne JSON:
{{
    "description": "string",
    "amount": float,
    "type": "INCOME" ou "EXPENSE",
    "category": "string",
    "date": "YYYY-MM-DD",
    "paymentMethod": "string ou null",
    "recurrence": "UNIQUE" ou "RECURRING"
}}"#,
        categories = taxonomy.categories.join(", "),
        fixed = fixed,
        methods = taxonomy.payment_methods.join(", "),
    )
}

/// User message for a voice transcript.
pub fn voice_task_prompt(transcript: &str) -> String {
    format!("Analise o comando financeiro: '{}'", transcript)
}
