//! The structured record produced by the pipeline.
//!
//! Field names on the wire follow the app's JSON (`type`, `paymentMethod`).
//! Any JSON object decodes: a missing, `null` or out-of-vocabulary field takes
//! its default. `amount` stays an `Option` because its absence is a
//! caller-side validation failure, not a decode failure.

use crate::taxonomy::Taxonomy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    #[serde(alias = "income", alias = "Income")]
    Income,
    #[default]
    #[serde(alias = "expense", alias = "Expense")]
    Expense,
}

/// How often a transaction happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recurrence {
    #[default]
    #[serde(alias = "unique", alias = "Unique")]
    Unique,
    #[serde(alias = "recurring", alias = "Recurring")]
    Recurring,
    /// Stored by the app but never produced by extraction.
    #[serde(alias = "installment", alias = "Installment")]
    Installment,
}

/// A transaction as read from a transcript or an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,

    #[serde(rename = "type", default, deserialize_with = "lenient_variant")]
    pub kind: TransactionType,

    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,

    /// `YYYY-MM-DD` as written by the model; not parsed here.
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,

    #[serde(rename = "paymentMethod", default)]
    pub payment_method: Option<String>,

    #[serde(default, deserialize_with = "lenient_variant")]
    pub recurrence: Recurrence,
}

/// A fixed-obligation draft that does not follow the recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    NotRecurring,
    HasPaymentMethod,
}

impl TransactionDraft {
    /// Check the fixed-obligation rule the instruction context asks for.
    ///
    /// Returns the first violation found for a fixed-obligation category, or
    /// `None` when the rule holds or does not apply.
    pub fn fixed_obligation_violation(&self, taxonomy: &Taxonomy) -> Option<RuleViolation> {
        if !taxonomy.is_fixed_obligation(&self.category) {
            return None;
        }
        if self.recurrence != Recurrence::Recurring {
            return Some(RuleViolation::NotRecurring);
        }
        if self
            .payment_method
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty())
        {
            return Some(RuleViolation::HasPaymentMethod);
        }
        None
    }
}

/// `null` becomes the empty string; a number or bool keeps its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Unknown or `null` enum values fall back to the variant's default.
fn lenient_variant<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(T::default()),
        Some(v) => v,
    };
    Ok(serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        debug!("Unrecognised value {} ({}), using default", value, e);
        T::default()
    }))
}

/// Accept `50`, `50.5`, `"50"`, `"50,00"`, `"R$ 1.234,56"`; anything else is `None`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_amount_text(&s),
        _ => None,
    })
}

/// Read a money amount written with `.` or `,` as either separator.
///
/// When both marks appear the last one is the decimal mark. A lone mark
/// followed by exactly three digits groups thousands (`1.234`, `1,234`).
/// Grouping that does not come in threes is ambiguous and yields `None`.
fn parse_amount_text(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let (sign, body) = match kept.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, kept.as_str()),
    };
    if body.is_empty() || body.contains('-') {
        return None;
    }

    let (integer, fraction) = match decimal_mark(body) {
        Some(mark) => {
            let at = body.rfind(mark)?;
            let integer = &body[..at];
            if integer.contains(mark) {
                return None;
            }
            (integer, &body[at + 1..])
        }
        None => (body, ""),
    };
    let integer = ungroup(integer)?;
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let normalised = match (integer.is_empty(), fraction.is_empty()) {
        (_, true) => integer,
        (true, false) => format!("0.{fraction}"),
        (false, false) => format!("{integer}.{fraction}"),
    };
    normalised.parse::<f64>().ok().map(|v| sign * v)
}

fn decimal_mark(body: &str) -> Option<char> {
    match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => lone_decimal_mark(body, '.'),
        (None, Some(_)) => lone_decimal_mark(body, ','),
        (None, None) => None,
    }
}

/// `mark` is decimal when it appears once and is not followed by three digits.
fn lone_decimal_mark(body: &str, mark: char) -> Option<char> {
    let mut parts = body.split(mark);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(tail), None) if tail.len() != 3 => Some(mark),
        _ => None,
    }
}

/// Strip thousands separators, rejecting groups that are not `d{1,3}(.ddd)*`.
fn ungroup(integer: &str) -> Option<String> {
    let groups: Vec<&str> = integer.split(|c| c == '.' || c == ',').collect();
    if let Some((head, rest)) = groups.split_first() {
        if !rest.is_empty()
            && (head.is_empty() || head.len() > 3 || rest.iter().any(|g| g.len() != 3))
        {
            return None;
        }
    }
    Some(groups.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> TransactionDraft {
        serde_json::from_str(json).expect("valid draft")
    }

    #[test]
    fn decodes_full_record() {
        let d = decode(
            r#"{"description":"Internet","amount":50.0,"type":"EXPENSE","category":"Internet",
                "date":"2024-05-10","paymentMethod":null,"recurrence":"RECURRING"}"#,
        );
        assert_eq!(d.amount, Some(50.0));
        assert_eq!(d.kind, TransactionType::Expense);
        assert_eq!(d.recurrence, Recurrence::Recurring);
        assert_eq!(d.payment_method, None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let d = decode(r#"{"description":"Padaria","amount":12.5}"#);
        assert_eq!(d.kind, TransactionType::Expense);
        assert_eq!(d.recurrence, Recurrence::Unique);
        assert!(d.category.is_empty());
        assert!(d.date.is_empty());
    }

    #[test]
    fn missing_amount_is_none() {
        let d = decode(r#"{"description":"?","type":"INCOME"}"#);
        assert_eq!(d.amount, None);
        assert_eq!(d.kind, TransactionType::Income);
    }

    #[test]
    fn amount_from_text() {
        assert_eq!(decode(r#"{"amount":"50"}"#).amount, Some(50.0));
        assert_eq!(decode(r#"{"amount":"50,90"}"#).amount, Some(50.9));
        assert_eq!(decode(r#"{"amount":"R$ 1.234,56"}"#).amount, Some(1234.56));
        assert_eq!(decode(r#"{"amount":"cinquenta"}"#).amount, None);
        assert_eq!(decode(r#"{"amount":null}"#).amount, None);
    }

    #[test]
    fn lowercase_enums_accepted() {
        let d = decode(r#"{"amount":1,"type":"income","recurrence":"recurring"}"#);
        assert_eq!(d.kind, TransactionType::Income);
        assert_eq!(d.recurrence, Recurrence::Recurring);
    }

    #[test]
    fn unknown_enum_values_fall_back_to_defaults() {
        let d = decode(r#"{"amount":1,"type":"DESPESA","recurrence":"MENSAL"}"#);
        assert_eq!(d.kind, TransactionType::Expense);
        assert_eq!(d.recurrence, Recurrence::Unique);

        let d = decode(r#"{"amount":1,"type":null,"recurrence":null}"#);
        assert_eq!(d.kind, TransactionType::Expense);
        assert_eq!(d.recurrence, Recurrence::Unique);
    }

    #[test]
    fn null_text_fields_become_empty() {
        let d = decode(
            r#"{"description":null,"amount":18.9,"category":null,"date":null,"paymentMethod":null}"#,
        );
        assert_eq!(d.amount, Some(18.9));
        assert!(d.description.is_empty());
        assert!(d.category.is_empty());
        assert!(d.date.is_empty());
    }

    #[test]
    fn non_string_text_keeps_json_form() {
        let d = decode(r#"{"amount":1,"date":20250310}"#);
        assert_eq!(d.date, "20250310");
    }

    #[test]
    fn amount_separators() {
        assert_eq!(parse_amount_text("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount_text("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount_text("R$ 1.234"), Some(1234.0));
        assert_eq!(parse_amount_text("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_amount_text("50.5"), Some(50.5));
        assert_eq!(parse_amount_text("50,00"), Some(50.0));
        assert_eq!(parse_amount_text("-20,00"), Some(-20.0));
        assert_eq!(parse_amount_text(",5"), Some(0.5));
    }

    #[test]
    fn ambiguous_amounts_are_none() {
        assert_eq!(parse_amount_text("12.34.5"), None);
        assert_eq!(parse_amount_text("1,2,3"), None);
        assert_eq!(parse_amount_text("1,2.3,45"), None);
        assert_eq!(parse_amount_text("5-0"), None);
        assert_eq!(parse_amount_text("."), None);
        assert_eq!(parse_amount_text("R$"), None);
    }

    #[test]
    fn serialises_wire_names() {
        let d = decode(r#"{"description":"Pix","amount":10,"paymentMethod":"Pix"}"#);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["type"], "EXPENSE");
        assert_eq!(v["paymentMethod"], "Pix");
        assert_eq!(v["recurrence"], "UNIQUE");
    }

    #[test]
    fn fixed_obligation_rule() {
        let t = Taxonomy::default();
        let mut d = decode(r#"{"amount":50,"category":"Internet","recurrence":"RECURRING"}"#);
        assert_eq!(d.fixed_obligation_violation(&t), None);

        d.payment_method = Some("Pix".into());
        assert_eq!(
            d.fixed_obligation_violation(&t),
            Some(RuleViolation::HasPaymentMethod)
        );

        d.recurrence = Recurrence::Unique;
        assert_eq!(
            d.fixed_obligation_violation(&t),
            Some(RuleViolation::NotRecurring)
        );

        d.category = "Mercado".into();
        assert_eq!(d.fixed_obligation_violation(&t), None);
    }
}
