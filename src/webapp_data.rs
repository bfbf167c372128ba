// 📥 Web App Data - the receiving end of `send_data`
// Parses what the form sent, re-validates it, and builds the chat replies.

use crate::submission::{FormField, Submission, ValidationError};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const START_MESSAGE: &str = "Привет! Я бот для учета кешбэков.\n\
Нажми кнопку ниже, чтобы добавить кешбэк через Mini App.";

pub const OPEN_APP_BUTTON: &str = "📱 Открыть приложение";

// ============================================================================
// PAYLOAD PARSING
// ============================================================================

/// Parse a payload received from the Mini App.
///
/// Absent keys and `null` read as empty strings, numbers are taken as
/// their JSON text. The result goes through the same validation the
/// form applies, since the client cannot be trusted.
pub fn parse_payload(payload: &str) -> Result<Submission> {
    let value: Value = serde_json::from_str(payload).context("Payload is not valid JSON")?;

    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Payload must be a JSON object"))?;

    let field = |field: FormField| -> Result<String> {
        match object.get(field.key()) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(anyhow!(
                "Field '{}' has unsupported type: {}",
                field.key(),
                other
            )),
        }
    };

    Submission::validate(
        field(FormField::Bank)?,
        field(FormField::Category)?,
        field(FormField::Percent)?,
    )
    .map_err(|errors| anyhow!(join_errors(&errors)))
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a user-typed percent such as `5`, `1,5` or `3.5%`.
pub fn parse_percent(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");

    let percent: f64 = cleaned
        .parse()
        .map_err(|_| anyhow!("Invalid percent: '{}'", raw))?;

    if !percent.is_finite() {
        return Err(anyhow!("Invalid percent: '{}'", raw));
    }

    if !(0.0..=100.0).contains(&percent) {
        return Err(anyhow!("Percent must be between 0 and 100, got {}", percent));
    }

    Ok(percent)
}

// ============================================================================
// CASHBACK ENTRY
// ============================================================================

/// A stored cashback offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashbackEntry {
    pub bank: String,
    pub category: String,
    pub percent: f64,
}

impl CashbackEntry {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        Ok(CashbackEntry {
            bank: submission.bank.clone(),
            category: submission.category.clone(),
            percent: parse_percent(&submission.percent)?,
        })
    }
}

// ============================================================================
// REPLIES
// ============================================================================

/// Reply for a stored entry; the percent is shown as parsed, not as typed
pub fn confirmation_message(entry: &CashbackEntry) -> String {
    format!(
        "✅ **Кешбэк сохранен!**\n\n\
         🏦 Банк: {}\n\
         🏷 Категория: {}\n\
         📉 Процент: {}%",
        entry.bank,
        entry.category,
        format_percent(entry.percent)
    )
}

pub fn best_cashback_message(query: &str, entries: &[CashbackEntry]) -> String {
    if entries.is_empty() {
        return format!("Кешбэк по категории «{}» не найден.", query);
    }

    let mut lines = vec![format!("🔎 Лучший кешбэк по запросу «{}»:", query)];
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!(
            "{}. {} ({}): {}%",
            i + 1,
            display_bank(&entry.bank),
            entry.category,
            format_percent(entry.percent)
        ));
    }
    lines.join("\n")
}

pub fn list_message(entries: &[CashbackEntry]) -> String {
    if entries.is_empty() {
        return "У тебя пока нет сохраненных кешбэков.".to_string();
    }

    let mut lines = vec!["📋 Твои кешбэки:".to_string()];
    let mut current_bank: Option<&str> = None;

    for entry in entries {
        if current_bank != Some(entry.bank.as_str()) {
            lines.push(format!("\n🏦 {}", display_bank(&entry.bank)));
            current_bank = Some(entry.bank.as_str());
        }
        lines.push(format!(
            "  • {}: {}%",
            entry.category,
            format_percent(entry.percent)
        ));
    }
    lines.join("\n")
}

fn display_bank(bank: &str) -> &str {
    if bank.is_empty() {
        "—"
    } else {
        bank
    }
}

/// `5.0` → `5`, `1.5` → `1.5`
pub fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("{:.0}", percent)
    } else {
        let s = format!("{:.2}", percent);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_payload() {
        let submission =
            parse_payload(r#"{"bank":"Visa","category":"Groceries","percent":"5"}"#).unwrap();

        assert_eq!(submission.bank, "Visa");
        assert_eq!(submission.category, "Groceries");
        assert_eq!(submission.percent, "5");
    }

    #[test]
    fn test_parse_payload_missing_bank_and_numeric_percent() {
        let submission = parse_payload(r#"{"category":"Fuel","percent":3.5}"#).unwrap();

        assert_eq!(submission.bank, "");
        assert_eq!(submission.percent, "3.5");
    }

    #[test]
    fn test_parse_payload_rejects_missing_required() {
        let err = parse_payload(r#"{"bank":"Visa","category":null,"percent":""}"#).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("category"));
        assert!(message.contains("percent"));
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert!(parse_payload("not json").is_err());
        assert!(parse_payload("[1,2,3]").is_err());
        assert!(parse_payload(r#"{"category":["a"],"percent":"1"}"#).is_err());
    }

    #[test]
    fn test_parse_percent_formats() {
        assert_eq!(parse_percent("5").unwrap(), 5.0);
        assert_eq!(parse_percent(" 1,5 ").unwrap(), 1.5);
        assert_eq!(parse_percent("3.5%").unwrap(), 3.5);
        assert_eq!(parse_percent("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_percent_rejects_out_of_range() {
        assert!(parse_percent("abc").is_err());
        assert!(parse_percent("-1").is_err());
        assert!(parse_percent("101").is_err());
        assert!(parse_percent("NaN").is_err());
        assert!(parse_percent(" ").is_err());
    }

    #[test]
    fn test_entry_from_submission() {
        let submission = Submission::validate("Amex", "Travel", "0").unwrap();
        let entry = CashbackEntry::from_submission(&submission).unwrap();

        assert_eq!(entry.bank, "Amex");
        assert_eq!(entry.percent, 0.0);
    }

    #[test]
    fn test_confirmation_message() {
        let submission = Submission::validate("Visa", "Groceries", "5").unwrap();
        let entry = CashbackEntry::from_submission(&submission).unwrap();
        let message = confirmation_message(&entry);

        assert!(message.starts_with("✅ **Кешбэк сохранен!**"));
        assert!(message.contains("🏦 Банк: Visa"));
        assert!(message.contains("🏷 Категория: Groceries"));
        assert!(message.ends_with("📉 Процент: 5%"));
    }

    #[test]
    fn test_confirmation_message_uses_parsed_percent() {
        for (typed, shown) in [("5%", "📉 Процент: 5%"), ("1,5", "📉 Процент: 1.5%"), (" 3 % ", "📉 Процент: 3%")] {
            let submission = Submission::validate("Visa", "Fuel", typed).unwrap();
            let entry = CashbackEntry::from_submission(&submission).unwrap();
            let message = confirmation_message(&entry);

            assert!(message.ends_with(shown), "{:?} -> {}", typed, message);
            assert!(!message.contains("%%"));
        }
    }

    #[test]
    fn test_start_message_only_offers_the_mini_app() {
        assert!(START_MESSAGE.contains("Mini App"));
        assert!(!START_MESSAGE.contains("OCR"));
        assert!(!START_MESSAGE.contains("скриншот"));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(5.0), "5");
        assert_eq!(format_percent(1.5), "1.5");
        assert_eq!(format_percent(0.25), "0.25");
    }

    #[test]
    fn test_list_message_groups_by_bank() {
        let entries = vec![
            CashbackEntry { bank: "Amex".into(), category: "Travel".into(), percent: 3.0 },
            CashbackEntry { bank: "Amex".into(), category: "Fuel".into(), percent: 1.5 },
            CashbackEntry { bank: "Visa".into(), category: "Groceries".into(), percent: 5.0 },
        ];
        let message = list_message(&entries);

        assert_eq!(message.matches("🏦 Amex").count(), 1);
        assert!(message.contains("  • Fuel: 1.5%"));
        assert!(message.contains("🏦 Visa"));
        assert_eq!(list_message(&[]), "У тебя пока нет сохраненных кешбэков.");
    }

    #[test]
    fn test_best_cashback_message() {
        let entries = vec![
            CashbackEntry { bank: "Visa".into(), category: "Fast Food".into(), percent: 7.0 },
            CashbackEntry { bank: "".into(), category: "Food".into(), percent: 2.0 },
        ];
        let message = best_cashback_message("food", &entries);

        assert!(message.contains("1. Visa (Fast Food): 7%"));
        assert!(message.contains("2. — (Food): 2%"));
        assert!(best_cashback_message("fuel", &[]).contains("не найден"));
    }
}
