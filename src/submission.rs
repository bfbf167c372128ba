// 📝 Submission - the value object behind the Mini App form
// One submission per button press: read, validate, encode, send, drop.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// FORM FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Bank,
    Category,
    Percent,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Bank, FormField::Category, FormField::Percent];

    /// Stable lookup key of the input element
    pub fn key(&self) -> &'static str {
        match self {
            FormField::Bank => "bank",
            FormField::Category => "category",
            FormField::Percent => "percent",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, FormField::Bank)
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingRequiredField(FormField),
}

impl ValidationError {
    pub fn field(&self) -> FormField {
        match self {
            ValidationError::MissingRequiredField(field) => *field,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingRequiredField(field) => {
                write!(f, "{}: required field is empty", field.key())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub type SubmissionResult = Result<Submission, Vec<ValidationError>>;

// ============================================================================
// SUBMISSION
// ============================================================================

/// A validated form submission.
///
/// Field order is the wire order: `{"bank":..,"category":..,"percent":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub bank: String,
    pub category: String,
    pub percent: String,
}

impl Submission {
    /// Build a submission from raw field values.
    ///
    /// Only emptiness is checked. `bank` may be empty; `category` and
    /// `percent` may not. Whitespace and `"0"` count as values.
    pub fn validate(
        bank: impl Into<String>,
        category: impl Into<String>,
        percent: impl Into<String>,
    ) -> SubmissionResult {
        let submission = Submission {
            bank: bank.into(),
            category: category.into(),
            percent: percent.into(),
        };

        let errors: Vec<ValidationError> = FormField::ALL
            .into_iter()
            .filter(|field| field.is_required() && submission.value(*field).is_empty())
            .map(ValidationError::MissingRequiredField)
            .collect();

        if errors.is_empty() {
            Ok(submission)
        } else {
            Err(errors)
        }
    }

    /// JSON string handed to the bridge
    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to encode submission")
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Bank => &self.bank,
            FormField::Category => &self.category,
            FormField::Percent => &self.percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_keys() {
        assert_eq!(FormField::Bank.key(), "bank");
        assert_eq!(FormField::Category.key(), "category");
        assert_eq!(FormField::Percent.key(), "percent");
    }

    #[test]
    fn test_required_fields_drive_validation() {
        let required: Vec<FormField> = FormField::ALL
            .into_iter()
            .filter(|field| field.is_required())
            .collect();
        assert_eq!(required, vec![FormField::Category, FormField::Percent]);

        let errors = Submission::validate("", "", "").unwrap_err();
        let fields: Vec<FormField> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, required);
    }

    #[test]
    fn test_valid_submission_payload() {
        let submission = Submission::validate("Visa", "Groceries", "5").unwrap();
        let payload = submission.to_payload().unwrap();

        assert_eq!(payload, r#"{"bank":"Visa","category":"Groceries","percent":"5"}"#);
    }

    #[test]
    fn test_zero_percent_is_a_value() {
        let submission = Submission::validate("Amex", "Travel", "0").unwrap();
        assert_eq!(
            submission.to_payload().unwrap(),
            r#"{"bank":"Amex","category":"Travel","percent":"0"}"#
        );
    }

    #[test]
    fn test_bank_is_optional() {
        let submission = Submission::validate("", "Fuel", "3").unwrap();
        assert_eq!(submission.bank, "");
        assert_eq!(
            submission.to_payload().unwrap(),
            r#"{"bank":"","category":"Fuel","percent":"3"}"#
        );
    }

    #[test]
    fn test_missing_category() {
        let errors = Submission::validate("", "", "10").unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredField(FormField::Category)]
        );
    }

    #[test]
    fn test_missing_percent() {
        let errors = Submission::validate("", "Fuel", "").unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredField(FormField::Percent)]
        );
        assert_eq!(errors[0].to_string(), "percent: required field is empty");
    }

    #[test]
    fn test_all_missing_reports_both_required_fields() {
        let errors = Submission::validate("Visa", "", "").unwrap_err();
        let fields: Vec<FormField> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec![FormField::Category, FormField::Percent]);
    }

    #[test]
    fn test_whitespace_counts_as_value() {
        assert!(Submission::validate("", " ", " ").is_ok());
    }

    #[test]
    fn test_unicode_is_not_escaped() {
        let submission = Submission::validate("Тинькофф", "Кафе", "7").unwrap();
        assert_eq!(
            submission.to_payload().unwrap(),
            r#"{"bank":"Тинькофф","category":"Кафе","percent":"7"}"#
        );
    }
}
