//! Boundary validation for requirement drafts.
//!
//! Drafts arrive with a flat bag of optional kind-specific fields (the shape
//! API clients send). Validation reports every problem at once and, when the
//! draft is clean, resolves the bag into the typed [`RequirementDetail`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, RequirementCategory, RequirementDetail, RequirementKind,
    RequirementNecessity, TaskId,
};

const DEFAULT_CURRENCY: &str = "USD";

/// One field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a draft: valid, or a list of field errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            return f.write_str("valid");
        }
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Flat kind-specific fields as submitted by clients, before resolution into
/// a [`RequirementDetail`]. Numeric fields are signed so that negative input
/// can be rejected rather than silently wrapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailDraft {
    pub document_type: Option<String>,
    pub max_file_size: Option<i64>,
    pub allowed_file_types: Option<Vec<String>>,
    pub word_limit: Option<i64>,
    pub character_limit: Option<i64>,
    pub test_type: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub score_format: Option<String>,
    pub fee_amount: Option<f64>,
    pub fee_currency: Option<String>,
    pub fee_description: Option<String>,
    pub interview_type: Option<String>,
    pub interview_duration: Option<i64>,
    pub interview_notes: Option<String>,
}

impl From<&RequirementDetail> for DetailDraft {
    fn from(detail: &RequirementDetail) -> Self {
        let mut draft = Self::default();
        match detail {
            RequirementDetail::Document {
                document_type,
                max_file_size,
                allowed_file_types,
                word_limit,
                character_limit,
            } => {
                draft.document_type = Some(document_type.clone());
                draft.max_file_size = max_file_size.map(|value| value as i64);
                if !allowed_file_types.is_empty() {
                    draft.allowed_file_types = Some(allowed_file_types.clone());
                }
                draft.word_limit = word_limit.map(|value| value as i64);
                draft.character_limit = character_limit.map(|value| value as i64);
            }
            RequirementDetail::TestScore {
                test_type,
                min_score,
                max_score,
                score_format,
            } => {
                draft.test_type = Some(test_type.clone());
                draft.min_score = *min_score;
                draft.max_score = *max_score;
                draft.score_format = score_format.clone();
            }
            RequirementDetail::Fee {
                amount,
                currency,
                description,
            } => {
                draft.fee_amount = Some(*amount);
                draft.fee_currency = Some(currency.clone());
                draft.fee_description = description.clone();
            }
            RequirementDetail::Interview {
                interview_type,
                duration_minutes,
                notes,
            } => {
                draft.interview_type = Some(interview_type.clone());
                draft.interview_duration = duration_minutes.map(|value| value as i64);
                draft.interview_notes = notes.clone();
            }
            RequirementDetail::Other => {}
        }
        draft
    }
}

/// Input for creating one requirement, either directly or via template
/// expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDraft {
    pub application_id: ApplicationId,
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<RequirementKind>,
    pub category: Option<RequirementCategory>,
    pub necessity: Option<RequirementNecessity>,
    pub order: Option<u32>,
    pub external_url: Option<String>,
    pub notes: Option<String>,
    pub task_id: Option<TaskId>,
    #[serde(flatten)]
    pub detail: DetailDraft,
}

impl RequirementDraft {
    pub fn new(
        application_id: ApplicationId,
        name: impl Into<String>,
        kind: RequirementKind,
        category: RequirementCategory,
    ) -> Self {
        Self {
            application_id,
            name: name.into(),
            description: None,
            kind: Some(kind),
            category: Some(category),
            necessity: None,
            order: None,
            external_url: None,
            notes: None,
            task_id: None,
            detail: DetailDraft::default(),
        }
    }

    /// Resolve the flat field bag into the typed detail payload, failing with
    /// the full validation report when the draft is malformed.
    pub fn resolved_detail(&self) -> Result<RequirementDetail, ValidationReport> {
        let (errors, detail) = evaluate(&self.name, self.kind, self.category, &self.detail);
        match detail {
            Some(detail) if errors.is_empty() => Ok(detail),
            _ => Err(ValidationReport::from_errors(errors)),
        }
    }
}

/// Check a requirement draft without persisting anything.
pub fn validate_requirement_data(draft: &RequirementDraft) -> ValidationReport {
    let (errors, _) = evaluate(&draft.name, draft.kind, draft.category, &draft.detail);
    ValidationReport::from_errors(errors)
}

/// Shared core for draft and blueprint validation: collect field errors and,
/// when the kind-specific mandatory fields are present, build the detail.
pub(crate) fn evaluate(
    name: &str,
    kind: Option<RequirementKind>,
    category: Option<RequirementCategory>,
    detail: &DetailDraft,
) -> (Vec<FieldError>, Option<RequirementDetail>) {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Requirement name is required"));
    }
    if category.is_none() {
        errors.push(FieldError::new("category", "Category is required"));
    }

    check_non_negative(&mut errors, "max_file_size", detail.max_file_size);
    check_non_negative(&mut errors, "word_limit", detail.word_limit);
    check_non_negative(&mut errors, "character_limit", detail.character_limit);
    check_non_negative_f64(&mut errors, "min_score", detail.min_score);
    check_non_negative_f64(&mut errors, "max_score", detail.max_score);
    check_non_negative_f64(&mut errors, "fee_amount", detail.fee_amount);
    check_non_negative(&mut errors, "interview_duration", detail.interview_duration);

    let Some(kind) = kind else {
        errors.push(FieldError::new("kind", "Requirement type is required"));
        return (errors, None);
    };

    let resolved = match kind {
        RequirementKind::Document => match detail.document_type.clone() {
            Some(document_type) if !document_type.trim().is_empty() => {
                Some(RequirementDetail::Document {
                    document_type,
                    max_file_size: unsigned(detail.max_file_size),
                    allowed_file_types: detail.allowed_file_types.clone().unwrap_or_default(),
                    word_limit: unsigned(detail.word_limit),
                    character_limit: unsigned(detail.character_limit),
                })
            }
            _ => {
                errors.push(FieldError::new(
                    "document_type",
                    "Document type is required for document requirements",
                ));
                None
            }
        },
        RequirementKind::TestScore => match detail.test_type.clone() {
            Some(test_type) if !test_type.trim().is_empty() => {
                Some(RequirementDetail::TestScore {
                    test_type,
                    min_score: detail.min_score,
                    max_score: detail.max_score,
                    score_format: detail.score_format.clone(),
                })
            }
            _ => {
                errors.push(FieldError::new(
                    "test_type",
                    "Test type is required for test score requirements",
                ));
                None
            }
        },
        RequirementKind::Fee => match detail.fee_amount {
            Some(amount) => Some(RequirementDetail::Fee {
                amount,
                currency: detail
                    .fee_currency
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                description: detail.fee_description.clone(),
            }),
            None => {
                errors.push(FieldError::new(
                    "fee_amount",
                    "Fee amount is required for fee requirements",
                ));
                None
            }
        },
        RequirementKind::Interview => match detail.interview_type.clone() {
            Some(interview_type) if !interview_type.trim().is_empty() => {
                Some(RequirementDetail::Interview {
                    interview_type,
                    duration_minutes: unsigned(detail.interview_duration),
                    notes: detail.interview_notes.clone(),
                })
            }
            _ => {
                errors.push(FieldError::new(
                    "interview_type",
                    "Interview type is required for interview requirements",
                ));
                None
            }
        },
        RequirementKind::Other => Some(RequirementDetail::Other),
    };

    if errors.is_empty() {
        (errors, resolved)
    } else {
        (errors, None)
    }
}

fn check_non_negative(errors: &mut Vec<FieldError>, field: &str, value: Option<i64>) {
    if matches!(value, Some(value) if value < 0) {
        errors.push(FieldError::new(
            field,
            format!("{field} cannot be negative"),
        ));
    }
}

fn check_non_negative_f64(errors: &mut Vec<FieldError>, field: &str, value: Option<f64>) {
    if matches!(value, Some(value) if value < 0.0) {
        errors.push(FieldError::new(
            field,
            format!("{field} cannot be negative"),
        ));
    }
}

fn unsigned(value: Option<i64>) -> Option<u64> {
    value.and_then(|value| u64::try_from(value).ok())
}
