use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for the owning application aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for a single checklist requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub String);

/// Identifier wrapper for documents held in the external document library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier wrapper for tasks owned by the external task planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad grouping used for checklist display and summary buckets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCategory {
    Academic,
    Financial,
    Personal,
    Professional,
    Administrative,
}

impl RequirementCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RequirementCategory::Academic => "academic",
            RequirementCategory::Financial => "financial",
            RequirementCategory::Personal => "personal",
            RequirementCategory::Professional => "professional",
            RequirementCategory::Administrative => "administrative",
        }
    }
}

/// Discriminant for the kind-specific payload a requirement carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Document,
    TestScore,
    Fee,
    Interview,
    Other,
}

impl RequirementKind {
    pub const fn label(self) -> &'static str {
        match self {
            RequirementKind::Document => "document",
            RequirementKind::TestScore => "test_score",
            RequirementKind::Fee => "fee",
            RequirementKind::Interview => "interview",
            RequirementKind::Other => "other",
        }
    }
}

/// Whether satisfying the requirement is mandatory for submission.
///
/// Collapses the contradictory required/optional flag pair of earlier trackers
/// into one three-valued classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementNecessity {
    Required,
    Optional,
    Conditional,
}

impl RequirementNecessity {
    pub const fn label(self) -> &'static str {
        match self {
            RequirementNecessity::Required => "required",
            RequirementNecessity::Optional => "optional",
            RequirementNecessity::Conditional => "conditional",
        }
    }
}

/// Checklist item lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Pending,
    InProgress,
    Completed,
    Waived,
    NotApplicable,
}

impl RequirementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequirementStatus::Pending => "pending",
            RequirementStatus::InProgress => "in_progress",
            RequirementStatus::Completed => "completed",
            RequirementStatus::Waived => "waived",
            RequirementStatus::NotApplicable => "not_applicable",
        }
    }

    /// Statuses that count toward the completion tally: fulfilled, waived,
    /// or declared inapplicable.
    pub const fn counts_as_completed(self) -> bool {
        matches!(
            self,
            RequirementStatus::Completed
                | RequirementStatus::Waived
                | RequirementStatus::NotApplicable
        )
    }

    pub const fn is_open(self) -> bool {
        matches!(
            self,
            RequirementStatus::Pending | RequirementStatus::InProgress
        )
    }

    /// Legal transitions: open states may move freely among each other and
    /// into any settled state; settled states may only reopen.
    pub fn can_transition_to(self, next: RequirementStatus) -> bool {
        if self == next {
            return false;
        }
        if self.is_open() {
            return true;
        }
        next.is_open()
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific payload, structurally tied to the requirement kind so a
/// document requirement cannot exist without its document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementDetail {
    Document {
        document_type: String,
        max_file_size: Option<u64>,
        allowed_file_types: Vec<String>,
        word_limit: Option<u64>,
        character_limit: Option<u64>,
    },
    TestScore {
        test_type: String,
        min_score: Option<f64>,
        max_score: Option<f64>,
        score_format: Option<String>,
    },
    Fee {
        amount: f64,
        currency: String,
        description: Option<String>,
    },
    Interview {
        interview_type: String,
        duration_minutes: Option<u64>,
        notes: Option<String>,
    },
    Other,
}

impl RequirementDetail {
    pub const fn kind(&self) -> RequirementKind {
        match self {
            RequirementDetail::Document { .. } => RequirementKind::Document,
            RequirementDetail::TestScore { .. } => RequirementKind::TestScore,
            RequirementDetail::Fee { .. } => RequirementKind::Fee,
            RequirementDetail::Interview { .. } => RequirementKind::Interview,
            RequirementDetail::Other => RequirementKind::Other,
        }
    }
}

/// One checklist item belonging to exactly one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub application_id: ApplicationId,
    pub name: String,
    pub description: Option<String>,
    pub category: RequirementCategory,
    pub necessity: RequirementNecessity,
    pub detail: RequirementDetail,
    pub status: RequirementStatus,
    pub linked_document_id: Option<DocumentId>,
    pub task_id: Option<TaskId>,
    pub external_url: Option<String>,
    pub notes: Option<String>,
    pub order: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raised when a status change is not permitted by the lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move a requirement from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RequirementStatus,
    pub to: RequirementStatus,
}

impl Requirement {
    pub const fn kind(&self) -> RequirementKind {
        self.detail.kind()
    }

    /// Move the requirement through its lifecycle, stamping `submitted_at`
    /// when it completes and clearing both stamps when it reopens.
    pub fn transition(
        &mut self,
        next: RequirementStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        if self.status == RequirementStatus::Completed && next.is_open() {
            self.submitted_at = None;
            self.verified_at = None;
        }
        if next == RequirementStatus::Completed && self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Merge a field patch onto the requirement. A patch that sets the status
    /// to completed stamps the submission and verification times if unset;
    /// lifecycle legality is not enforced here, only by [`Self::transition`].
    pub fn apply_patch(&mut self, patch: &RequirementPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(necessity) = patch.necessity {
            self.necessity = necessity;
        }
        if let Some(external_url) = &patch.external_url {
            self.external_url = Some(external_url.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status == RequirementStatus::Completed {
                if self.submitted_at.is_none() {
                    self.submitted_at = Some(now);
                }
                if self.verified_at.is_none() {
                    self.verified_at = Some(now);
                }
            }
        }
        self.updated_at = now;
    }
}

/// Field patch shared by single and bulk requirement updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<RequirementCategory>,
    pub necessity: Option<RequirementNecessity>,
    pub status: Option<RequirementStatus>,
    pub external_url: Option<String>,
    pub notes: Option<String>,
    pub order: Option<u32>,
}

/// Computed completion snapshot for one application's checklist. Recomputed
/// from a full scan after every mutation and cached on the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsProgress {
    pub total: u32,
    pub completed: u32,
    pub required: u32,
    pub required_completed: u32,
    pub optional: u32,
    pub optional_completed: u32,
    pub percentage: u8,
}

impl RequirementsProgress {
    pub fn from_requirements<'a, I>(requirements: I) -> Self
    where
        I: IntoIterator<Item = &'a Requirement>,
    {
        let mut progress = Self::default();
        for requirement in requirements {
            progress.total += 1;
            let done = requirement.status.counts_as_completed();
            if done {
                progress.completed += 1;
            }
            match requirement.necessity {
                RequirementNecessity::Required => {
                    progress.required += 1;
                    if done {
                        progress.required_completed += 1;
                    }
                }
                RequirementNecessity::Optional => {
                    progress.optional += 1;
                    if done {
                        progress.optional_completed += 1;
                    }
                }
                RequirementNecessity::Conditional => {}
            }
        }

        if progress.total > 0 {
            let ratio = f64::from(progress.completed) / f64::from(progress.total);
            progress.percentage = (ratio * 100.0).round() as u8;
        }
        progress
    }

    /// An application is ready to submit only when it has at least one
    /// required item and all of them are settled.
    pub const fn is_ready_to_submit(&self) -> bool {
        self.required > 0 && self.required_completed == self.required
    }
}
