//! Treatment plans customers follow between consultations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use skinior_core::{MilestoneId, TreatmentId, TreatmentStatus, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Treatment {
    pub id: TreatmentId,
    pub user_id: UserId,
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_weeks: i32,
    pub progress_percent: i32,
    pub status: TreatmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A treatment with milestone counts and the week it is in today.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TreatmentSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub treatment: Treatment,
    pub milestones_completed: i64,
    pub total_milestones: i64,
    /// 0 before the start date, capped at `duration_weeks`.
    #[sqlx(skip)]
    pub current_week: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreatmentDetail {
    #[serde(flatten)]
    pub summary: TreatmentSummary,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: MilestoneId,
    pub treatment_id: TreatmentId,
    pub title: String,
    pub description: String,
    pub target_week: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A milestone to be written with a new treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMilestone {
    pub title: String,
    pub description: String,
    pub target_week: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTreatmentRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_weeks: i32,
    /// Milestone titles, spread evenly over the plan. A default plan is
    /// used when absent or empty.
    pub milestones: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTreatmentRequest {
    pub progress_percent: Option<i32>,
    pub status: Option<TreatmentStatus>,
    pub complete_milestone_id: Option<MilestoneId>,
}
