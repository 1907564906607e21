//! Treatment plans: creation with a milestone schedule, progress updates
//! and milestone completion.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use skinior_core::{TreatmentId, TreatmentStatus, UserId};

use crate::db::RepositoryError;
use crate::db::treatments::TreatmentRepository;
use crate::models::treatment::{
    CreateTreatmentRequest, Milestone, NewMilestone, TreatmentDetail, TreatmentSummary,
    UpdateTreatmentRequest,
};

pub const MAX_DURATION_WEEKS: i32 = 104;
pub const MAX_MILESTONES: usize = 20;
const MAX_NAME_LEN: usize = 200;

/// Milestones used when a plan is created without its own.
const DEFAULT_PLAN: [(&str, &str); 4] = [
    ("Initial Assessment", "Complete skin analysis and set baseline"),
    ("First Progress Check", "Review initial treatment response"),
    ("Mid-Treatment Evaluation", "Assess treatment effectiveness and adjust if needed"),
    ("Final Assessment", "Complete treatment evaluation"),
];

#[derive(Debug, Error)]
pub enum TreatmentError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Week of the plan `today` falls in, starting at 1 on the start date.
#[must_use]
pub fn current_week(start_date: NaiveDate, duration_weeks: i32, today: NaiveDate) -> i32 {
    let days = (today - start_date).num_days();
    if days < 0 {
        return 0;
    }
    i32::try_from(days / 7 + 1).map_or(duration_weeks, |week| week.min(duration_weeks))
}

/// Percentage of milestones done, rounded down.
#[must_use]
pub fn milestone_progress(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    i32::try_from((completed.clamp(0, total) * 100) / total).unwrap_or(100)
}

/// Spread milestone titles evenly over the plan, the last one landing on
/// the final week. Blank titles are dropped.
#[must_use]
pub fn plan_milestones(titles: Option<&[String]>, duration_weeks: i32) -> Vec<NewMilestone> {
    let titles: Vec<&str> = titles
        .unwrap_or_default()
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    if titles.is_empty() {
        let weeks = [1, duration_weeks / 3, duration_weeks / 2, duration_weeks];
        return DEFAULT_PLAN
            .iter()
            .zip(weeks)
            .map(|((title, description), week)| NewMilestone {
                title: (*title).to_owned(),
                description: (*description).to_owned(),
                target_week: week.max(1),
            })
            .collect();
    }

    let count = i32::try_from(titles.len()).unwrap_or(i32::MAX);
    titles
        .into_iter()
        .zip(1..)
        .map(|(title, position)| NewMilestone {
            title: title.to_owned(),
            description: String::new(),
            target_week: ((position * duration_weeks + count - 1) / count).max(1),
        })
        .collect()
}

fn validate(request: &CreateTreatmentRequest) -> Result<(), TreatmentError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(TreatmentError::Invalid("name is required".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(TreatmentError::Invalid(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if !(1..=MAX_DURATION_WEEKS).contains(&request.duration_weeks) {
        return Err(TreatmentError::Invalid(format!(
            "duration_weeks must be between 1 and {MAX_DURATION_WEEKS}"
        )));
    }
    if request.milestones.as_ref().is_some_and(|m| m.len() > MAX_MILESTONES) {
        return Err(TreatmentError::Invalid(format!(
            "at most {MAX_MILESTONES} milestones are allowed"
        )));
    }
    Ok(())
}

fn with_current_week(mut summary: TreatmentSummary, today: NaiveDate) -> TreatmentSummary {
    let treatment = &summary.treatment;
    summary.current_week = current_week(treatment.start_date, treatment.duration_weeks, today);
    summary
}

pub struct TreatmentService<'a> {
    pool: &'a PgPool,
}

impl<'a> TreatmentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn treatments(&self) -> TreatmentRepository<'a> {
        TreatmentRepository::new(self.pool)
    }

    /// # Errors
    ///
    /// Returns `TreatmentError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<TreatmentSummary>, TreatmentError> {
        let today = Utc::now().date_naive();
        Ok(self
            .treatments()
            .list(user_id)
            .await?
            .into_iter()
            .map(|s| with_current_week(s, today))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `TreatmentError::NotFound` unless the user owns the treatment.
    pub async fn get(&self, id: TreatmentId, user_id: UserId) -> Result<TreatmentDetail, TreatmentError> {
        let summary = self
            .treatments()
            .get(id, user_id)
            .await?
            .ok_or(TreatmentError::NotFound("treatment"))?;
        let milestones = self.treatments().milestones(id).await?;
        Ok(TreatmentDetail {
            summary: with_current_week(summary, Utc::now().date_naive()),
            milestones,
        })
    }

    /// # Errors
    ///
    /// Returns `TreatmentError::Invalid` for a blank name, a duration outside
    /// 1 to 104 weeks or too many milestones.
    #[instrument(skip(self, request), fields(%user_id))]
    pub async fn create(
        &self,
        user_id: UserId,
        request: &CreateTreatmentRequest,
    ) -> Result<TreatmentDetail, TreatmentError> {
        validate(request)?;
        let milestones = plan_milestones(request.milestones.as_deref(), request.duration_weeks);
        let id = self
            .treatments()
            .create(
                user_id,
                request.name.trim(),
                request.start_date,
                request.duration_weeks,
                &milestones,
            )
            .await?;
        info!(treatment_id = %id, "Treatment created");
        self.get(id, user_id).await
    }

    /// Apply a progress update.
    ///
    /// Completing a milestone without an explicit `progress_percent` sets
    /// progress from the share of completed milestones. Marking the plan
    /// completed without one sets it to 100.
    ///
    /// # Errors
    ///
    /// Returns `TreatmentError::NotFound` for an unknown treatment or a
    /// milestone of another plan, and `TreatmentError::Invalid` for progress
    /// outside 0 to 100.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: TreatmentId,
        user_id: UserId,
        update: &UpdateTreatmentRequest,
    ) -> Result<TreatmentDetail, TreatmentError> {
        if update.progress_percent.is_some_and(|p| !(0..=100).contains(&p)) {
            return Err(TreatmentError::Invalid(
                "progress_percent must be between 0 and 100".to_owned(),
            ));
        }
        let repo = self.treatments();
        repo.get(id, user_id)
            .await?
            .ok_or(TreatmentError::NotFound("treatment"))?;

        let mut progress = update.progress_percent;
        if let Some(milestone_id) = update.complete_milestone_id {
            repo.complete_milestone(id, milestone_id)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => TreatmentError::NotFound("milestone"),
                    other => other.into(),
                })?;
            info!(%milestone_id, "Milestone completed");
            if progress.is_none() {
                let milestones = repo.milestones(id).await?;
                let done = milestones.iter().filter(|m| m.completed).count();
                progress = Some(milestone_progress(
                    i64::try_from(done).unwrap_or(i64::MAX),
                    i64::try_from(milestones.len()).unwrap_or(i64::MAX),
                ));
            }
        }
        if progress.is_none() && update.status == Some(TreatmentStatus::Completed) {
            progress = Some(100);
        }

        repo.update(id, user_id, progress, update.status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => TreatmentError::NotFound("treatment"),
                other => other.into(),
            })?;
        self.get(id, user_id).await
    }

    /// # Errors
    ///
    /// Returns `TreatmentError::NotFound` unless the user owns the treatment.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: TreatmentId, user_id: UserId) -> Result<(), TreatmentError> {
        self.treatments().delete(id, user_id).await.map_err(|e| match e {
            RepositoryError::NotFound => TreatmentError::NotFound("treatment"),
            other => other.into(),
        })?;
        info!("Treatment deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TreatmentError::NotFound` unless the user owns the treatment.
    pub async fn milestones(
        &self,
        id: TreatmentId,
        user_id: UserId,
    ) -> Result<Vec<Milestone>, TreatmentError> {
        Ok(self.get(id, user_id).await?.milestones)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(name: &str, duration_weeks: i32) -> CreateTreatmentRequest {
        CreateTreatmentRequest {
            name: name.to_owned(),
            start_date: date(2026, 1, 1),
            duration_weeks,
            milestones: None,
        }
    }

    #[test]
    fn test_current_week() {
        let start = date(2026, 1, 1);
        assert_eq!(current_week(start, 12, date(2025, 12, 31)), 0);
        assert_eq!(current_week(start, 12, start), 1);
        assert_eq!(current_week(start, 12, date(2026, 1, 7)), 1);
        assert_eq!(current_week(start, 12, date(2026, 1, 8)), 2);
        assert_eq!(current_week(start, 12, date(2027, 1, 1)), 12);
    }

    #[test]
    fn test_milestone_progress() {
        assert_eq!(milestone_progress(0, 0), 0);
        assert_eq!(milestone_progress(3, 6), 50);
        assert_eq!(milestone_progress(2, 3), 66);
        assert_eq!(milestone_progress(5, 5), 100);
    }

    #[test]
    fn test_default_plan() {
        let plan = plan_milestones(None, 12);
        let weeks: Vec<_> = plan.iter().map(|m| m.target_week).collect();
        assert_eq!(weeks, [1, 4, 6, 12]);
        assert_eq!(plan[0].title, "Initial Assessment");
        assert!(plan.iter().all(|m| !m.description.is_empty()));

        // Very short plans still start at week 1.
        assert!(plan_milestones(None, 1).iter().all(|m| m.target_week == 1));
    }

    #[test]
    fn test_custom_milestones_spread_evenly() {
        let titles = vec![
            "Purge phase".to_owned(),
            "  ".to_owned(),
            "Clearer skin".to_owned(),
            " Maintenance ".to_owned(),
        ];
        let plan = plan_milestones(Some(&titles), 8);
        let weeks: Vec<_> = plan.iter().map(|m| m.target_week).collect();
        assert_eq!(weeks, [3, 6, 8]);
        assert_eq!(plan[2].title, "Maintenance");

        // Blank-only lists fall back to the default plan.
        assert_eq!(plan_milestones(Some(&["".to_owned()]), 8).len(), DEFAULT_PLAN.len());
    }

    #[test]
    fn test_validate() {
        assert!(validate(&request("Acne Treatment Plan", 12)).is_ok());
        assert!(matches!(validate(&request("   ", 12)), Err(TreatmentError::Invalid(_))));
        assert!(validate(&request("Plan", 0)).is_err());
        assert!(validate(&request("Plan", MAX_DURATION_WEEKS + 1)).is_err());

        let mut many = request("Plan", 12);
        many.milestones = Some(vec!["step".to_owned(); MAX_MILESTONES + 1]);
        assert!(validate(&many).is_err());
    }
}
