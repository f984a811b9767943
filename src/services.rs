use crate::api_client::Filters;
use crate::errors::{NoCrmError, Result};
use crate::models::{Lead, Record};
use crate::repository::{LeadRepository, Repository};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

/// Where a lead currently sits in its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStatus {
    pub lead: Lead,
    /// The step whose name matches the lead's status, if any.
    pub current_step: Option<Record>,
    /// The pipeline that step belongs to, if it could be found.
    pub current_pipeline: Option<Record>,
    /// Every step the account defines.
    pub available_steps: Vec<Record>,
}

/// Optional criteria for [`LeadService::search_leads`].
///
/// Only the criteria that are set become query filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadSearch {
    pub status: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub date_from: Option<DateTime<FixedOffset>>,
    pub date_to: Option<DateTime<FixedOffset>>,
}

impl LeadSearch {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            filters.insert("status".to_string(), status.to_string());
        }
        if let Some(min_amount) = self.min_amount {
            filters.insert("min_amount".to_string(), min_amount.to_string());
        }
        if let Some(max_amount) = self.max_amount {
            filters.insert("max_amount".to_string(), max_amount.to_string());
        }
        if let Some(date_from) = self.date_from {
            filters.insert("date_from".to_string(), date_from.to_rfc3339());
        }
        if let Some(date_to) = self.date_to {
            filters.insert("date_to".to_string(), date_to.to_rfc3339());
        }
        filters
    }
}

/// Business rules and composite operations on top of [`LeadRepository`].
#[derive(Debug, Clone)]
pub struct LeadService {
    repository: LeadRepository,
}

impl LeadService {
    pub fn new(repository: LeadRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &LeadRepository {
        &self.repository
    }

    /// Validates the lead, then creates it.
    ///
    /// # Errors
    ///
    /// * `NoCrmError::Validation` if a business rule fails; no request is sent.
    /// * Any transport error from the create call.
    pub async fn create_lead(&self, lead: &Lead) -> Result<Lead> {
        validate_lead(lead)?;
        self.repository.create(lead).await
    }

    /// Validates the lead, checks the target exists, then updates it.
    ///
    /// # Errors
    ///
    /// * `NoCrmError::Validation` if a rule fails or no lead has this id.
    /// * Any transport error from the lookup or the update.
    pub async fn update_lead(&self, id: i64, lead: &Lead) -> Result<Lead> {
        validate_lead(lead)?;
        if self.repository.get(id).await?.is_none() {
            return Err(NoCrmError::Validation(format!(
                "Lead with id {} not found",
                id
            )));
        }
        self.repository.update(id, lead).await
    }

    pub async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        self.repository.get(id).await
    }

    pub async fn delete_lead(&self, id: i64) -> Result<bool> {
        self.repository.delete(id).await
    }

    /// Assigns the lead to `user_id`, then moves it to `step_name`.
    ///
    /// The two calls are not atomic: if the status change fails, the
    /// assignment stays in place. Dropping the future between the calls has
    /// the same effect.
    pub async fn process_lead(&self, id: i64, user_id: i64, step_name: &str) -> Result<Lead> {
        self.repository.assign_lead(id, user_id).await?;
        self.repository.change_status(id, step_name).await
    }

    /// Fetches a lead along with its current step and pipeline.
    ///
    /// # Errors
    ///
    /// * `NoCrmError::Validation` if no lead has this id.
    /// * Any transport error from the three lookups.
    pub async fn get_lead_pipeline_status(&self, id: i64) -> Result<PipelineStatus> {
        let lead = self.repository.get(id).await?.ok_or_else(|| {
            NoCrmError::Validation(format!("Lead with id {} not found", id))
        })?;

        let pipelines = self.repository.list_pipelines().await?;
        let steps = self.repository.list_steps().await?;

        let current_step = steps
            .iter()
            .find(|step| step.get("name").and_then(Value::as_str) == Some(lead.status.as_str()))
            .cloned();

        let current_pipeline = current_step
            .as_ref()
            .and_then(|step| step.get("pipeline_id"))
            .and_then(|pipeline_id| {
                pipelines
                    .iter()
                    .find(|pipeline| pipeline.get("id") == Some(pipeline_id))
                    .cloned()
            });

        if current_step.is_none() {
            tracing::debug!("No step named '{}' for lead {}", lead.status, id);
        }

        Ok(PipelineStatus {
            lead,
            current_step,
            current_pipeline,
            available_steps: steps,
        })
    }

    /// Lists leads matching whichever criteria are set.
    pub async fn search_leads(&self, search: &LeadSearch) -> Result<Vec<Lead>> {
        let filters = search.to_filters();
        tracing::debug!("Searching leads with filters: {:?}", filters);
        self.repository.list(&filters).await
    }

    pub async fn list(&self) -> Result<Vec<Lead>> {
        self.repository.list(&Filters::new()).await
    }
}

/// Applies the lead business rules against the current time.
pub fn validate_lead(lead: &Lead) -> Result<()> {
    validate_lead_at(lead, Utc::now())
}

/// Applies the lead business rules, in order, stopping at the first failure.
///
/// 1. Title has at least 3 characters once trimmed.
/// 2. Amount, if set, is finite and not negative.
/// 3. Probability, if set, is within 0..=100.
/// 4. Expected closing date, if set, is not before `now`.
pub fn validate_lead_at(lead: &Lead, now: DateTime<Utc>) -> Result<()> {
    let rejection = if lead.title.trim().chars().count() < 3 {
        Some("Lead title is required and must be at least 3 characters")
    } else if lead.amount.is_some_and(|amount| !amount.is_finite()) {
        Some("Lead amount must be a finite number")
    } else if lead.amount.is_some_and(|amount| amount < 0.0) {
        Some("Lead amount cannot be negative")
    } else if lead
        .probability
        .is_some_and(|probability| !(0..=100).contains(&probability))
    {
        Some("Lead probability must be between 0 and 100")
    } else if lead
        .expected_closing_date
        .is_some_and(|date| date.with_timezone(&Utc) < now)
    {
        Some("Expected closing date cannot be in the past")
    } else {
        None
    };

    match rejection {
        Some(message) => {
            tracing::warn!("Lead '{}' rejected: {}", lead.title, message);
            Err(NoCrmError::Validation(message.to_string()))
        }
        None => Ok(()),
    }
}
