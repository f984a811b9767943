//! End-to-end smoke run against a live NoCRM account.
//!
//! Requires `NOCRM_API_KEY`, `NOCRM_SUBDOMAIN` and `NOCRM_USER_ID`
//! (from the environment or `.env`). Creates a throwaway lead, walks it
//! through update, assignment and a status change, then deletes it.

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_nocrm_api::{Config, Lead, NoCrmClient, Repository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_nocrm_api=debug,lead_workflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let user_id: i64 = std::env::var("NOCRM_USER_ID")
        .context("NOCRM_USER_ID environment variable required")?
        .parse()
        .context("NOCRM_USER_ID must be a number")?;

    let client = NoCrmClient::from_config(config);
    let leads = client.leads();
    let repository = client.repository();

    let new_lead = Lead::new("Test Lead from Wrapper", "new")
        .with_contact_name("John Doe")
        .with_amount(1000.0)
        .with_description("Test lead creation")
        .with_expected_closing_date((Utc::now() + Duration::days(7)).fixed_offset());
    let created = leads.create_lead(&new_lead).await?;
    let id = created.id.context("created lead has no id")?;
    tracing::info!("✓ Lead created with id {}", id);

    let fetched = leads
        .get_lead(id)
        .await?
        .context("created lead could not be fetched")?;
    tracing::info!("✓ Lead fetched: {}", fetched.title);

    let changes = Lead::new("Updated Test Lead", fetched.status.clone())
        .with_contact_name("Jane Doe")
        .with_amount(2000.0)
        .with_description("Updated description");
    let updated = leads.update_lead(id, &changes).await?;
    tracing::info!("✓ Lead updated: {}", updated.title);

    let pipelines = repository.list_pipelines().await?;
    tracing::info!("✓ Pipelines available: {}", pipelines.len());

    let steps = repository.list_steps().await?;
    tracing::info!("✓ Steps available: {}", steps.len());

    repository.assign_lead(id, user_id).await?;
    tracing::info!("✓ Lead assigned to user {}", user_id);

    if let Some(step_name) = steps
        .first()
        .and_then(|step| step.get("name"))
        .and_then(|name| name.as_str())
    {
        let moved = repository.change_status(id, step_name).await?;
        tracing::info!("✓ Lead status is now '{}'", moved.status);
    }

    let status = leads.get_lead_pipeline_status(id).await?;
    tracing::info!(
        "✓ Pipeline status: step={:?} pipeline={:?}",
        status.current_step.as_ref().and_then(|s| s.get("name")),
        status.current_pipeline.as_ref().and_then(|p| p.get("name"))
    );

    let all = leads.list().await?;
    tracing::info!("✓ Leads found: {}", all.len());

    let deleted = repository.delete(id).await?;
    tracing::info!("✓ Test lead deleted: {}", deleted);

    Ok(())
}
