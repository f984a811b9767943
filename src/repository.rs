use crate::api_client::{ApiClient, Filters};
use crate::config::Config;
use crate::errors::{NoCrmError, Result};
use crate::models::{Lead, Record};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

/// Keys the API does not accept on a plain lead update.
pub const IMMUTABLE_ON_UPDATE: [&str; 3] = ["status", "step", "client_folder"];

/// CRUD contract shared by every remote entity repository.
///
/// The two 404 cases are part of the contract: `get` yields `None` and
/// `delete` yields `false`. Every other failure is returned unchanged.
#[async_trait]
pub trait Repository<T: Send + Sync>: Send + Sync {
    /// Creates the entity and returns the server's copy (with id and timestamps).
    async fn create(&self, entity: &T) -> Result<T>;
    /// Fetches an entity, or `None` if the API answers 404.
    async fn get(&self, id: i64) -> Result<Option<T>>;
    async fn update(&self, id: i64, entity: &T) -> Result<T>;
    /// Deletes an entity; `false` if the API answers 404.
    async fn delete(&self, id: i64) -> Result<bool>;
    /// Lists entities in server order, passing `filters` as query parameters.
    async fn list(&self, filters: &Filters) -> Result<Vec<T>>;
}

/// Repository for NoCRM leads plus the pipeline/step reference data.
#[derive(Debug, Clone)]
pub struct LeadRepository {
    client: ApiClient,
    endpoint: &'static str,
}

impl LeadRepository {
    pub fn new(config: Config) -> Self {
        Self {
            client: ApiClient::new(config),
            endpoint: "leads",
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Lists pipeline definitions as raw JSON objects.
    pub async fn list_pipelines(&self) -> Result<Vec<Record>> {
        tracing::info!("Listing pipelines");
        let response = self.client.request(Method::GET, "pipelines", None, None).await?;
        decode_records(response, "pipelines")
    }

    /// Lists pipeline step definitions as raw JSON objects.
    pub async fn list_steps(&self) -> Result<Vec<Record>> {
        tracing::info!("Listing steps");
        let response = self.client.request(Method::GET, "steps", None, None).await?;
        decode_records(response, "steps")
    }

    /// Assigns a lead to a user and returns the updated lead.
    pub async fn assign_lead(&self, id: i64, user_id: i64) -> Result<Lead> {
        tracing::info!("Assigning lead {} to user {}", id, user_id);
        let body = json!({ "user_id": user_id });
        let response = self
            .client
            .request(
                Method::POST,
                &format!("{}/{}/assign", self.endpoint, id),
                Some(&body),
                None,
            )
            .await?;
        Lead::from_value(response)
    }

    /// Moves a lead to another step, given its id or name.
    pub async fn change_status(&self, id: i64, step_id_or_name: &str) -> Result<Lead> {
        tracing::info!("Changing status of lead {} to '{}'", id, step_id_or_name);
        let body = json!({ "step": step_id_or_name });
        let response = self
            .client
            .request(Method::PUT, &self.lead_path(id), Some(&body), None)
            .await?;
        Lead::from_value(response)
    }

    fn lead_path(&self, id: i64) -> String {
        format!("{}/{}", self.endpoint, id)
    }
}

#[async_trait]
impl Repository<Lead> for LeadRepository {
    async fn create(&self, lead: &Lead) -> Result<Lead> {
        let body = Value::Object(lead.to_record()?);
        tracing::info!("Creating lead '{}'", lead.title);
        let response = self
            .client
            .request(Method::POST, self.endpoint, Some(&body), None)
            .await?;
        let created = Lead::from_value(response)?;
        tracing::info!("✓ Lead created: {:?}", created.id);
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Lead>> {
        match self
            .client
            .request(Method::GET, &self.lead_path(id), None, None)
            .await
        {
            Ok(response) => Lead::from_value(response).map(Some),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Lead {} not found", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: i64, lead: &Lead) -> Result<Lead> {
        let mut data = lead.to_record()?;
        data.retain(|key, _| !IMMUTABLE_ON_UPDATE.contains(&key.as_str()));
        tracing::info!("Updating lead {}", id);
        tracing::debug!("Update payload keys: {:?}", data.keys().collect::<Vec<_>>());

        let body = Value::Object(data);
        let response = self
            .client
            .request(Method::PUT, &self.lead_path(id), Some(&body), None)
            .await?;
        Lead::from_value(response)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        tracing::info!("Deleting lead {}", id);
        match self
            .client
            .request(Method::DELETE, &self.lead_path(id), None, None)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Lead {} not found, nothing deleted", id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Lead>> {
        tracing::info!("Listing leads");
        let params = (!filters.is_empty()).then_some(filters);
        let response = self
            .client
            .request(Method::GET, self.endpoint, None, params)
            .await?;

        match response {
            Value::Array(items) => items.into_iter().map(Lead::from_value).collect(),
            other => Err(NoCrmError::Decode(format!(
                "Expected a list of leads, got: {}",
                other
            ))),
        }
    }
}

/// Turns a JSON array of objects into records; anything else is a decode error.
fn decode_records(value: Value, what: &str) -> Result<Vec<Record>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(NoCrmError::Decode(format!(
                "Expected a list of {}, got: {}",
                what, other
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(NoCrmError::Decode(format!(
                "Expected {} entries to be objects, got: {}",
                what, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_records_accepts_array_of_objects() {
        let records = decode_records(
            json!([{"id": 1, "name": "Sales"}, {"id": 2, "name": "Support"}]),
            "pipelines",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], "Support");
    }

    #[test]
    fn test_decode_records_empty_array() {
        assert!(decode_records(json!([]), "steps").unwrap().is_empty());
    }

    #[test]
    fn test_decode_records_rejects_other_shapes() {
        assert!(matches!(
            decode_records(json!({"id": 1}), "steps"),
            Err(NoCrmError::Decode(_))
        ));
        assert!(matches!(
            decode_records(json!([1, 2]), "steps"),
            Err(NoCrmError::Decode(_))
        ));
    }

    #[test]
    fn test_lead_paths() {
        let repo = LeadRepository::new(Config::new("key", "acme").unwrap());
        assert_eq!(repo.lead_path(7), "leads/7");
    }
}
