//! NoCRM Lead API Client Library
//!
//! This library wraps the NoCRM REST API behind a repository/service layer:
//! typed leads are encoded to and decoded from JSON, requests are sent with
//! the account's API key, and business rules are checked before any remote
//! mutation.
//!
//! # Modules
//!
//! - `api_client`: Single-request HTTP executor and status mapping.
//! - `client`: `NoCrmClient` facade bundling config, repository and service.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `models`: The `Lead` entity and its JSON codec.
//! - `repository`: Generic repository contract and the lead repository.
//! - `services`: Lead validation and composite operations.

pub mod api_client;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod repository;
pub mod services;

pub use client::NoCrmClient;
pub use config::Config;
pub use errors::{NoCrmError, Result};
pub use models::{Lead, Record};
pub use repository::{LeadRepository, Repository};
pub use services::{LeadSearch, LeadService, PipelineStatus};
