use crate::config::Config;
use crate::errors::Result;
use crate::repository::LeadRepository;
use crate::services::LeadService;

/// Entry point bundling the configuration, the lead repository and the lead service.
///
/// ```no_run
/// # async fn run() -> rust_nocrm_api::errors::Result<()> {
/// use rust_nocrm_api::{Lead, NoCrmClient};
///
/// let client = NoCrmClient::new("api-key", "acme")?;
/// let created = client.leads().create_lead(&Lead::new("New opportunity", "new")).await?;
/// println!("{:?}", created.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NoCrmClient {
    config: Config,
    leads: LeadService,
}

impl NoCrmClient {
    pub fn new(api_key: impl Into<String>, subdomain: impl Into<String>) -> Result<Self> {
        Ok(Self::from_config(Config::new(api_key, subdomain)?))
    }

    pub fn from_config(config: Config) -> Self {
        let repository = LeadRepository::new(config.clone());
        Self {
            config,
            leads: LeadService::new(repository),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn leads(&self) -> &LeadService {
        &self.leads
    }

    pub fn repository(&self) -> &LeadRepository {
        self.leads.repository()
    }
}
