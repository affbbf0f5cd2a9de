use crate::config::DownstreamConfig;
use crate::entitlement::{BenefitStatusRequest, EntitlementPayload};
use crate::error::{MembershipError, MembershipResult};
use async_trait::async_trait;
use logger_redacted::redacted_warn;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Client side of the downstream benefit-management system.
///
/// Any acknowledged (2xx) call is `Ok`; everything else is an error and the
/// caller must leave local processing state untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenefitPublisher: Send + Sync {
    async fn publish(&self, payload: &EntitlementPayload) -> MembershipResult<()>;

    async fn suspend_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()>;

    async fn activate_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()>;

    async fn deactivate_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()>;
}

/// JSON-over-HTTP publisher
pub struct HttpBenefitPublisher {
    client: reqwest::Client,
    config: DownstreamConfig,
}

impl HttpBenefitPublisher {
    pub fn new(config: DownstreamConfig) -> MembershipResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> MembershipResult<()> {
        let url = self.config.url(path);
        debug!(url = %url, "Calling benefit service");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        redacted_warn!("Benefit service rejected call to {url} with {status}: {detail}");
        Err(MembershipError::Downstream(format!(
            "Benefit service returned {status} for {path}"
        )))
    }
}

#[async_trait]
impl BenefitPublisher for HttpBenefitPublisher {
    async fn publish(&self, payload: &EntitlementPayload) -> MembershipResult<()> {
        self.post(&self.config.create_benefit_path, payload).await?;
        info!(
            aggregate_id = %payload.aggregate_id,
            benefit_id = payload.benefit_id,
            beneficiaries = payload.beneficiaries.len(),
            "Entitlement published"
        );
        Ok(())
    }

    async fn suspend_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()> {
        self.post(&self.config.suspend_benefits_path, request).await
    }

    async fn activate_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()> {
        self.post(&self.config.activate_benefits_path, request).await
    }

    async fn deactivate_benefits(&self, request: &BenefitStatusRequest) -> MembershipResult<()> {
        self.post(&self.config.deactivate_benefits_path, request).await
    }
}
