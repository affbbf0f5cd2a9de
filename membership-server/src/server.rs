use membership_service::{MembershipConfig, MembershipResult, MembershipService};
use std::sync::Arc;
use std::time::Instant;

/// Shared handler state
#[derive(Clone)]
pub struct MembershipServer {
    pub service: Arc<MembershipService>,
    started_at: Instant,
}

impl MembershipServer {
    pub fn new(service: MembershipService) -> Self {
        Self {
            service: Arc::new(service),
            started_at: Instant::now(),
        }
    }

    /// Wire the service from loaded configuration
    pub async fn from_config(config: &MembershipConfig) -> MembershipResult<Self> {
        Ok(Self::new(MembershipService::from_config(config).await?))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
