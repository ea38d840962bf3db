use crate::domain::ContainerHealthStatus;
use crate::services::ContainerService;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    Unhealthy,
    TimedOut,
    /// Probe never answered; the caller proceeds anyway
    AssumedReady,
}

impl HealthOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Healthy | Self::AssumedReady)
    }
}

impl fmt::Display for HealthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::TimedOut => "timed out",
            Self::AssumedReady => "assumed ready",
        };
        f.write_str(label)
    }
}

/// Polls a container until it reports healthy, unhealthy or the timeout
/// elapses. MongoDB images ship without a healthcheck, so they are probed
/// with a mongosh ping instead.
pub struct HealthWaiter {
    containers: Arc<ContainerService>,
    interval: Duration,
}

fn uses_ping_probe(service: &str) -> bool {
    matches!(service, "mongodb" | "mongo")
}

impl HealthWaiter {
    pub fn new(containers: Arc<ContainerService>, interval: Duration) -> Self {
        Self {
            containers,
            interval,
        }
    }

    pub fn wait_healthy(&self, service: &str, timeout: Duration) -> Result<HealthOutcome> {
        info!("⏳ Aguardando {service} ficar saudável...");

        let outcome = if uses_ping_probe(service) {
            self.wait_ping(service, timeout)?
        } else {
            self.wait_health_status(service, timeout)?
        };

        match outcome {
            HealthOutcome::Healthy => info!("✅ {service} está saudável"),
            HealthOutcome::AssumedReady => {
                warn!("⚠️  {service} não respondeu ao ping em {timeout:?}; prosseguindo")
            }
            HealthOutcome::Unhealthy => warn!("❌ {service} reportou unhealthy"),
            HealthOutcome::TimedOut => {
                warn!("⚠️  {service} não ficou saudável em {timeout:?}")
            }
        }

        Ok(outcome)
    }

    fn wait_health_status(&self, service: &str, timeout: Duration) -> Result<HealthOutcome> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.containers.get_health_status(service)? {
                ContainerHealthStatus::Healthy => return Ok(HealthOutcome::Healthy),
                ContainerHealthStatus::Unhealthy => return Ok(HealthOutcome::Unhealthy),
                ContainerHealthStatus::NotApplicable => {
                    debug!("{service} sem healthcheck configurado");
                    return Ok(HealthOutcome::Healthy);
                }
                ContainerHealthStatus::Starting | ContainerHealthStatus::Unknown => {
                    debug!("{service} ainda iniciando...");
                }
            }

            if !self.pause_until(deadline) {
                return Ok(HealthOutcome::TimedOut);
            }
        }
    }

    fn wait_ping(&self, service: &str, timeout: Duration) -> Result<HealthOutcome> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.containers.ping_mongo(service)? {
                return Ok(HealthOutcome::Healthy);
            }

            if !self.pause_until(deadline) {
                return Ok(HealthOutcome::AssumedReady);
            }
        }
    }

    /// Sleeps one interval, capped at the deadline; false once it has passed
    fn pause_until(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(self.interval.min(deadline - now));
        true
    }
}
