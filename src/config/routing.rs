//! Backend routing configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::{AgentId, InstanceId};
use crate::domain::routing::BackendRoute;
use crate::domain::run::PollBudget;

/// Logical agent → backend instance routing
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Primary instance per logical agent id
    #[serde(default)]
    pub routes: HashMap<String, String>,

    /// Instance every bypassed or unknown agent is sent to
    #[serde(default = "default_fallback")]
    pub fallback_instance: String,

    /// API key overrides per instance id
    #[serde(default)]
    pub instance_keys: HashMap<String, String>,

    #[serde(default = "default_standard_attempts")]
    pub standard_max_attempts: u32,

    #[serde(default = "default_standard_timeout")]
    pub standard_timeout_secs: u64,

    #[serde(default = "default_reduced_attempts")]
    pub reduced_max_attempts: u32,

    #[serde(default = "default_reduced_timeout")]
    pub reduced_timeout_secs: u64,
}

impl RoutingConfig {
    /// Build the typed route table.
    pub fn backend_routes(&self) -> Result<Vec<BackendRoute>, ValidationError> {
        let fallback = InstanceId::new(self.fallback_instance.clone())
            .map_err(|_| ValidationError::MissingRequired("ROUTING__FALLBACK_INSTANCE"))?;

        let mut routes = Vec::with_capacity(self.routes.len());
        for (agent, primary) in &self.routes {
            let logical_agent_id = AgentId::new(agent.clone())
                .map_err(|_| ValidationError::InvalidAgentId(agent.clone()))?;
            let primary_instance_id = InstanceId::new(primary.clone())
                .map_err(|_| ValidationError::InvalidInstanceId(agent.clone()))?;
            routes.push(BackendRoute {
                logical_agent_id,
                primary_instance_id,
                fallback_instance_id: fallback.clone(),
            });
        }
        Ok(routes)
    }

    pub fn fallback_instance_id(&self) -> Result<InstanceId, ValidationError> {
        InstanceId::new(self.fallback_instance.clone())
            .map_err(|_| ValidationError::MissingRequired("ROUTING__FALLBACK_INSTANCE"))
    }

    pub fn standard_budget(&self) -> PollBudget {
        PollBudget::new(
            self.standard_max_attempts,
            Duration::from_secs(self.standard_timeout_secs),
        )
    }

    pub fn reduced_budget(&self) -> PollBudget {
        PollBudget::new(
            self.reduced_max_attempts,
            Duration::from_secs(self.reduced_timeout_secs),
        )
    }

    /// Validate routing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend_routes()?;
        if self.standard_max_attempts == 0 || self.reduced_max_attempts == 0 {
            return Err(ValidationError::InvalidPollBudget("max attempts must be positive"));
        }
        if self.standard_timeout_secs == 0 || self.reduced_timeout_secs == 0 {
            return Err(ValidationError::InvalidPollBudget("timeout must be positive"));
        }
        if self.reduced_max_attempts > self.standard_max_attempts
            || self.reduced_timeout_secs > self.standard_timeout_secs
        {
            return Err(ValidationError::InvalidPollBudget(
                "reduced budget exceeds standard budget",
            ));
        }
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            fallback_instance: default_fallback(),
            instance_keys: HashMap::new(),
            standard_max_attempts: default_standard_attempts(),
            standard_timeout_secs: default_standard_timeout(),
            reduced_max_attempts: default_reduced_attempts(),
            reduced_timeout_secs: default_reduced_timeout(),
        }
    }
}

fn default_fallback() -> String {
    "default".to_string()
}

fn default_standard_attempts() -> u32 {
    PollBudget::standard().max_attempts
}

fn default_standard_timeout() -> u64 {
    PollBudget::standard().global_timeout.as_secs()
}

fn default_reduced_attempts() -> u32 {
    PollBudget::reduced().max_attempts
}

fn default_reduced_timeout() -> u64 {
    PollBudget::reduced().global_timeout.as_secs()
}
