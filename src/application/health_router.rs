//! Backend health router.
//!
//! Maps a logical agent to the concrete backend instance that should serve
//! it, steering traffic to a shared fallback instance while the primary is
//! failing. Health is tracked per instance for the process lifetime.

use std::collections::{BTreeMap, HashMap};

use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;

use crate::domain::foundation::{AgentId, InstanceId, Timestamp};
use crate::domain::routing::{BackendRoute, InstanceHealth};
use crate::domain::run::PollBudget;
use crate::ports::InstanceCredentials;

pub struct HealthRouter {
    routes: HashMap<AgentId, BackendRoute>,
    fallback: InstanceId,
    api_keys: HashMap<InstanceId, Secret<String>>,
    standard_budget: PollBudget,
    reduced_budget: PollBudget,
    health: RwLock<HashMap<InstanceId, InstanceHealth>>,
}

impl HealthRouter {
    pub fn new(routes: Vec<BackendRoute>, fallback: InstanceId) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.logical_agent_id.clone(), route))
                .collect(),
            fallback,
            api_keys: HashMap::new(),
            standard_budget: PollBudget::standard(),
            reduced_budget: PollBudget::reduced(),
            health: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_budgets(mut self, standard: PollBudget, reduced: PollBudget) -> Self {
        self.standard_budget = standard;
        self.reduced_budget = reduced;
        self
    }

    pub fn with_api_key(mut self, instance: InstanceId, key: impl Into<String>) -> Self {
        self.api_keys.insert(instance, Secret::new(key.into()));
        self
    }

    /// Primary unless it is unhealthy with enough failures, then the fallback.
    /// Unknown agents go straight to the fallback.
    pub async fn resolve_instance(&self, agent_id: &AgentId) -> InstanceId {
        let Some(route) = self.routes.get(agent_id) else {
            tracing::debug!(agent = %agent_id, fallback = %self.fallback, "no route for agent");
            return self.fallback.clone();
        };

        let health = self.health.read().await;
        let bypass = health
            .get(&route.primary_instance_id)
            .is_some_and(InstanceHealth::should_bypass);
        if bypass {
            tracing::warn!(
                agent = %agent_id,
                primary = %route.primary_instance_id,
                fallback = %route.fallback_instance_id,
                "primary instance unhealthy, routing to fallback"
            );
            route.fallback_instance_id.clone()
        } else {
            route.primary_instance_id.clone()
        }
    }

    pub fn credentials_for(&self, instance: &InstanceId) -> InstanceCredentials {
        let credentials = InstanceCredentials::new(instance.clone());
        match self.api_keys.get(instance) {
            Some(key) => credentials.with_api_key(key.expose_secret().clone()),
            None => credentials,
        }
    }

    pub async fn record_success(&self, instance: &InstanceId, response_time_ms: u64) {
        let mut health = self.health.write().await;
        let entry = health.entry(instance.clone()).or_default();
        let recovered = entry.is_degraded();
        entry.record_success(response_time_ms, Timestamp::now());
        if recovered {
            tracing::info!(
                instance = %instance,
                failures = entry.failure_count,
                "instance succeeded after failures"
            );
        }
    }

    pub async fn record_failure(&self, instance: &InstanceId) {
        let mut health = self.health.write().await;
        let entry = health.entry(instance.clone()).or_default();
        entry.record_failure(Timestamp::now());
        tracing::warn!(instance = %instance, failures = entry.failure_count, "instance failure recorded");
    }

    /// Reduced budget while the instance has outstanding failures.
    pub async fn optimized_poll_budget(&self, instance: &InstanceId) -> PollBudget {
        let degraded = self
            .health
            .read()
            .await
            .get(instance)
            .is_some_and(InstanceHealth::is_degraded);
        if degraded {
            self.reduced_budget
        } else {
            self.standard_budget
        }
    }

    pub async fn health_of(&self, instance: &InstanceId) -> InstanceHealth {
        self.health
            .read()
            .await
            .get(instance)
            .cloned()
            .unwrap_or_default()
    }

    /// Every instance seen so far, ordered by id.
    pub async fn snapshot(&self) -> BTreeMap<String, InstanceHealth> {
        self.health
            .read()
            .await
            .iter()
            .map(|(id, health)| (id.to_string(), health.clone()))
            .collect()
    }
}

impl std::fmt::Debug for HealthRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRouter")
            .field("routes", &self.routes.len())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}
