//! Agent Gateway server binary.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use agent_gateway::adapters::ai::{OpenAIAssistantsProvider, OpenAIChatProvider, OpenAIConfig};
use agent_gateway::adapters::auth::{OidcConfig, OidcSessionValidator, StaticTokenValidator};
use agent_gateway::adapters::cache::{InMemoryConversationCache, RedisConversationCache};
use agent_gateway::adapters::http::chat::DEFAULT_CHANNEL_CAPACITY;
use agent_gateway::adapters::http::{app_router, AuthState, ChatAppState};
use agent_gateway::application::{
    AgentSettingsResolver, AssistantChatHandler, CacheJanitor, HealthRouter, PerformanceCounters,
    StreamChatHandler,
};
use agent_gateway::config::{
    AppConfig, AuthMode, CacheBackend, ConfigError, ProviderConfig, ServerConfig,
};
use agent_gateway::domain::foundation::{AgentId, InstanceId};
use agent_gateway::ports::{AssistantRunsProvider, ChatStreamProvider, ConversationCache};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate().map_err(ConfigError::ValidationFailed)?;

    let addr = config.server.socket_addr()?;
    let validator = build_validator(&config)?;
    let cache = build_cache(&config).await?;

    let chat: Arc<dyn ChatStreamProvider> =
        Arc::new(OpenAIChatProvider::new(openai_config(&config.provider))?);
    let assistants: Arc<dyn AssistantRunsProvider> =
        Arc::new(OpenAIAssistantsProvider::new(openai_config(&config.provider))?);

    let router = Arc::new(build_router(&config)?);
    let settings = Arc::new(build_settings(&config)?);
    let counters = Arc::new(PerformanceCounters::new());

    let state = ChatAppState {
        stream_handler: Arc::new(StreamChatHandler::new(
            chat,
            router.clone(),
            settings.clone(),
            counters.clone(),
        )),
        assistant_handler: Arc::new(AssistantChatHandler::new(
            assistants,
            cache.clone(),
            router.clone(),
            settings,
            counters.clone(),
        )),
        counters,
        cache: cache.clone(),
        router,
        channel_capacity: DEFAULT_CHANNEL_CAPACITY,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor = CacheJanitor::new(cache, config.cache.cleanup_interval());
    let janitor_task = tokio::spawn(async move { janitor.run(shutdown_rx).await });

    let app = app_router(state, validator, cors_layer(&config.server));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        cache = ?config.cache.backend,
        auth = ?config.auth.mode,
        "agent gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = janitor_task.await {
        tracing::warn!(error = %e, "cache janitor ended abnormally");
    }
    tracing::info!("agent gateway stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = if server.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}

fn openai_config(provider: &ProviderConfig) -> OpenAIConfig {
    let config = OpenAIConfig::new()
        .with_base_url(provider.base_url.clone())
        .with_timeout(provider.timeout())
        .with_assistants_beta(provider.assistants_beta.clone());
    match &provider.api_key {
        Some(key) => config.with_api_key(key.clone()),
        None => config,
    }
}

fn build_validator(config: &AppConfig) -> Result<AuthState, BoxError> {
    let validator: AuthState = match config.auth.mode {
        AuthMode::Oidc => {
            let oidc = OidcConfig::new(config.auth.issuer.clone(), config.auth.audience.clone())
                .with_jwks_url(config.auth.jwks_url.clone())
                .with_cache_duration(config.auth.jwks_cache_ttl());
            Arc::new(OidcSessionValidator::new(oidc)?)
        }
        AuthMode::Static => {
            let validator = StaticTokenValidator::from_table(&config.auth.static_tokens);
            tracing::warn!(tokens = validator.len(), "using static development tokens");
            Arc::new(validator)
        }
    };
    Ok(validator)
}

async fn build_cache(config: &AppConfig) -> Result<Arc<dyn ConversationCache>, BoxError> {
    let policy = config.cache.policy();
    let cache: Arc<dyn ConversationCache> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(InMemoryConversationCache::new(policy)),
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .ok_or("cache.redis_url is required for the redis backend")?;
            let cache = RedisConversationCache::connect(url, policy)
                .await?
                .with_prefix(config.cache.key_prefix.clone());
            Arc::new(cache)
        }
    };
    Ok(cache)
}

fn build_router(config: &AppConfig) -> Result<HealthRouter, BoxError> {
    let routing = &config.routing;
    let mut router = HealthRouter::new(routing.backend_routes()?, routing.fallback_instance_id()?)
        .with_budgets(routing.standard_budget(), routing.reduced_budget());
    for (instance, key) in &routing.instance_keys {
        router = router.with_api_key(InstanceId::new(instance.clone())?, key.clone());
    }
    Ok(router)
}

fn build_settings(config: &AppConfig) -> Result<AgentSettingsResolver, BoxError> {
    let mut resolver = AgentSettingsResolver::new(config.agents.default.clone());
    for (agent, settings) in &config.agents.profiles {
        resolver = resolver.with_static(AgentId::new(agent.clone())?, settings.clone());
    }
    Ok(resolver)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
