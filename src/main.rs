//! Unified agent API server binary.
//!
//! Configuration comes from `UNIFIED_AGENT__*` environment variables (and a
//! `.env` file when present); see [`unified_agent::config`].
//!
//! # Environment Variables
//!
//! - `UNIFIED_AGENT__AI__OPENAI_API_KEY` - OpenAI API key (required for the openai provider)
//! - `UNIFIED_AGENT__AI__PROVIDER` - `openai` or `mock`
//! - `UNIFIED_AGENT__SERVER__PORT` - Listen port (default: 8080)
//! - `RUST_LOG` - Log filter, overrides `server.log_level`

use axum::http::HeaderValue;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unified_agent::adapters::agents::{HttpAgentClient, HttpAgentConfig};
use unified_agent::adapters::ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
use unified_agent::adapters::http::{api_router, AppState};
use unified_agent::adapters::storage::{InMemoryMessageStore, InMemorySessionStore};
use unified_agent::application::{ConsultationAgent, QueryRouter, WorkflowOrchestrator};
use unified_agent::config::{AiProvider, AppConfig, ServerConfig, SessionConfig};
use unified_agent::domain::conversation::{ConversationState, DomainKind};
use unified_agent::domain::routing::{AgentType, ConversationFlow};
use unified_agent::domain::workflow::HistoryEntry;
use unified_agent::ports::{AIProvider, AgentClient, MessageStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    let ai_provider = build_provider(&config);
    tracing::info!(
        provider = %ai_provider.provider_info().name,
        model = %ai_provider.provider_info().model,
        "AI provider ready"
    );

    let stores = Stores::new(&config.session);
    let messages: Arc<dyn MessageStore> = Arc::new(InMemoryMessageStore::new());

    let router = QueryRouter::new(
        Arc::clone(&ai_provider),
        stores.flows.clone(),
        config.router_settings(),
    );
    let mut orchestrator = WorkflowOrchestrator::new(
        Arc::new(router),
        stores.history.clone(),
        config.workflow_settings(),
    );
    for agent in AgentType::routable() {
        let Some(settings) = config.agents.get(agent) else {
            continue;
        };
        let client = build_agent(&config, agent, &ai_provider, &stores, &messages);
        orchestrator =
            orchestrator.with_agent_settings(client, settings.enabled, settings.confidence_threshold);
    }

    spawn_sweeper(stores.clone(), config.session.sweep_interval());

    let app = api_router(AppState::new(Arc::new(orchestrator)))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    tracing::info!(%addr, environment = ?config.server.environment, "starting unified agent API");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.features.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_provider(config: &AppConfig) -> Arc<dyn AIProvider> {
    match (&config.ai.provider, &config.ai.openai_api_key) {
        (AiProvider::OpenAI, Some(key)) => {
            let openai = OpenAIConfig::new(key.expose_secret().clone())
                .with_model(config.ai.model.as_str())
                .with_base_url(config.ai.base_url.as_str())
                .with_timeout(config.ai.timeout())
                .with_max_retries(config.ai.max_retries)
                .with_temperature(config.ai.temperature);
            Arc::new(OpenAIProvider::new(openai))
        }
        _ => {
            tracing::warn!("using the mock AI provider; replies are canned");
            Arc::new(MockAIProvider::new())
        }
    }
}

/// Per-conversation stores shared by the router, orchestrator and agents.
#[derive(Clone)]
struct Stores {
    /// One consultation store per domain; both key on the conversation id.
    states: BTreeMap<DomainKind, Arc<InMemorySessionStore<ConversationState>>>,
    flows: Arc<InMemorySessionStore<ConversationFlow>>,
    history: Arc<InMemorySessionStore<Vec<HistoryEntry>>>,
}

impl Stores {
    fn new(config: &SessionConfig) -> Self {
        let idle = config.idle_timeout();
        Self {
            states: [DomainKind::Marketing, DomainKind::CustomerService]
                .into_iter()
                .map(|domain| {
                    let store = Arc::new(InMemorySessionStore::new(config.max_sessions, idle));
                    (domain, store)
                })
                .collect(),
            flows: Arc::new(InMemorySessionStore::new(config.max_sessions, idle)),
            history: Arc::new(InMemorySessionStore::new(config.max_sessions, idle)),
        }
    }
}

fn build_agent(
    config: &AppConfig,
    agent: AgentType,
    ai_provider: &Arc<dyn AIProvider>,
    stores: &Stores,
    messages: &Arc<dyn MessageStore>,
) -> Arc<dyn AgentClient> {
    let local_domain = agent
        .consultation_domain()
        .filter(|_| config.features.local_consultation);
    if let Some(domain) = local_domain {
        tracing::info!(agent = %agent, "serving agent in-process");
        let states: Arc<dyn SessionStore<ConversationState>> = match stores.states.get(&domain) {
            Some(store) => store.clone(),
            None => Arc::new(InMemorySessionStore::new(
                config.session.max_sessions,
                config.session.idle_timeout(),
            )),
        };
        let idle_minutes = i64::try_from(config.session.idle_timeout_minutes).unwrap_or(i64::MAX);
        return Arc::new(
            ConsultationAgent::new(domain, Arc::clone(ai_provider), states, Arc::clone(messages))
                .with_idle_minutes(idle_minutes),
        );
    }

    let endpoint = config.agents.endpoint(agent);
    let settings = config.agents.get(agent).cloned().unwrap_or_default();
    tracing::info!(agent = %agent, %endpoint, "using remote agent");
    Arc::new(HttpAgentClient::new(
        HttpAgentConfig::new(agent, endpoint)
            .with_timeout(settings.timeout())
            .with_enabled(settings.enabled),
    ))
}

fn spawn_sweeper(stores: Stores, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let mut states = 0;
            for store in stores.states.values() {
                states += store.purge_expired().await;
            }
            let flows = stores.flows.purge_expired().await;
            let history = stores.history.purge_expired().await;
            if states + flows + history > 0 {
                tracing::info!(states, flows, history, "purged idle conversations");
            }
        }
    });
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
