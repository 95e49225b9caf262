use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visage_ai::OpenAiCompatibleBackend;
use visage_bot::{BotConfig, Handler, Poller, StorageBackend, shutdown_signal};
use visage_conversation::Orchestrator;
use visage_history::{HistoryStore, InMemoryHistoryStore, PgHistoryStore};
use visage_telegram::TelegramClient;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        model = %config.completion.model,
        storage = ?config.storage.backend,
        "loaded configuration"
    );

    let pg_store = match config.storage.backend {
        StorageBackend::Postgres => {
            match PgHistoryStore::connect(
                config.database.connect_options(),
                config.database.max_connections,
                config.database.acquire_timeout(),
            )
            .await
            {
                Ok(store) => Some(store),
                Err(e) => {
                    error!(
                        error = %e,
                        host = %config.database.host,
                        port = config.database.port,
                        "failed to connect to database"
                    );
                    return ExitCode::FAILURE;
                }
            }
        }
        StorageBackend::Memory => None,
    };
    let store: Arc<dyn HistoryStore> = match &pg_store {
        Some(store) => Arc::new(store.clone()),
        None => Arc::new(InMemoryHistoryStore::new()),
    };

    info!("initializing history store");
    if let Err(e) = store.init().await {
        error!(error = %e, "failed to initialize history store");
        return ExitCode::FAILURE;
    }

    let backend = match OpenAiCompatibleBackend::new(&config.completion) {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "failed to create completion client");
            return ExitCode::FAILURE;
        }
    };
    if !backend.has_credential() {
        warn!("HF_TOKEN is not set; questions will be answered with the failure message");
    }

    let client = match TelegramClient::new(config.bot_api_token.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create telegram client");
            return ExitCode::FAILURE;
        }
    };
    match client.get_me().await {
        Ok(me) => info!(username = ?me.username, "connected to telegram"),
        Err(e) => {
            error!(error = %e, "failed to reach telegram");
            return ExitCode::FAILURE;
        }
    }

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        Arc::new(backend),
        config.orchestrator_config(),
    ));
    let handler = Arc::new(Handler::new(client.clone(), orchestrator));

    info!("virtual makeup artist bot started");
    Poller::new(client, handler, config.polling)
        .run(shutdown_signal())
        .await;

    if let Some(store) = pg_store {
        store.close().await;
    }
    info!("bot stopped");
    ExitCode::SUCCESS
}
