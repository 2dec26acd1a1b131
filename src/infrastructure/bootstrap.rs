//! Composition root: wires adapters into the application and runs it.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::inbound::http::{health_router, serve};
use crate::adapter::inbound::telegram::{
    build_dispatcher, register_bot_commands, webhook_listener,
};
use crate::adapter::outbound::mudrex::MudrexConnector;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::sqlite::store::SqliteStore;
use crate::adapter::outbound::telegram::TelegramMessenger;
use crate::application::bot::SignalBot;
use crate::error::{Error, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::health::HealthChecker;
use crate::port::inbound::chat::MessageHandler;
use crate::port::outbound::exchange::ExchangeConnector;
use crate::port::outbound::messenger::Messenger;
use crate::port::outbound::store::Store;

/// Open the database, run migrations, and build the encrypted store.
pub fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = create_pool(&config.database.path)?;
    run_migrations(&pool)?;
    info!(path = %config.database.path, "Database ready");
    Ok(Arc::new(SqliteStore::new(pool, config.cipher()?)))
}

/// Build the message handler from its ports.
pub fn build_bot(
    config: &Config,
    store: Arc<dyn Store>,
    connector: Arc<dyn ExchangeConnector>,
    messenger: Arc<dyn Messenger>,
) -> Result<Arc<SignalBot>> {
    Ok(Arc::new(SignalBot::new(
        config.bot_settings()?,
        store,
        connector,
        messenger,
    )))
}

/// Run the bot until ctrl-c or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let bot = Bot::new(&config.telegram.bot_token);

    let connector: Arc<dyn ExchangeConnector> =
        Arc::new(MudrexConnector::from_config(&config.exchange));
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let handler: Arc<dyn MessageHandler> =
        build_bot(&config, store.clone(), connector, messenger)?;
    let health = Arc::new(HealthChecker::new(
        store,
        &config.telegram.bot_token,
        config.telegram.signal_channel_id,
    ));

    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "Failed to register bot commands with Telegram");
    }

    let addr = config.server.socket_addr()?;
    let tcp = TcpListener::bind(addr).await?;
    let mut dispatcher = build_dispatcher(bot.clone(), handler);
    let dispatcher_token = dispatcher.shutdown_token();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
        // The dispatcher rejects shutdown until it is running.
        loop {
            match dispatcher_token.shutdown() {
                Ok(done) => {
                    done.await;
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    });

    let mut http_shutdown = shutdown_rx;
    let http_stop = async move {
        let _ = http_shutdown.changed().await;
    };

    match config.telegram.full_webhook_url() {
        Some(url) => {
            let (listener, webhook_routes) = webhook_listener(bot, addr, &url).await?;
            let router = health_router(health).merge(webhook_routes);
            let http = tokio::spawn(serve(tcp, router, http_stop));
            info!("Receiving Telegram updates by webhook");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Telegram webhook listener error"),
                )
                .await;
            join_http(http).await
        }
        None => {
            let http = tokio::spawn(serve(tcp, health_router(health), http_stop));
            info!("Receiving Telegram updates by long polling");
            dispatcher.dispatch().await;
            join_http(http).await
        }
    }
}

async fn join_http(handle: tokio::task::JoinHandle<Result<()>>) -> Result<()> {
    handle
        .await
        .map_err(|e| Error::Connection(format!("HTTP server task failed: {e}")))?
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            tracing::error!(error = %e, "ctrl-c signal handler failed");
        }
    }
}
