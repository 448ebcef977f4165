use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tryouts_bot::config::BotConfig;
use tryouts_bot::dispatcher::Dispatcher;
use tryouts_bot::emitter::spawn_emitter;
use tryouts_bot::irc::spawn_transport;
use tryouts_bot::policy::TournamentPolicy;
use tryouts_bot::registry::SessionRegistry;
use tryouts_core::store::MappoolProvider;
use tryouts_sheets::{SheetsClient, SheetsConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Tryouts bot starting");

    let config = BotConfig::load();
    config.validate();

    let sheets = SheetsClient::new(SheetsConfig {
        spreadsheet_id: config.sheets.spreadsheet_id.clone(),
        mappool_range: config.sheets.mappool_range.clone(),
        lobbies_range: config.sheets.lobbies_range.clone(),
        scores_range: config.sheets.scores_range.clone(),
        players_range: config.sheets.players_range.clone(),
        token: config.sheets.token.clone().unwrap_or_default(),
    });

    let mappool = match sheets.get_mappool().await {
        Ok(pool) if !pool.is_empty() => pool,
        Ok(_) => {
            tracing::error!("Mappool sheet is empty");
            std::process::exit(1);
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to load the mappool");
            std::process::exit(1);
        },
    };
    tracing::info!(maps = mappool.len(), "Loaded the mappool");

    let (event_tx, mut event_rx) = mpsc::channel(config.limits.event_buffer);
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (wire_tx, wire_rx) = mpsc::channel(config.limits.event_buffer);

    spawn_transport(config.irc.clone(), event_tx, wire_rx);
    let emitter = spawn_emitter(
        queue_rx,
        wire_tx,
        Duration::from_millis(config.limits.send_interval_millis),
    );

    let registry = SessionRegistry::new(
        mappool,
        config.rules.clone(),
        config.messages.clone(),
        queue_tx.clone(),
    );
    let policy = TournamentPolicy::new(config.tournament.clone(), config.rules.max_plays);
    let mut dispatcher = Dispatcher::new(
        registry,
        policy,
        sheets,
        config.messages.clone(),
        queue_tx.clone(),
    );

    // One event is fully processed before the next is read; the registry
    // has a single writer.
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(event) => dispatcher.handle_event(event).await,
                    None => {
                        tracing::warn!("Event stream closed, shutting down");
                        dispatcher.shutdown();
                        break;
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, closing every active lobby");
                dispatcher.shutdown();
                break;
            }
        }
    }

    // Let the emitter flush the close commands before the process exits.
    drop(dispatcher);
    drop(queue_tx);
    if tokio::time::timeout(Duration::from_secs(30), emitter)
        .await
        .is_err()
    {
        tracing::warn!("Emitter did not drain in time");
    }
}
