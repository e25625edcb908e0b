/**
 * shoot-chat - headless chat client
 *
 * Opens one chat room and bridges it to the terminal: stdin lines are sent
 * as messages, the visible message list is printed whenever it changes.
 *
 * Usage: shoot-chat <room_id> <user_id>
 *
 * Environment:
 *   SHOOT_CONFIG  optional TOML config file
 *   SHOOT_TOKEN   access token (otherwise the stored one is used)
 *   SHOOT_API_URL / SHOOT_WS_URL / SHOOT_DB_PATH  config overrides
 *
 * Commands: /retry, /reconnect, /search <query>, /sync, /quit
 */
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::{LinesStream, WatchStream};
use tokio_stream::StreamExt;

use shoot_client::client::api::ApiClient;
use shoot_client::client::auth::TokenManager;
use shoot_client::client::chat::{ChatDeps, ChatSession, SearchState};
use shoot_client::client::offline::{OfflineMessageQueue, ProcessOutcome};
use shoot_client::client::store::{DurableStore, SqliteStore};
use shoot_client::client::sync::{SyncManager, SyncOutcome};
use shoot_client::client::transport::{StompConnection, TungsteniteConnector};
use shoot_client::client::Config;
use shoot_client::logging;
use shoot_client::shared::config::AppConfig;
use shoot_client::shared::message::Message;

fn parse_args() -> Option<(i64, i64)> {
    let mut args = std::env::args().skip(1);
    let room_id = args.next()?.parse().ok()?;
    let user_id = args.next()?.parse().ok()?;
    Some((room_id, user_id))
}

fn render(message: &Message) -> String {
    format!(
        "[{}] {}: {} ({:?})",
        message.created_at.format("%H:%M:%S"),
        message.sender_id,
        message.content.text,
        message.status
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let Some((room_id, user_id)) = parse_args() else {
        eprintln!("Usage: shoot-chat <room_id> <user_id>");
        std::process::exit(2);
    };

    let config_path = std::env::var_os("SHOOT_CONFIG").map(PathBuf::from);
    let config = Config::from_app(AppConfig::load(config_path.as_deref())?)?;

    let store: Arc<dyn DurableStore> = Arc::new(SqliteStore::open(&config.database_path()).await?);
    let tokens = Arc::new(TokenManager::open(store.clone()).await?);
    if let Ok(token) = std::env::var("SHOOT_TOKEN") {
        tokens.save_access_token(&token).await?;
    }

    let api = Arc::new(ApiClient::new(config.clone(), tokens.clone(), store.clone())?);
    let queue = Arc::new(OfflineMessageQueue::open(store.clone(), config.app().retry).await?);
    let connection = Arc::new(StompConnection::from_config(&config, Arc::new(TungsteniteConnector)));
    let sync = Arc::new(SyncManager::open(api.clone(), store.clone(), config.app().retry).await?);
    let _periodic = config.app().sync_interval.map(|interval| sync.spawn_periodic(interval));

    let deps = ChatDeps {
        config: config.clone(),
        connection,
        api,
        queue,
        tokens,
    };
    let session = ChatSession::open(deps, room_id, user_id).await?;

    let mut updates = WatchStream::new(session.watch_messages());
    let printer = tokio::spawn(async move {
        while let Some(messages) = updates.next().await {
            println!("--- room {} ({} messages)", room_id, messages.len());
            for message in &messages {
                println!("{}", render(message));
            }
        }
    });

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        let line = line.trim();
        match line {
            "/quit" => break,
            "/retry" => match session.retry_failed().await {
                Ok(count) => println!("retried {count} messages"),
                Err(e) => eprintln!("retry failed: {}", e.user_message()),
            },
            "/reconnect" => match session.reconnect().await {
                Ok(ProcessOutcome::Completed(summary)) => {
                    println!("reconnected, {} queued messages delivered", summary.delivered)
                }
                Ok(ProcessOutcome::AlreadyRunning) => println!("reconnected, queue flush already running"),
                Err(e) => eprintln!("reconnect failed: {}", e.user_message()),
            },
            "/sync" => match sync.sync_all().await {
                Ok(SyncOutcome::Completed(report)) => {
                    println!("sync: {} pulled, {} deferred", report.synced.len(), report.deferred.len());
                    if let Some(error) = report.error_message() {
                        eprintln!("sync errors: {error}");
                    }
                }
                Ok(SyncOutcome::AlreadyRunning) => println!("sync already running"),
                Err(e) => eprintln!("sync failed: {}", e.user_message()),
            },
            _ if line.starts_with("/search") => {
                let query = line.trim_start_matches("/search").trim();
                session.enter_search_mode();
                if let Err(e) = session.update_search_query(query).await {
                    eprintln!("search failed: {}", e.user_message());
                    continue;
                }
                let view = session.search();
                if let SearchState::Results(count) = view.state {
                    println!("--- {count} results for '{}'", view.query);
                    for message in &view.results {
                        println!("{}", render(message));
                    }
                }
                session.exit_search_mode();
            }
            _ => {
                session.send_message(line).await?;
                if let Some(error) = session.error() {
                    eprintln!("send failed: {error}");
                    session.clear_error();
                }
            }
        }
    }

    session.close().await;
    printer.abort();
    Ok(())
}
