//! # Main Entry Point
//!
//! Loads the state file, sets up logging, logs in to Matrix and runs the
//! reactor:
//! - Domain: Rules, Types, Traits
//! - Application: State, Grounding, Matcher, Selector, Formatter, Dispatcher
//! - Infrastructure: Matrix transport, Pacing
//!

mod application;
mod domain;
mod infrastructure;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use matrix_sdk::{
    Client,
    config::SyncSettings,
    room::Room,
    ruma::{
        RoomOrAliasId,
        events::room::{
            member::{MembershipState, StrippedRoomMemberEvent},
            message::{MessageType, SyncRoomMessageEvent},
        },
    },
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use crate::application::dispatcher::Dispatcher;
use crate::application::state::StateStore;
use crate::domain::types::MessageEvent;
use crate::infrastructure::matrix::MatrixTransport;
use crate::infrastructure::pacing::TokioPacer;
use crate::strings::logs;

#[derive(Parser, Debug)]
#[command(name = "dadbot", version, about = "Rule-driven chat responder")]
struct Args {
    /// Homeserver URL (defaults to the one in the state file)
    #[arg(long)]
    server: Option<String>,

    /// Display name for the bot (defaults to the active persona's name)
    #[arg(long)]
    nick: Option<String>,

    /// State file holding rules, counters and settings (.json, .yaml or .yml)
    #[arg(long, default_value = "conf.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load State
    let store = StateStore::new(&args.config);
    let mut state = store
        .load()
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(server) = args.server {
        state.matrix.homeserver = server;
    }
    if let Some(nick) = args.nick {
        state.names.set_name(state.persona, nick);
    }

    // 2. Logging Setup
    let _guard = init_tracing(state.debug)?;
    tracing::info!(
        "{}",
        logs::config_loaded(
            &store.path().display().to_string(),
            &state.persona.to_string(),
            state.active_name()
        )
    );
    for (scope, pattern) in state.rules.unselectable() {
        tracing::warn!("Rule `{}` in {} rules has no responses and will be skipped", pattern, scope);
    }

    // 3. Matrix Setup
    let client = Client::builder()
        .homeserver_url(&state.matrix.homeserver)
        .build()
        .await?;

    client
        .matrix_auth()
        .login_username(&state.matrix.username, &state.matrix.password)
        .initial_device_display_name(state.active_name())
        .send()
        .await
        .context("Matrix login failed")?;

    let own_user_id = client.user_id().map(|u| u.to_owned());
    if let Some(user_id) = &own_user_id {
        tracing::info!("{}", logs::logged_in(user_id.as_str()));
        state.own_identity = Some(user_id.to_string());
    }

    tracing::info!("{}", logs::setting_display_name(state.active_name()));
    if let Err(e) = client
        .account()
        .set_display_name(Some(state.active_name()))
        .await
    {
        tracing::warn!("{}", logs::set_display_name_fail(&e.to_string()));
    }

    for channel in &state.channels {
        tracing::info!("{}", logs::channel_joining(channel));
        let target = match <&RoomOrAliasId>::try_from(channel.as_str()) {
            Ok(target) => target,
            Err(e) => {
                tracing::error!("{}", logs::channel_join_fail(channel, &e.to_string()));
                continue;
            }
        };
        match client.join_room_by_id_or_alias(target, &[]).await {
            Ok(_) => tracing::info!("{}", logs::channel_join_success(channel)),
            Err(e) => tracing::error!("{}", logs::channel_join_fail(channel, &e.to_string())),
        }
    }

    // 4. Reactor: one task owns the dispatcher and handles messages in order
    let (tx, mut rx) = mpsc::unbounded_channel::<MessageEvent>();
    let transport = Arc::new(MatrixTransport::new(client.clone()));
    let mut dispatcher = Dispatcher::new(state, store, transport, Arc::new(TokioPacer));

    let reactor = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let from = event.from.clone();
            match dispatcher.on_message(event).await {
                Ok(true) => tracing::debug!("Replied to {}", from),
                Ok(false) => {}
                Err(e) => tracing::error!("{}", logs::dispatch_fail(&from, &format!("{e:#}"))),
            }
        }
    });

    // 5. Event Handlers
    let start_time = std::time::SystemTime::now();
    client.add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
        let tx = tx.clone();
        async move {
            let Some(original_msg) = ev.as_original() else {
                return;
            };

            // Ignore history delivered by the first sync
            let ts = ev.origin_server_ts();
            let event_time =
                std::time::UNIX_EPOCH + std::time::Duration::from_millis(ts.get().into());
            if event_time < start_time {
                return;
            }
            if original_msg.sender == room.own_user_id() {
                return;
            }

            if let MessageType::Text(text_content) = &original_msg.content.msgtype {
                tracing::info!(
                    "Received message from {} in {}: {}",
                    original_msg.sender,
                    room.room_id(),
                    text_content.body
                );
                let event = MessageEvent::new(
                    original_msg.sender.as_str(),
                    room.room_id().as_str(),
                    text_content.body.as_str(),
                );
                if tx.send(event).is_err() {
                    tracing::error!("Reactor stopped; dropping message");
                }
            }
        }
    });

    client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
        if ev.content.membership == MembershipState::Invite {
            tracing::info!("{}", logs::invite_received(room.room_id().as_str()));
            match room.join().await {
                Ok(_) => tracing::info!("{}", logs::JOIN_INVITE_SUCCESS),
                Err(e) => tracing::error!("{}", logs::join_invite_fail(&e.to_string())),
            }
        }
    });

    // 6. Sync until disconnect or Ctrl-C
    tracing::info!("{}", logs::SYNC_LOOP_START);
    tokio::select! {
        res = client.sync(SyncSettings::default()) => {
            if let Err(e) = res {
                tracing::error!("{}", logs::sync_loop_fail(&e.to_string()));
            }
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    reactor.abort();
    tracing::info!("{}", logs::SHUTDOWN);
    Ok(())
}

/// Console plus `data/session.log`. `RUST_LOG` wins over the state file's
/// `debug` flag.
fn init_tracing(debug: bool) -> Result<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    if !std::path::Path::new("data").exists() {
        fs::create_dir("data").context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = std::path::Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{default_level},matrix_sdk=warn,matrix_sdk_base=warn,matrix_sdk_crypto=error,ruma=warn,hyper=warn"
        ))
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}
