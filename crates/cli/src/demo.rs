//! Loopback demo session.
//!
//! Runs a server engine and two client engines (a player and a silent
//! observer) over the in-memory hub. Stdin lines starting with the prefix
//! become commands; anything else is chat, which the server relays to the
//! observer. Both clients' displays are printed, so relays are visible.

use std::time::Duration;

use anyhow::Result;
use herald_config::SettingsStore;
use herald_core::command::{CommandContext, CommandHandler, CommandOutput, CommandSide};
use herald_core::error::CommandError;
use herald_core::message::{ConnectionId, MessageFlags, MessageStatus};
use herald_core::world::{ConnectionTrust, WorldView};
use herald_dispatch::{DispatchEngine, HelpCommand};
use herald_transport::MemoryHub;
use tokio::io::AsyncBufReadExt;

const SERVER: ConnectionId = ConnectionId(0);
const PLAYER: ConnectionId = ConnectionId(1);
const OBSERVER: ConnectionId = ConnectionId(2);

struct DemoWorld;

impl WorldView for DemoWorld {
    fn connection_trust(&self, conn: ConnectionId) -> Option<ConnectionTrust> {
        (conn == PLAYER || conn == OBSERVER).then_some(ConnectionTrust {
            admin_level: 1,
            guest_mode: false,
        })
    }

    fn display_name(&self, conn: ConnectionId) -> String {
        match conn {
            PLAYER => "Player".into(),
            OBSERVER => "Observer".into(),
            _ => conn.to_string(),
        }
    }
}

/// `/echo` — repeats its arguments back.
#[derive(Default)]
struct EchoCommand;

impl CommandHandler for EchoCommand {
    fn triggers(&self) -> &[&str] {
        &["echo"]
    }
    fn side(&self) -> CommandSide {
        CommandSide::Server
    }
    fn description(&self) -> &str {
        "Repeat the given text back"
    }
    fn usage(&self) -> &str {
        "/echo <text>"
    }
    fn run(
        &self,
        ctx: &CommandContext<'_>,
    ) -> std::result::Result<Vec<CommandOutput>, CommandError> {
        if ctx.args.is_empty() {
            return Err(CommandError::InvalidArguments("nothing to echo".into()));
        }
        Ok(vec![CommandOutput::info(ctx.args.join(" "))])
    }
}

fn print_display(who: &str, engine: &mut DispatchEngine) {
    for msg in engine.take_display() {
        let tag = match msg.status {
            MessageStatus::Info => "info",
            MessageStatus::Warning => "warn",
            MessageStatus::Error => "error",
            MessageStatus::Hint => "hint",
            MessageStatus::None => "chat",
        };
        println!("[{who}/{tag}] {}", msg.text().unwrap_or_default());
    }
}

pub async fn run(prefix: char) -> Result<()> {
    let hub = MemoryHub::new();
    let mut server_tp = hub.endpoint(SERVER);
    let mut player_tp = hub.endpoint(PLAYER);
    let mut observer_tp = hub.endpoint(OBSERVER);

    let mut server = DispatchEngine::server(SettingsStore::in_memory()).with_prefix(prefix);
    let mut player = DispatchEngine::client(SettingsStore::in_memory()).with_prefix(prefix);
    let mut observer = DispatchEngine::client(SettingsStore::in_memory()).with_prefix(prefix);

    server.register_handler::<HelpCommand>("chat");
    server.register_handler::<EchoCommand>("demo");

    println!("Loopback session ready.");
    println!("Type {prefix}help for commands; plain text is chat; Ctrl-D quits.");

    let world = DemoWorld;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                server.pump(&world, &mut server_tp);
                player.pump(&world, &mut player_tp);
                observer.pump(&world, &mut observer_tp);
                print_display("player", &mut player);
                print_display("observer", &mut observer);
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) if line.starts_with(prefix) => {
                        player.send_command(
                            &mut player_tp,
                            SERVER,
                            &line,
                            MessageFlags::WANTS_HINTS,
                        )?;
                    }
                    Some(line) => {
                        player.send_chat(&mut player_tp, Some(SERVER), &line)?;
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}
