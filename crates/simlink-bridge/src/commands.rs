//! Built-in server console commands

use crate::headless::HeadlessHost;
use crate::host::SimulationHost;
use crate::lifecycle::LifecycleSender;
use crate::pause::PauseState;
use crate::runtime::ServerRuntime;
use simlink_console::CommandHandler;
use simlink_core::{Gamemode, Result, ShuffleMode, SimlinkError, Team};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Everything the built-in commands act on
#[derive(Clone)]
pub struct CommandContext {
    pub host: Arc<dyn SimulationHost>,
    pub runtime: Arc<ServerRuntime>,
    pub lifecycle: LifecycleSender,
    pub pause_state: watch::Receiver<PauseState>,
}

/// Register `status`, `say`, `pause`, `mode`, `shufflemode`, `nextmap` and
/// finally `help`, which lists every command registered up to that point.
pub fn register_server_commands(handler: &mut CommandHandler, ctx: CommandContext) -> Result<()> {
    let c = ctx.clone();
    handler.register("status", "", "Display server status.", move |_| {
        let map = c
            .host
            .current_map()
            .map(|m| m.plain_name())
            .unwrap_or_else(|| "none".to_string());
        let state = *c.pause_state.borrow();

        info!(
            "Status: {:?}, map {}, mode {}, shuffle {}",
            state,
            map,
            c.runtime.last_mode(),
            c.runtime.shuffle_mode()
        );
        if c.host.population() == 0 {
            info!("No players connected.");
        } else {
            info!(
                "Players: {} ({})",
                c.host.population(),
                c.host.player_names().join(", ")
            );
        }
        info!("Global rules: {}", c.runtime.global_rules());
        info!(
            "Bans: {}, admins: {}",
            c.runtime.banned().len(),
            c.runtime.admins().len()
        );
        Ok(())
    })?;

    let c = ctx.clone();
    handler.register(
        "say",
        "<message...>",
        "Send a message to all players.",
        move |args| {
            let message = args.join(" ");
            c.host.broadcast(&format!("[scarlet][[Server]:[] {}", message));
            info!("Server: {}", message);
            Ok(())
        },
    )?;

    let c = ctx.clone();
    handler.register(
        "pause",
        "<on/off>",
        "Pause or unpause the game.",
        move |args| {
            let paused = match args[0].as_str() {
                "on" => true,
                "off" => false,
                other => {
                    return Err(SimlinkError::Command(format!(
                        "Expected 'on' or 'off', got '{}'",
                        other
                    )));
                }
            };
            c.lifecycle.request_pause(paused);
            info!("{}", if paused { "Game paused." } else { "Game unpaused." });
            Ok(())
        },
    )?;

    let c = ctx.clone();
    handler.register(
        "mode",
        "[gamemode]",
        "Show or set the game mode used for the next map.",
        move |args| {
            let Some(name) = args.first() else {
                info!("Current mode: {}", c.runtime.last_mode());
                info!("Available modes: {}", join_names(Gamemode::ALL.iter()));
                return Ok(());
            };
            let mode: Gamemode = name.parse()?;
            c.runtime.set_last_mode(mode)?;
            info!("Game mode set to {}.", mode);
            Ok(())
        },
    )?;

    let c = ctx.clone();
    handler.register(
        "shufflemode",
        "[type]",
        "Show or set the map rotation type.",
        move |args| {
            let Some(name) = args.first() else {
                info!("Shuffle mode: {}", c.runtime.shuffle_mode());
                info!("Available types: {}", join_names(ShuffleMode::ALL.iter()));
                return Ok(());
            };
            let mode: ShuffleMode = name.parse()?;
            c.runtime.set_shuffle_mode(mode)?;
            c.host.set_shuffle_mode(mode);
            info!("Shuffle mode set to {}.", mode);
            Ok(())
        },
    )?;

    let c = ctx;
    handler.register(
        "nextmap",
        "<mapname...>",
        "Set the next map to be played after a game over.",
        move |args| {
            let name = args.join(" ");
            let map = c
                .host
                .find_map(&name)
                .ok_or_else(|| SimlinkError::Command(format!("No map with name '{}' found.", name)))?;
            info!("Next map set to {}.", map.plain_name());
            c.host.set_next_map_override(map);
            Ok(())
        },
    )?;

    let mut listing: Vec<String> = handler
        .commands()
        .iter()
        .map(|cmd| format!("{} - {}", cmd.usage(), cmd.description))
        .collect();
    listing.push("help - Display the command list.".to_string());
    handler.register("help", "", "Display the command list.", move |_| {
        info!("Commands:");
        for line in &listing {
            info!("  {}", line);
        }
        Ok(())
    })?;

    Ok(())
}

/// Register `join`, `leave`, `chat`, `runwave`, `gameover` and `newgame`,
/// which drive a [`HeadlessHost`] from the console. Register these before
/// [`register_server_commands`] so `help` lists them.
pub fn register_headless_commands(
    handler: &mut CommandHandler,
    host: Arc<HeadlessHost>,
    runtime: Arc<ServerRuntime>,
) -> Result<()> {
    let h = host.clone();
    handler.register("join", "<player...>", "Connect a simulated player.", move |args| {
        h.join(&args[0]);
        Ok(())
    })?;

    let h = host.clone();
    handler.register("leave", "<player...>", "Disconnect a simulated player.", move |args| {
        if h.leave(&args[0]) {
            Ok(())
        } else {
            Err(SimlinkError::Command(format!("No player named '{}' is connected.", args[0])))
        }
    })?;

    let h = host.clone();
    handler.register(
        "chat",
        "<player> <message...>",
        "Send chat as a simulated player.",
        move |args| {
            h.chat(&args[0], &args[1]);
            Ok(())
        },
    )?;

    let h = host.clone();
    handler.register("runwave", "", "Advance to the next wave.", move |_| {
        info!("Wave {} started.", h.run_wave());
        Ok(())
    })?;

    let h = host.clone();
    let r = runtime.clone();
    handler.register("gameover", "[team]", "End the current game.", move |args| {
        let winner = match args.first() {
            Some(name) => Some(
                Team::find(name)
                    .ok_or_else(|| SimlinkError::Command(format!("No team named '{}'.", name)))?,
            ),
            None => None,
        };
        h.game_over(winner, r.last_mode());
        info!("Game over triggered.");
        Ok(())
    })?;

    handler.register(
        "newgame",
        "",
        "Start the next game on the next map.",
        move |_| {
            match host.load_next_map(runtime.last_mode()) {
                Some(map) => info!("New game on {}.", map.plain_name()),
                None => info!("Rotation keeps the current map; restarting it."),
            }
            Ok(())
        },
    )?;

    Ok(())
}

fn join_names<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleBridge;
    use simlink_console::{CommandResolver, CommandResponse, Resolution};
    use simlink_core::{MapInfo, SettingsStore};
    use simlink_server::{Gateway, MemorySink};
    use std::time::Duration;

    struct Harness {
        host: Arc<HeadlessHost>,
        runtime: Arc<ServerRuntime>,
        handler: CommandHandler,
        sink: MemorySink,
        pause_state: watch::Receiver<PauseState>,
    }

    fn harness() -> Harness {
        let host = Arc::new(HeadlessHost::new(vec![
            MapInfo::new("Ground Zero"),
            MapInfo::new("[accent]Frozen_Forest"),
        ]));
        let runtime = Arc::new(ServerRuntime::load(SettingsStore::in_memory()));
        let sink = MemorySink::new();
        let bridge = LifecycleBridge::new(
            Arc::new(Gateway::new(sink.clone())),
            host.clone(),
            runtime.clone(),
        );
        let pause_state = bridge.subscribe();
        let (lifecycle, _task) = bridge.spawn();
        host.subscribe(lifecycle.clone());

        let mut handler = CommandHandler::new();
        register_headless_commands(&mut handler, host.clone(), runtime.clone()).unwrap();
        register_server_commands(
            &mut handler,
            CommandContext {
                host: host.clone(),
                runtime: runtime.clone(),
                lifecycle,
                pause_state: pause_state.clone(),
            },
        )
        .unwrap();

        Harness {
            host,
            runtime,
            handler,
            sink,
            pause_state,
        }
    }

    async fn wait_for_payloads(sink: &MemorySink, count: usize) -> Vec<String> {
        for _ in 0..200 {
            if sink.lines().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sink.json_lines()
            .iter()
            .map(|v| v["payload"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_registration_order_ends_with_help() {
        let h = harness();
        let names: Vec<&str> = h.handler.commands().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "join",
                "leave",
                "chat",
                "runwave",
                "gameover",
                "newgame",
                "status",
                "say",
                "pause",
                "mode",
                "shufflemode",
                "nextmap",
                "help",
            ]
        );
        assert!(matches!(
            h.handler.handle_message("help"),
            CommandResponse::Executed { .. }
        ));
        assert!(matches!(
            h.handler.handle_message("status"),
            CommandResponse::Executed { .. }
        ));
    }

    #[tokio::test]
    async fn test_console_players_produce_chat_messages() {
        let mut h = harness();
        h.handler.handle_message("join alice");
        h.handler.handle_message("join bob");
        h.handler.handle_message("chat bob hello there");
        h.handler.handle_message("leave alice");
        assert!(matches!(
            h.handler.handle_message("leave alice"),
            CommandResponse::Failed { .. }
        ));

        let lines = wait_for_payloads(&h.sink, 4).await;
        assert_eq!(
            lines,
            vec![
                "alice joined the server, current players: 1",
                "bob joined the server, current players: 2",
                "[bob] => hello there",
                "alice left the server, current players: 1",
            ]
        );
        h.pause_state
            .wait_for(|state| *state == PauseState::AutoPaused)
            .await
            .unwrap();
        assert!(h.host.is_paused());
    }

    #[tokio::test]
    async fn test_gameover_and_newgame() {
        let h = harness();
        h.handler.handle_message("join alice");
        h.handler.handle_message("runwave");
        assert!(matches!(
            h.handler.handle_message("gameover purple"),
            CommandResponse::Failed { .. }
        ));
        h.handler.handle_message("gameover");

        let lines = wait_for_payloads(&h.sink, 3).await;
        assert_eq!(
            lines[1],
            "Game over! Reached wave 2 with 1 players online on map Ground Zero."
        );
        assert!(lines[2].contains("Next selected map: [accent][accent]Frozen_Forest[white]."));

        h.handler.handle_message("newgame");
        assert_eq!(h.host.current_map().unwrap().name, "[accent]Frozen_Forest");
        assert_eq!(h.host.wave(), 1);
    }

    #[tokio::test]
    async fn test_say_broadcasts_with_server_prefix() {
        let h = harness();
        h.handler.handle_message("say hello there");
        assert_eq!(h.host.broadcasts(), vec!["[scarlet][[Server]:[] hello there"]);
    }

    #[tokio::test]
    async fn test_mode_and_shufflemode_update_runtime() {
        let h = harness();
        h.handler.handle_message("mode attack");
        h.handler.handle_message("shufflemode builtin");
        assert_eq!(h.runtime.last_mode(), Gamemode::Attack);
        assert_eq!(h.runtime.shuffle_mode(), ShuffleMode::Builtin);
        assert_eq!(h.host.shuffle_mode(), ShuffleMode::Builtin);

        assert!(matches!(
            h.handler.handle_message("mode flood"),
            CommandResponse::Failed { .. }
        ));
        assert_eq!(h.runtime.last_mode(), Gamemode::Attack);
    }

    #[tokio::test]
    async fn test_nextmap_sets_override() {
        let h = harness();
        h.handler.handle_message("nextmap frozen forest");
        let current = h.host.current_map();
        assert_eq!(
            h.host
                .next_map(Gamemode::Survival, current.as_ref())
                .unwrap()
                .name,
            "[accent]Frozen_Forest"
        );

        let resolver = CommandResolver::new(Arc::new(h.handler));
        assert!(matches!(
            resolver.resolve("nextmap Atlantis"),
            Resolution::Failed(_)
        ));
        assert_eq!(
            resolver.resolve("nextmap"),
            Resolution::TooFewArguments {
                usage: "nextmap <mapname...>".into()
            }
        );
    }

    #[tokio::test]
    async fn test_pause_goes_through_bridge() {
        let mut h = harness();
        assert!(matches!(
            h.handler.handle_message("pause maybe"),
            CommandResponse::Failed { .. }
        ));
        h.handler.handle_message("pause on");

        h.pause_state.changed().await.unwrap();
        assert_eq!(*h.pause_state.borrow(), PauseState::Paused);
        assert!(h.host.is_paused());
    }
}
