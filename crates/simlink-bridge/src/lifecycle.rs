//! Lifecycle bridge
//!
//! Host callbacks become [`LifecycleEvent`]s on an unbounded channel. A
//! single task drains the channel in order, emits the chat notifications and
//! drives the [`PauseMachine`], so pause state is never shared between
//! threads. Other components observe it through a `watch` channel.

use crate::host::SimulationHost;
use crate::pause::{PauseMachine, PauseState};
use crate::runtime::ServerRuntime;
use simlink_core::text::capitalize;
use simlink_core::{GameSnapshot, LifecycleEvent, MapInfo, Team};
use simlink_server::Gateway;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Event name of every outbound notification
pub const CHAT_MESSAGE: &str = "CHAT_MESSAGE";

const UNKNOWN_PLAYER: &str = "Unknown";
const UNKNOWN_MAP: &str = "Unknown";

/// Cloneable handle for pushing events into the bridge from any thread
#[derive(Clone, Debug)]
pub struct LifecycleSender {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl LifecycleSender {
    /// A sender and the receiving end a bridge task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. Never blocks; events sent after shutdown are dropped.
    pub fn send(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            warn!("Lifecycle bridge stopped, dropping event");
        }
    }

    pub fn request_pause(&self, paused: bool) {
        self.send(LifecycleEvent::PauseRequested { paused });
    }
}

pub struct LifecycleBridge {
    gateway: Arc<Gateway>,
    host: Arc<dyn SimulationHost>,
    runtime: Arc<ServerRuntime>,
    machine: PauseMachine,
    state_tx: watch::Sender<PauseState>,
}

impl LifecycleBridge {
    /// Bridge starting from the host's current pause flag
    pub fn new(
        gateway: Arc<Gateway>,
        host: Arc<dyn SimulationHost>,
        runtime: Arc<ServerRuntime>,
    ) -> Self {
        let initial = if host.is_paused() {
            PauseState::Paused
        } else {
            PauseState::Running
        };
        let (state_tx, _) = watch::channel(initial);

        Self {
            gateway,
            host,
            runtime,
            machine: PauseMachine::new(initial),
            state_tx,
        }
    }

    /// Watch pause state changes
    pub fn subscribe(&self) -> watch::Receiver<PauseState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PauseState {
        self.machine.state()
    }

    /// Process one event to completion
    pub fn handle(&mut self, event: LifecycleEvent) {
        debug!("Lifecycle event: {:?}", event);

        match event {
            LifecycleEvent::PlayerJoin { player, population } => {
                self.notify(&join_message(player.as_deref(), population));
                let transition = self.machine.on_join();
                self.apply(transition);
            }
            LifecycleEvent::PlayerLeave { player, remaining } => {
                self.notify(&leave_message(player.as_deref(), remaining));
                let transition = self.machine.on_leave(remaining);
                self.apply(transition);
            }
            LifecycleEvent::PlayerChat { player, message } => {
                self.notify(&chat_message(player.as_deref(), &message));
            }
            LifecycleEvent::GameOver { winner, snapshot } => {
                self.game_over(winner.unwrap_or_else(Team::derelict), &snapshot);
            }
            LifecycleEvent::PauseRequested { paused } => {
                let transition = self.machine.request(paused);
                if transition.is_none() {
                    info!("Pause state unchanged ({:?})", self.machine.state());
                }
                self.apply(transition);
            }
        }
    }

    /// Run the bridge on its own task. The task ends once every sender is
    /// dropped and the queue is drained.
    pub fn spawn(mut self) -> (LifecycleSender, JoinHandle<()>) {
        let (sender, mut rx) = LifecycleSender::channel();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(event);
            }
            debug!("Lifecycle bridge stopped");
        });

        (sender, handle)
    }

    fn game_over(&self, winner: Team, snapshot: &GameSnapshot) {
        self.notify(&game_over_summary(&winner, snapshot));

        let next = self
            .host
            .next_map(self.runtime.last_mode(), snapshot.map.as_ref());
        if let Some(map) = next {
            self.notify(&next_map_message(
                &winner,
                snapshot.pvp,
                &map,
                self.runtime.round_extra_time(),
            ));
        }
    }

    fn apply(&self, transition: Option<PauseState>) {
        let Some(state) = transition else {
            return;
        };

        self.host.set_paused(state.is_paused());
        self.state_tx.send_replace(state);
        info!("Pause state -> {:?}", state);
    }

    fn notify(&self, message: &str) {
        self.gateway.emit(CHAT_MESSAGE, message);
    }
}

pub fn chat_message(player: Option<&str>, message: &str) -> String {
    format!("[{}] => {}", player.unwrap_or(UNKNOWN_PLAYER), message)
}

pub fn join_message(player: Option<&str>, population: usize) -> String {
    format!(
        "{} joined the server, current players: {}",
        player.unwrap_or(UNKNOWN_PLAYER),
        population
    )
}

pub fn leave_message(player: Option<&str>, remaining: usize) -> String {
    format!(
        "{} left the server, current players: {}",
        player.unwrap_or(UNKNOWN_PLAYER),
        remaining
    )
}

/// First game-over line: wave reached or winning team
pub fn game_over_summary(winner: &Team, snapshot: &GameSnapshot) -> String {
    let map = snapshot
        .map
        .as_ref()
        .map(|m| capitalize(&m.plain_name()))
        .unwrap_or_else(|| UNKNOWN_MAP.to_string());

    if snapshot.waves {
        format!(
            "Game over! Reached wave {} with {} players online on map {}.",
            snapshot.wave, snapshot.population, map
        )
    } else {
        format!(
            "Game over! Team {} is victorious with {} players online on map {}.",
            winner.name, snapshot.population, map
        )
    }
}

/// Second game-over line announcing the next map
pub fn next_map_message(winner: &Team, pvp: bool, map: &MapInfo, round_extra_time: u32) -> String {
    let headline = if pvp {
        format!("[accent]The {} team is victorious![]", winner.colored_name())
    } else {
        "[scarlet]Game over![]".to_string()
    };
    let author = map
        .author
        .as_ref()
        .map(|a| format!(" by[accent] {}[white]", a))
        .unwrap_or_default();

    format!(
        "{}\nNext selected map: [accent]{}[white]{}.\nNew game begins in {} seconds.",
        headline, map.name, author, round_extra_time
    )
}
