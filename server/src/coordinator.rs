//! Applies session-originated commands to the shared store and fans the
//! resulting events out.
//!
//! The registry, both flags, and the score live behind one mutex, and
//! every operation holds it for its full duration: capture, pickup,
//! death, and disconnect all touch more than one of them and no client
//! may observe an intermediate state. The lock is never held across
//! socket I/O: fan-out only pushes onto the per-session queues, which the
//! writer tasks drain outside the lock.

use crate::game::MatchState;
use crate::registry::{EventSender, PlayerRegistry};
use log::{debug, warn};
use shared::{ClientCommand, ServerEvent, Team};
use tokio::sync::Mutex;

struct Store {
    registry: PlayerRegistry,
    game: MatchState,
}

/// Owner of the game state store; every read or mutation goes through
/// these methods.
pub struct Coordinator {
    store: Mutex<Store>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                registry: PlayerRegistry::new(),
                game: MatchState::new(),
            }),
        }
    }

    /// Registers a joining player and runs the join handshake.
    ///
    /// The joiner first learns the existing roster, then receives their
    /// welcome, the current score, and both flag states; everyone else is
    /// told about the new player. Returns the assigned id.
    pub async fn join(&self, name: &str, sender: EventSender) -> u32 {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        for existing in store.registry.players() {
            let _ = sender.send(ServerEvent::PlayerJoined {
                id: existing.id,
                team: existing.team,
                name: existing.name.clone(),
            });
        }

        let (id, team) = store.registry.add_player(name, sender);

        if let Some(player) = store.registry.get(id) {
            player.send(ServerEvent::Welcome { id, team });
            let (red, blue) = store.game.score();
            player.send(ServerEvent::Score { red, blue });
            for event in store.game.flag_states() {
                player.send(event);
            }
        }

        store.registry.broadcast_except(
            id,
            &ServerEvent::PlayerJoined {
                id,
                team,
                name: name.to_string(),
            },
        );

        id
    }

    /// Dispatches one decoded command from a registered session.
    pub async fn handle(&self, player_id: u32, command: ClientCommand) {
        match command {
            ClientCommand::Join { .. } => {
                debug!("Ignoring JOIN from already registered player {}", player_id);
            }
            ClientCommand::Position { x, y, z, yaw, pitch } => {
                self.relay_position(player_id, x, y, z, yaw, pitch).await;
            }
            ClientCommand::FlagPickup { team } => self.flag_pickup(player_id, team).await,
            ClientCommand::FlagDrop { team, x, y, z } => {
                self.flag_drop(player_id, team, (x, y, z)).await;
            }
            ClientCommand::FlagCapture { team } => self.flag_capture(player_id, team).await,
            ClientCommand::Hit {
                target_id,
                damage,
                shooter_id,
            } => self.relay_hit(player_id, target_id, damage, shooter_id).await,
            ClientCommand::PlayerDead { dead_id, killer_id } => {
                self.player_dead(dead_id, killer_id).await;
            }
            ClientCommand::ResetMatch => self.reset_match(player_id).await,
        }
    }

    /// Deregisters a departing player, exactly once per session.
    ///
    /// Every flag the player carried lands dropped at its last known
    /// position, unlike a death, which sends flags home. A repeated call
    /// finds no registered player and does nothing.
    pub async fn disconnect(&self, player_id: u32) {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        if store.registry.remove_player(player_id).is_none() {
            return;
        }
        store
            .registry
            .broadcast_except(player_id, &ServerEvent::PlayerLeft { id: player_id });
        for event in store.game.force_drop_all(player_id) {
            store.registry.broadcast_all(&event);
        }
    }

    /// Position is not server-authoritative: relayed to everyone else,
    /// stored nowhere.
    async fn relay_position(&self, player_id: u32, x: f32, y: f32, z: f32, yaw: f32, pitch: f32) {
        let store = self.store.lock().await;
        store.registry.broadcast_except(
            player_id,
            &ServerEvent::Position {
                id: player_id,
                x,
                y,
                z,
                yaw,
                pitch,
            },
        );
    }

    async fn flag_pickup(&self, player_id: u32, team: Team) {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let player_team = match store.registry.get(player_id) {
            Some(player) => player.team,
            None => return,
        };
        if let Some(event) = store.game.pickup(team, player_id, player_team) {
            store.registry.broadcast_all(&event);
        }
    }

    async fn flag_drop(&self, player_id: u32, team: Team, position: (f32, f32, f32)) {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        if let Some(event) = store.game.drop_flag(team, player_id, position) {
            store.registry.broadcast_all(&event);
        }
    }

    async fn flag_capture(&self, player_id: u32, team: Team) {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let player_team = match store.registry.get(player_id) {
            Some(player) => player.team,
            None => return,
        };
        if let Some(events) = store.game.capture(team, player_id, player_team) {
            for event in events {
                store.registry.broadcast_all(&event);
            }
        }
    }

    /// Damage is client-asserted: relayed to every session, the sender
    /// included, so the target client can apply it.
    async fn relay_hit(&self, player_id: u32, target_id: u32, damage: u32, shooter_id: u32) {
        if shooter_id != player_id {
            warn!(
                "Shooter id mismatch in HIT from player {} (claimed {})",
                player_id, shooter_id
            );
        }
        let store = self.store.lock().await;
        store.registry.broadcast_all(&ServerEvent::PlayerHit {
            target_id,
            damage,
            shooter_id,
        });
    }

    /// The dead player's id comes from the message, not from the sender:
    /// clients report deaths they observe locally.
    async fn player_dead(&self, dead_id: u32, killer_id: u32) {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        for event in store.game.player_dead(dead_id) {
            store.registry.broadcast_all(&event);
        }
        store
            .registry
            .broadcast_all(&ServerEvent::PlayerDead { dead_id, killer_id });
    }

    /// Any connected player may reset the match.
    async fn reset_match(&self, player_id: u32) {
        debug!("Player {} requested a match reset", player_id);
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        for event in store.game.reset() {
            store.registry.broadcast_all(&event);
        }
    }
}
