//! Player registry and broadcast dispatch for the session server
//!
//! This module handles the server-side roster of connected players:
//! - Identity assignment (monotonic ids, alternating teams)
//! - The outbound handle each session's writer task drains
//! - Fan-out of events to every session, or every session but one
//!
//! The registry never talks to sockets itself; delivery is a push onto a
//! session's unbounded queue, so fan-out cannot block on a slow peer.

use log::{debug, info};
use shared::{ServerEvent, Team};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Sending side of a session's outbound event queue.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// A registered player and the handle for reaching their session
///
/// The handle owns the only route to the player's socket: events pushed
/// here are serialized and written by the session's writer task. Identity
/// fields never change after registration.
#[derive(Debug)]
pub struct PlayerHandle {
    /// Unique player identifier assigned by the server
    pub id: u32,
    /// Side the player fights for, fixed at registration
    pub team: Team,
    /// Client-supplied display name, spaces allowed, not unique
    pub name: String,
    sender: EventSender,
}

impl PlayerHandle {
    /// Queues an event for this player's session.
    ///
    /// Delivery is best-effort: when the session's writer task is gone the
    /// event is dropped with a debug log, and nobody else is affected.
    pub fn send(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            debug!("Dropping event for player {}: session writer is gone", self.id);
        }
    }
}

/// Roster of all currently connected players
///
/// Ids start at 1 and only ever count up, so an id is never reused within
/// a process lifetime even after its player disconnects. Teams alternate
/// on id parity: odd ids are Red, even ids are Blue.
pub struct PlayerRegistry {
    players: HashMap<u32, PlayerHandle>,
    next_player_id: u32,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Registers a new player and returns their assigned id and team.
    pub fn add_player(&mut self, name: &str, sender: EventSender) -> (u32, Team) {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let team = if id % 2 == 0 { Team::Blue } else { Team::Red };
        info!("Player {} ({}) joined as {}", id, name, team);
        self.players.insert(
            id,
            PlayerHandle {
                id,
                team,
                name: name.to_string(),
                sender,
            },
        );

        (id, team)
    }

    /// Removes a player from the roster.
    ///
    /// Returns the removed handle, or `None` when the player was already
    /// gone; the disconnect path relies on this for idempotence.
    pub fn remove_player(&mut self, id: u32) -> Option<PlayerHandle> {
        let removed = self.players.remove(&id);
        if let Some(player) = &removed {
            info!("Player {} ({}) disconnected", player.id, player.name);
        }
        removed
    }

    pub fn get(&self, id: u32) -> Option<&PlayerHandle> {
        self.players.get(&id)
    }

    /// All registered players, in no particular order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerHandle> {
        self.players.values()
    }

    /// Queues an event for every registered player.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        debug!("Broadcast: {}", event.to_line());
        for player in self.players.values() {
            player.send(event.clone());
        }
    }

    /// Queues an event for every registered player except one.
    pub fn broadcast_except(&self, except_id: u32, event: &ServerEvent) {
        debug!("Broadcast except {}: {}", except_id, event.to_line());
        for player in self.players.values() {
            if player.id == except_id {
                continue;
            }
            player.send(event.clone());
        }
    }

    /// Returns the number of currently registered players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if no players are currently registered
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let mut registry = PlayerRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let (id1, _) = registry.add_player("a", tx.clone());
        let (id2, _) = registry.add_player("b", tx.clone());
        let (id3, _) = registry.add_player("c", tx);
        assert_eq!((id1, id2, id3), (1, 2, 3));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_teams_alternate_on_id_parity() {
        let mut registry = PlayerRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let (_, team1) = registry.add_player("a", tx.clone());
        let (_, team2) = registry.add_player("b", tx.clone());
        let (_, team3) = registry.add_player("c", tx);
        assert_eq!(team1, Team::Red);
        assert_eq!(team2, Team::Blue);
        assert_eq!(team3, Team::Red);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = PlayerRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let (id1, _) = registry.add_player("a", tx.clone());
        assert!(registry.remove_player(id1).is_some());
        let (id2, _) = registry.add_player("b", tx);
        assert_eq!(id2, 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = PlayerRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let (id, _) = registry.add_player("a", tx);
        assert!(registry.remove_player(id).is_some());
        assert!(registry.remove_player(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stored_identity() {
        let mut registry = PlayerRegistry::new();
        let (tx, _rx) = unbounded_channel();
        let (id, team) = registry.add_player("Big Bad Bob", tx);
        let player = registry.get(id).unwrap();
        assert_eq!(player.id, id);
        assert_eq!(player.team, team);
        assert_eq!(player.name, "Big Bad Bob");
    }

    #[test]
    fn test_broadcast_all_reaches_everyone() {
        let mut registry = PlayerRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.add_player("a", tx1);
        registry.add_player("b", tx2);

        registry.broadcast_all(&ServerEvent::MatchReset);
        assert_eq!(drain(&mut rx1), vec![ServerEvent::MatchReset]);
        assert_eq!(drain(&mut rx2), vec![ServerEvent::MatchReset]);
    }

    #[test]
    fn test_broadcast_except_skips_one() {
        let mut registry = PlayerRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let (id1, _) = registry.add_player("a", tx1);
        registry.add_player("b", tx2);

        registry.broadcast_except(id1, &ServerEvent::PlayerLeft { id: 9 });
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2), vec![ServerEvent::PlayerLeft { id: 9 }]);
    }

    #[test]
    fn test_dead_receiver_does_not_stop_fanout() {
        let mut registry = PlayerRegistry::new();
        let (tx1, rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.add_player("a", tx1);
        registry.add_player("b", tx2);
        drop(rx1);

        registry.broadcast_all(&ServerEvent::MatchReset);
        assert_eq!(drain(&mut rx2), vec![ServerEvent::MatchReset]);
    }
}
