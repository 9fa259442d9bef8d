//! Authoritative match state: both flags and the score.
//!
//! Every method is a guarded transition of the flag state machine. A
//! method returns the broadcast events the transition implies, or nothing
//! when the request is rejected; callers never learn why a request was
//! rejected, they simply have nothing to fan out.

use log::info;
use shared::{FlagStatus, ServerEvent, Team, SCORE_TO_WIN};

/// World coordinates of a flag, meaningful only while it lies dropped.
pub type Position = (f32, f32, f32);

const ORIGIN: Position = (0.0, 0.0, 0.0);

#[derive(Debug, Clone)]
pub struct Flag {
    pub team: Team,
    pub status: FlagStatus,
    /// Last coordinates the flag was dropped at. A death return keeps this
    /// untouched so the home position on the clients is never overwritten;
    /// a capture, friendly return, or match reset clears it.
    last_position: Position,
}

impl Flag {
    fn new(team: Team) -> Self {
        Self {
            team,
            status: FlagStatus::AtBase,
            last_position: ORIGIN,
        }
    }

    /// Id of the player holding this flag, if anyone does.
    pub fn carrier(&self) -> Option<u32> {
        match self.status {
            FlagStatus::Carried(id) => Some(id),
            _ => None,
        }
    }

    fn state_event(&self) -> ServerEvent {
        ServerEvent::FlagState {
            team: self.team,
            status: self.status,
        }
    }
}

/// The flags and score of the running match.
///
/// Mutation goes through the coordinator's lock; nothing in here is aware
/// of connections or sessions.
#[derive(Debug)]
pub struct MatchState {
    flags: [Flag; 2],
    red_score: u32,
    blue_score: u32,
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            flags: [Flag::new(Team::Red), Flag::new(Team::Blue)],
            red_score: 0,
            blue_score: 0,
        }
    }

    pub fn score(&self) -> (u32, u32) {
        (self.red_score, self.blue_score)
    }

    pub fn flag(&self, team: Team) -> &Flag {
        match team {
            Team::Red => &self.flags[0],
            Team::Blue => &self.flags[1],
        }
    }

    fn flag_mut(&mut self, team: Team) -> &mut Flag {
        match team {
            Team::Red => &mut self.flags[0],
            Team::Blue => &mut self.flags[1],
        }
    }

    /// Current state of both flags, Red first, as sent to a fresh joiner.
    pub fn flag_states(&self) -> Vec<ServerEvent> {
        self.flags.iter().map(Flag::state_event).collect()
    }

    /// A player touched a flag.
    ///
    /// An enemy takes the flag unless someone already carries it; a
    /// friendly touch returns a dropped flag home. Everything else is a
    /// no-op, including a pickup racing against an earlier pickup whose
    /// broadcast the client has not seen yet.
    pub fn pickup(&mut self, flag_team: Team, player_id: u32, player_team: Team) -> Option<ServerEvent> {
        let flag = self.flag_mut(flag_team);
        match flag.status {
            FlagStatus::Carried(_) => None,
            _ if player_team != flag_team => {
                flag.status = FlagStatus::Carried(player_id);
                info!("Player {} picked up the {} flag", player_id, flag_team);
                Some(flag.state_event())
            }
            FlagStatus::Dropped { .. } => {
                flag.status = FlagStatus::AtBase;
                flag.last_position = ORIGIN;
                info!("Player {} returned the {} flag to base", player_id, flag_team);
                Some(flag.state_event())
            }
            FlagStatus::AtBase => None,
        }
    }

    /// The carrier put the flag down at the given coordinates. Ignored
    /// when the requester is not the current carrier.
    pub fn drop_flag(
        &mut self,
        flag_team: Team,
        player_id: u32,
        position: Position,
    ) -> Option<ServerEvent> {
        let flag = self.flag_mut(flag_team);
        if flag.carrier() != Some(player_id) {
            return None;
        }
        let (x, y, z) = position;
        flag.status = FlagStatus::Dropped { x, y, z };
        flag.last_position = position;
        info!(
            "Player {} dropped the {} flag at {} {} {}",
            player_id, flag_team, x, y, z
        );
        Some(flag.state_event())
    }

    /// The carrier brought the enemy flag home: flag returns to base and
    /// the carrier's team scores. Returns the resulting broadcasts in
    /// order (flag state, score, then game over when a team just reached
    /// the winning score).
    pub fn capture(
        &mut self,
        flag_team: Team,
        player_id: u32,
        player_team: Team,
    ) -> Option<Vec<ServerEvent>> {
        if player_team == flag_team {
            return None;
        }
        {
            let flag = self.flag_mut(flag_team);
            if flag.carrier() != Some(player_id) {
                return None;
            }
            flag.status = FlagStatus::AtBase;
            flag.last_position = ORIGIN;
        }

        match player_team {
            Team::Red => self.red_score += 1,
            Team::Blue => self.blue_score += 1,
        }
        info!(
            "Player {} captured the {} flag. Score: Red={} Blue={}",
            player_id, flag_team, self.red_score, self.blue_score
        );

        let mut events = vec![
            self.flag(flag_team).state_event(),
            ServerEvent::Score {
                red: self.red_score,
                blue: self.blue_score,
            },
        ];
        if self.red_score >= SCORE_TO_WIN {
            events.push(ServerEvent::GameOver { team: Team::Red });
        } else if self.blue_score >= SCORE_TO_WIN {
            events.push(ServerEvent::GameOver { team: Team::Blue });
        }
        Some(events)
    }

    /// A player died: every flag they carried returns home, with no
    /// scoring and without touching its last drop coordinates.
    pub fn player_dead(&mut self, dead_id: u32) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        for flag in &mut self.flags {
            if flag.carrier() == Some(dead_id) {
                flag.status = FlagStatus::AtBase;
                info!(
                    "{} flag returned to base after the death of player {}",
                    flag.team, dead_id
                );
                events.push(flag.state_event());
            }
        }
        events
    }

    /// A player vanished mid-carry: every flag they held lands dropped at
    /// its last known coordinates (the origin if it was never dropped).
    /// Distinct from [`MatchState::player_dead`], which sends flags home.
    pub fn force_drop_all(&mut self, player_id: u32) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        for flag in &mut self.flags {
            if flag.carrier() == Some(player_id) {
                let (x, y, z) = flag.last_position;
                flag.status = FlagStatus::Dropped { x, y, z };
                info!(
                    "{} flag dropped at {} {} {} after its carrier {} disconnected",
                    flag.team, x, y, z, player_id
                );
                events.push(flag.state_event());
            }
        }
        events
    }

    /// Fresh match: zero scores, both flags home. Returns the full
    /// broadcast sequence (score, both flag states, match reset marker).
    pub fn reset(&mut self) -> Vec<ServerEvent> {
        self.red_score = 0;
        self.blue_score = 0;
        for flag in &mut self.flags {
            flag.status = FlagStatus::AtBase;
            flag.last_position = ORIGIN;
        }
        info!("Match reset");

        let mut events = vec![ServerEvent::Score { red: 0, blue: 0 }];
        events.extend(self.flags.iter().map(Flag::state_event));
        events.push(ServerEvent::MatchReset);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carried_by(state: &MatchState, team: Team) -> Option<u32> {
        state.flag(team).carrier()
    }

    #[test]
    fn test_new_match_has_both_flags_at_base() {
        let state = MatchState::new();
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);
        assert_eq!(state.flag(Team::Blue).status, FlagStatus::AtBase);
        assert_eq!(state.score(), (0, 0));
    }

    #[test]
    fn test_enemy_pickup_carries_flag() {
        let mut state = MatchState::new();
        let event = state.pickup(Team::Red, 2, Team::Blue).unwrap();
        assert_eq!(state.flag(Team::Red).status, FlagStatus::Carried(2));
        assert_eq!(
            event,
            ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::Carried(2),
            }
        );
    }

    #[test]
    fn test_friendly_pickup_of_home_flag_is_ignored() {
        let mut state = MatchState::new();
        assert_eq!(state.pickup(Team::Red, 1, Team::Red), None);
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);
    }

    #[test]
    fn test_pickup_of_carried_flag_is_ignored() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        // A second pickup for the same flag loses the race, whoever asks.
        assert_eq!(state.pickup(Team::Red, 4, Team::Blue), None);
        assert_eq!(state.pickup(Team::Red, 1, Team::Red), None);
        assert_eq!(carried_by(&state, Team::Red), Some(2));
    }

    #[test]
    fn test_drop_by_carrier_leaves_flag_dropped() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        let event = state.drop_flag(Team::Red, 2, (10.5, 0.0, -3.0)).unwrap();
        assert_eq!(
            state.flag(Team::Red).status,
            FlagStatus::Dropped {
                x: 10.5,
                y: 0.0,
                z: -3.0,
            }
        );
        assert_eq!(
            event,
            ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::Dropped {
                    x: 10.5,
                    y: 0.0,
                    z: -3.0,
                },
            }
        );
    }

    #[test]
    fn test_drop_by_non_carrier_is_ignored() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        assert_eq!(state.drop_flag(Team::Red, 4, (1.0, 2.0, 3.0)), None);
        assert_eq!(carried_by(&state, Team::Red), Some(2));

        // Nobody carries the Blue flag at all.
        assert_eq!(state.drop_flag(Team::Blue, 2, (1.0, 2.0, 3.0)), None);
    }

    #[test]
    fn test_enemy_pickup_of_dropped_flag_carries_it() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        state.drop_flag(Team::Red, 2, (5.0, 0.0, 5.0)).unwrap();
        let event = state.pickup(Team::Red, 4, Team::Blue).unwrap();
        assert_eq!(carried_by(&state, Team::Red), Some(4));
        assert_eq!(
            event,
            ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::Carried(4),
            }
        );
    }

    #[test]
    fn test_friendly_pickup_returns_dropped_flag_home() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        state.drop_flag(Team::Red, 2, (5.0, 0.0, 5.0)).unwrap();
        let event = state.pickup(Team::Red, 1, Team::Red).unwrap();
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);
        assert_eq!(
            event,
            ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::AtBase,
            }
        );

        // The return also forgot the drop coordinates: a later carrier
        // disconnect drops the flag at the origin again.
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        let events = state.force_drop_all(2);
        assert_eq!(
            events,
            vec![ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::Dropped {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
            }]
        );
    }

    #[test]
    fn test_capture_scores_and_sends_flag_home() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        let events = state.capture(Team::Red, 2, Team::Blue).unwrap();
        assert_eq!(state.score(), (0, 1));
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);
        assert_eq!(
            events,
            vec![
                ServerEvent::FlagState {
                    team: Team::Red,
                    status: FlagStatus::AtBase,
                },
                ServerEvent::Score { red: 0, blue: 1 },
            ]
        );
    }

    #[test]
    fn test_capture_by_non_carrier_is_ignored() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        assert_eq!(state.capture(Team::Red, 4, Team::Blue), None);
        assert_eq!(state.score(), (0, 0));
        assert_eq!(carried_by(&state, Team::Red), Some(2));
    }

    #[test]
    fn test_capture_of_own_flag_is_ignored() {
        let mut state = MatchState::new();
        // Not reachable through pickup, but the capture guard must hold on
        // its own.
        assert_eq!(state.capture(Team::Red, 1, Team::Red), None);
        assert_eq!(state.score(), (0, 0));
    }

    #[test]
    fn test_game_over_exactly_at_threshold() {
        let mut state = MatchState::new();
        for expected_blue in 1..=SCORE_TO_WIN {
            state.pickup(Team::Red, 2, Team::Blue).unwrap();
            let events = state.capture(Team::Red, 2, Team::Blue).unwrap();
            let game_over = events
                .iter()
                .find(|e| matches!(e, ServerEvent::GameOver { .. }));
            if expected_blue < SCORE_TO_WIN {
                assert!(game_over.is_none(), "no win before the threshold");
            } else {
                assert_eq!(game_over, Some(&ServerEvent::GameOver { team: Team::Blue }));
            }
            assert_eq!(state.score(), (0, expected_blue));
        }
    }

    #[test]
    fn test_death_returns_flag_home_without_scoring() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        let events = state.player_dead(2);
        assert_eq!(
            events,
            vec![ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::AtBase,
            }]
        );
        assert_eq!(state.score(), (0, 0));
    }

    #[test]
    fn test_death_of_non_carrier_changes_nothing() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        assert!(state.player_dead(4).is_empty());
        assert_eq!(carried_by(&state, Team::Red), Some(2));
    }

    #[test]
    fn test_death_return_keeps_last_drop_position() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        state.drop_flag(Team::Red, 2, (7.0, 1.0, -2.0)).unwrap();
        state.pickup(Team::Red, 4, Team::Blue).unwrap();
        state.player_dead(4);
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);

        // The next carrier disconnecting drops the flag where it last lay,
        // not at the origin.
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        let events = state.force_drop_all(2);
        assert_eq!(
            events,
            vec![ServerEvent::FlagState {
                team: Team::Red,
                status: FlagStatus::Dropped {
                    x: 7.0,
                    y: 1.0,
                    z: -2.0,
                },
            }]
        );
    }

    #[test]
    fn test_force_drop_without_carried_flag_is_empty() {
        let mut state = MatchState::new();
        assert!(state.force_drop_all(1).is_empty());
    }

    #[test]
    fn test_reset_clears_scores_flags_and_positions() {
        let mut state = MatchState::new();
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        state.capture(Team::Red, 2, Team::Blue).unwrap();
        state.pickup(Team::Blue, 1, Team::Red).unwrap();
        state.drop_flag(Team::Blue, 1, (4.0, 4.0, 4.0)).unwrap();

        let events = state.reset();
        assert_eq!(state.score(), (0, 0));
        assert_eq!(state.flag(Team::Red).status, FlagStatus::AtBase);
        assert_eq!(state.flag(Team::Blue).status, FlagStatus::AtBase);
        assert_eq!(
            events,
            vec![
                ServerEvent::Score { red: 0, blue: 0 },
                ServerEvent::FlagState {
                    team: Team::Red,
                    status: FlagStatus::AtBase,
                },
                ServerEvent::FlagState {
                    team: Team::Blue,
                    status: FlagStatus::AtBase,
                },
                ServerEvent::MatchReset,
            ]
        );

        // Reset also wiped the Blue flag's remembered drop position.
        state.pickup(Team::Blue, 1, Team::Red).unwrap();
        let events = state.force_drop_all(1);
        assert_eq!(
            events,
            vec![ServerEvent::FlagState {
                team: Team::Blue,
                status: FlagStatus::Dropped {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
            }]
        );
    }

    #[test]
    fn test_carrier_id_only_exists_while_carried() {
        let mut state = MatchState::new();
        assert_eq!(carried_by(&state, Team::Red), None);
        state.pickup(Team::Red, 2, Team::Blue).unwrap();
        assert_eq!(carried_by(&state, Team::Red), Some(2));
        state.drop_flag(Team::Red, 2, (1.0, 1.0, 1.0)).unwrap();
        assert_eq!(carried_by(&state, Team::Red), None);
    }
}
