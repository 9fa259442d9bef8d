//! Wire protocol shared between the CTF session server and its clients.
//!
//! Messages travel as newline-delimited text lines with space-separated
//! fields. The first token of a line is the message tag; the remaining
//! tokens are ordered arguments. Player names may contain spaces and are
//! always serialized as the tail of their line; every other field is a
//! single token. Numeric fields use plain `.`-decimal formatting in both
//! directions.

use std::fmt;
use std::str::FromStr;

/// Default TCP port the server binds when none is given.
pub const DEFAULT_PORT: u16 = 5000;

/// Captures needed to win the match.
pub const SCORE_TO_WIN: u32 = 3;

/// Carrier field written on the wire when no player holds a flag.
const NO_CARRIER: i32 = -1;

/// One of the two sides of the match.
///
/// Wire tokens are the literal variant names `Red` / `Blue`, case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opposite(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Red" => Ok(Team::Red),
            "Blue" => Ok(Team::Blue),
            _ => Err(()),
        }
    }
}

/// Possession state of a flag.
///
/// The carried player id and the drop coordinates live inside their
/// variants, so a flag can never simultaneously claim to be at base and
/// carried, or carry a stale carrier id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagStatus {
    AtBase,
    Carried(u32),
    Dropped { x: f32, y: f32, z: f32 },
}

/// A request received from a client, tagged by its first token.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Join { name: String },
    Position { x: f32, y: f32, z: f32, yaw: f32, pitch: f32 },
    FlagPickup { team: Team },
    FlagDrop { team: Team, x: f32, y: f32, z: f32 },
    FlagCapture { team: Team },
    Hit { target_id: u32, damage: u32, shooter_id: u32 },
    PlayerDead { dead_id: u32, killer_id: u32 },
    ResetMatch,
}

impl ClientCommand {
    /// Decodes one line into a typed command.
    ///
    /// Returns `None` for anything that should be discarded: an empty
    /// line, an unknown tag, a wrong argument count, a numeric field that
    /// fails to parse, or a team token that is not `Red` / `Blue`.
    /// Discarding is never fatal to the connection.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let tag = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        match tag {
            "JOIN" => {
                if args.is_empty() {
                    return None;
                }
                Some(ClientCommand::Join {
                    name: args.join(" "),
                })
            }
            "POS" => {
                if args.len() != 5 {
                    return None;
                }
                Some(ClientCommand::Position {
                    x: args[0].parse().ok()?,
                    y: args[1].parse().ok()?,
                    z: args[2].parse().ok()?,
                    yaw: args[3].parse().ok()?,
                    pitch: args[4].parse().ok()?,
                })
            }
            "FLAG_PICKUP" => {
                if args.len() != 1 {
                    return None;
                }
                Some(ClientCommand::FlagPickup {
                    team: args[0].parse().ok()?,
                })
            }
            "FLAG_DROP" => {
                if args.len() != 4 {
                    return None;
                }
                Some(ClientCommand::FlagDrop {
                    team: args[0].parse().ok()?,
                    x: args[1].parse().ok()?,
                    y: args[2].parse().ok()?,
                    z: args[3].parse().ok()?,
                })
            }
            "FLAG_CAPTURE" => {
                if args.len() != 1 {
                    return None;
                }
                Some(ClientCommand::FlagCapture {
                    team: args[0].parse().ok()?,
                })
            }
            "HIT" => {
                if args.len() != 3 {
                    return None;
                }
                Some(ClientCommand::Hit {
                    target_id: args[0].parse().ok()?,
                    damage: args[1].parse().ok()?,
                    shooter_id: args[2].parse().ok()?,
                })
            }
            "PLAYER_DEAD" => {
                if args.len() != 2 {
                    return None;
                }
                Some(ClientCommand::PlayerDead {
                    dead_id: args[0].parse().ok()?,
                    killer_id: args[1].parse().ok()?,
                })
            }
            "RESET_MATCH" => {
                if !args.is_empty() {
                    return None;
                }
                Some(ClientCommand::ResetMatch)
            }
            _ => None,
        }
    }
}

/// A state change or relay fanned out to connected sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Welcome { id: u32, team: Team },
    PlayerJoined { id: u32, team: Team, name: String },
    PlayerLeft { id: u32 },
    Position { id: u32, x: f32, y: f32, z: f32, yaw: f32, pitch: f32 },
    FlagState { team: Team, status: FlagStatus },
    Score { red: u32, blue: u32 },
    GameOver { team: Team },
    MatchReset,
    PlayerHit { target_id: u32, damage: u32, shooter_id: u32 },
    PlayerDead { dead_id: u32, killer_id: u32 },
}

impl ServerEvent {
    /// Encodes the event as a single line, without the trailing newline.
    ///
    /// None of the fields may contain a newline; names are the only field
    /// that may contain spaces and therefore always end their line.
    pub fn to_line(&self) -> String {
        match self {
            ServerEvent::Welcome { id, team } => format!("WELCOME {} {}", id, team),
            ServerEvent::PlayerJoined { id, team, name } => {
                format!("PLAYER_JOINED {} {} {}", id, team, name)
            }
            ServerEvent::PlayerLeft { id } => format!("PLAYER_LEFT {}", id),
            ServerEvent::Position {
                id,
                x,
                y,
                z,
                yaw,
                pitch,
            } => format!("POS {} {} {} {} {} {}", id, x, y, z, yaw, pitch),
            ServerEvent::FlagState { team, status } => match status {
                FlagStatus::AtBase => format!("FLAG_STATE {} AT_BASE {}", team, NO_CARRIER),
                FlagStatus::Carried(carrier_id) => {
                    format!("FLAG_STATE {} CARRIED {}", team, carrier_id)
                }
                FlagStatus::Dropped { x, y, z } => {
                    format!("FLAG_STATE {} DROPPED {} {} {} {}", team, NO_CARRIER, x, y, z)
                }
            },
            ServerEvent::Score { red, blue } => format!("SCORE {} {}", red, blue),
            ServerEvent::GameOver { team } => format!("GAME_OVER {}", team),
            ServerEvent::MatchReset => "MATCH_RESET".to_string(),
            ServerEvent::PlayerHit {
                target_id,
                damage,
                shooter_id,
            } => format!("PLAYER_HIT {} {} {}", target_id, damage, shooter_id),
            ServerEvent::PlayerDead { dead_id, killer_id } => {
                format!("PLAYER_DEAD {} {}", dead_id, killer_id)
            }
        }
    }
}
