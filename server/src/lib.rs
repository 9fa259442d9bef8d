//! # CTF Session Server Library
//!
//! This library provides the authoritative session server for a team-based
//! capture-the-flag game. It accepts player connections, assigns identity
//! and team, keeps the single source of truth for flag possession and
//! score, and fans every state change out to all connected clients.
//!
//! ## Core Responsibilities
//!
//! ### State Authority
//! The server owns flag possession and the match score outright. Clients
//! request transitions (pickup, drop, capture); the server validates each
//! request against the current state and either applies and broadcasts it
//! or silently ignores it. Clients never receive a negative
//! acknowledgement; the absence of a broadcast is the only rejection
//! signal.
//!
//! ### Session Management
//! Each TCP connection becomes one session: a join handshake, an inbound
//! read loop, an outbound writer task, and a teardown path that runs
//! exactly once. Disconnecting mid-carry force-drops the flag at its last
//! known position.
//!
//! ### Relayed Traffic
//! Position and damage reports are not validated or stored; the server
//! relays them so clients can render remote players and apply damage
//! locally. This is a deliberate trust boundary for small, friendly
//! deployments.
//!
//! ## Architecture Design
//!
//! ### Serialized Command Handling
//! The player registry, both flags, and the score live behind a single
//! mutex inside the coordinator. Every command runs under that lock from
//! validation through broadcast queueing, so handling is fully serialized
//! and no client ever observes an intermediate state. Throughput is
//! bounded by the single writer, which is the right trade at the player
//! counts this server targets.
//!
//! ### Decoupled Fan-out
//! Broadcasting pushes events onto unbounded per-session queues; each
//! session's writer task drains its own queue onto its own socket. A slow
//! or dead peer therefore cannot stall the serialized core or any other
//! session; its queue just grows until its next write fails and the
//! session tears down.
//!
//! ### Ordering
//! Commands from one session apply in the order sent, because the session
//! loop finishes handling a line before reading the next. Across sessions
//! the order is whatever order the lock is won in.
//!
//! ## Module Organization
//!
//! - [`game`]: flags, score, and the guarded transitions between flag
//!   states; pure state, no I/O.
//! - [`registry`]: the roster of connected players and broadcast
//!   dispatch over their outbound queues.
//! - [`coordinator`]: applies decoded commands to the store under the
//!   single lock and derives the broadcasts.
//! - [`session`]: per-connection lifecycle from accept to teardown.
//! - [`network`]: the TCP listener and accept loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the listener; port 5000 is the conventional default.
//!     let server = Server::new("0.0.0.0:5000").await?;
//!
//!     // Accept connections until the process is stopped. Each client
//!     // joins with a name, is assigned an id and a team, and from then
//!     // on exchanges newline-delimited text messages with the server.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod game;
pub mod network;
pub mod registry;
pub mod session;
