//! Narrow interfaces to the spreadsheet-backed collaborators. The core
//! never talks to the sheets API directly; it reads and appends through
//! these traits so session logic stays testable with in-memory fakes.

#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::beatmap::Beatmap;

/// A lobby a player has already played, as recorded on the lobbies sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedLobby {
    pub lobby_url: String,
}

/// Failure talking to a backing store. Store failures never corrupt
/// in-memory session state; callers log and fall back to the last known
/// snapshot where one exists.
#[derive(Debug)]
pub enum StoreError {
    /// Transport-level failure (connection, TLS, timeout).
    Http(String),
    /// The API answered with a non-success status.
    Api { status: u16, message: String },
    /// The response arrived but rows did not have the expected shape.
    Malformed(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(m) => write!(f, "http error: {m}"),
            Self::Api { status, message } => write!(f, "api error {status}: {message}"),
            Self::Malformed(m) => write!(f, "malformed response: {m}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read access to the mappool sheet.
pub trait MappoolProvider {
    /// The ordered map rotation for every lobby.
    async fn get_mappool(&self) -> Result<Vec<Beatmap>, StoreError>;
}

/// Read/append access to the played-lobbies sheet.
pub trait PlayedLobbyStore {
    /// Lobby history keyed by player. An empty `players` filter returns
    /// every recorded row.
    async fn get_played_lobbies(
        &self,
        players: &[String],
    ) -> Result<HashMap<String, Vec<PlayedLobby>>, StoreError>;

    async fn append_lobby(&self, player: &str, lobby_url: &str) -> Result<(), StoreError>;
}

/// Append access to the tryout scores sheet.
pub trait ScoreStore {
    async fn append_score(
        &self,
        player: &str,
        score: u64,
        beatmap_id: &str,
    ) -> Result<(), StoreError>;
}

/// The player roster sheet: names seen by the bot, appended as Bancho
/// reports their stats.
pub trait PlayersStore {
    async fn get_players(&self) -> Result<Vec<String>, StoreError>;

    async fn add_player(&self, player_id: &str, player_name: &str) -> Result<(), StoreError>;
}
