use serde::{Deserialize, Serialize};

/// Lifecycle of one player's tryout lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyState {
    /// Match container exists on Bancho, not yet configured.
    Created,
    /// Slot config, first map and mods applied; waiting for the player to join.
    Initialized,
    /// A readiness timer is running (or about to run).
    Waiting,
    /// Match in progress.
    Playing,
    /// Player left mid-session; an extended wait timer is running.
    Disconnected,
    /// Rotation exhausted or forced end; the session is about to be removed.
    Ending,
}

/// Per-player lobby bookkeeping. One of these exists for every
/// currently-active player, keyed by their normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySession {
    /// Multiplayer channel assigned by Bancho on creation, e.g. `#mp_12345`.
    pub channel: String,
    /// Public match history URL, reported back to the player.
    pub lobby_url: String,
    /// Owning player, normalized (spaces replaced with underscores).
    pub player: String,
    /// Index of the next mappool slot to be selected. Advances by exactly
    /// one per map change; equal to the pool length once exhausted.
    pub map_idx: usize,
    pub state: LobbyState,
    /// Disconnect strikes consumed so far.
    pub leave_count: u32,
    /// Aborts consumed so far.
    pub abort_count: u32,
}

impl LobbySession {
    pub fn new(match_id: &str, player: impl Into<String>) -> Self {
        Self {
            channel: format!("#mp_{match_id}"),
            lobby_url: format!("https://osu.ppy.sh/community/matches/{match_id}"),
            player: player.into(),
            map_idx: 0,
            state: LobbyState::Created,
            leave_count: 0,
            abort_count: 0,
        }
    }
}
