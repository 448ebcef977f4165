use std::collections::HashMap;

use tokio::sync::mpsc;

use tryouts_core::beatmap::Beatmap;
use tryouts_core::commands::{
    BANCHO_BOT, Outbound, mp_abort, mp_close, mp_invite, mp_set_slots, mp_start, mp_timer, stats,
};
use tryouts_core::lobby::{LobbySession, LobbyState};

use crate::config::{MessagesConfig, RulesConfig, fill};

/// Owns every active lobby session and drives the per-lobby state
/// machine. All mutation goes through the single task that owns this
/// struct; outbound commands are queued on the emitter channel and
/// rate-limited there.
pub struct SessionRegistry {
    sessions: HashMap<String, LobbySession>,
    mappool: Vec<Beatmap>,
    rules: RulesConfig,
    messages: MessagesConfig,
    out: mpsc::UnboundedSender<Outbound>,
}

impl SessionRegistry {
    pub fn new(
        mappool: Vec<Beatmap>,
        rules: RulesConfig,
        messages: MessagesConfig,
        out: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            mappool,
            rules,
            messages,
            out,
        }
    }

    fn send(&self, target: &str, text: String) {
        if self.out.send(Outbound::new(target, text)).is_err() {
            tracing::debug!(target, "Outbound channel closed, dropping send");
        }
    }

    /// Guard for session-scoped actions: actions addressed to a player
    /// with no active lobby are dropped and logged, never an error.
    fn session(&self, player: &str) -> Option<&LobbySession> {
        let session = self.sessions.get(player);
        if session.is_none() {
            tracing::warn!(player, "Action for a player with no active lobby, dropping");
        }
        session
    }

    pub fn contains(&self, player: &str) -> bool {
        self.sessions.contains_key(player)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn state_of(&self, player: &str) -> Option<LobbyState> {
        self.sessions.get(player).map(|s| s.state)
    }

    /// Some Bancho events carry only a channel; resolve it back to the
    /// owning player.
    pub fn player_by_channel(&self, channel: &str) -> Option<String> {
        self.sessions
            .values()
            .find(|s| s.channel == channel)
            .map(|s| s.player.clone())
    }

    /// Bancho confirmed the match container. Record the session, request
    /// the player's stats, and configure the lobby: slots, invite, first
    /// map and mods. Returns the lobby URL for history recording.
    pub fn open_session(&mut self, match_id: &str, player: &str) -> Option<String> {
        if self.sessions.contains_key(player) {
            tracing::warn!(player, "Player already had an active lobby, replacing it");
        }
        let session = LobbySession::new(match_id, player);
        let channel = session.channel.clone();
        let lobby_url = session.lobby_url.clone();
        tracing::info!(player, channel = %channel, "Opened a tryout lobby");
        self.sessions.insert(player.to_string(), session);

        self.send(BANCHO_BOT, stats(player));
        self.send(&channel, mp_set_slots());
        self.send(&channel, mp_invite(player));

        let Some(first) = self.mappool.first() else {
            tracing::warn!("Mappool is empty, closing the lobby immediately");
            self.close_session(player);
            return None;
        };
        let (map_cmd, mods_cmd) = first.to_commands();
        self.send(&channel, map_cmd);
        self.send(&channel, mods_cmd);
        if let Some(s) = self.sessions.get_mut(player) {
            s.map_idx = 1;
            s.state = LobbyState::Initialized;
        }
        Some(lobby_url)
    }

    /// Re-send the lobby invite.
    pub fn invite(&mut self, player: &str) {
        let Some(s) = self.session(player) else {
            return;
        };
        let channel = s.channel.clone();
        self.send(&channel, mp_invite(player));
    }

    /// The player appeared in slot 1: greet them on first join, or welcome
    /// them back after a disconnect. Either way the readiness timer starts.
    pub fn player_joined(&mut self, player: &str) {
        let Some(s) = self.session(player) else {
            return;
        };
        let (channel, state, leave_count) = (s.channel.clone(), s.state, s.leave_count);
        match state {
            LobbyState::Initialized => {
                for line in self.messages.greetings.clone() {
                    self.send(&channel, line);
                }
                self.run_ready_timer(player);
            },
            LobbyState::Disconnected => {
                let leaves_left = self.rules.max_leaves.saturating_sub(leave_count);
                let text = fill(
                    &self.messages.leave_detected,
                    "leaves_left",
                    &leaves_left.to_string(),
                );
                let text = fill(&text, "leave_count", &leave_count.to_string());
                let text = fill(&text, "max_leaves", &self.rules.max_leaves.to_string());
                self.send(&channel, text);
                self.run_ready_timer(player);
            },
            _ => {
                tracing::debug!(player, state = ?state, "Join event needs no greeting");
            },
        }
    }

    /// Everyone readied up (or a player forced it with !play in the
    /// channel): ask Bancho to start the match.
    pub fn start_match(&mut self, channel: &str) {
        let Some(player) = self.player_by_channel(channel) else {
            tracing::warn!(channel, "Start requested for an unknown channel, dropping");
            return;
        };
        tracing::info!(player, channel, "Starting the match");
        self.send(channel, mp_start(self.rules.start_countdown_secs));
    }

    /// A Bancho countdown ran out. The event is ambiguous on its own; the
    /// session state disambiguates it: a disconnected player never came
    /// back, a waiting player simply didn't ready up in time.
    pub fn countdown_finished(&mut self, channel: &str) {
        let Some(player) = self.player_by_channel(channel) else {
            tracing::warn!(channel, "Countdown finished for an unknown channel, dropping");
            return;
        };
        let Some(state) = self.state_of(&player) else {
            return;
        };
        match state {
            LobbyState::Disconnected => {
                tracing::warn!(player, "Player never came back, terminating the lobby");
                self.close_session(&player);
            },
            LobbyState::Waiting => {
                tracing::info!(player, "Countdown finished while waiting, starting the match");
                self.send(channel, mp_start(self.rules.start_countdown_secs));
            },
            _ => {
                tracing::debug!(player, state = ?state, "Countdown finished needs no action");
            },
        }
    }

    /// Bancho reported the match has started.
    pub fn match_started(&mut self, channel: &str) {
        let Some(player) = self.player_by_channel(channel) else {
            tracing::warn!(channel, "Match started in an unknown channel, dropping");
            return;
        };
        if let Some(s) = self.sessions.get_mut(&player) {
            s.state = LobbyState::Playing;
            tracing::info!(player, "Match is now playing");
        }
    }

    /// The player finished the current map. Rotates to the next map (or
    /// ends the session on an exhausted pool) and returns the beatmap id
    /// of the map just played, for score recording.
    pub fn player_finished(&mut self, player: &str) -> Option<String> {
        let Some(s) = self.session(player) else {
            return None;
        };
        if s.state != LobbyState::Playing {
            tracing::debug!(player, state = ?s.state, "Finish report outside of play, ignoring");
            return None;
        }
        let played = s
            .map_idx
            .checked_sub(1)
            .and_then(|i| self.mappool.get(i))
            .map(|m| m.beatmap_id.clone());
        self.change_to_next_map(player);
        played
    }

    /// The player asked to abort the running map. Aborts are limited per
    /// session; at the cap the request is refused with a fixed message
    /// and nothing changes.
    pub fn abort(&mut self, player: &str) {
        let Some(s) = self.session(player) else {
            return;
        };
        let (channel, state, aborts) = (s.channel.clone(), s.state, s.abort_count);
        if state != LobbyState::Playing {
            tracing::debug!(player, state = ?state, "Abort outside of play, ignoring");
            return;
        }
        if aborts >= self.rules.max_aborts {
            self.send(&channel, self.messages.no_aborts_left.clone());
            return;
        }
        if let Some(s) = self.sessions.get_mut(player) {
            s.abort_count += 1;
        }
        self.send(&channel, mp_abort());
        self.run_ready_timer(player);
    }

    /// The player asked to skip the current map without playing it.
    pub fn skip(&mut self, player: &str) {
        let Some(s) = self.session(player) else {
            return;
        };
        let (channel, state) = (s.channel.clone(), s.state);
        match state {
            LobbyState::Playing => {
                self.send(&channel, mp_abort());
                self.change_to_next_map(player);
            },
            LobbyState::Waiting | LobbyState::Initialized => {
                self.change_to_next_map(player);
            },
            _ => {
                tracing::debug!(player, state = ?state, "Skip needs no action in this state");
            },
        }
    }

    /// The player left the lobby. Tolerated up to the configured strike
    /// count with an extended wait timer; past that the session is
    /// forfeited.
    pub fn player_left(&mut self, player: &str) {
        let Some(s) = self.session(player) else {
            return;
        };
        let (channel, leaves) = (s.channel.clone(), s.leave_count);
        if leaves < self.rules.max_leaves {
            self.send(&channel, mp_timer(self.rules.disconnect_wait_secs));
            if let Some(s) = self.sessions.get_mut(player) {
                s.state = LobbyState::Disconnected;
                s.leave_count += 1;
            }
            tracing::info!(player, "Player left, waiting for them to come back");
        } else {
            tracing::warn!(player, "Player left with no disconnects remaining, forfeiting");
            self.close_session(player);
        }
    }

    /// Close the player's lobby and forget the session.
    pub fn close_session(&mut self, player: &str) {
        let Some(session) = self.sessions.remove(player) else {
            tracing::warn!(player, "Close requested for a player with no active lobby");
            return;
        };
        self.send(&session.channel, mp_close());
        tracing::info!(player, channel = %session.channel, "Closed the lobby");
    }

    /// The bot was removed from a lobby channel. The channel is already
    /// gone, so the session is dropped without sending anything.
    pub fn remove_by_channel(&mut self, channel: &str) {
        match self.player_by_channel(channel) {
            Some(player) => {
                self.sessions.remove(&player);
                tracing::info!(player, channel, "Dropped session for a channel we were removed from");
            },
            None => {
                tracing::debug!(channel, "Removed from a channel with no active session");
            },
        }
    }

    /// Force-close every active session. Called on shutdown so no lobby
    /// is left dangling.
    pub fn close_all(&mut self) {
        let players: Vec<String> = self.sessions.keys().cloned().collect();
        for player in players {
            self.close_session(&player);
        }
    }

    fn change_to_next_map(&mut self, player: &str) {
        let Some(s) = self.sessions.get(player) else {
            return;
        };
        let (channel, idx) = (s.channel.clone(), s.map_idx);
        match self.mappool.get(idx) {
            None => {
                tracing::info!(player, "Mappool exhausted, ending the lobby");
                if let Some(s) = self.sessions.get_mut(player) {
                    s.state = LobbyState::Ending;
                }
                self.close_session(player);
            },
            Some(map) => {
                let (map_cmd, mods_cmd) = map.to_commands();
                tracing::info!(player, beatmap = %map.beatmap_id, "Rotating to the next map");
                self.send(&channel, map_cmd);
                self.send(&channel, mods_cmd);
                if let Some(s) = self.sessions.get_mut(player) {
                    s.map_idx += 1;
                }
                self.run_ready_timer(player);
            },
        }
    }

    fn run_ready_timer(&mut self, player: &str) {
        let Some(s) = self.sessions.get(player) else {
            return;
        };
        let channel = s.channel.clone();
        self.send(&channel, mp_timer(self.rules.ready_wait_secs));
        if let Some(s) = self.sessions.get_mut(player) {
            s.state = LobbyState::Waiting;
        }
    }
}
