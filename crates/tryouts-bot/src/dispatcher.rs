use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::mpsc;

use tryouts_core::commands::{BANCHO_BOT, Outbound, mp_make};
use tryouts_core::events::{
    BanchoEvent, ChatEvent, ChatEventKind, PlayerCommand, classify_channel, classify_private,
};
use tryouts_core::store::{PlayedLobby, PlayedLobbyStore, PlayersStore, ScoreStore};

use crate::config::{MessagesConfig, fill};
use crate::policy::{LobbyRequest, TournamentPolicy};
use crate::registry::SessionRegistry;

/// Routes parsed chat events to the tournament policy and the session
/// registry. The dispatcher never mutates a session itself; every state
/// transition happens inside the registry behind its lookup-or-drop
/// guard. Store failures are logged and never touch session state.
pub struct Dispatcher<S> {
    registry: SessionRegistry,
    policy: TournamentPolicy,
    store: S,
    messages: MessagesConfig,
    out: mpsc::UnboundedSender<Outbound>,
    /// Last known played-lobby snapshot, refreshed on each lobby request
    /// and kept as-is when a refresh fails.
    played: HashMap<String, Vec<PlayedLobby>>,
}

impl<S> Dispatcher<S>
where
    S: PlayedLobbyStore + ScoreStore + PlayersStore,
{
    pub fn new(
        registry: SessionRegistry,
        policy: TournamentPolicy,
        store: S,
        messages: MessagesConfig,
        out: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            registry,
            policy,
            store,
            messages,
            out,
            played: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn send(&self, target: &str, text: String) {
        if self.out.send(Outbound::new(target, text)).is_err() {
            tracing::debug!(target, "Outbound channel closed, dropping send");
        }
    }

    /// Process one inbound event to completion before the next is read.
    pub async fn handle_event(&mut self, event: ChatEvent) {
        match event.kind {
            ChatEventKind::Private => self.handle_private(event).await,
            ChatEventKind::Channel => self.handle_channel(event).await,
            ChatEventKind::Kicked => self.registry.remove_by_channel(&event.target),
        }
    }

    async fn handle_private(&mut self, event: ChatEvent) {
        if event.sender == BANCHO_BOT {
            match classify_private(&event.text) {
                Some(BanchoEvent::MatchCreated { match_id, player }) => {
                    self.lobby_created(&match_id, &player).await;
                },
                Some(BanchoEvent::NoMoreMatches) => self.relay_no_more_matches(),
                Some(BanchoEvent::StatsReply {
                    player_name,
                    player_id,
                }) => {
                    if let Err(e) = self.store.add_player(&player_id, &player_name).await {
                        tracing::warn!(player = %player_name, error = %e, "Failed to record player");
                    }
                },
                Some(other) => {
                    tracing::debug!(event = ?other, "Channel-level event in a private message");
                },
                None => {
                    tracing::debug!(text = %event.text, "Unrecognized Bancho private message");
                },
            }
            return;
        }

        match PlayerCommand::parse(&event.text) {
            Some(PlayerCommand::Play) => self.request_lobby(&event.sender).await,
            Some(PlayerCommand::Invite) => self.registry.invite(&event.sender),
            _ => {},
        }
    }

    async fn handle_channel(&mut self, event: ChatEvent) {
        if event.sender == BANCHO_BOT {
            match classify_channel(&event.text) {
                Some(BanchoEvent::AllReady) => self.registry.start_match(&event.target),
                Some(BanchoEvent::CountdownFinished) => {
                    self.registry.countdown_finished(&event.target);
                },
                Some(BanchoEvent::MatchStarted) => self.registry.match_started(&event.target),
                Some(BanchoEvent::PlayerFinished { player, score }) => {
                    let played_map = self.registry.player_finished(&player);
                    if let (Some(beatmap_id), Some(score)) = (played_map, score)
                        && let Err(e) = self.store.append_score(&player, score, &beatmap_id).await
                    {
                        tracing::warn!(player, error = %e, "Failed to record score");
                    }
                },
                Some(BanchoEvent::JoinedSlotOne { player }) => {
                    self.registry.player_joined(&player);
                },
                Some(BanchoEvent::LeftGame { player }) => self.registry.player_left(&player),
                Some(other) => {
                    tracing::debug!(event = ?other, "Private-level event in a channel message");
                },
                None => {
                    tracing::debug!(text = %event.text, "Unrecognized Bancho channel message");
                },
            }
            return;
        }

        match PlayerCommand::parse(&event.text) {
            Some(PlayerCommand::Abort) => self.registry.abort(&event.sender),
            Some(PlayerCommand::Skip) => self.registry.skip(&event.sender),
            Some(PlayerCommand::Quit) => self.registry.close_session(&event.sender),
            Some(PlayerCommand::Play) => self.registry.start_match(&event.target),
            _ => {},
        }
    }

    /// A player asked for a lobby. Refresh the played-lobby snapshot,
    /// run the tournament gates, and either reply with the rejection or
    /// ask Bancho for a match container. The session itself is created
    /// only when Bancho's confirmation arrives.
    async fn request_lobby(&mut self, author: &str) {
        self.refresh_played().await;

        let has_active = self.registry.contains(author);
        let verdict = self
            .policy
            .evaluate(author, Utc::now(), has_active, &self.played);
        tracing::info!(player = author, verdict = ?verdict, "Lobby request evaluated");

        match verdict {
            LobbyRequest::NotStarted => {
                let start = self.policy.start().format("%Y-%m-%d %H:%M").to_string();
                let text = fill(&self.messages.not_started, "start_time", &start);
                self.send(author, text);
            },
            LobbyRequest::Ended { played } => {
                let end = self.policy.end().format("%Y-%m-%d %H:%M").to_string();
                let text = fill(&self.messages.ended, "end_time", &end);
                self.send(author, text);
                if !played.is_empty() {
                    self.send_played_lobbies(author, &played);
                }
            },
            LobbyRequest::NotAllowed => {
                self.send(author, self.messages.allowed_players_only.clone());
            },
            LobbyRequest::AlreadyActive => {
                self.send(author, self.messages.already_in_lobby.clone());
                self.registry.invite(author);
            },
            LobbyRequest::PlayedOut { played } => {
                self.send_played_lobbies(author, &played);
            },
            LobbyRequest::Create { title } => {
                self.send(BANCHO_BOT, mp_make(&title));
            },
        }
    }

    /// Bancho confirmed a match container: open the session (slot config,
    /// invite, first map) and record the lobby in the played history.
    async fn lobby_created(&mut self, match_id: &str, player: &str) {
        let Some(lobby_url) = self.registry.open_session(match_id, player) else {
            return;
        };
        if let Err(e) = self.store.append_lobby(player, &lobby_url).await {
            tracing::warn!(player, error = %e, "Failed to record the lobby");
        }
    }

    /// Bancho refused to open another match. Only one pending-request
    /// slot exists, so under concurrent requests this can reach the
    /// wrong player; known limitation.
    fn relay_no_more_matches(&mut self) {
        match self.policy.last_requester() {
            Some(requester) => {
                let requester = requester.to_string();
                self.send(&requester, self.messages.lobby_full.clone());
            },
            None => {
                tracing::warn!("Bancho refused a match but no requester is on record");
            },
        }
    }

    fn send_played_lobbies(&self, player: &str, urls: &[String]) {
        let joined = urls.join(" - ");
        let text = fill(&self.messages.played_lobbies, "lobby_urls", &joined);
        self.send(player, text);
    }

    async fn refresh_played(&mut self) {
        let roster = match self.store.get_players().await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read the player roster, using no filter");
                Vec::new()
            },
        };
        match self.store.get_played_lobbies(&roster).await {
            Ok(played) => self.played = played,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh played lobbies, keeping the last snapshot");
            },
        }
    }

    /// Force-close every active session, e.g. on shutdown.
    pub fn shutdown(&mut self) {
        self.registry.close_all();
    }
}
