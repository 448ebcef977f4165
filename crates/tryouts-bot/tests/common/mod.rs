#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use tryouts_bot::config::{MessagesConfig, RulesConfig, TournamentConfig};
use tryouts_bot::dispatcher::Dispatcher;
use tryouts_bot::policy::TournamentPolicy;
use tryouts_bot::registry::SessionRegistry;
use tryouts_core::beatmap::{Beatmap, Modifier};
use tryouts_core::commands::Outbound;
use tryouts_core::events::{ChatEvent, ChatEventKind};
use tryouts_core::store::{
    PlayedLobby, PlayedLobbyStore, PlayersStore, ScoreStore, StoreError,
};

/// In-memory stand-in for the spreadsheet collaborator. Shared behind an
/// Arc so tests can inspect writes after handing a clone to the bot.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    played: Mutex<HashMap<String, Vec<PlayedLobby>>>,
    lobbies: Mutex<Vec<(String, String)>>,
    scores: Mutex<Vec<(String, u64, String)>>,
    roster: Mutex<Vec<(String, String)>>,
    failing: Mutex<bool>,
}

impl MemoryStore {
    pub fn record_played(&self, player: &str, lobby_url: &str) {
        self.inner
            .played
            .lock()
            .unwrap()
            .entry(player.to_string())
            .or_default()
            .push(PlayedLobby {
                lobby_url: lobby_url.to_string(),
            });
    }

    /// Make every store call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        *self.inner.failing.lock().unwrap() = failing;
    }

    pub fn appended_lobbies(&self) -> Vec<(String, String)> {
        self.inner.lobbies.lock().unwrap().clone()
    }

    pub fn scores(&self) -> Vec<(String, u64, String)> {
        self.inner.scores.lock().unwrap().clone()
    }

    pub fn roster(&self) -> Vec<(String, String)> {
        self.inner.roster.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.inner.failing.lock().unwrap() {
            Err(StoreError::Http("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PlayedLobbyStore for MemoryStore {
    async fn get_played_lobbies(
        &self,
        _players: &[String],
    ) -> Result<HashMap<String, Vec<PlayedLobby>>, StoreError> {
        self.check()?;
        Ok(self.inner.played.lock().unwrap().clone())
    }

    async fn append_lobby(&self, player: &str, lobby_url: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .lobbies
            .lock()
            .unwrap()
            .push((player.to_string(), lobby_url.to_string()));
        Ok(())
    }
}

impl ScoreStore for MemoryStore {
    async fn append_score(
        &self,
        player: &str,
        score: u64,
        beatmap_id: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .scores
            .lock()
            .unwrap()
            .push((player.to_string(), score, beatmap_id.to_string()));
        Ok(())
    }
}

impl PlayersStore for MemoryStore {
    async fn get_players(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .roster
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn add_player(&self, player_id: &str, player_name: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .roster
            .lock()
            .unwrap()
            .push((player_id.to_string(), player_name.to_string()));
        Ok(())
    }
}

pub const BOT_NICK: &str = "TryoutsBot";

/// A dispatcher wired to an in-memory store and an inspectable outbound
/// queue, fed with hand-built chat events.
pub struct TestBot {
    pub dispatcher: Dispatcher<MemoryStore>,
    pub store: MemoryStore,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

/// A tournament window that is always open.
pub fn open_tournament() -> TournamentConfig {
    TournamentConfig::default()
}

pub fn pool(n: usize) -> Vec<Beatmap> {
    (0..n)
        .map(|i| Beatmap::new(format!("{}", 1000 + i), Modifier::NoMod))
        .collect()
}

impl TestBot {
    pub fn new(maps: usize, tournament: TournamentConfig, rules: RulesConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let store = MemoryStore::default();
        let registry = SessionRegistry::new(
            pool(maps),
            rules.clone(),
            MessagesConfig::default(),
            queue_tx.clone(),
        );
        let policy = TournamentPolicy::new(tournament, rules.max_plays);
        let dispatcher = Dispatcher::new(
            registry,
            policy,
            store.clone(),
            MessagesConfig::default(),
            queue_tx,
        );
        Self {
            dispatcher,
            store,
            outbound: queue_rx,
        }
    }

    pub async fn bancho_private(&mut self, text: &str) {
        self.dispatcher
            .handle_event(ChatEvent::new(
                "BanchoBot",
                BOT_NICK,
                text,
                ChatEventKind::Private,
            ))
            .await;
    }

    pub async fn bancho_channel(&mut self, channel: &str, text: &str) {
        self.dispatcher
            .handle_event(ChatEvent::new(
                "BanchoBot",
                channel,
                text,
                ChatEventKind::Channel,
            ))
            .await;
    }

    pub async fn player_private(&mut self, player: &str, text: &str) {
        self.dispatcher
            .handle_event(ChatEvent::new(
                player,
                BOT_NICK,
                text,
                ChatEventKind::Private,
            ))
            .await;
    }

    pub async fn player_channel(&mut self, player: &str, channel: &str, text: &str) {
        self.dispatcher
            .handle_event(ChatEvent::new(player, channel, text, ChatEventKind::Channel))
            .await;
    }

    pub async fn kicked(&mut self, channel: &str) {
        self.dispatcher
            .handle_event(ChatEvent::new(
                "BanchoBot",
                channel,
                "",
                ChatEventKind::Kicked,
            ))
            .await;
    }

    /// Drain everything queued for sending so far.
    pub fn sent(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn sent_texts(&mut self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }
}
