use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Top-level bot configuration, loaded from `tryouts.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub irc: IrcConfig,
    pub tournament: TournamentConfig,
    pub rules: RulesConfig,
    pub sheets: SheetsFileConfig,
    pub messages: MessagesConfig,
    pub limits: LimitsConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            irc: IrcConfig::default(),
            tournament: TournamentConfig::default(),
            rules: RulesConfig::default(),
            sheets: SheetsFileConfig::default(),
            messages: MessagesConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Bancho IRC endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    /// IRC server password (the osu! IRC token). Prefer the
    /// TRYOUTS_IRC_PASSWORD env var over putting it in the file.
    pub password: Option<String>,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "irc.ppy.sh".to_string(),
            port: 6667,
            nickname: String::new(),
            password: None,
        }
    }
}

/// Tournament identity and signup window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub name: String,
    /// Lobby requests before this instant are rejected.
    pub start: DateTime<Utc>,
    /// Lobby requests at or after this instant are rejected.
    pub end: DateTime<Utc>,
    /// Optional allow-list. Empty means no restriction.
    pub allowed_players: Vec<String>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            name: "osu! Tryouts".to_string(),
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
            allowed_players: Vec::new(),
        }
    }
}

/// Per-session tournament rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disconnect strikes tolerated before the session is forfeited.
    pub max_leaves: u32,
    /// Aborts allowed per session.
    pub max_aborts: u32,
    /// How many lobbies one player may play over the whole tournament.
    pub max_plays: usize,
    /// Readiness timer between maps.
    pub ready_wait_secs: u64,
    /// Extended grace timer after a disconnect.
    pub disconnect_wait_secs: u64,
    /// Countdown passed to `!mp start`.
    pub start_countdown_secs: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_leaves: 1,
            max_aborts: 1,
            max_plays: 1,
            ready_wait_secs: 120,
            disconnect_wait_secs: 300,
            start_countdown_secs: 5,
        }
    }
}

/// Spreadsheet ids and ranges for the sheets adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsFileConfig {
    pub spreadsheet_id: String,
    pub mappool_range: String,
    pub lobbies_range: String,
    pub scores_range: String,
    pub players_range: String,
    /// OAuth bearer token. Prefer the TRYOUTS_SHEETS_TOKEN env var.
    pub token: Option<String>,
}

impl Default for SheetsFileConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            mappool_range: "Mappool!A2:G".to_string(),
            lobbies_range: "Lobbies!A2:B".to_string(),
            scores_range: "Scores!A2:C".to_string(),
            players_range: "Players!A2:B".to_string(),
            token: None,
        }
    }
}

/// User-visible chat text. Placeholders in braces are substituted at
/// send time; see each field for the names it supports.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Lines sent when the player first joins their lobby.
    pub greetings: Vec<String>,
    /// Supports `{start_time}`.
    pub not_started: String,
    /// Supports `{end_time}`.
    pub ended: String,
    pub lobby_full: String,
    pub no_aborts_left: String,
    pub allowed_players_only: String,
    pub already_in_lobby: String,
    /// Supports `{lobby_urls}`.
    pub played_lobbies: String,
    /// Supports `{leaves_left}`, `{leave_count}`, `{max_leaves}`.
    pub leave_detected: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            greetings: vec![
                "Welcome to your tryouts lobby!".to_string(),
                "Maps rotate automatically. The match starts when you ready up or the timer runs out.".to_string(),
                "Commands: !abort, !skip, !quit".to_string(),
            ],
            not_started: "The tryouts have not started yet! They begin at {start_time} UTC."
                .to_string(),
            ended: "The tryouts ended at {end_time} UTC. Thanks for your interest!".to_string(),
            lobby_full: "Bancho cannot open any more lobbies right now. Please try again in a few minutes.".to_string(),
            no_aborts_left: "You have no aborts left, the match keeps going.".to_string(),
            allowed_players_only: "You are not on the tryouts player list. Contact the staff if you think this is a mistake.".to_string(),
            already_in_lobby: "You already have an open lobby, sending you a fresh invite.".to_string(),
            played_lobbies: "Your played lobbies: {lobby_urls}".to_string(),
            leave_detected: "Welcome back! Disconnects left: {leaves_left} ({leave_count}/{max_leaves} used).".to_string(),
        }
    }
}

/// Infrastructure limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Minimum gap between outbound sends, Bancho's chat rate limit.
    pub send_interval_millis: u64,
    /// Inbound event channel depth.
    pub event_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            send_interval_millis: 1000,
            event_buffer: 256,
        }
    }
}

/// Substitute a single `{name}` placeholder.
pub fn fill(template: &str, name: &str, value: &str) -> String {
    template.replace(&format!("{{{name}}}"), value)
}

impl BotConfig {
    /// Validate configuration, exiting on fatal misconfiguration.
    pub fn validate(&self) {
        if self.irc.nickname.is_empty() {
            tracing::error!("irc.nickname must be set");
            std::process::exit(1);
        }
        if self.irc.password.is_none() {
            tracing::warn!("irc.password is not set; Bancho will refuse the login");
        }
        if self.tournament.start >= self.tournament.end {
            tracing::error!(
                start = %self.tournament.start,
                end = %self.tournament.end,
                "tournament.start must be before tournament.end"
            );
            std::process::exit(1);
        }
        if self.sheets.spreadsheet_id.is_empty() {
            tracing::error!("sheets.spreadsheet_id must be set");
            std::process::exit(1);
        }
        if self.sheets.token.is_none() {
            tracing::error!("sheets.token must be set (TRYOUTS_SHEETS_TOKEN)");
            std::process::exit(1);
        }
        if self.rules.max_plays == 0 {
            tracing::error!("rules.max_plays must be > 0");
            std::process::exit(1);
        }
        if self.rules.ready_wait_secs == 0 {
            tracing::error!("rules.ready_wait_secs must be > 0");
            std::process::exit(1);
        }
        if self.rules.disconnect_wait_secs == 0 {
            tracing::error!("rules.disconnect_wait_secs must be > 0");
            std::process::exit(1);
        }
        if self.limits.send_interval_millis == 0 {
            tracing::error!("limits.send_interval_millis must be > 0");
            std::process::exit(1);
        }
        if self.limits.event_buffer == 0 {
            tracing::error!("limits.event_buffer must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `tryouts.toml` if it exists, then apply env var
    /// overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("tryouts.toml") {
            Ok(content) => match toml::from_str::<BotConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from tryouts.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse tryouts.toml: {e}, using defaults");
                    BotConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No tryouts.toml found, using defaults");
                BotConfig::default()
            },
        };

        if let Ok(nick) = std::env::var("TRYOUTS_IRC_NICKNAME")
            && !nick.is_empty()
        {
            config.irc.nickname = nick;
        }
        if let Ok(password) = std::env::var("TRYOUTS_IRC_PASSWORD")
            && !password.is_empty()
        {
            config.irc.password = Some(password);
        }
        if let Ok(id) = std::env::var("TRYOUTS_SPREADSHEET_ID")
            && !id.is_empty()
        {
            config.sheets.spreadsheet_id = id;
        }
        if let Ok(token) = std::env::var("TRYOUTS_SHEETS_TOKEN")
            && !token.is_empty()
        {
            config.sheets.token = Some(token);
        }
        if let Ok(val) = std::env::var("TRYOUTS_SEND_INTERVAL_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.limits.send_interval_millis = n;
        }

        config
    }
}
