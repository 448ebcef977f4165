//! The outbound command vocabulary spoken to Bancho. Everything the bot
//! ever sends is one of these fixed `!mp`/`!stats` forms or a plain chat
//! message; keeping the renderers in one place keeps the wire text exact.

/// One outbound chat line: `text` delivered to `target` (player or channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub target: String,
    pub text: String,
}

impl Outbound {
    pub fn new(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
        }
    }
}

/// Bancho's tournament bot account. All match-control commands and the
/// authoritative event stream go through this nick.
pub const BANCHO_BOT: &str = "BanchoBot";

/// Create a tournament match with the given title
/// (conventionally `<tournament> - <player>`).
pub fn mp_make(title: &str) -> String {
    format!("!mp make {title}")
}

/// Lock the lobby to one slot, head-to-head, score scoring.
pub fn mp_set_slots() -> String {
    "!mp set 0 3 1".to_string()
}

pub fn mp_invite(player: &str) -> String {
    format!("!mp invite {player}")
}

/// Start a Bancho-side countdown. Both readiness waits and disconnect
/// grace periods use this; the bot never runs timers of its own.
pub fn mp_timer(seconds: u64) -> String {
    format!("!mp timer {seconds}")
}

pub fn mp_start(countdown_secs: u64) -> String {
    format!("!mp start {countdown_secs}")
}

pub fn mp_abort() -> String {
    "!mp abort".to_string()
}

pub fn mp_close() -> String {
    "!mp close".to_string()
}

/// Ask Bancho for a player's profile stats.
pub fn stats(player: &str) -> String {
    format!("!stats {player}")
}
