//! Classification of the inbound chat stream. Bancho reports lobby
//! activity as free-form text on fixed templates; players issue literal
//! `!command` messages. Classification is an ordered rule list, first
//! match wins, so it stays deterministic and testable away from the
//! transport. Unrecognized text classifies to `None` and is dropped by
//! the caller.

/// How a chat event reached the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEventKind {
    /// Private message to the bot.
    Private,
    /// Message in a channel the bot sits in.
    Channel,
    /// The bot was removed from `target`; the channel is gone.
    Kicked,
}

/// A parsed chat event from the transport: who said what, where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub sender: String,
    pub target: String,
    pub text: String,
    pub kind: ChatEventKind,
}

impl ChatEvent {
    pub fn new(
        sender: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
        kind: ChatEventKind,
    ) -> Self {
        Self {
            sender: sender.into(),
            target: target.into(),
            text: text.into(),
            kind,
        }
    }
}

/// Session-relevant events extracted from BanchoBot text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanchoEvent {
    /// `Created the tournament match https://osu.ppy.sh/mp/<id> <player>`
    MatchCreated { match_id: String, player: String },
    /// Bancho refused to open another tournament match.
    NoMoreMatches,
    /// `Stats for (<name>)[https://osu.ppy.sh/u/<id>] ...`
    StatsReply {
        player_name: String,
        player_id: String,
    },
    AllReady,
    CountdownFinished,
    MatchStarted,
    /// `<name> finished playing (Score: <n>, PASSED).`
    PlayerFinished { player: String, score: Option<u64> },
    /// `<name> joined in slot 1.`
    JoinedSlotOne { player: String },
    /// `<name> left the game.`
    LeftGame { player: String },
}

/// Commands players may issue, matched against the full message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Invite,
    Abort,
    Skip,
    Quit,
}

impl PlayerCommand {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "!play" => Some(Self::Play),
            "!invite" => Some(Self::Invite),
            "!abort" => Some(Self::Abort),
            "!skip" => Some(Self::Skip),
            "!quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Registry keys are single tokens: player names with spaces are carried
/// by Bancho verbatim in lobby reports but as underscores on IRC.
pub fn normalize_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// The inverse form, for matching against rosters kept with spaces.
pub fn spaced_name(name: &str) -> String {
    name.replace('_', " ")
}

enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
    Contains(&'static str),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Exact(p) => text == *p,
            Self::Prefix(p) => text.starts_with(p),
            Self::Contains(p) => text.contains(p),
        }
    }
}

struct Rule {
    pattern: Pattern,
    extract: fn(&str) -> Option<BanchoEvent>,
}

/// Bancho private messages, checked in priority order.
const PRIVATE_RULES: &[Rule] = &[
    Rule {
        pattern: Pattern::Prefix("Created the tournament"),
        extract: extract_match_created,
    },
    Rule {
        pattern: Pattern::Prefix("You cannot create any more tournament matches."),
        extract: |_| Some(BanchoEvent::NoMoreMatches),
    },
    Rule {
        pattern: Pattern::Prefix("Stats for"),
        extract: extract_stats_reply,
    },
];

/// Bancho channel messages, checked in priority order. The exact-match
/// rules come first so a player name can never shadow them.
const CHANNEL_RULES: &[Rule] = &[
    Rule {
        pattern: Pattern::Exact("All players are ready"),
        extract: |_| Some(BanchoEvent::AllReady),
    },
    Rule {
        pattern: Pattern::Exact("Countdown finished"),
        extract: |_| Some(BanchoEvent::CountdownFinished),
    },
    Rule {
        pattern: Pattern::Exact("The match has started!"),
        extract: |_| Some(BanchoEvent::MatchStarted),
    },
    Rule {
        pattern: Pattern::Contains("finished playing"),
        extract: extract_player_finished,
    },
    Rule {
        pattern: Pattern::Contains("joined in slot 1"),
        extract: extract_joined_slot_one,
    },
    Rule {
        pattern: Pattern::Contains("left the game."),
        extract: extract_left_game,
    },
];

/// Classify a private message from the Bancho account.
pub fn classify_private(text: &str) -> Option<BanchoEvent> {
    classify(PRIVATE_RULES, text)
}

/// Classify a channel message from the Bancho account.
pub fn classify_channel(text: &str) -> Option<BanchoEvent> {
    classify(CHANNEL_RULES, text)
}

fn classify(rules: &[Rule], text: &str) -> Option<BanchoEvent> {
    rules
        .iter()
        .find(|rule| rule.pattern.matches(text))
        .and_then(|rule| (rule.extract)(text))
}

/// `Created the tournament match https://osu.ppy.sh/mp/106754 cavit`
/// The match id is the tail path segment of the URL; the player is the
/// final whitespace token (IRC nicks never contain spaces).
fn extract_match_created(text: &str) -> Option<BanchoEvent> {
    let (_, url_tail) = text.rsplit_once('/')?;
    let match_id = url_tail.split_whitespace().next()?;
    let player = text.split_whitespace().next_back()?;
    if match_id.is_empty() || !match_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(BanchoEvent::MatchCreated {
        match_id: match_id.to_string(),
        player: normalize_name(player),
    })
}

/// `Stats for (cavit)[https://osu.ppy.sh/u/5316406] is Idle:`
fn extract_stats_reply(text: &str) -> Option<BanchoEvent> {
    let (_, after_paren) = text.split_once('(')?;
    let (player_name, _) = after_paren.rsplit_once(')')?;
    let (_, after_bracket) = text.split_once('[')?;
    let (url, _) = after_bracket.split_once(']')?;
    let (_, player_id) = url.rsplit_once('/')?;
    if player_id.is_empty() {
        return None;
    }
    Some(BanchoEvent::StatsReply {
        player_name: player_name.to_string(),
        player_id: player_id.to_string(),
    })
}

/// `cavit finished playing (Score: 113330, PASSED).`
fn extract_player_finished(text: &str) -> Option<BanchoEvent> {
    let (player, rest) = text.split_once(" finished playing")?;
    let score = rest.split_once("Score: ").and_then(|(_, tail)| {
        let digits: String = tail
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    });
    Some(BanchoEvent::PlayerFinished {
        player: normalize_name(player),
        score,
    })
}

fn extract_joined_slot_one(text: &str) -> Option<BanchoEvent> {
    let (player, _) = text.split_once(" joined in slot")?;
    Some(BanchoEvent::JoinedSlotOne {
        player: normalize_name(player),
    })
}

fn extract_left_game(text: &str) -> Option<BanchoEvent> {
    let (player, _) = text.split_once(" left the game")?;
    Some(BanchoEvent::LeftGame {
        player: normalize_name(player),
    })
}
