use std::collections::HashMap;

use chrono::{DateTime, Utc};

use tryouts_core::events::spaced_name;
use tryouts_core::store::PlayedLobby;

use crate::config::TournamentConfig;

/// Outcome of a lobby request, decided before any session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyRequest {
    /// The tournament window hasn't opened yet.
    NotStarted,
    /// The tournament is over; includes the player's lobby history when
    /// they played.
    Ended { played: Vec<String> },
    /// An allow-list is configured and the player isn't on it.
    NotAllowed,
    /// The player already has an open lobby; re-invite instead.
    AlreadyActive,
    /// The player used up their allowed plays.
    PlayedOut { played: Vec<String> },
    /// All gates passed: ask Bancho for a match with this title.
    Create { title: String },
}

/// Gates player-initiated lobby requests: time window, allow-list,
/// play-count. Holds the single "last requester" slot used to relay
/// Bancho's "no more matches" refusal; concurrent requests can in
/// principle reply to the wrong requester, a known limitation.
pub struct TournamentPolicy {
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    allowed_players: Vec<String>,
    max_plays: usize,
    last_requester: Option<String>,
}

impl TournamentPolicy {
    pub fn new(tournament: TournamentConfig, max_plays: usize) -> Self {
        Self {
            name: tournament.name,
            start: tournament.start,
            end: tournament.end,
            allowed_players: tournament.allowed_players,
            max_plays,
            last_requester: None,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whoever most recently passed the gates and asked for a match.
    pub fn last_requester(&self) -> Option<&str> {
        self.last_requester.as_deref()
    }

    /// Evaluate a `!play` request. Pure given the clock, the active flag
    /// and the played-lobby snapshot; the caller turns the verdict into
    /// chat messages and commands.
    pub fn evaluate(
        &mut self,
        player: &str,
        now: DateTime<Utc>,
        has_active_session: bool,
        played: &HashMap<String, Vec<PlayedLobby>>,
    ) -> LobbyRequest {
        if now < self.start {
            return LobbyRequest::NotStarted;
        }
        if now >= self.end {
            return LobbyRequest::Ended {
                played: lobby_urls(played, player),
            };
        }
        if !self.allowed_players.is_empty() && !self.is_allowed(player) {
            return LobbyRequest::NotAllowed;
        }
        if has_active_session {
            return LobbyRequest::AlreadyActive;
        }
        let urls = lobby_urls(played, player);
        if urls.len() >= self.max_plays {
            return LobbyRequest::PlayedOut { played: urls };
        }
        self.last_requester = Some(player.to_string());
        LobbyRequest::Create {
            title: format!("{} - {}", self.name, player),
        }
    }

    /// Allow-list check against both the literal name and the spaced
    /// variant, since rosters are kept with spaces but IRC nicks use
    /// underscores.
    fn is_allowed(&self, player: &str) -> bool {
        let spaced = spaced_name(player);
        self.allowed_players
            .iter()
            .any(|allowed| allowed == player || allowed == &spaced)
    }
}

/// A player's recorded lobby URLs, looked up under both name variants.
fn lobby_urls(played: &HashMap<String, Vec<PlayedLobby>>, player: &str) -> Vec<String> {
    let spaced = spaced_name(player);
    played
        .get(player)
        .or_else(|| played.get(&spaced))
        .map(|lobbies| lobbies.iter().map(|l| l.lobby_url.clone()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tournament() -> TournamentConfig {
        TournamentConfig {
            name: "5WC Tryouts".to_string(),
            start: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap(),
            allowed_players: Vec::new(),
        }
    }

    fn played_one(player: &str) -> HashMap<String, Vec<PlayedLobby>> {
        let mut map = HashMap::new();
        map.insert(
            player.to_string(),
            vec![PlayedLobby {
                lobby_url: "https://osu.ppy.sh/community/matches/1".to_string(),
            }],
        );
        map
    }

    #[test]
    fn request_before_start_is_rejected() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, false, &HashMap::new());
        assert_eq!(verdict, LobbyRequest::NotStarted);
        assert_eq!(policy.last_requester(), None);
    }

    #[test]
    fn request_after_end_reports_history() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, false, &played_one("cavit"));
        assert_eq!(
            verdict,
            LobbyRequest::Ended {
                played: vec!["https://osu.ppy.sh/community/matches/1".to_string()],
            }
        );
    }

    #[test]
    fn allow_list_matches_both_name_variants() {
        let mut config = tournament();
        config.allowed_players = vec!["Mad Max".to_string()];
        let mut policy = TournamentPolicy::new(config, 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();

        let verdict = policy.evaluate("Mad_Max", now, false, &HashMap::new());
        assert!(matches!(verdict, LobbyRequest::Create { .. }));

        let verdict = policy.evaluate("someone_else", now, false, &HashMap::new());
        assert_eq!(verdict, LobbyRequest::NotAllowed);
    }

    #[test]
    fn active_session_wins_over_play_count() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, true, &played_one("cavit"));
        assert_eq!(verdict, LobbyRequest::AlreadyActive);
    }

    #[test]
    fn played_out_reports_history() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, false, &played_one("cavit"));
        assert_eq!(
            verdict,
            LobbyRequest::PlayedOut {
                played: vec!["https://osu.ppy.sh/community/matches/1".to_string()],
            }
        );
    }

    #[test]
    fn history_under_the_spaced_name_still_counts() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("Mad_Max", now, false, &played_one("Mad Max"));
        assert!(matches!(verdict, LobbyRequest::PlayedOut { .. }));
    }

    #[test]
    fn create_records_the_last_requester() {
        let mut policy = TournamentPolicy::new(tournament(), 1);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, false, &HashMap::new());
        assert_eq!(
            verdict,
            LobbyRequest::Create {
                title: "5WC Tryouts - cavit".to_string(),
            }
        );
        assert_eq!(policy.last_requester(), Some("cavit"));
    }

    #[test]
    fn second_play_allowed_when_max_plays_is_two() {
        let mut policy = TournamentPolicy::new(tournament(), 2);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let verdict = policy.evaluate("cavit", now, false, &played_one("cavit"));
        assert!(matches!(verdict, LobbyRequest::Create { .. }));
    }
}
