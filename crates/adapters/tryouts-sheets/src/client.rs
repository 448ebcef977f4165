use std::collections::HashMap;

use serde::Deserialize;

use tryouts_core::beatmap::{Beatmap, Modifier};
use tryouts_core::store::{
    MappoolProvider, PlayedLobby, PlayedLobbyStore, PlayersStore, ScoreStore, StoreError,
};

use crate::config::SheetsConfig;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Index of the mod column on the mappool tab; the beatmap id sits in
/// the last column of each row.
const MAPPOOL_MOD_COLUMN: usize = 5;

/// Google Sheets values API client backing all four stores.
pub struct SheetsClient {
    config: SheetsConfig,
    client: reqwest::Client,
}

/// Partial Sheets API response for a values read.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("tryouts-bot/0.1")
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    async fn values_get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = format!(
            "{API_BASE}/{}/values/{range}",
            self.config.spreadsheet_id
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }
        let range: ValueRange = resp
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(range.values)
    }

    async fn values_append(&self, range: &str, row: Vec<String>) -> Result<(), StoreError> {
        tracing::info!(range, ?row, "Appending to sheet");
        let url = format!(
            "{API_BASE}/{}/values/{range}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.config.spreadsheet_id
        );
        let body = serde_json::json!({ "values": [row] });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }
        Ok(())
    }
}

impl MappoolProvider for SheetsClient {
    async fn get_mappool(&self) -> Result<Vec<Beatmap>, StoreError> {
        tracing::info!("Reading the mappool sheet");
        let rows = self.values_get(&self.config.mappool_range).await?;
        let mappool = parse_mappool_rows(&rows);
        tracing::info!(maps = mappool.len(), "Collected the mappool");
        Ok(mappool)
    }
}

impl PlayedLobbyStore for SheetsClient {
    async fn get_played_lobbies(
        &self,
        players: &[String],
    ) -> Result<HashMap<String, Vec<PlayedLobby>>, StoreError> {
        let rows = self.values_get(&self.config.lobbies_range).await?;
        Ok(group_played(&rows, players))
    }

    async fn append_lobby(&self, player: &str, lobby_url: &str) -> Result<(), StoreError> {
        self.values_append(
            &self.config.lobbies_range,
            vec![player.to_string(), lobby_url.to_string()],
        )
        .await
    }
}

impl ScoreStore for SheetsClient {
    async fn append_score(
        &self,
        player: &str,
        score: u64,
        beatmap_id: &str,
    ) -> Result<(), StoreError> {
        self.values_append(
            &self.config.scores_range,
            vec![player.to_string(), beatmap_id.to_string(), score.to_string()],
        )
        .await
    }
}

impl PlayersStore for SheetsClient {
    async fn get_players(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.values_get(&self.config.players_range).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(1))
            .filter(|name| !name.is_empty())
            .cloned()
            .collect())
    }

    async fn add_player(&self, player_id: &str, player_name: &str) -> Result<(), StoreError> {
        self.values_append(
            &self.config.players_range,
            vec![player_id.to_string(), player_name.to_string()],
        )
        .await
    }
}

/// Turn mappool rows into the rotation. Rows missing the mod or the
/// beatmap id column are skipped with a warning rather than aborting
/// the whole load.
fn parse_mappool_rows(rows: &[Vec<String>]) -> Vec<Beatmap> {
    let mut mappool = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let beatmap_id = row.last().filter(|id| !id.is_empty());
        let raw_mod = row.get(MAPPOOL_MOD_COLUMN).filter(|m| !m.is_empty());
        match (beatmap_id, raw_mod) {
            (Some(id), Some(raw)) => {
                mappool.push(Beatmap::new(id.clone(), Modifier::parse(raw)));
            },
            _ => {
                tracing::warn!(row = i, "Skipping malformed mappool row");
            },
        }
    }
    mappool
}

/// Group played-lobby rows by player. An empty `players` filter keeps
/// every row.
fn group_played(rows: &[Vec<String>], players: &[String]) -> HashMap<String, Vec<PlayedLobby>> {
    let mut grouped: HashMap<String, Vec<PlayedLobby>> = HashMap::new();
    for row in rows {
        let (Some(player), Some(url)) = (row.first(), row.get(1)) else {
            continue;
        };
        if player.is_empty() || url.is_empty() {
            continue;
        }
        if !players.is_empty() && !players.contains(player) {
            continue;
        }
        grouped.entry(player.clone()).or_default().push(PlayedLobby {
            lobby_url: url.clone(),
        });
    }
    grouped
}
