/// Configuration for the Google Sheets stores.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// The spreadsheet holding every tab the bot uses.
    pub spreadsheet_id: String,
    /// A1 range of the mappool tab; the mod column and the beatmap id
    /// column are read from each row.
    pub mappool_range: String,
    /// A1 range of the played-lobbies tab: one `player, lobby_url` row
    /// per played lobby.
    pub lobbies_range: String,
    /// A1 range of the scores tab: `player, beatmap_id, score` rows.
    pub scores_range: String,
    /// A1 range of the roster tab: `player_id, player_name` rows.
    pub players_range: String,
    /// OAuth bearer token for the Sheets API.
    pub token: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            mappool_range: "Mappool!A2:G".to_string(),
            lobbies_range: "Lobbies!A2:B".to_string(),
            scores_range: "Scores!A2:C".to_string(),
            players_range: "Players!A2:B".to_string(),
            token: String::new(),
        }
    }
}
