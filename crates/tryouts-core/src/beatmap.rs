use serde::{Deserialize, Serialize};

/// Mod requirement for a mappool slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// "NM" on the sheet: the map is played with no-fail only.
    NoMod,
    /// "FM" on the sheet: players pick their own mods.
    FreeMod,
    /// Any other mod string (e.g. "HD", "HR", "DT"), carried through literally.
    Other(String),
}

impl Modifier {
    /// Parse a mappool sheet cell. "NM" and "FM" are the closed set;
    /// everything else falls back to `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "NM" => Self::NoMod,
            "FM" => Self::FreeMod,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMod => write!(f, "NM"),
            Self::FreeMod => write!(f, "FM"),
            Self::Other(m) => write!(f, "{m}"),
        }
    }
}

/// One mappool slot: a beatmap and the mods it is played with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beatmap {
    pub beatmap_id: String,
    pub modifier: Modifier,
}

impl Beatmap {
    pub fn new(beatmap_id: impl Into<String>, modifier: Modifier) -> Self {
        Self {
            beatmap_id: beatmap_id.into(),
            modifier,
        }
    }

    /// Render the `!mp` command pair that puts this slot on in a lobby.
    /// The mods line always carries no-fail except for freemod slots,
    /// where Bancho expects the dedicated freemod toggle.
    pub fn to_commands(&self) -> (String, String) {
        let map_cmd = format!("!mp map {}", self.beatmap_id);
        let mods_cmd = match &self.modifier {
            Modifier::NoMod => "!mp mods NF".to_string(),
            Modifier::FreeMod => "!mp mods 1 freemod".to_string(),
            Modifier::Other(m) => format!("!mp mods NF {m}"),
        };
        (map_cmd, mods_cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nomod_renders_plain_nofail() {
        let map = Beatmap::new("1257904", Modifier::parse("NM"));
        let (map_cmd, mods_cmd) = map.to_commands();
        assert_eq!(map_cmd, "!mp map 1257904");
        assert_eq!(mods_cmd, "!mp mods NF");
    }

    #[test]
    fn freemod_renders_freemod_toggle() {
        let map = Beatmap::new("2094934", Modifier::parse("FM"));
        let (_, mods_cmd) = map.to_commands();
        assert_eq!(mods_cmd, "!mp mods 1 freemod");
    }

    #[test]
    fn named_mod_renders_nofail_plus_mod() {
        let map = Beatmap::new("123", Modifier::parse("HR"));
        let (_, mods_cmd) = map.to_commands();
        assert_eq!(mods_cmd, "!mp mods NF HR");
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(Modifier::parse(" NM "), Modifier::NoMod);
        assert_eq!(Modifier::parse(" DT"), Modifier::Other("DT".to_string()));
    }

    proptest! {
        // Every modifier value maps to exactly one rendering rule; strings
        // outside the closed set fall back to no-fail plus the literal mod.
        #[test]
        fn mod_rendering_is_total(raw in "[A-Z]{1,6}( [A-Z]{1,6})?") {
            let map = Beatmap::new("1", Modifier::parse(&raw));
            let (_, mods_cmd) = map.to_commands();
            let trimmed = raw.trim();
            let expected = match trimmed {
                "NM" => "!mp mods NF".to_string(),
                "FM" => "!mp mods 1 freemod".to_string(),
                other => format!("!mp mods NF {other}"),
            };
            prop_assert_eq!(mods_cmd, expected);
        }
    }
}
