// Provider snapshot types: leagues, rosters, users, matchups, brackets.
//
// Field names follow the Sleeper wire format so the HTTP adapter can
// deserialize responses directly. Every type here is an immutable input to
// the history pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// League
// ---------------------------------------------------------------------------

/// Lifecycle status reported by the provider for a league season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueStatus {
    PreDraft,
    Drafting,
    InSeason,
    Complete,
    #[serde(other)]
    Unknown,
}

impl LeagueStatus {
    /// True when no games can have been played yet.
    pub fn is_pre_season(&self) -> bool {
        matches!(self, LeagueStatus::PreDraft | LeagueStatus::Drafting)
    }
}

/// League-level settings relevant to week windows and playoffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSettings {
    /// First playoff week. 0 means the league has no playoffs configured.
    #[serde(default)]
    pub playoff_week_start: u32,
    #[serde(default)]
    pub playoff_teams: Option<u32>,
    /// Explicit final week of the championship, when the provider sends one.
    #[serde(default)]
    pub playoff_week_end: Option<u32>,
    #[serde(default)]
    pub last_scored_leg: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub league_id: String,
    #[serde(default)]
    pub name: String,
    pub season: String,
    pub status: LeagueStatus,
    #[serde(default, deserialize_with = "league_ref")]
    pub previous_league_id: Option<String>,
    #[serde(default)]
    pub settings: LeagueSettings,
    #[serde(default)]
    pub scoring_settings: Value,
}

impl League {
    /// Numeric season year, used for chronological ordering.
    pub fn season_year(&self) -> Option<i32> {
        self.season.trim().parse().ok()
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Season totals as the provider reports them. Points arrive split into an
/// integer part and a two-digit decimal part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSettings {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    #[serde(default)]
    pub fpts: u32,
    #[serde(default)]
    pub fpts_decimal: u32,
    #[serde(default)]
    pub fpts_against: u32,
    #[serde(default)]
    pub fpts_against_decimal: u32,
    /// Final playoff placement (1 = champion, 2 = runner-up), when recorded.
    #[serde(default)]
    pub playoff_finish: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub roster_id: u32,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub settings: RosterSettings,
}

impl Roster {
    pub fn wins(&self) -> u32 {
        self.settings.wins
    }

    pub fn losses(&self) -> u32 {
        self.settings.losses
    }

    pub fn ties(&self) -> u32 {
        self.settings.ties
    }

    pub fn games(&self) -> u32 {
        self.settings.wins + self.settings.losses + self.settings.ties
    }

    pub fn points_for(&self) -> f64 {
        join_points(self.settings.fpts, self.settings.fpts_decimal)
    }

    pub fn points_against(&self) -> f64 {
        join_points(self.settings.fpts_against, self.settings.fpts_against_decimal)
    }

    /// Win rate with ties counted as half a win. 0.0 for a roster with no games.
    pub fn win_rate(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        (self.wins() as f64 + 0.5 * self.ties() as f64) / games as f64
    }
}

fn join_points(whole: u32, hundredths: u32) -> f64 {
    whole as f64 + hundredths as f64 / 100.0
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub metadata: Option<UserMetadata>,
}

// ---------------------------------------------------------------------------
// Matchup
// ---------------------------------------------------------------------------

/// One roster's row for one week. Two rows sharing a `matchup_id` form a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub roster_id: u32,
    #[serde(default)]
    pub matchup_id: Option<u32>,
    #[serde(default)]
    pub points: f64,
}

// ---------------------------------------------------------------------------
// Playoff bracket
// ---------------------------------------------------------------------------

/// One match of the winners bracket.
///
/// Team slots may be unresolved (`None`) early in the playoffs; the provider
/// encodes those as objects pointing at a feeder match, which deserialize to
/// `None` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketMatch {
    #[serde(rename = "r")]
    pub round: u32,
    #[serde(rename = "m")]
    pub match_id: u32,
    #[serde(rename = "t1", default, deserialize_with = "roster_slot")]
    pub team_one: Option<u32>,
    #[serde(rename = "t2", default, deserialize_with = "roster_slot")]
    pub team_two: Option<u32>,
    #[serde(rename = "w", default)]
    pub winner: Option<u32>,
    #[serde(rename = "l", default)]
    pub loser: Option<u32>,
    #[serde(rename = "p", default)]
    pub placement: Option<u32>,
}

impl BracketMatch {
    pub fn members(&self) -> impl Iterator<Item = u32> {
        self.team_one.into_iter().chain(self.team_two)
    }
}

// ---------------------------------------------------------------------------
// Provider state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NflState {
    pub season: String,
    #[serde(default)]
    pub week: u32,
    #[serde(default)]
    pub season_type: String,
}

// ---------------------------------------------------------------------------
// Deserialization helpers
// ---------------------------------------------------------------------------

/// The provider sends `null`, `"0"` or a real id for league backlinks.
fn league_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.is_empty() && id != "0"))
}

fn roster_slot<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_u64().and_then(|id| u32::try_from(id).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_backlink_zero_is_none() {
        let json = r#"{
            "league_id": "200",
            "season": "2023",
            "status": "complete",
            "previous_league_id": "0",
            "settings": { "playoff_week_start": 15, "playoff_teams": 6 }
        }"#;
        let league: League = serde_json::from_str(json).unwrap();
        assert_eq!(league.previous_league_id, None);
        assert_eq!(league.settings.playoff_week_start, 15);
        assert_eq!(league.season_year(), Some(2023));
    }

    #[test]
    fn unknown_status_does_not_fail() {
        let json = r#"{ "league_id": "1", "season": "2020", "status": "postponed" }"#;
        let league: League = serde_json::from_str(json).unwrap();
        assert_eq!(league.status, LeagueStatus::Unknown);
    }

    #[test]
    fn roster_points_join_decimal_part() {
        let json = r#"{
            "roster_id": 3,
            "owner_id": "u3",
            "settings": { "wins": 9, "losses": 5, "fpts": 1650, "fpts_decimal": 42,
                          "fpts_against": 1500, "fpts_against_decimal": 8 }
        }"#;
        let roster: Roster = serde_json::from_str(json).unwrap();
        assert!((roster.points_for() - 1650.42).abs() < 1e-9);
        assert!((roster.points_against() - 1500.08).abs() < 1e-9);
        assert_eq!(roster.games(), 14);
    }

    #[test]
    fn bracket_feeder_slots_are_unresolved() {
        let json = r#"{ "r": 2, "m": 5, "t1": { "w": 1 }, "t2": 4, "w": null, "l": null }"#;
        let m: BracketMatch = serde_json::from_str(json).unwrap();
        assert_eq!(m.team_one, None);
        assert_eq!(m.team_two, Some(4));
        assert_eq!(m.members().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn bye_week_matchup_has_no_id() {
        let json = r#"{ "roster_id": 7, "matchup_id": null, "points": 0.0 }"#;
        let m: Matchup = serde_json::from_str(json).unwrap();
        assert_eq!(m.matchup_id, None);
    }
}
