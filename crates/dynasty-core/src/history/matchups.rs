// Weekly matchup pairing and game-level record events.
//
// Each week's rows are grouped by matchup id. A group becomes a game only if
// it has exactly two rosters with positive scores; anything else is a bye,
// an unplayed week, or malformed data and is dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::history::records::{retain_best, Record, RecordKind};
use crate::history::weeks::WeekWindow;
use crate::history::OwnerIndex;
use crate::model::Matchup;

/// Margin a game must strictly exceed to count as a blowout.
pub const BLOWOUT_MARGIN: f64 = 30.0;

/// Margin a decided game must stay strictly under to count as close.
pub const CLOSE_GAME_MARGIN: f64 = 10.0;

/// Weekly high/low candidates retained per kind before final ranking.
pub const SCORE_CANDIDATES: usize = 50;

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamScore {
    pub roster_id: u32,
    pub points: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

/// One head-to-head game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub week: u32,
    pub matchup_id: u32,
    pub playoff: bool,
    pub home: TeamScore,
    pub away: TeamScore,
}

impl Game {
    /// Absolute point difference, rounded to the hundredths the provider
    /// scores in so threshold comparisons are exact.
    pub fn margin(&self) -> f64 {
        round_hundredths((self.home.points - self.away.points).abs())
    }

    pub fn is_tie(&self) -> bool {
        self.margin() == 0.0
    }

    pub fn winner(&self) -> Option<TeamScore> {
        if self.is_tie() {
            None
        } else if self.home.points > self.away.points {
            Some(self.home)
        } else {
            Some(self.away)
        }
    }

    pub fn loser(&self) -> Option<TeamScore> {
        let winner = self.winner()?;
        Some(if winner.roster_id == self.home.roster_id {
            self.away
        } else {
            self.home
        })
    }

    pub fn involves(&self, roster_id: u32) -> bool {
        self.home.roster_id == roster_id || self.away.roster_id == roster_id
    }

    /// The side `roster_id` played, and its opponent.
    pub fn sides(&self, roster_id: u32) -> Option<(TeamScore, TeamScore)> {
        if self.home.roster_id == roster_id {
            Some((self.home, self.away))
        } else if self.away.roster_id == roster_id {
            Some((self.away, self.home))
        } else {
            None
        }
    }

    pub fn outcome_for(&self, roster_id: u32) -> Option<Outcome> {
        self.sides(roster_id)?;
        Some(match self.winner() {
            None => Outcome::Tie,
            Some(w) if w.roster_id == roster_id => Outcome::Win,
            Some(_) => Outcome::Loss,
        })
    }

    pub fn is_blowout(&self) -> bool {
        self.margin() > BLOWOUT_MARGIN
    }

    pub fn is_close(&self) -> bool {
        let margin = self.margin();
        margin > 0.0 && margin < CLOSE_GAME_MARGIN
    }
}

pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pair one week's rows into games, ordered by matchup id.
pub fn pair_week(week: u32, rows: &[Matchup], playoff: bool) -> Vec<Game> {
    let mut groups: BTreeMap<u32, Vec<&Matchup>> = BTreeMap::new();
    for row in rows {
        if let Some(id) = row.matchup_id {
            groups.entry(id).or_default().push(row);
        }
    }

    let mut games = Vec::with_capacity(groups.len());
    for (matchup_id, members) in groups {
        let [home, away] = members.as_slice() else {
            debug!(week, matchup_id, members = members.len(), "skipping unpaired matchup group");
            continue;
        };
        if home.points <= 0.0 || away.points <= 0.0 {
            debug!(week, matchup_id, "skipping unscored matchup");
            continue;
        }
        games.push(Game {
            week,
            matchup_id,
            playoff,
            home: TeamScore {
                roster_id: home.roster_id,
                points: home.points,
            },
            away: TeamScore {
                roster_id: away.roster_id,
                points: away.points,
            },
        });
    }
    games
}

// ---------------------------------------------------------------------------
// Season analysis
// ---------------------------------------------------------------------------

/// Games and game-derived record events for one season.
#[derive(Debug, Clone, Default)]
pub struct MatchupAnalysis {
    /// All games, ordered by week then matchup id.
    pub games: Vec<Game>,
    pub records: Vec<Record>,
}

impl MatchupAnalysis {
    pub fn games_for(&self, roster_id: u32) -> impl Iterator<Item = &Game> {
        self.games.iter().filter(move |g| g.involves(roster_id))
    }

    pub fn regular_season_games(&self) -> impl Iterator<Item = &Game> {
        self.games.iter().filter(|g| !g.playoff)
    }
}

#[derive(Default)]
struct ScoreCandidates {
    high: Vec<Record>,
    low: Vec<Record>,
    playoff_high: Vec<Record>,
    playoff_low: Vec<Record>,
}

impl ScoreCandidates {
    fn push(&mut self, record: Record) {
        let bucket = match record.kind {
            RecordKind::HighScore => &mut self.high,
            RecordKind::LowScore => &mut self.low,
            RecordKind::PlayoffHighScore => &mut self.playoff_high,
            _ => &mut self.playoff_low,
        };
        bucket.push(record);
    }

    fn into_records(self) -> Vec<Record> {
        let mut out = Vec::new();
        for mut bucket in [self.high, self.low, self.playoff_high, self.playoff_low] {
            retain_best(&mut bucket, SCORE_CANDIDATES);
            out.extend(bucket);
        }
        out
    }
}

/// Pair every week of a season and emit blowout, close-game and weekly
/// score records. `weeks` maps week number to that week's raw rows.
pub fn analyze_season(
    season: &str,
    weeks: &BTreeMap<u32, Vec<Matchup>>,
    window: &WeekWindow,
    owners: &OwnerIndex,
) -> MatchupAnalysis {
    let mut analysis = MatchupAnalysis::default();
    let mut candidates = ScoreCandidates::default();

    for (&week, rows) in weeks {
        let playoff = window.is_playoff(week);
        for game in pair_week(week, rows, playoff) {
            game_records(season, &game, owners, &mut analysis.records);

            for side in [game.home, game.away] {
                let Some(owner) = owners.get(side.roster_id) else {
                    continue;
                };
                for kind in score_kinds(playoff) {
                    candidates.push(
                        Record::new(kind, season, &owner.user_id, &owner.display_name, side.points)
                            .in_week(week)
                            .described(format!(
                                "{}: {} scored {:.2} in week {week} of {season}",
                                kind.label(),
                                owner.display_name,
                                side.points
                            )),
                    );
                }
            }

            analysis.games.push(game);
        }
    }

    analysis.records.extend(candidates.into_records());
    analysis
}

fn score_kinds(playoff: bool) -> [RecordKind; 2] {
    if playoff {
        [RecordKind::PlayoffHighScore, RecordKind::PlayoffLowScore]
    } else {
        [RecordKind::HighScore, RecordKind::LowScore]
    }
}

fn game_records(season: &str, game: &Game, owners: &OwnerIndex, out: &mut Vec<Record>) {
    let (Some(winner), Some(loser)) = (game.winner(), game.loser()) else {
        return;
    };
    let (Some(w), Some(l)) = (owners.get(winner.roster_id), owners.get(loser.roster_id)) else {
        return;
    };

    let margin = game.margin();
    let kind = if game.is_blowout() {
        RecordKind::Blowout
    } else if game.is_close() {
        RecordKind::CloseGame
    } else {
        return;
    };
    let verb = if kind == RecordKind::Blowout { "crushed" } else { "edged" };

    out.push(
        Record::new(kind, season, &w.user_id, &w.display_name, margin)
            .in_week(game.week)
            .against(&l.user_id)
            .described(format!(
                "{} {verb} {} by {margin:.2} ({:.2}-{:.2}) in week {} of {season}",
                w.display_name, l.display_name, winner.points, loser.points, game.week
            )),
    );
}
