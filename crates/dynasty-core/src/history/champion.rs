// Champion resolution.
//
// Strategies are independent and tried in order; the first one that names a
// champion wins. Which strategies run, and in what order, comes from config.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::history::matchups::pair_week;
use crate::history::records::Confidence;
use crate::history::weeks::WeekWindow;
use crate::model::{BracketMatch, League, LeagueStatus, Matchup, Roster};

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything a strategy may look at for one season.
#[derive(Debug, Clone, Copy)]
pub struct ChampionContext<'a> {
    pub league: &'a League,
    pub rosters: &'a [Roster],
    pub window: &'a WeekWindow,
    pub bracket: Option<&'a [BracketMatch]>,
    /// Raw matchup rows of the final playoff week.
    pub final_week: Option<&'a [Matchup]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChampionResult {
    pub champion: u32,
    pub runner_up: Option<u32>,
    pub source: StrategyKind,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PlayoffFinish,
    Bracket,
    FinalWeek,
    BestRecord,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::PlayoffFinish,
        StrategyKind::Bracket,
        StrategyKind::FinalWeek,
        StrategyKind::BestRecord,
    ];

    /// Name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::PlayoffFinish => "playoff_finish",
            StrategyKind::Bracket => "bracket",
            StrategyKind::FinalWeek => "final_week",
            StrategyKind::BestRecord => "best_record",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name.trim())
    }

    pub fn build(self) -> Box<dyn ChampionStrategy> {
        match self {
            StrategyKind::PlayoffFinish => Box::new(PlayoffFinish),
            StrategyKind::Bracket => Box::new(WinnersBracket),
            StrategyKind::FinalWeek => Box::new(FinalWeekMatchup),
            StrategyKind::BestRecord => Box::new(BestRecord),
        }
    }
}

/// One way of naming a season's champion.
pub trait ChampionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// `None` when this strategy has nothing to say about the season.
    fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult>;
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Explicit playoff placement recorded on the rosters.
pub struct PlayoffFinish;

impl ChampionStrategy for PlayoffFinish {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PlayoffFinish
    }

    fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult> {
        let with_finish = |place: u32| {
            ctx.rosters
                .iter()
                .find(|r| r.settings.playoff_finish == Some(place))
                .map(|r| r.roster_id)
        };
        Some(ChampionResult {
            champion: with_finish(1)?,
            runner_up: with_finish(2),
            source: self.kind(),
            confidence: Confidence::High,
        })
    }
}

/// The final of the provider's winners bracket.
pub struct WinnersBracket;

impl WinnersBracket {
    /// The championship match: the last round's match placed first. Only
    /// when no match in that round carries a placement does the
    /// lowest-numbered decided match stand in for it.
    fn final_match(bracket: &[BracketMatch]) -> Option<&BracketMatch> {
        let last_round = bracket.iter().map(|m| m.round).max()?;
        let mut round: Vec<&BracketMatch> =
            bracket.iter().filter(|m| m.round == last_round).collect();
        round.sort_by_key(|m| m.match_id);

        if let Some(title) = round.iter().find(|m| m.placement == Some(1)) {
            return Some(*title);
        }
        if round.iter().any(|m| m.placement.is_some()) {
            return None;
        }
        round.into_iter().find(|m| m.winner.is_some())
    }
}

impl ChampionStrategy for WinnersBracket {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bracket
    }

    fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult> {
        let final_match = Self::final_match(ctx.bracket?)?;
        let champion = final_match.winner?;
        let runner_up = final_match
            .loser
            .or_else(|| final_match.members().find(|id| *id != champion));
        Some(ChampionResult {
            champion,
            runner_up,
            source: self.kind(),
            confidence: Confidence::High,
        })
    }
}

/// The highest-numbered game of the final playoff week.
pub struct FinalWeekMatchup;

impl ChampionStrategy for FinalWeekMatchup {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FinalWeek
    }

    fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult> {
        let week = ctx.window.final_week()?;
        let games = pair_week(week, ctx.final_week?, true);
        let championship = games.last()?;
        let winner = championship.winner()?;
        Some(ChampionResult {
            champion: winner.roster_id,
            runner_up: championship.loser().map(|l| l.roster_id),
            source: self.kind(),
            confidence: Confidence::High,
        })
    }
}

/// Best regular-season record, for completed seasons with no playoff data.
/// The result is an approximation and is marked low-confidence.
pub struct BestRecord;

impl ChampionStrategy for BestRecord {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BestRecord
    }

    fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult> {
        if ctx.league.status != LeagueStatus::Complete {
            return None;
        }
        let table = standings(ctx.rosters);
        Some(ChampionResult {
            champion: table.first()?.roster_id,
            runner_up: table.get(1).map(|r| r.roster_id),
            source: self.kind(),
            confidence: Confidence::Low,
        })
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct ChampionResolver {
    strategies: Vec<Box<dyn ChampionStrategy>>,
}

impl ChampionResolver {
    pub fn new(kinds: &[StrategyKind]) -> Self {
        Self {
            strategies: kinds.iter().map(|k| k.build()).collect(),
        }
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run the chain; `None` when every strategy declines.
    pub fn resolve(&self, ctx: &ChampionContext<'_>) -> Option<ChampionResult> {
        for strategy in &self.strategies {
            match strategy.resolve(ctx) {
                Some(result) => return Some(result),
                None => debug!(
                    season = %ctx.league.season,
                    strategy = strategy.kind().name(),
                    "champion strategy declined"
                ),
            }
        }
        None
    }
}

impl Default for ChampionResolver {
    fn default() -> Self {
        Self::new(&StrategyKind::ALL)
    }
}

// ---------------------------------------------------------------------------
// Regular season
// ---------------------------------------------------------------------------

/// Order by wins, then points for, both descending. Roster id breaks any
/// remaining tie so the order is stable.
pub fn compare_standing(a: &Roster, b: &Roster) -> Ordering {
    b.wins()
        .cmp(&a.wins())
        .then_with(|| {
            b.points_for()
                .partial_cmp(&a.points_for())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.roster_id.cmp(&b.roster_id))
}

/// Rosters in regular-season standings order.
pub fn standings(rosters: &[Roster]) -> Vec<&Roster> {
    let mut table: Vec<&Roster> = rosters.iter().collect();
    table.sort_by(|a, b| compare_standing(a, b));
    table
}

/// Regular-season champion: most wins, ties broken by points for.
pub fn regular_season_champion(rosters: &[Roster]) -> Option<&Roster> {
    rosters
        .iter()
        .filter(|r| r.games() > 0)
        .min_by(|a, b| compare_standing(a, b))
}
