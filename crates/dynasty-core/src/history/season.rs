// Per-season pipeline: fetch one league season, pair its games, resolve the
// champion, and derive streaks, metrics and record events.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PlayoffConfig;
use crate::history::chain::ChainLink;
use crate::history::champion::{
    regular_season_champion, standings, ChampionContext, ChampionResolver, ChampionResult,
    StrategyKind,
};
use crate::history::matchups::{analyze_season, round_hundredths, Game, MatchupAnalysis};
use crate::history::metrics::{compute_metrics, LeagueDistribution, Metric, TeamMetrics, TeamSeries};
use crate::history::records::{Confidence, Record, RecordKind};
use crate::history::streaks::{game_streak_records, game_streaks, outcomes_for, GameStreaks};
use crate::history::weeks::WeekWindow;
use crate::history::{Owner, OwnerIndex};
use crate::model::{BracketMatch, League, Matchup, NflState, Roster};
use crate::source::{DataSource, SourceError};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Headline numbers for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonStats {
    pub league_id: String,
    pub total_games: usize,
    pub average_score: f64,
    pub highest_score: Option<f64>,
    pub lowest_score: Option<f64>,
    pub regular_season_weeks: u32,
    pub playoff_start_week: Option<u32>,
    pub final_week: Option<u32>,
    pub champion_user_id: Option<String>,
    pub runner_up_user_id: Option<String>,
    pub champion_source: Option<StrategyKind>,
    pub champion_confidence: Option<Confidence>,
    pub regular_season_champion_user_id: Option<String>,
}

/// Everything derived from one processed season. Consumed by the all-time
/// aggregator.
#[derive(Debug, Clone)]
pub struct SeasonResult {
    pub league: League,
    pub window: WeekWindow,
    pub owners: OwnerIndex,
    pub rosters: Vec<Roster>,
    pub analysis: MatchupAnalysis,
    pub champion: Option<ChampionResult>,
    pub regular_season_champion: Option<u32>,
    pub playoff_teams: HashSet<u32>,
    /// Regular-season weekly scores of every team.
    pub distribution: LeagueDistribution,
    /// Keyed by roster id; owned rosters only.
    pub series: HashMap<u32, TeamSeries>,
    pub streaks: HashMap<u32, GameStreaks>,
    /// Keyed by user id.
    pub metrics: BTreeMap<String, TeamMetrics>,
    pub records: Vec<Record>,
    pub stats: SeasonStats,
}

impl SeasonResult {
    pub fn season(&self) -> &str {
        &self.league.season
    }

    /// Highest and lowest single-week score for a roster, playoffs included.
    pub fn score_range(&self, roster_id: u32) -> Option<(f64, f64)> {
        self.analysis
            .games_for(roster_id)
            .filter_map(|g| g.sides(roster_id))
            .map(|(me, _)| me.points)
            .fold(None, |range, p| match range {
                None => Some((p, p)),
                Some((hi, lo)) => Some((f64::max(hi, p), f64::min(lo, p))),
            })
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// Shared, read-only inputs for processing any season of a run.
#[derive(Clone, Copy)]
pub struct SeasonProcessor<'a> {
    pub source: &'a dyn DataSource,
    pub playoffs: &'a PlayoffConfig,
    pub resolver: &'a ChampionResolver,
    pub metrics: &'a [Box<dyn Metric>],
    pub nfl_state: Option<&'a NflState>,
}

impl<'a> SeasonProcessor<'a> {
    /// Process one season. `Ok(None)` means the season was skipped (not
    /// started yet or no scored games); errors mean the season's core data
    /// could not be fetched.
    pub async fn process(&self, link: &ChainLink) -> Result<Option<SeasonResult>, SourceError> {
        let league_id = link.league_id.as_str();
        let league = self
            .source
            .league(league_id)
            .await?
            .ok_or_else(|| SourceError::NotFound {
                what: format!("league {league_id}"),
            })?;

        if let Some(reason) = skip_reason(&league, self.nfl_state) {
            info!(league_id, season = %league.season, "skipping season: {reason}");
            return Ok(None);
        }

        let (users, rosters) =
            tokio::try_join!(self.source.users(league_id), self.source.rosters(league_id))?;
        let bracket = match self.source.winners_bracket(league_id).await {
            Ok(bracket) => bracket,
            Err(e) => {
                warn!(league_id, error = %e, "winners bracket unavailable");
                None
            }
        };

        let rounds = self.playoffs.rounds_for(league_id);
        let window = WeekWindow::from_settings(&league.settings, rounds);
        let weeks = fetch_weeks(self.source, league_id, &window).await;
        let owners = OwnerIndex::new(&rosters, &users);
        let analysis = analyze_season(&league.season, &weeks, &window, &owners);

        if analysis.games.is_empty() {
            warn!(league_id, season = %league.season, "season has no scored games; skipping");
            return Ok(None);
        }

        let final_rows = window
            .final_week()
            .and_then(|w| weeks.get(&w))
            .map(Vec::as_slice);
        let champion = self.resolver.resolve(&ChampionContext {
            league: &league,
            rosters: &rosters,
            window: &window,
            bracket: bracket.as_deref(),
            final_week: final_rows,
        });
        if champion.is_none() && window.has_playoffs() {
            warn!(league_id, season = %league.season, "could not determine a champion");
        }

        check_record_symmetry(&league.season, &rosters);

        let result = assemble(
            league,
            window,
            owners,
            rosters,
            analysis,
            champion,
            bracket.as_deref(),
            self.metrics,
        );
        info!(
            season = %result.season(),
            games = result.stats.total_games,
            records = result.records.len(),
            "processed season"
        );
        Ok(Some(result))
    }
}

/// Why a season should not be analyzed, if it shouldn't.
pub fn skip_reason(league: &League, state: Option<&NflState>) -> Option<&'static str> {
    if league.status.is_pre_season() {
        return Some("draft not complete");
    }
    match state {
        Some(state) if state.season == league.season && state.week < 1 => {
            Some("current season has no games played")
        }
        _ => None,
    }
}

/// Matchup rows for every week in the window, fetched concurrently. A week
/// that fails to load contributes no games.
async fn fetch_weeks(
    source: &dyn DataSource,
    league_id: &str,
    window: &WeekWindow,
) -> BTreeMap<u32, Vec<Matchup>> {
    let fetches = window.weeks().map(|week| async move {
        match source.matchups(league_id, week).await {
            Ok(rows) => (week, rows),
            Err(e) => {
                warn!(league_id, week, error = %e, "matchups unavailable; week treated as empty");
                (week, Vec::new())
            }
        }
    });
    join_all(fetches).await.into_iter().collect()
}

/// Teams that reached the playoffs: everyone seeded into the winners
/// bracket, otherwise the top `playoff_teams` by regular-season standing.
pub fn playoff_teams(
    league: &League,
    rosters: &[Roster],
    window: &WeekWindow,
    bracket: Option<&[BracketMatch]>,
) -> HashSet<u32> {
    if !window.has_playoffs() {
        return HashSet::new();
    }
    if let Some(bracket) = bracket.filter(|b| !b.is_empty()) {
        return bracket.iter().flat_map(BracketMatch::members).collect();
    }
    let seeds = league.settings.playoff_teams.unwrap_or(0) as usize;
    standings(rosters)
        .into_iter()
        .take(seeds)
        .map(|r| r.roster_id)
        .collect()
}

/// Every win in a season is someone else's loss.
fn check_record_symmetry(season: &str, rosters: &[Roster]) {
    let (wins, losses) = rosters
        .iter()
        .fold((0u32, 0u32), |(w, l), r| (w + r.wins(), l + r.losses()));
    if wins != losses {
        warn!(season, wins, losses, "season win and loss totals disagree");
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    league: League,
    window: WeekWindow,
    owners: OwnerIndex,
    rosters: Vec<Roster>,
    analysis: MatchupAnalysis,
    champion: Option<ChampionResult>,
    bracket: Option<&[BracketMatch]>,
    metric_set: &[Box<dyn Metric>],
) -> SeasonResult {
    let season = league.season.as_str();
    let playoff_teams = playoff_teams(&league, &rosters, &window, bracket);
    let distribution = LeagueDistribution::from_games(season, analysis.regular_season_games());
    let regular_champ = regular_season_champion(&rosters).map(|r| r.roster_id);

    let mut records = analysis.records.clone();
    let mut series = HashMap::new();
    let mut streaks = HashMap::new();
    let mut metrics = BTreeMap::new();

    for roster in &rosters {
        let Some(owner) = owners.get(roster.roster_id) else {
            debug!(season, roster_id = roster.roster_id, "roster has no owner; skipping");
            continue;
        };
        let games: Vec<&Game> = analysis.games_for(roster.roster_id).collect();

        let team_streaks = game_streaks(outcomes_for(games.iter().copied(), roster.roster_id));
        records.extend(game_streak_records(season, owner, team_streaks));
        streaks.insert(roster.roster_id, team_streaks);

        let team = TeamSeries::from_games(
            season,
            games.iter().copied(),
            roster.roster_id,
            &window,
            &playoff_teams,
        );
        metrics.insert(
            owner.user_id.clone(),
            compute_metrics(metric_set, &team, &distribution),
        );
        series.insert(roster.roster_id, team);
    }

    records.extend(honor_records(
        &league,
        &owners,
        &rosters,
        champion.as_ref(),
        regular_champ,
        &playoff_teams,
    ));

    let stats = season_stats(
        &league,
        &window,
        &owners,
        &analysis,
        champion.as_ref(),
        regular_champ,
    );

    SeasonResult {
        league,
        window,
        owners,
        rosters,
        analysis,
        champion,
        regular_season_champion: regular_champ,
        playoff_teams,
        distribution,
        series,
        streaks,
        metrics,
        records,
        stats,
    }
}

/// Championship, runner-up, regular-season title and playoff appearance
/// records. Title records carry the season year as their value so the most
/// recent ranks first.
fn honor_records(
    league: &League,
    owners: &OwnerIndex,
    rosters: &[Roster],
    champion: Option<&ChampionResult>,
    regular_champ: Option<u32>,
    playoff_teams: &HashSet<u32>,
) -> Vec<Record> {
    let season = league.season.as_str();
    let year = f64::from(league.season_year().unwrap_or_default());
    let mut records = Vec::new();

    let honor = |kind: RecordKind, owner: &Owner, value: f64, text: String| {
        Record::new(kind, season, &owner.user_id, &owner.display_name, value).described(text)
    };

    if let Some(result) = champion {
        if let Some(owner) = owners.get(result.champion) {
            records.push(
                honor(
                    RecordKind::Championship,
                    owner,
                    year,
                    format!("{} won the {season} championship", owner.display_name),
                )
                .with_confidence(result.confidence),
            );
        }
        if let Some(owner) = result.runner_up.and_then(|id| owners.get(id)) {
            records.push(
                honor(
                    RecordKind::RunnerUp,
                    owner,
                    year,
                    format!("{} finished runner-up in {season}", owner.display_name),
                )
                .with_confidence(result.confidence),
            );
        }
    }

    if let Some(roster) = regular_champ.and_then(|id| rosters.iter().find(|r| r.roster_id == id)) {
        if let Some(owner) = owners.get(roster.roster_id) {
            records.push(honor(
                RecordKind::RegularSeasonChamp,
                owner,
                f64::from(roster.wins()),
                format!(
                    "{} took the {season} regular season at {}-{}-{}",
                    owner.display_name,
                    roster.wins(),
                    roster.losses(),
                    roster.ties()
                ),
            ));
        }
    }

    let mut qualifiers: Vec<u32> = playoff_teams.iter().copied().collect();
    qualifiers.sort_unstable();
    for owner in qualifiers.into_iter().filter_map(|id| owners.get(id)) {
        records.push(honor(
            RecordKind::PlayoffAppearance,
            owner,
            year,
            format!("{} made the {season} playoffs", owner.display_name),
        ));
    }

    records
}

fn season_stats(
    league: &League,
    window: &WeekWindow,
    owners: &OwnerIndex,
    analysis: &MatchupAnalysis,
    champion: Option<&ChampionResult>,
    regular_champ: Option<u32>,
) -> SeasonStats {
    let scores: Vec<f64> = analysis
        .games
        .iter()
        .flat_map(|g| [g.home.points, g.away.points])
        .collect();
    let average_score = if scores.is_empty() {
        0.0
    } else {
        round_hundredths(scores.iter().sum::<f64>() / scores.len() as f64)
    };
    let user_of = |roster_id: u32| owners.get(roster_id).map(|o| o.user_id.clone());

    SeasonStats {
        league_id: league.league_id.clone(),
        total_games: analysis.games.len(),
        average_score,
        highest_score: scores.iter().copied().reduce(f64::max),
        lowest_score: scores.iter().copied().reduce(f64::min),
        regular_season_weeks: window.regular_season_weeks,
        playoff_start_week: window.playoff_start(),
        final_week: window.final_week(),
        champion_user_id: champion.and_then(|c| user_of(c.champion)),
        runner_up_user_id: champion.and_then(|c| c.runner_up).and_then(user_of),
        champion_source: champion.map(|c| c.source),
        champion_confidence: champion.map(|c| c.confidence),
        regular_season_champion_user_id: regular_champ.and_then(user_of),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeagueSettings, LeagueStatus, RosterSettings};

    fn league(status: LeagueStatus) -> League {
        League {
            league_id: "l1".into(),
            name: "Test".into(),
            season: "2024".into(),
            status,
            previous_league_id: None,
            settings: LeagueSettings {
                playoff_week_start: 15,
                playoff_teams: Some(2),
                ..Default::default()
            },
            scoring_settings: serde_json::Value::Null,
        }
    }

    fn state(season: &str, week: u32) -> NflState {
        NflState {
            season: season.into(),
            week,
            season_type: "regular".into(),
        }
    }

    fn roster(id: u32, wins: u32, fpts: u32) -> Roster {
        Roster {
            roster_id: id,
            owner_id: Some(format!("u{id}")),
            settings: RosterSettings {
                wins,
                fpts,
                ..Default::default()
            },
        }
    }

    #[test]
    fn pre_draft_seasons_are_skipped() {
        assert!(skip_reason(&league(LeagueStatus::PreDraft), None).is_some());
        assert!(skip_reason(&league(LeagueStatus::Drafting), None).is_some());
        assert!(skip_reason(&league(LeagueStatus::Complete), None).is_none());
    }

    #[test]
    fn current_season_before_week_one_is_skipped() {
        let l = league(LeagueStatus::InSeason);
        assert!(skip_reason(&l, Some(&state("2024", 0))).is_some());
        assert!(skip_reason(&l, Some(&state("2024", 3))).is_none());
        assert!(skip_reason(&l, Some(&state("2025", 0))).is_none());
    }

    #[test]
    fn playoff_teams_prefer_bracket_members() {
        let l = league(LeagueStatus::Complete);
        let window = WeekWindow::from_settings(&l.settings, 3);
        let rosters = vec![roster(1, 10, 1500), roster(2, 8, 1400), roster(3, 4, 1200)];
        let bracket = vec![BracketMatch {
            round: 1,
            match_id: 1,
            team_one: Some(2),
            team_two: Some(3),
            winner: Some(3),
            loser: Some(2),
            placement: Some(1),
        }];

        let from_bracket = playoff_teams(&l, &rosters, &window, Some(&bracket));
        assert_eq!(from_bracket, HashSet::from([2, 3]));

        let from_standings = playoff_teams(&l, &rosters, &window, None);
        assert_eq!(from_standings, HashSet::from([1, 2]));
    }

    #[test]
    fn no_playoffs_means_no_qualifiers() {
        let mut l = league(LeagueStatus::Complete);
        l.settings.playoff_week_start = 0;
        let window = WeekWindow::from_settings(&l.settings, 3);
        let rosters = vec![roster(1, 10, 1500)];
        assert!(playoff_teams(&l, &rosters, &window, None).is_empty());
    }
}
