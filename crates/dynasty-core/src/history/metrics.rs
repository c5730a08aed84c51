// Advanced per-team scores: consistency, explosiveness, clutch, efficiency,
// momentum, luck.
//
// Every metric is a pure function of one team's weekly series and the
// league-wide score distribution for the same weeks. All-time scores are
// computed by concatenating series and merging distributions, then running
// the same functions again; per-season scores are never averaged.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::history::matchups::{round_hundredths, Game, Outcome, CLOSE_GAME_MARGIN};
use crate::history::streaks::game_streaks;
use crate::history::weeks::WeekWindow;

/// Points per game that maps to a full efficiency score.
pub const EFFICIENCY_BENCHMARK_PPG: f64 = 150.0;

/// A week counts as explosive above this multiple of the league average.
pub const EXPLOSIVE_FACTOR: f64 = 1.2;

/// Longest win streak that maps to a full momentum streak score.
pub const MOMENTUM_STREAK_TARGET: u32 = 5;

/// Score reported for clutch and late-season form when there are no games
/// to judge.
const NEUTRAL_SCORE: f64 = 50.0;

const STDEV_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One team's result in one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamWeek {
    pub season: String,
    pub week: u32,
    pub points: f64,
    pub opponent_points: f64,
    pub outcome: Outcome,
    pub late_season: bool,
    pub opponent_made_playoffs: bool,
}

impl TeamWeek {
    pub fn margin(&self) -> f64 {
        round_hundredths((self.points - self.opponent_points).abs())
    }

    fn is_close(&self) -> bool {
        let margin = self.margin();
        margin > 0.0 && margin < CLOSE_GAME_MARGIN
    }
}

/// A team's regular-season weeks in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamSeries {
    pub weeks: Vec<TeamWeek>,
}

impl TeamSeries {
    /// Build from a season's games (ordered by week). Playoff games are left
    /// out so every team is measured over the same schedule.
    pub fn from_games<'a, I>(
        season: &str,
        games: I,
        roster_id: u32,
        window: &WeekWindow,
        playoff_teams: &HashSet<u32>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let weeks = games
            .into_iter()
            .filter(|g| !g.playoff)
            .filter_map(|g| {
                let (me, them) = g.sides(roster_id)?;
                Some(TeamWeek {
                    season: season.to_string(),
                    week: g.week,
                    points: me.points,
                    opponent_points: them.points,
                    outcome: g.outcome_for(roster_id)?,
                    late_season: window.is_late_season(g.week),
                    opponent_made_playoffs: playoff_teams.contains(&them.roster_id),
                })
            })
            .collect();
        Self { weeks }
    }

    /// Append another series; `other` must be later in time.
    pub fn extend(&mut self, other: &TeamSeries) {
        self.weeks.extend(other.weeks.iter().cloned());
    }

    pub fn points(&self) -> Vec<f64> {
        self.weeks.iter().map(|w| w.points).collect()
    }

    pub fn games(&self) -> usize {
        self.weeks.len()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.weeks.iter().map(|w| w.outcome)
    }

    /// Wins with ties counted as half.
    pub fn win_total(&self) -> f64 {
        win_total(self.weeks.iter())
    }
}

fn win_total<'a>(weeks: impl Iterator<Item = &'a TeamWeek>) -> f64 {
    weeks
        .map(|w| match w.outcome {
            Outcome::Win => 1.0,
            Outcome::Tie => 0.5,
            Outcome::Loss => 0.0,
        })
        .sum()
}

/// Every team's score for every week, keyed by season and week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueDistribution {
    weeks: HashMap<(String, u32), Vec<f64>>,
}

impl LeagueDistribution {
    /// Both sides' scores from every game given. Callers pass regular-season
    /// games only.
    pub fn from_games<'a, I>(season: &str, games: I) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let mut dist = Self::default();
        for game in games {
            let scores = dist.weeks.entry((season.to_string(), game.week)).or_default();
            scores.push(game.home.points);
            scores.push(game.away.points);
        }
        dist
    }

    pub fn merge(&mut self, other: &LeagueDistribution) {
        for (key, scores) in &other.weeks {
            self.weeks
                .entry(key.clone())
                .or_default()
                .extend(scores.iter().copied());
        }
    }

    pub fn scores(&self, season: &str, week: u32) -> &[f64] {
        self.weeks
            .get(&(season.to_string(), week))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn average(&self, season: &str, week: u32) -> Option<f64> {
        let scores = self.scores(season, week);
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Metric abstraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Consistency,
    Explosiveness,
    Clutch,
    Efficiency,
    Momentum,
    Luck,
}

/// A 0-100 team score.
pub trait Metric: Send + Sync {
    fn kind(&self) -> MetricKind;

    fn score(&self, team: &TeamSeries, league: &LeagueDistribution) -> f64;
}

pub struct Consistency;
pub struct Explosiveness;
pub struct Clutch;
pub struct Efficiency;
pub struct Momentum;
pub struct Luck;

impl Metric for Consistency {
    fn kind(&self) -> MetricKind {
        MetricKind::Consistency
    }

    fn score(&self, team: &TeamSeries, _league: &LeagueDistribution) -> f64 {
        consistency_score(&team.points())
    }
}

impl Metric for Explosiveness {
    fn kind(&self) -> MetricKind {
        MetricKind::Explosiveness
    }

    fn score(&self, team: &TeamSeries, league: &LeagueDistribution) -> f64 {
        explosiveness_score(team, league)
    }
}

impl Metric for Clutch {
    fn kind(&self) -> MetricKind {
        MetricKind::Clutch
    }

    fn score(&self, team: &TeamSeries, _league: &LeagueDistribution) -> f64 {
        ClutchSummary::from_series(team).score()
    }
}

impl Metric for Efficiency {
    fn kind(&self) -> MetricKind {
        MetricKind::Efficiency
    }

    fn score(&self, team: &TeamSeries, _league: &LeagueDistribution) -> f64 {
        efficiency_score(team)
    }
}

impl Metric for Momentum {
    fn kind(&self) -> MetricKind {
        MetricKind::Momentum
    }

    fn score(&self, team: &TeamSeries, _league: &LeagueDistribution) -> f64 {
        momentum_score(team)
    }
}

impl Metric for Luck {
    fn kind(&self) -> MetricKind {
        MetricKind::Luck
    }

    fn score(&self, team: &TeamSeries, league: &LeagueDistribution) -> f64 {
        LuckSummary::compute(team, league).score
    }
}

/// The six built-in metrics.
pub fn default_metrics() -> Vec<Box<dyn Metric>> {
    vec![
        Box::new(Consistency),
        Box::new(Explosiveness),
        Box::new(Clutch),
        Box::new(Efficiency),
        Box::new(Momentum),
        Box::new(Luck),
    ]
}

// ---------------------------------------------------------------------------
// Metric functions
// ---------------------------------------------------------------------------

/// Mean and population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub stdev: f64,
}

pub fn series_stats(values: &[f64]) -> SeriesStats {
    if values.is_empty() {
        return SeriesStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    SeriesStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// `max(0, 100 - 100 * CV)`. Zero variance scores exactly 100; an empty or
/// non-positive series scores 0.
pub fn consistency_score(points: &[f64]) -> f64 {
    let stats = series_stats(points);
    if points.is_empty() || stats.mean <= 0.0 {
        return 0.0;
    }
    if stats.stdev < STDEV_EPSILON {
        return 100.0;
    }
    (100.0 - 100.0 * (stats.stdev / stats.mean)).max(0.0)
}

/// Percentage of weeks scoring above 120% of that week's league average.
pub fn explosiveness_score(team: &TeamSeries, league: &LeagueDistribution) -> f64 {
    if team.weeks.is_empty() {
        return 0.0;
    }
    let explosive = team
        .weeks
        .iter()
        .filter(|w| {
            league
                .average(&w.season, w.week)
                .is_some_and(|avg| w.points > EXPLOSIVE_FACTOR * avg)
        })
        .count();
    100.0 * explosive as f64 / team.weeks.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClutchSummary {
    pub close_wins: u32,
    pub close_losses: u32,
    /// Wins over opponents that qualified for the playoffs.
    pub wins_vs_playoff_teams: u32,
}

impl ClutchSummary {
    pub fn from_series(team: &TeamSeries) -> Self {
        let mut summary = Self::default();
        for week in &team.weeks {
            if week.is_close() {
                match week.outcome {
                    Outcome::Win => summary.close_wins += 1,
                    Outcome::Loss => summary.close_losses += 1,
                    Outcome::Tie => {}
                }
            }
            if week.outcome == Outcome::Win && week.opponent_made_playoffs {
                summary.wins_vs_playoff_teams += 1;
            }
        }
        summary
    }

    /// Close-game win rate as a percentage.
    pub fn score(&self) -> f64 {
        let close = self.close_wins + self.close_losses;
        if close == 0 {
            return NEUTRAL_SCORE;
        }
        100.0 * self.close_wins as f64 / close as f64
    }
}

/// Mean of the points-per-game score against the benchmark and the win
/// percentage.
pub fn efficiency_score(team: &TeamSeries) -> f64 {
    if team.weeks.is_empty() {
        return 0.0;
    }
    let games = team.games() as f64;
    let ppg = team.points().iter().sum::<f64>() / games;
    let ppg_score = (100.0 * ppg / EFFICIENCY_BENCHMARK_PPG).min(100.0);
    let win_pct = 100.0 * team.win_total() / games;
    (ppg_score + win_pct) / 2.0
}

/// Mean of the late-season win rate and the longest-win-streak score.
pub fn momentum_score(team: &TeamSeries) -> f64 {
    let late: Vec<&TeamWeek> = team.weeks.iter().filter(|w| w.late_season).collect();
    let late_rate = if late.is_empty() {
        NEUTRAL_SCORE
    } else {
        100.0 * win_total(late.iter().copied()) / late.len() as f64
    };

    let longest = game_streaks(team.outcomes()).longest_win;
    let streak_score = (100.0 * longest as f64 / MOMENTUM_STREAK_TARGET as f64).min(100.0);

    (late_rate + streak_score) / 2.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LuckSummary {
    pub actual_wins: f64,
    pub expected_wins: f64,
    /// Actual minus expected wins. Positive means the team won more than its
    /// scoring deserved.
    pub rating: f64,
    pub narrow_losses: u32,
    /// Rating mapped onto 0-100, pulled down by narrow losses.
    pub score: f64,
}

impl LuckSummary {
    pub fn compute(team: &TeamSeries, league: &LeagueDistribution) -> Self {
        let expected_wins: f64 = team
            .weeks
            .iter()
            .map(|w| share_beaten(w.points, league.scores(&w.season, w.week)))
            .sum();
        let actual_wins = team.win_total();
        let narrow_losses = team
            .weeks
            .iter()
            .filter(|w| w.outcome == Outcome::Loss && w.is_close())
            .count() as u32;
        let rating = actual_wins - expected_wins;
        let score = (50.0 + 10.0 * rating - 2.5 * narrow_losses as f64).clamp(0.0, 100.0);
        Self {
            actual_wins,
            expected_wins,
            rating,
            narrow_losses,
            score,
        }
    }
}

/// Fraction of the other scores in `week_scores` that `points` beats, equal
/// scores counting half. `week_scores` includes the team's own score once.
pub fn share_beaten(points: f64, week_scores: &[f64]) -> f64 {
    if week_scores.len() < 2 {
        return 0.0;
    }
    let below = week_scores.iter().filter(|s| **s < points).count() as f64;
    let equal = week_scores.iter().filter(|s| **s == points).count() as f64;
    let others = (week_scores.len() - 1) as f64;
    (below + 0.5 * (equal - 1.0).max(0.0)) / others
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// All six scores plus the supporting numbers behind clutch and luck.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamMetrics {
    pub consistency: f64,
    pub explosiveness: f64,
    pub clutch: f64,
    pub efficiency: f64,
    pub momentum: f64,
    pub luck: f64,
    pub games: usize,
    pub clutch_detail: ClutchSummary,
    pub luck_detail: LuckSummary,
}

impl TeamMetrics {
    fn set(&mut self, kind: MetricKind, value: f64) {
        let slot = match kind {
            MetricKind::Consistency => &mut self.consistency,
            MetricKind::Explosiveness => &mut self.explosiveness,
            MetricKind::Clutch => &mut self.clutch,
            MetricKind::Efficiency => &mut self.efficiency,
            MetricKind::Momentum => &mut self.momentum,
            MetricKind::Luck => &mut self.luck,
        };
        *slot = value;
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Consistency => self.consistency,
            MetricKind::Explosiveness => self.explosiveness,
            MetricKind::Clutch => self.clutch,
            MetricKind::Efficiency => self.efficiency,
            MetricKind::Momentum => self.momentum,
            MetricKind::Luck => self.luck,
        }
    }
}

/// Run every metric in `metrics` for one team.
pub fn compute_metrics(
    metrics: &[Box<dyn Metric>],
    team: &TeamSeries,
    league: &LeagueDistribution,
) -> TeamMetrics {
    let mut out = TeamMetrics {
        games: team.games(),
        clutch_detail: ClutchSummary::from_series(team),
        luck_detail: LuckSummary::compute(team, league),
        ..Default::default()
    };
    for metric in metrics {
        out.set(metric.kind(), metric.score(team, league));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn week(week: u32, points: f64, opponent_points: f64) -> TeamWeek {
        let outcome = if points > opponent_points {
            Outcome::Win
        } else if points < opponent_points {
            Outcome::Loss
        } else {
            Outcome::Tie
        };
        TeamWeek {
            season: "2023".into(),
            week,
            points,
            opponent_points,
            outcome,
            late_season: false,
            opponent_made_playoffs: false,
        }
    }

    fn series(points: &[(f64, f64)]) -> TeamSeries {
        TeamSeries {
            weeks: points
                .iter()
                .enumerate()
                .map(|(i, (p, o))| week(i as u32 + 1, *p, *o))
                .collect(),
        }
    }

    /// Two-team league: the distribution is just both sides of every game.
    fn head_to_head(team: &TeamSeries) -> LeagueDistribution {
        let mut dist = LeagueDistribution::default();
        for w in &team.weeks {
            dist.weeks
                .insert((w.season.clone(), w.week), vec![w.points, w.opponent_points]);
        }
        dist
    }

    #[test]
    fn flat_scores_are_fully_consistent_and_never_explosive() {
        let team = series(&[(100.0, 90.0), (100.0, 90.0), (100.0, 110.0), (100.0, 95.0)]);
        let mut league = LeagueDistribution::default();
        for w in 1..=4 {
            league.weeks.insert(("2023".into(), w), vec![100.0; 4]);
        }
        assert_eq!(consistency_score(&team.points()), 100.0);
        assert_eq!(explosiveness_score(&team, &league), 0.0);
    }

    #[test]
    fn consistency_falls_as_variation_rises() {
        let tight = consistency_score(&[100.0, 105.0, 95.0, 100.0]);
        let loose = consistency_score(&[60.0, 140.0, 80.0, 120.0]);
        let wild = consistency_score(&[10.0, 190.0, 20.0, 180.0]);
        assert!(tight > loose);
        assert!(loose > wild);
        assert!(wild >= 0.0);
        assert_eq!(consistency_score(&[]), 0.0);
        // CV above 1 clamps at zero.
        assert_eq!(consistency_score(&[1.0, 1.0, 1.0, 200.0]), 0.0);
    }

    #[test]
    fn explosive_weeks_exceed_the_weekly_average() {
        let team = series(&[(130.0, 90.0), (121.0, 90.0)]);
        let mut league = LeagueDistribution::default();
        league.weeks.insert(("2023".into(), 1), vec![130.0, 90.0, 100.0, 80.0]);
        league.weeks.insert(("2023".into(), 2), vec![121.0, 90.0, 100.0, 89.0]);
        // Week 1 average 100 -> 130 > 120. Week 2 average 100 -> 121 > 120.
        assert!(approx_eq(explosiveness_score(&team, &league), 100.0));

        league.weeks.insert(("2023".into(), 2), vec![121.0, 110.0, 110.0, 111.0]);
        assert!(approx_eq(explosiveness_score(&team, &league), 50.0));
    }

    #[test]
    fn clutch_counts_close_games_only() {
        let mut team = series(&[(100.0, 95.0), (100.0, 104.0), (100.0, 99.0), (150.0, 80.0)]);
        team.weeks[3].opponent_made_playoffs = true;
        let summary = ClutchSummary::from_series(&team);
        assert_eq!(summary.close_wins, 2);
        assert_eq!(summary.close_losses, 1);
        assert_eq!(summary.wins_vs_playoff_teams, 1);
        assert!(approx_eq(summary.score(), 200.0 / 3.0));

        let blowouts = series(&[(150.0, 80.0)]);
        assert_eq!(ClutchSummary::from_series(&blowouts).score(), 50.0);
    }

    #[test]
    fn efficiency_blends_scoring_and_winning() {
        let team = series(&[(150.0, 100.0), (150.0, 160.0)]);
        // ppg 150 -> 100, win pct 50 -> mean 75.
        assert!(approx_eq(efficiency_score(&team), 75.0));
        let team = series(&[(300.0, 100.0)]);
        assert!(approx_eq(efficiency_score(&team), 100.0));
    }

    #[test]
    fn momentum_uses_late_season_and_streak() {
        let mut team = series(&[
            (110.0, 100.0),
            (110.0, 100.0),
            (110.0, 100.0),
            (110.0, 100.0),
            (110.0, 100.0),
            (90.0, 100.0),
            (110.0, 100.0),
            (90.0, 100.0),
        ]);
        for w in team.weeks.iter_mut().skip(4) {
            w.late_season = true;
        }
        // Late weeks 5-8: 2 wins of 4 -> 50. Longest streak 5 -> 100.
        assert!(approx_eq(momentum_score(&team), 75.0));
    }

    #[test]
    fn luck_is_zero_when_results_match_scoring() {
        let team = series(&[(120.0, 100.0), (90.0, 100.0), (130.0, 80.0)]);
        let league = head_to_head(&team);
        let luck = LuckSummary::compute(&team, &league);
        assert!(approx_eq(luck.expected_wins, 2.0));
        assert!(approx_eq(luck.actual_wins, 2.0));
        assert!(approx_eq(luck.rating, 0.0));
        assert!(approx_eq(luck.score, 50.0));
    }

    #[test]
    fn luck_is_positive_when_out_winning_the_profile() {
        // Second-best score of four each week, but always wins.
        let team = series(&[(110.0, 90.0), (110.0, 90.0)]);
        let mut league = LeagueDistribution::default();
        for w in 1..=2 {
            league.weeks.insert(("2023".into(), w), vec![110.0, 90.0, 120.0, 80.0]);
        }
        let luck = LuckSummary::compute(&team, &league);
        assert!(approx_eq(luck.expected_wins, 4.0 / 3.0));
        assert!(luck.rating > 0.0);
        assert!(luck.score > 50.0);
    }

    #[test]
    fn narrow_losses_pull_luck_score_down() {
        let team = series(&[(95.0, 100.0), (96.0, 100.0)]);
        let league = head_to_head(&team);
        let luck = LuckSummary::compute(&team, &league);
        assert_eq!(luck.narrow_losses, 2);
        assert!(approx_eq(luck.rating, 0.0));
        assert!(approx_eq(luck.score, 45.0));
    }

    #[test]
    fn share_beaten_counts_ties_as_half() {
        assert!(approx_eq(share_beaten(100.0, &[100.0, 100.0, 90.0]), 0.75));
        assert_eq!(share_beaten(100.0, &[100.0]), 0.0);
    }

    #[test]
    fn compute_metrics_fills_every_slot() {
        let team = series(&[(120.0, 100.0), (90.0, 100.0), (130.0, 80.0), (100.0, 99.0)]);
        let league = head_to_head(&team);
        let metrics = compute_metrics(&default_metrics(), &team, &league);
        assert_eq!(metrics.games, 4);
        for kind in [
            MetricKind::Consistency,
            MetricKind::Explosiveness,
            MetricKind::Clutch,
            MetricKind::Efficiency,
            MetricKind::Momentum,
            MetricKind::Luck,
        ] {
            let v = metrics.get(kind);
            assert!((0.0..=100.0).contains(&v), "{kind:?} out of range: {v}");
        }
        assert_eq!(metrics.clutch, 100.0);
    }

    #[test]
    fn all_time_recomputes_over_combined_series() {
        let a = series(&[(100.0, 90.0), (100.0, 90.0)]);
        let mut b = series(&[(200.0, 90.0), (200.0, 90.0)]);
        for w in &mut b.weeks {
            w.season = "2024".into();
        }
        let mut combined = a.clone();
        combined.extend(&b);
        let avg_of_seasons =
            (consistency_score(&a.points()) + consistency_score(&b.points())) / 2.0;
        let all_time = consistency_score(&combined.points());
        assert_eq!(avg_of_seasons, 100.0);
        assert!(all_time < 100.0);

        let mut league = head_to_head(&a);
        league.merge(&head_to_head(&b));
        assert_eq!(league.scores("2024", 1), &[200.0, 90.0]);
    }
}
