// All-time aggregation.
//
// Seasons are folded oldest first into one tally per user. Lifetime metrics
// come from each user's concatenated weekly series scored against the merged
// league distribution, never from averaging per-season scores.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::history::champion::standings;
use crate::history::matchups::round_hundredths;
use crate::history::metrics::{compute_metrics, LeagueDistribution, Metric, TeamMetrics, TeamSeries};
use crate::history::records::Record;
use crate::history::season::SeasonResult;
use crate::history::streaks::{season_streak_records, SeasonClass, SeasonStreaks};
use crate::history::Owner;
use crate::model::Roster;

/// One user's line for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonBreakdown {
    pub season: String,
    pub roster_id: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    /// Regular-season finish, 1 = first.
    pub standing: usize,
    pub made_playoffs: bool,
    pub champion: bool,
    pub runner_up: bool,
    pub high_score: Option<f64>,
    pub low_score: Option<f64>,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub metrics: Option<TeamMetrics>,
}

/// Lifetime totals for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub team_name: Option<String>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub games_played: u32,
    pub championships: u32,
    pub runner_ups: u32,
    pub regular_season_titles: u32,
    pub playoff_appearances: u32,
    pub high_score: Option<f64>,
    pub low_score: Option<f64>,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub longest_winning_seasons: u32,
    pub longest_losing_seasons: u32,
    /// Ties count as half a win.
    pub win_percentage: f64,
    pub average_points_per_game: f64,
    pub metrics: TeamMetrics,
    pub seasons: Vec<SeasonBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeagueMetadata {
    pub total_seasons: usize,
    pub foundation_season: Option<String>,
    pub latest_season: Option<String>,
    pub all_time_high_score: Option<f64>,
    pub all_time_low_score: Option<f64>,
    pub most_championships: u32,
    /// Mean of every user's average points per game.
    pub average_league_score: f64,
    pub total_games_played: u32,
}

#[derive(Debug, Clone, Default)]
pub struct AllTimeSummary {
    /// Standings order: wins, then points for.
    pub users: Vec<UserStats>,
    pub metadata: LeagueMetadata,
    /// Winning/losing season streak records.
    pub records: Vec<Record>,
}

struct UserTally {
    owner: Owner,
    stats: UserStats,
    season_streaks: SeasonStreaks,
    series: TeamSeries,
}

impl UserTally {
    fn new(owner: &Owner) -> Self {
        Self {
            owner: owner.clone(),
            stats: UserStats {
                user_id: owner.user_id.clone(),
                ..Default::default()
            },
            season_streaks: SeasonStreaks::default(),
            series: TeamSeries::default(),
        }
    }

    fn add_season(
        &mut self,
        season: &SeasonResult,
        roster: &Roster,
        standing: usize,
        owner: &Owner,
    ) {
        // Latest season's names and avatar win.
        self.owner = owner.clone();

        let id = roster.roster_id;
        let champion = season.champion.as_ref();
        let is_champion = champion.is_some_and(|c| c.champion == id);
        let is_runner_up = champion.is_some_and(|c| c.runner_up == Some(id));
        let made_playoffs = season.playoff_teams.contains(&id);
        let streaks = season.streaks.get(&id).copied().unwrap_or_default();
        let range = season.score_range(id);

        let s = &mut self.stats;
        s.wins += roster.wins();
        s.losses += roster.losses();
        s.ties += roster.ties();
        s.points_for += roster.points_for();
        s.points_against += roster.points_against();
        s.games_played += roster.games();
        s.championships += u32::from(is_champion);
        s.runner_ups += u32::from(is_runner_up);
        s.regular_season_titles += u32::from(season.regular_season_champion == Some(id));
        s.playoff_appearances += u32::from(made_playoffs);
        s.longest_win_streak = s.longest_win_streak.max(streaks.longest_win);
        s.longest_loss_streak = s.longest_loss_streak.max(streaks.longest_loss);
        if let Some((high, low)) = range {
            s.high_score = Some(s.high_score.map_or(high, |h| h.max(high)));
            s.low_score = Some(s.low_score.map_or(low, |l| l.min(low)));
        }
        s.seasons.push(SeasonBreakdown {
            season: season.season().to_string(),
            roster_id: id,
            wins: roster.wins(),
            losses: roster.losses(),
            ties: roster.ties(),
            points_for: roster.points_for(),
            points_against: roster.points_against(),
            standing,
            made_playoffs,
            champion: is_champion,
            runner_up: is_runner_up,
            high_score: range.map(|r| r.0),
            low_score: range.map(|r| r.1),
            longest_win_streak: streaks.longest_win,
            longest_loss_streak: streaks.longest_loss,
            metrics: season.metrics.get(&owner.user_id).cloned(),
        });

        if roster.games() > 0 {
            let class = SeasonClass::from_win_rate(roster.win_rate());
            self.season_streaks =
                std::mem::take(&mut self.season_streaks).step(season.season(), class);
        }
        if let Some(series) = season.series.get(&id) {
            self.series.extend(series);
        }
    }

    fn finish(
        self,
        metric_set: &[Box<dyn Metric>],
        league: &LeagueDistribution,
    ) -> (UserStats, Vec<Record>) {
        let Self {
            owner,
            mut stats,
            season_streaks,
            series,
        } = self;

        stats.display_name = owner.display_name.clone();
        stats.avatar = owner.avatar.clone();
        stats.team_name = owner.team_name.clone();
        stats.longest_winning_seasons = season_streaks.longest_winning_len();
        stats.longest_losing_seasons = season_streaks.longest_losing_len();
        stats.points_for = round_hundredths(stats.points_for);
        stats.points_against = round_hundredths(stats.points_against);

        if stats.games_played > 0 {
            let won = f64::from(stats.wins) + 0.5 * f64::from(stats.ties);
            stats.win_percentage = round_hundredths(won / f64::from(stats.games_played) * 100.0);
        }
        // Points and games come from the same source: the weekly series when
        // any week was scored, the roster totals otherwise.
        let (points, games) = match series.games() {
            0 => (stats.points_for, stats.games_played as usize),
            n => (series.weeks.iter().map(|w| w.points).sum::<f64>(), n),
        };
        if games > 0 {
            stats.average_points_per_game = round_hundredths(points / games as f64);
        }

        stats.metrics = compute_metrics(metric_set, &series, league);
        let records = season_streak_records(&owner, &season_streaks);
        (stats, records)
    }
}

/// All-time standings order: wins, then points for, both descending.
fn compare_users(a: &UserStats, b: &UserStats) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then_with(|| {
            b.points_for
                .partial_cmp(&a.points_for)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Fold processed seasons into lifetime stats. `seasons` must be oldest
/// first; season streaks depend on it.
pub fn aggregate(seasons: &[SeasonResult], metric_set: &[Box<dyn Metric>]) -> AllTimeSummary {
    debug_assert!(seasons
        .windows(2)
        .all(|w| w[0].league.season_year() <= w[1].league.season_year()));

    let mut tallies: BTreeMap<String, UserTally> = BTreeMap::new();
    let mut distribution = LeagueDistribution::default();

    for season in seasons {
        distribution.merge(&season.distribution);
        for (place, roster) in standings(&season.rosters).into_iter().enumerate() {
            let Some(owner) = season.owners.get(roster.roster_id) else {
                continue;
            };
            tallies
                .entry(owner.user_id.clone())
                .or_insert_with(|| UserTally::new(owner))
                .add_season(season, roster, place + 1, owner);
        }
    }

    let mut records = Vec::new();
    let mut users: Vec<UserStats> = tallies
        .into_values()
        .map(|tally| {
            let (stats, streak_records) = tally.finish(metric_set, &distribution);
            records.extend(streak_records);
            stats
        })
        .collect();
    users.sort_by(compare_users);

    let metadata = league_metadata(seasons, &users);
    AllTimeSummary {
        users,
        metadata,
        records,
    }
}

fn league_metadata(seasons: &[SeasonResult], users: &[UserStats]) -> LeagueMetadata {
    let scoring: Vec<f64> = users
        .iter()
        .filter(|u| u.games_played > 0)
        .map(|u| u.average_points_per_game)
        .collect();
    let average_league_score = if scoring.is_empty() {
        0.0
    } else {
        round_hundredths(scoring.iter().sum::<f64>() / scoring.len() as f64)
    };

    LeagueMetadata {
        total_seasons: seasons.len(),
        foundation_season: seasons.first().map(|s| s.season().to_string()),
        latest_season: seasons.last().map(|s| s.season().to_string()),
        all_time_high_score: seasons
            .iter()
            .filter_map(|s| s.stats.highest_score)
            .reduce(f64::max),
        all_time_low_score: seasons
            .iter()
            .filter_map(|s| s.stats.lowest_score)
            .reduce(f64::min),
        most_championships: users.iter().map(|u| u.championships).max().unwrap_or(0),
        average_league_score,
        total_games_played: users.iter().map(|u| u.games_played).sum::<u32>() / 2,
    }
}
