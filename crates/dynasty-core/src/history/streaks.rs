// Win/loss streaks.
//
// Game-level streaks run within one season over games in week order.
// Season-level streaks run across a user's whole history over seasons in
// chronological order, carried as an explicit fold accumulator.

use serde::Serialize;

use crate::history::matchups::{Game, Outcome};
use crate::history::records::{Record, RecordKind};
use crate::history::Owner;

/// Shortest run that is worth a record.
pub const MIN_RECORD_STREAK: u32 = 2;

// ---------------------------------------------------------------------------
// Game-level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStreaks {
    pub longest_win: u32,
    pub longest_loss: u32,
}

/// Longest win and loss runs in a sequence of outcomes. A tie ends both.
pub fn game_streaks<I>(outcomes: I) -> GameStreaks
where
    I: IntoIterator<Item = Outcome>,
{
    let mut streaks = GameStreaks::default();
    let (mut wins, mut losses) = (0u32, 0u32);
    for outcome in outcomes {
        match outcome {
            Outcome::Win => {
                wins += 1;
                losses = 0;
            }
            Outcome::Loss => {
                losses += 1;
                wins = 0;
            }
            Outcome::Tie => {
                wins = 0;
                losses = 0;
            }
        }
        streaks.longest_win = streaks.longest_win.max(wins);
        streaks.longest_loss = streaks.longest_loss.max(losses);
    }
    streaks
}

/// Outcomes for one roster over games already ordered by week.
pub fn outcomes_for<'a, I>(games: I, roster_id: u32) -> Vec<Outcome>
where
    I: IntoIterator<Item = &'a Game>,
{
    games
        .into_iter()
        .filter_map(|g| g.outcome_for(roster_id))
        .collect()
}

/// Win/loss streak records for one owner's season.
pub fn game_streak_records(season: &str, owner: &Owner, streaks: GameStreaks) -> Vec<Record> {
    let mut records = Vec::new();
    if streaks.longest_win >= MIN_RECORD_STREAK {
        records.push(
            Record::new(
                RecordKind::WinStreak,
                season,
                &owner.user_id,
                &owner.display_name,
                streaks.longest_win as f64,
            )
            .described(format!(
                "{} won {} straight in {season}",
                owner.display_name, streaks.longest_win
            )),
        );
    }
    if streaks.longest_loss >= MIN_RECORD_STREAK {
        records.push(
            Record::new(
                RecordKind::LossStreak,
                season,
                &owner.user_id,
                &owner.display_name,
                streaks.longest_loss as f64,
            )
            .described(format!(
                "{} lost {} straight in {season}",
                owner.display_name, streaks.longest_loss
            )),
        );
    }
    records
}

// ---------------------------------------------------------------------------
// Season-level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonClass {
    Winning,
    Losing,
}

impl SeasonClass {
    /// Winning means strictly better than .500.
    pub fn from_win_rate(win_rate: f64) -> Self {
        if win_rate > 0.5 {
            SeasonClass::Winning
        } else {
            SeasonClass::Losing
        }
    }
}

/// A run of consecutive same-class seasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonRun {
    pub kind: SeasonClass,
    pub length: u32,
    pub first_season: String,
    pub last_season: String,
}

/// Fold state for season-level streaks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeasonStreaks {
    pub current: Option<SeasonRun>,
    pub longest_winning: Option<SeasonRun>,
    pub longest_losing: Option<SeasonRun>,
}

impl SeasonStreaks {
    /// Advance by one season. Seasons must arrive oldest first.
    pub fn step(self, season: &str, class: SeasonClass) -> Self {
        let current = match self.current {
            Some(run) if run.kind == class => SeasonRun {
                length: run.length + 1,
                last_season: season.to_string(),
                ..run
            },
            _ => SeasonRun {
                kind: class,
                length: 1,
                first_season: season.to_string(),
                last_season: season.to_string(),
            },
        };

        let (mut longest_winning, mut longest_losing) = (self.longest_winning, self.longest_losing);
        let best = match class {
            SeasonClass::Winning => &mut longest_winning,
            SeasonClass::Losing => &mut longest_losing,
        };
        if best.as_ref().map_or(true, |b| current.length > b.length) {
            *best = Some(current.clone());
        }

        Self {
            current: Some(current),
            longest_winning,
            longest_losing,
        }
    }

    pub fn longest_winning_len(&self) -> u32 {
        self.longest_winning.as_ref().map_or(0, |r| r.length)
    }

    pub fn longest_losing_len(&self) -> u32 {
        self.longest_losing.as_ref().map_or(0, |r| r.length)
    }
}

/// Fold chronologically ordered `(season, class)` pairs.
pub fn season_streaks<'a, I>(seasons: I) -> SeasonStreaks
where
    I: IntoIterator<Item = (&'a str, SeasonClass)>,
{
    seasons
        .into_iter()
        .fold(SeasonStreaks::default(), |acc, (season, class)| acc.step(season, class))
}

/// Lifetime season-streak records for one user. Each record is attributed to
/// the season that ended the run.
pub fn season_streak_records(owner: &Owner, streaks: &SeasonStreaks) -> Vec<Record> {
    [
        (RecordKind::WinningSeasonStreak, &streaks.longest_winning, "winning"),
        (RecordKind::LosingSeasonStreak, &streaks.longest_losing, "losing"),
    ]
    .into_iter()
    .filter_map(|(kind, run, label)| {
        let run = run.as_ref().filter(|r| r.length >= MIN_RECORD_STREAK)?;
        Some(
            Record::new(
                kind,
                run.last_season.as_str(),
                &owner.user_id,
                &owner.display_name,
                run.length as f64,
            )
            .described(format!(
                "{} put together {} straight {label} seasons ({}-{})",
                owner.display_name, run.length, run.first_season, run.last_season
            )),
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::{Loss, Tie, Win};

    #[test]
    fn win_streak_interrupted_by_loss() {
        // Weeks 1-5 won, week 6 lost, weeks 7-9 won, rest of a 13-week
        // season lost.
        let mut outcomes = vec![Win; 5];
        outcomes.push(Loss);
        outcomes.extend([Win; 3]);
        outcomes.extend([Loss; 4]);
        let streaks = game_streaks(outcomes);
        assert_eq!(streaks.longest_win, 5);
        assert_eq!(streaks.longest_loss, 4);
    }

    #[test]
    fn tie_resets_both_runs() {
        let streaks = game_streaks([Win, Win, Tie, Win, Loss, Tie, Loss]);
        assert_eq!(streaks.longest_win, 2);
        assert_eq!(streaks.longest_loss, 1);
    }

    #[test]
    fn empty_history_has_no_streaks() {
        assert_eq!(game_streaks(Vec::new()), GameStreaks::default());
    }

    #[test]
    fn season_classification_requires_better_than_even() {
        assert_eq!(SeasonClass::from_win_rate(0.5), SeasonClass::Losing);
        assert_eq!(SeasonClass::from_win_rate(0.51), SeasonClass::Winning);
    }

    #[test]
    fn season_fold_tracks_longest_runs() {
        use SeasonClass::{Losing, Winning};
        let seasons = [
            ("2017", Winning),
            ("2018", Winning),
            ("2019", Losing),
            ("2020", Winning),
            ("2021", Winning),
            ("2022", Winning),
            ("2023", Losing),
            ("2024", Losing),
        ];
        let streaks = season_streaks(seasons);
        let best = streaks.longest_winning.as_ref().unwrap();
        assert_eq!(best.length, 3);
        assert_eq!(best.first_season, "2020");
        assert_eq!(best.last_season, "2022");
        assert_eq!(streaks.longest_losing_len(), 2);
        assert_eq!(streaks.current.as_ref().unwrap().kind, Losing);
    }

    #[test]
    fn season_records_only_for_runs_of_two_or_more() {
        let owner = Owner {
            user_id: "u1".into(),
            display_name: "Alice".into(),
            avatar: None,
            team_name: None,
        };
        let streaks = season_streaks([
            ("2020", SeasonClass::Winning),
            ("2021", SeasonClass::Winning),
            ("2022", SeasonClass::Losing),
        ]);
        let records = season_streak_records(&owner, &streaks);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::WinningSeasonStreak);
        assert_eq!(records[0].season, "2021");
        assert_eq!(records[0].value, 2.0);
    }
}
