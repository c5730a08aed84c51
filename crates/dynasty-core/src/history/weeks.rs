// Regular-season and playoff week bounds for one league season.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::model::LeagueSettings;

/// Regular-season length used when a league has no playoffs configured and
/// the provider does not say how many weeks were scored.
const FALLBACK_SEASON_WEEKS: u32 = 17;

/// Number of closing regular-season weeks that count as "late season".
pub const LATE_SEASON_WEEKS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub regular_season_weeks: u32,
    pub total_weeks: u32,
}

impl WeekWindow {
    /// Derive the window from league settings.
    ///
    /// `playoff_rounds` is the configured number of playoff weeks, counting a
    /// two-week final as two. An explicit `playoff_week_end` in the settings
    /// takes precedence over it.
    pub fn from_settings(settings: &LeagueSettings, playoff_rounds: u32) -> Self {
        let start = settings.playoff_week_start;
        if start == 0 {
            let weeks = settings
                .last_scored_leg
                .filter(|w| *w > 0)
                .unwrap_or(FALLBACK_SEASON_WEEKS);
            return Self {
                regular_season_weeks: weeks,
                total_weeks: weeks,
            };
        }

        let total_weeks = match settings.playoff_week_end {
            Some(end) if end >= start => end,
            _ => start + playoff_rounds.max(1) - 1,
        };
        Self {
            regular_season_weeks: start - 1,
            total_weeks,
        }
    }

    pub fn has_playoffs(&self) -> bool {
        self.total_weeks > self.regular_season_weeks
    }

    /// First playoff week, if the season has playoffs.
    pub fn playoff_start(&self) -> Option<u32> {
        self.has_playoffs().then_some(self.regular_season_weeks + 1)
    }

    /// Final playoff week (the championship week), if any.
    pub fn final_week(&self) -> Option<u32> {
        self.has_playoffs().then_some(self.total_weeks)
    }

    pub fn is_playoff(&self, week: u32) -> bool {
        week > self.regular_season_weeks && week <= self.total_weeks
    }

    pub fn is_late_season(&self, week: u32) -> bool {
        week <= self.regular_season_weeks
            && week + LATE_SEASON_WEEKS > self.regular_season_weeks
    }

    pub fn weeks(&self) -> RangeInclusive<u32> {
        1..=self.total_weeks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(start: u32) -> LeagueSettings {
        LeagueSettings {
            playoff_week_start: start,
            playoff_teams: Some(6),
            ..Default::default()
        }
    }

    #[test]
    fn default_three_round_window() {
        let w = WeekWindow::from_settings(&settings(15), 3);
        assert_eq!(w.regular_season_weeks, 14);
        assert_eq!(w.total_weeks, 17);
        assert_eq!(w.playoff_start(), Some(15));
        assert_eq!(w.final_week(), Some(17));
    }

    #[test]
    fn configured_round_count_is_respected() {
        let w = WeekWindow::from_settings(&settings(15), 2);
        assert_eq!(w.total_weeks, 16);
        let w = WeekWindow::from_settings(&settings(14), 4);
        assert_eq!(w.total_weeks, 17);
    }

    #[test]
    fn explicit_playoff_end_wins() {
        let mut s = settings(15);
        s.playoff_week_end = Some(18);
        let w = WeekWindow::from_settings(&s, 3);
        assert_eq!(w.total_weeks, 18);
    }

    #[test]
    fn no_playoffs_uses_last_scored_leg() {
        let mut s = settings(0);
        s.last_scored_leg = Some(13);
        let w = WeekWindow::from_settings(&s, 3);
        assert_eq!(w.regular_season_weeks, 13);
        assert!(!w.has_playoffs());
        assert_eq!(w.final_week(), None);
    }

    #[test]
    fn late_season_is_final_four_regular_weeks() {
        let w = WeekWindow::from_settings(&settings(15), 3);
        let late: Vec<u32> = w.weeks().filter(|wk| w.is_late_season(*wk)).collect();
        assert_eq!(late, vec![11, 12, 13, 14]);
        assert!(w.is_playoff(15));
        assert!(!w.is_playoff(14));
        assert!(!w.is_playoff(18));
    }
}
