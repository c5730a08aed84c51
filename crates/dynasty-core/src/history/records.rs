// Historical record events and the per-kind top-N ranker.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Records kept per kind after ranking.
pub const RECORDS_PER_KIND: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Championship,
    RunnerUp,
    RegularSeasonChamp,
    HighScore,
    LowScore,
    PlayoffHighScore,
    PlayoffLowScore,
    WinStreak,
    LossStreak,
    WinningSeasonStreak,
    LosingSeasonStreak,
    Blowout,
    CloseGame,
    PlayoffAppearance,
}

impl RecordKind {
    /// Kinds where the smallest value is the most notable.
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            RecordKind::LowScore | RecordKind::PlayoffLowScore | RecordKind::CloseGame
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Championship => "Championship",
            RecordKind::RunnerUp => "Runner-up",
            RecordKind::RegularSeasonChamp => "Regular season champion",
            RecordKind::HighScore => "High score",
            RecordKind::LowScore => "Low score",
            RecordKind::PlayoffHighScore => "Playoff high score",
            RecordKind::PlayoffLowScore => "Playoff low score",
            RecordKind::WinStreak => "Win streak",
            RecordKind::LossStreak => "Loss streak",
            RecordKind::WinningSeasonStreak => "Winning seasons in a row",
            RecordKind::LosingSeasonStreak => "Losing seasons in a row",
            RecordKind::Blowout => "Blowout",
            RecordKind::CloseGame => "Close game",
            RecordKind::PlayoffAppearance => "Playoff appearance",
        }
    }

    /// Order two values of this kind, most notable first.
    fn compare_values(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        if self.lower_is_better() {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// How much an event's attribution can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    /// Derived from a heuristic rather than provider data.
    Low,
}

/// A describable statistical event attributable to one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub kind: RecordKind,
    pub season: String,
    pub week: Option<u32>,
    pub user_id: String,
    pub display_name: String,
    pub opponent_user_id: Option<String>,
    pub value: f64,
    pub description: String,
    pub confidence: Confidence,
    /// 1-based position within `kind`; set by `rank_records`.
    pub contextual_rank: Option<u32>,
}

impl Record {
    pub fn new(
        kind: RecordKind,
        season: impl Into<String>,
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            kind,
            season: season.into(),
            week: None,
            user_id: user_id.into(),
            display_name: display_name.into(),
            opponent_user_id: None,
            value,
            description: String::new(),
            confidence: Confidence::High,
            contextual_rank: None,
        }
    }

    pub fn in_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }

    pub fn against(mut self, opponent_user_id: impl Into<String>) -> Self {
        self.opponent_user_id = Some(opponent_user_id.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Identity used for de-duplication. Values are compared at hundredths,
    /// the precision the provider reports scores in.
    fn dedup_key(&self) -> (RecordKind, &str, Option<u32>, &str, i64) {
        (
            self.kind,
            self.season.as_str(),
            self.week,
            self.user_id.as_str(),
            (self.value * 100.0).round() as i64,
        )
    }
}

/// Keep the `keep` most notable candidates of a single kind, unranked.
/// Used to bound per-season candidate lists before the final ranking.
pub fn retain_best(records: &mut Vec<Record>, keep: usize) {
    records.sort_by(|a, b| compare_records(a, b));
    records.truncate(keep);
}

fn compare_records(a: &Record, b: &Record) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| a.kind.compare_values(a.value, b.value))
        .then_with(|| compare_seasons(&a.season, &b.season))
        .then_with(|| a.week.cmp(&b.week))
}

fn compare_seasons(a: &str, b: &str) -> Ordering {
    match (a.parse::<i32>(), b.parse::<i32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Deduplicate, rank within kind, and truncate to `RECORDS_PER_KIND`.
///
/// Output is grouped by kind (declaration order) and ordered by rank.
pub fn rank_records(records: Vec<Record>) -> Vec<Record> {
    let mut by_kind: BTreeMap<RecordKind, Vec<Record>> = BTreeMap::new();
    {
        let mut seen = HashSet::new();
        for record in &records {
            if seen.insert(record.dedup_key()) {
                by_kind.entry(record.kind).or_default().push(record.clone());
            }
        }
    }

    let mut ranked = Vec::new();
    for (_, mut group) in by_kind {
        retain_best(&mut group, RECORDS_PER_KIND);
        for (i, mut record) in group.into_iter().enumerate() {
            record.contextual_rank = Some(i as u32 + 1);
            ranked.push(record);
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(kind: RecordKind, season: &str, week: u32, user: &str, value: f64) -> Record {
        Record::new(kind, season, user, user, value).in_week(week)
    }

    #[test]
    fn never_more_than_ten_per_kind() {
        let highs = (0..40).map(|i| {
            let user = format!("u{i}");
            score(RecordKind::HighScore, "2022", i % 17 + 1, &user, 100.0 + i as f64)
        });
        let blowouts = (0..3).map(|i| {
            let user = format!("b{i}");
            score(RecordKind::Blowout, "2022", 1, &user, 40.0 + i as f64)
        });
        let records: Vec<Record> = highs.chain(blowouts).collect();

        let ranked = rank_records(records);
        let highs: Vec<&Record> = ranked
            .iter()
            .filter(|r| r.kind == RecordKind::HighScore)
            .collect();
        assert_eq!(highs.len(), 10);
        assert_eq!(highs[0].value, 139.0);
        let ranks: Vec<u32> = highs.iter().map(|r| r.contextual_rank.unwrap()).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<_>>());

        let blowouts = ranked.iter().filter(|r| r.kind == RecordKind::Blowout).count();
        assert_eq!(blowouts, 3);
    }

    #[test]
    fn lower_is_better_kinds_sort_ascending() {
        let ranked = rank_records(vec![
            score(RecordKind::LowScore, "2021", 3, "a", 71.2),
            score(RecordKind::LowScore, "2021", 4, "b", 52.0),
            score(RecordKind::LowScore, "2022", 1, "c", 60.5),
        ]);
        let values: Vec<f64> = ranked.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![52.0, 60.5, 71.2]);
        assert_eq!(ranked[0].contextual_rank, Some(1));
    }

    #[test]
    fn duplicates_are_collapsed() {
        let ranked = rank_records(vec![
            score(RecordKind::CloseGame, "2020", 5, "a", 0.4),
            score(RecordKind::CloseGame, "2020", 5, "a", 0.4),
            score(RecordKind::CloseGame, "2020", 6, "a", 0.4),
        ]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].contextual_rank, Some(2));
    }

    #[test]
    fn ties_keep_older_events_first() {
        let ranked = rank_records(vec![
            score(RecordKind::HighScore, "2023", 2, "late", 150.0),
            score(RecordKind::HighScore, "2019", 9, "early", 150.0),
        ]);
        assert_eq!(ranked[0].user_id, "early");
        assert_eq!(ranked[1].user_id, "late");
    }

    #[test]
    fn retain_best_bounds_candidates() {
        let mut candidates: Vec<Record> = (0..60)
            .map(|i| score(RecordKind::PlayoffLowScore, "2024", 15, &format!("u{i}"), i as f64))
            .collect();
        retain_best(&mut candidates, 50);
        assert_eq!(candidates.len(), 50);
        assert_eq!(candidates[0].value, 0.0);
        assert!(candidates.iter().all(|r| r.contextual_rank.is_none()));
    }
}
