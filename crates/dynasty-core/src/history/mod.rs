// League history pipeline.
//
// `HistoryEngine::run` resolves the season chain for a seed league, processes
// every season concurrently, folds the results oldest first into lifetime
// stats, and ranks the record book.

pub mod aggregate;
pub mod chain;
pub mod champion;
pub mod matchups;
pub mod metrics;
pub mod records;
pub mod season;
pub mod streaks;
pub mod weeks;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, PlayoffConfig};
use crate::model::{Roster, User};
use crate::source::{DataSource, SourceError};

use self::aggregate::{aggregate, LeagueMetadata, UserStats};
use self::chain::{ChainCache, ChainLink};
use self::champion::ChampionResolver;
use self::metrics::{default_metrics, Metric, TeamMetrics};
use self::records::{rank_records, Record};
use self::season::{SeasonProcessor, SeasonResult, SeasonStats};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no analyzable seasons linked to league {league_id}")]
    NoLinkedSeasons { league_id: String },

    #[error("data source error: {0}")]
    Source(#[from] SourceError),
}

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

/// The user behind a roster, as shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    pub user_id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    /// League-specific team name, when the user set one.
    pub team_name: Option<String>,
}

/// Roster id to owner for one season. Rosters without an owner are absent.
#[derive(Debug, Clone, Default)]
pub struct OwnerIndex {
    by_roster: HashMap<u32, Owner>,
}

impl OwnerIndex {
    /// A roster whose owner is missing from `users` still gets an entry,
    /// named by its user id.
    pub fn new(rosters: &[Roster], users: &[User]) -> Self {
        let users: HashMap<&str, &User> = users.iter().map(|u| (u.user_id.as_str(), u)).collect();
        let by_roster = rosters
            .iter()
            .filter_map(|roster| {
                let user_id = roster.owner_id.as_deref().filter(|id| !id.is_empty())?;
                let user = users.get(user_id);
                let display_name = user
                    .map(|u| u.display_name.trim())
                    .filter(|name| !name.is_empty())
                    .unwrap_or(user_id)
                    .to_string();
                Some((
                    roster.roster_id,
                    Owner {
                        user_id: user_id.to_string(),
                        display_name,
                        avatar: user.and_then(|u| u.avatar.clone()),
                        team_name: user
                            .and_then(|u| u.metadata.as_ref())
                            .and_then(|m| m.team_name.as_deref())
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string),
                    },
                ))
            })
            .collect();
        Self { by_roster }
    }

    pub fn get(&self, roster_id: u32) -> Option<&Owner> {
        self.by_roster.get(&roster_id)
    }

    pub fn len(&self) -> usize {
        self.by_roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_roster.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub seed_league_id: String,
    pub league_name: String,
    pub generated_at: DateTime<Utc>,
    pub seasons: Vec<ChainLink>,
    /// Ranked, grouped by kind.
    pub records: Vec<Record>,
    pub season_stats: BTreeMap<String, SeasonStats>,
    /// Season label to user id to metrics.
    pub season_metrics: BTreeMap<String, BTreeMap<String, TeamMetrics>>,
    pub all_time_stats: Vec<UserStats>,
    pub league_metadata: LeagueMetadata,
}

/// Receives a percentage (0-100) and a short status line.
pub type ProgressCallback = Arc<dyn Fn(u8, &str) + Send + Sync>;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct HistoryEngine {
    source: Arc<dyn DataSource>,
    playoffs: PlayoffConfig,
    resolver: ChampionResolver,
    metrics: Vec<Box<dyn Metric>>,
    cache: Arc<ChainCache>,
    progress: Option<ProgressCallback>,
}

impl HistoryEngine {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            playoffs: PlayoffConfig::default(),
            resolver: ChampionResolver::default(),
            metrics: default_metrics(),
            cache: Arc::new(ChainCache::new()),
            progress: None,
        }
    }

    /// Engine with playoff lengths and champion strategies taken from config.
    pub fn from_config(source: Arc<dyn DataSource>, config: &Config) -> Self {
        Self::new(source)
            .with_playoffs(config.playoffs.clone())
            .with_resolver(ChampionResolver::new(&config.champion.kinds()))
    }

    pub fn with_playoffs(mut self, playoffs: PlayoffConfig) -> Self {
        self.playoffs = playoffs;
        self
    }

    pub fn with_resolver(mut self, resolver: ChampionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<Box<dyn Metric>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Share a chain cache between engines.
    pub fn with_cache(mut self, cache: Arc<ChainCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, percent: u8, message: &str) {
        if let Some(progress) = &self.progress {
            progress(percent.min(100), message);
        }
    }

    /// Build the full history report for the league chain containing
    /// `seed_league_id`.
    pub async fn run(&self, seed_league_id: &str) -> Result<HistoryReport, HistoryError> {
        let source = self.source.as_ref();

        self.report(0, "Resolving season chain");
        let chain = self.cache.get_or_resolve(source, seed_league_id).await?;
        self.report(10, &format!("Found {} linked seasons", chain.len()));

        let nfl_state = match source.nfl_state().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "NFL state unavailable; only draft status gates seasons");
                None
            }
        };

        let processor = SeasonProcessor {
            source,
            playoffs: &self.playoffs,
            resolver: &self.resolver,
            metrics: &self.metrics,
            nfl_state: nfl_state.as_ref(),
        };
        let seasons = self.process_seasons(processor, &chain).await;
        if seasons.is_empty() {
            return Err(HistoryError::NoLinkedSeasons {
                league_id: seed_league_id.to_string(),
            });
        }

        self.report(85, "Aggregating all-time stats");
        let summary = aggregate(&seasons, &self.metrics);

        self.report(95, "Ranking records");
        let records = rank_records(
            seasons
                .iter()
                .flat_map(|s| s.records.iter().cloned())
                .chain(summary.records)
                .collect(),
        );

        let league_name = seasons
            .last()
            .map(|s| s.league.name.clone())
            .unwrap_or_default();
        let report = HistoryReport {
            seed_league_id: seed_league_id.to_string(),
            league_name,
            generated_at: Utc::now(),
            seasons: seasons
                .iter()
                .map(|s| ChainLink::from(&s.league))
                .collect(),
            records,
            season_stats: seasons
                .iter()
                .map(|s| (s.season().to_string(), s.stats.clone()))
                .collect(),
            season_metrics: seasons
                .iter()
                .map(|s| (s.season().to_string(), s.metrics.clone()))
                .collect(),
            all_time_stats: summary.users,
            league_metadata: summary.metadata,
        };

        info!(
            seed = seed_league_id,
            seasons = report.season_stats.len(),
            users = report.all_time_stats.len(),
            records = report.records.len(),
            "history report complete"
        );
        self.report(100, "Done");
        Ok(report)
    }

    /// Process every linked season concurrently. Failed or skipped seasons
    /// drop out; the rest come back oldest first.
    async fn process_seasons(
        &self,
        processor: SeasonProcessor<'_>,
        chain: &[ChainLink],
    ) -> Vec<SeasonResult> {
        let done = AtomicUsize::new(0);
        let total = chain.len().max(1);
        let done = &done;

        let runs = chain.iter().map(|link| async move {
            let outcome = processor.process(link).await;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            let percent = 10 + (finished * 70 / total) as u8;
            self.report(percent, &format!("Processed season {}", link.season));
            match outcome {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        league_id = %link.league_id,
                        season = %link.season,
                        error = %e,
                        "season unavailable; skipping"
                    );
                    None
                }
            }
        });

        let mut seasons: Vec<SeasonResult> = join_all(runs).await.into_iter().flatten().collect();
        seasons.sort_by_key(|s| s.league.season_year().unwrap_or(i32::MAX));
        seasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RosterSettings, UserMetadata};

    fn roster(id: u32, owner: Option<&str>) -> Roster {
        Roster {
            roster_id: id,
            owner_id: owner.map(str::to_string),
            settings: RosterSettings::default(),
        }
    }

    fn user(id: &str, name: &str) -> User {
        User {
            user_id: id.into(),
            display_name: name.into(),
            avatar: Some(format!("av-{id}")),
            metadata: Some(UserMetadata {
                team_name: Some(format!("{name} FC")),
            }),
        }
    }

    #[test]
    fn owner_index_maps_rosters_to_users() {
        let rosters = vec![roster(1, Some("u1")), roster(2, Some("u2")), roster(3, None)];
        let users = vec![user("u1", "Alice")];
        let owners = OwnerIndex::new(&rosters, &users);

        assert_eq!(owners.len(), 2);
        let alice = owners.get(1).unwrap();
        assert_eq!(alice.display_name, "Alice");
        assert_eq!(alice.avatar.as_deref(), Some("av-u1"));
        assert_eq!(alice.team_name.as_deref(), Some("Alice FC"));
        // Unknown user falls back to the id.
        let unknown = owners.get(2).unwrap();
        assert_eq!(unknown.display_name, "u2");
        assert!(unknown.team_name.is_none());
        assert!(owners.get(3).is_none());
    }
}
