// In-memory data source backed by fixture snapshots.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{DataSource, Result, SourceError};
use crate::model::{BracketMatch, League, Matchup, NflState, Roster, User};

/// Everything the provider knows about one league season.
#[derive(Debug, Clone)]
pub struct LeagueSnapshot {
    pub league: League,
    pub users: Vec<User>,
    pub rosters: Vec<Roster>,
    /// Matchup rows keyed by week.
    pub matchups: HashMap<u32, Vec<Matchup>>,
    pub winners_bracket: Option<Vec<BracketMatch>>,
}

impl LeagueSnapshot {
    pub fn new(league: League) -> Self {
        Self {
            league,
            users: Vec::new(),
            rosters: Vec::new(),
            matchups: HashMap::new(),
            winners_bracket: None,
        }
    }
}

/// Fixture-backed `DataSource`. Individual leagues or weeks can be marked as
/// failing to exercise the pipeline's isolate-and-continue paths.
#[derive(Debug, Clone)]
pub struct MemorySource {
    leagues: HashMap<String, LeagueSnapshot>,
    state: NflState,
    failing_leagues: HashSet<String>,
    failing_weeks: HashSet<(String, u32)>,
}

impl MemorySource {
    pub fn new(state: NflState) -> Self {
        Self {
            leagues: HashMap::new(),
            state,
            failing_leagues: HashSet::new(),
            failing_weeks: HashSet::new(),
        }
    }

    pub fn insert(&mut self, snapshot: LeagueSnapshot) {
        self.leagues.insert(snapshot.league.league_id.clone(), snapshot);
    }

    pub fn with(mut self, snapshot: LeagueSnapshot) -> Self {
        self.insert(snapshot);
        self
    }

    /// Every request for `league_id` fails.
    pub fn fail_league(&mut self, league_id: &str) {
        self.failing_leagues.insert(league_id.to_string());
    }

    /// Matchup requests for one week of `league_id` fail.
    pub fn fail_week(&mut self, league_id: &str, week: u32) {
        self.failing_weeks.insert((league_id.to_string(), week));
    }

    fn snapshot(&self, league_id: &str) -> Result<Option<&LeagueSnapshot>> {
        if self.failing_leagues.contains(league_id) {
            return Err(SourceError::Status {
                url: format!("memory://league/{league_id}"),
                status: 503,
            });
        }
        Ok(self.leagues.get(league_id))
    }

    fn require(&self, league_id: &str) -> Result<&LeagueSnapshot> {
        self.snapshot(league_id)?.ok_or_else(|| SourceError::NotFound {
            what: format!("league {league_id}"),
        })
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn league(&self, league_id: &str) -> Result<Option<League>> {
        Ok(self.snapshot(league_id)?.map(|s| s.league.clone()))
    }

    async fn users(&self, league_id: &str) -> Result<Vec<User>> {
        Ok(self.require(league_id)?.users.clone())
    }

    async fn rosters(&self, league_id: &str) -> Result<Vec<Roster>> {
        Ok(self.require(league_id)?.rosters.clone())
    }

    async fn matchups(&self, league_id: &str, week: u32) -> Result<Vec<Matchup>> {
        if self
            .failing_weeks
            .contains(&(league_id.to_string(), week))
        {
            return Err(SourceError::Status {
                url: format!("memory://league/{league_id}/matchups/{week}"),
                status: 500,
            });
        }
        Ok(self
            .require(league_id)?
            .matchups
            .get(&week)
            .cloned()
            .unwrap_or_default())
    }

    async fn winners_bracket(&self, league_id: &str) -> Result<Option<Vec<BracketMatch>>> {
        Ok(self.require(league_id)?.winners_bracket.clone())
    }

    async fn nfl_state(&self) -> Result<NflState> {
        Ok(self.state.clone())
    }

    async fn find_successor(&self, league_id: &str) -> Result<Option<League>> {
        Ok(self
            .leagues
            .values()
            .filter(|s| !self.failing_leagues.contains(&s.league.league_id))
            .find(|s| s.league.previous_league_id.as_deref() == Some(league_id))
            .map(|s| s.league.clone()))
    }
}
