// Season chain discovery.
//
// A persistent league is a new league id every season, linked backwards by
// `previous_league_id`. Walk the backlinks from the seed, probe once for a
// successor, and order the result oldest first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::history::HistoryError;
use crate::model::League;
use crate::source::DataSource;

/// One season of a persistent league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    pub league_id: String,
    pub season: String,
}

impl ChainLink {
    pub fn year(&self) -> Option<i32> {
        self.season.trim().parse().ok()
    }
}

impl From<&League> for ChainLink {
    fn from(league: &League) -> Self {
        Self {
            league_id: league.league_id.clone(),
            season: league.season.clone(),
        }
    }
}

/// Resolve the seasons linked to `seed_league_id`, oldest first.
///
/// The seed must be reachable. Any other hop that fails or is missing ends
/// the walk in that direction; the seasons found so far are kept.
pub async fn resolve_chain(
    source: &dyn DataSource,
    seed_league_id: &str,
) -> Result<Vec<ChainLink>, HistoryError> {
    let seed = source
        .league(seed_league_id)
        .await?
        .ok_or_else(|| HistoryError::NoLinkedSeasons {
            league_id: seed_league_id.to_string(),
        })?;

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(seed.league_id.clone());

    // Backwards: newest to oldest.
    let mut earlier = Vec::new();
    let mut cursor = seed.previous_league_id.clone();
    while let Some(id) = cursor.take() {
        if !visited.insert(id.clone()) {
            warn!(league_id = %id, "season chain loops back on itself; stopping");
            break;
        }
        match source.league(&id).await {
            Ok(Some(league)) => {
                debug!(league_id = %id, season = %league.season, "found previous season");
                cursor = league.previous_league_id.clone();
                earlier.push(league);
            }
            Ok(None) => {
                warn!(league_id = %id, "linked season not found; chain ends here");
            }
            Err(e) => {
                warn!(league_id = %id, error = %e, "linked season unreachable; chain ends here");
            }
        }
    }

    // Forwards: at most one successor.
    let successor = match source.find_successor(&seed.league_id).await {
        Ok(Some(next))
            if next.previous_league_id.as_deref() == Some(seed.league_id.as_str())
                && !visited.contains(&next.league_id) =>
        {
            debug!(league_id = %next.league_id, season = %next.season, "found next season");
            Some(next)
        }
        Ok(_) => None,
        Err(e) => {
            warn!(league_id = %seed.league_id, error = %e, "successor probe failed");
            None
        }
    };

    let mut chain: Vec<ChainLink> = earlier.iter().rev().map(ChainLink::from).collect();
    chain.push(ChainLink::from(&seed));
    chain.extend(successor.as_ref().map(ChainLink::from));

    let chain = order_chronologically(chain);
    info!(
        seed = seed_league_id,
        seasons = chain.len(),
        "resolved season chain: {}",
        chain
            .iter()
            .map(|l| l.season.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(chain)
}

/// Stable sort by season year, dropping any later league that repeats a
/// season label already seen.
fn order_chronologically(chain: Vec<ChainLink>) -> Vec<ChainLink> {
    let mut seen_seasons = HashSet::new();
    let mut unique: Vec<ChainLink> = chain
        .into_iter()
        .filter(|l| {
            let fresh = seen_seasons.insert(l.season.clone());
            if !fresh {
                warn!(
                    league_id = %l.league_id,
                    season = %l.season,
                    "duplicate season in chain; ignoring"
                );
            }
            fresh
        })
        .collect();
    unique.sort_by_key(|l| l.year().unwrap_or(i32::MAX));
    unique
}

/// Resolved chains keyed by seed league id. Each seed is resolved once;
/// later lookups share the same snapshot.
#[derive(Debug, Default)]
pub struct ChainCache {
    chains: RwLock<HashMap<String, Arc<Vec<ChainLink>>>>,
}

impl ChainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_resolve(
        &self,
        source: &dyn DataSource,
        seed_league_id: &str,
    ) -> Result<Arc<Vec<ChainLink>>, HistoryError> {
        if let Some(chain) = self.chains.read().await.get(seed_league_id) {
            return Ok(Arc::clone(chain));
        }

        let resolved = Arc::new(resolve_chain(source, seed_league_id).await?);
        let mut chains = self.chains.write().await;
        Ok(Arc::clone(
            chains
                .entry(seed_league_id.to_string())
                .or_insert(resolved),
        ))
    }

    pub async fn cached(&self, seed_league_id: &str) -> Option<Arc<Vec<ChainLink>>> {
        self.chains.read().await.get(seed_league_id).cloned()
    }
}
