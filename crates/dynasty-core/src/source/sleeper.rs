// Sleeper public API client.
//
// Thin reqwest adapter over the read-only endpoints the history pipeline
// needs. No retries or caching here; 404s on league lookups map to `None`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{DataSource, Result, SourceError};
use crate::model::{BracketMatch, League, Matchup, NflState, Roster, User};

pub const DEFAULT_BASE_URL: &str = "https://api.sleeper.app/v1";

/// Sleeper API client.
#[derive(Debug, Clone)]
pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET `path` and decode the body. The provider answers unknown ids with
    /// either a 404 or a literal `null`; both come back as `Ok(None)`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "sleeper request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str::<Option<T>>(&text)
            .map_err(|source| SourceError::Decode { url, source })
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        Ok(self.get_optional::<Vec<T>>(path).await?.unwrap_or_default())
    }

    /// All NFL leagues a user belongs to for one season.
    pub async fn user_leagues(&self, user_id: &str, season: &str) -> Result<Vec<League>> {
        self.get_list(&format!("/user/{user_id}/leagues/nfl/{season}")).await
    }
}

impl Default for SleeperClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl DataSource for SleeperClient {
    async fn league(&self, league_id: &str) -> Result<Option<League>> {
        self.get_optional(&format!("/league/{league_id}")).await
    }

    async fn users(&self, league_id: &str) -> Result<Vec<User>> {
        self.get_list(&format!("/league/{league_id}/users")).await
    }

    async fn rosters(&self, league_id: &str) -> Result<Vec<Roster>> {
        self.get_list(&format!("/league/{league_id}/rosters")).await
    }

    async fn matchups(&self, league_id: &str, week: u32) -> Result<Vec<Matchup>> {
        self.get_list(&format!("/league/{league_id}/matchups/{week}")).await
    }

    async fn winners_bracket(&self, league_id: &str) -> Result<Option<Vec<BracketMatch>>> {
        let bracket: Option<Vec<BracketMatch>> = self
            .get_optional(&format!("/league/{league_id}/winners_bracket"))
            .await?;
        Ok(bracket.filter(|matches| !matches.is_empty()))
    }

    async fn nfl_state(&self) -> Result<NflState> {
        self.get_optional("/state/nfl")
            .await?
            .ok_or_else(|| SourceError::NotFound {
                what: "nfl state".to_string(),
            })
    }

    /// Probes the league members' next-season leagues for one whose backlink
    /// is `league_id`. Stops at the first member that has one.
    async fn find_successor(&self, league_id: &str) -> Result<Option<League>> {
        let Some(league) = self.league(league_id).await? else {
            return Ok(None);
        };
        let Some(year) = league.season_year() else {
            return Ok(None);
        };
        let next_season = (year + 1).to_string();

        for user in self.users(league_id).await? {
            let leagues = self.user_leagues(&user.user_id, &next_season).await?;
            if let Some(next) = leagues
                .into_iter()
                .find(|l| l.previous_league_id.as_deref() == Some(league_id))
            {
                return Ok(Some(next));
            }
        }
        Ok(None)
    }
}
