// FPL public API data source.
//
// The `DataSource` trait is the seam between the pipeline and the network:
// the production implementation talks to the FPL API over reqwest, tests use
// an in-memory stub. JSON wire structs are private and converted into the
// core model on the way in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use fpl_core::model::{
    Fixture, GameweekRecord, Player, PlayerStatus, Position, SeasonSummary, Team,
};

use crate::config::ApiConfig;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Players and teams from `bootstrap-static/`.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
}

/// A fixture still to come, as listed in a player's summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFixture {
    pub fixture_id: u32,
    pub gameweek: Option<u32>,
    pub is_home: bool,
    pub difficulty: u8,
}

/// Everything `element-summary/{id}/` returns for one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerHistory {
    pub history: Vec<GameweekRecord>,
    pub upcoming: Vec<ScheduledFixture>,
    pub previous_seasons: Vec<SeasonSummary>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid JSON from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Supplier of the three FPL datasets. Each call may fail independently.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_bootstrap(&self) -> Result<Bootstrap, SourceError>;

    async fn fetch_fixtures(&self) -> Result<Vec<Fixture>, SourceError>;

    async fn fetch_player_history(&self, player_id: u32) -> Result<PlayerHistory, SourceError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// reqwest-backed client for the public FPL endpoints.
pub struct FplClient {
    http: reqwest::Client,
    base_url: String,
}

impl FplClient {
    pub fn new(api: &ApiConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(api.timeout())
            .user_agent(api.user_agent.as_str())
            .build()
            .map_err(SourceError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(&self, endpoint: &str) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "GET");

        let http_err = |source| SourceError::Http {
            endpoint: endpoint.to_string(),
            source,
        };
        let response = self.http.get(&url).send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(http_err)
    }
}

fn decode_err(endpoint: &str) -> impl FnOnce(serde_json::Error) -> SourceError + '_ {
    move |source| SourceError::Decode {
        endpoint: endpoint.to_string(),
        source,
    }
}

#[async_trait]
impl DataSource for FplClient {
    async fn fetch_bootstrap(&self) -> Result<Bootstrap, SourceError> {
        let endpoint = "bootstrap-static/";
        let body = self.get_text(endpoint).await?;
        parse_bootstrap(&body).map_err(decode_err(endpoint))
    }

    async fn fetch_fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
        let endpoint = "fixtures/";
        let body = self.get_text(endpoint).await?;
        parse_fixtures(&body).map_err(decode_err(endpoint))
    }

    async fn fetch_player_history(&self, player_id: u32) -> Result<PlayerHistory, SourceError> {
        let endpoint = format!("element-summary/{player_id}/");
        let body = self.get_text(&endpoint).await?;
        parse_player_history(&body).map_err(decode_err(&endpoint))
    }
}

// ---------------------------------------------------------------------------
// Raw JSON structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    elements: Vec<RawElement>,
    teams: Vec<RawTeam>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    name: String,
    short_name: String,
}

/// A player as listed in `bootstrap-static/`. Several numeric fields arrive
/// as strings ("5.2").
#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    first_name: String,
    second_name: String,
    web_name: String,
    team: u32,
    element_type: u8,
    status: String,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    starts: u32,
    #[serde(default)]
    form: String,
    #[serde(default)]
    total_points: i32,
    now_cost: u32,
    #[serde(default)]
    selected_by_percent: String,
    #[serde(default)]
    points_per_game: String,
    #[serde(default)]
    goals_scored: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    clean_sheets: u32,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    id: u32,
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    started: Option<bool>,
    #[serde(default)]
    kickoff_time: Option<String>,
    #[serde(default)]
    team_h_difficulty: u8,
    #[serde(default)]
    team_a_difficulty: u8,
    #[serde(default)]
    team_h_score: Option<u32>,
    #[serde(default)]
    team_a_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawElementSummary {
    #[serde(default)]
    history: Vec<RawHistoryEntry>,
    #[serde(default)]
    fixtures: Vec<RawUpcomingEntry>,
    #[serde(default)]
    history_past: Vec<RawPastSeason>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryEntry {
    round: u32,
    fixture: u32,
    opponent_team: u32,
    #[serde(default)]
    was_home: bool,
    minutes: u32,
    total_points: i32,
}

#[derive(Debug, Deserialize)]
struct RawUpcomingEntry {
    id: u32,
    event: Option<u32>,
    is_home: bool,
    difficulty: u8,
}

#[derive(Debug, Deserialize)]
struct RawPastSeason {
    season_name: String,
    total_points: i32,
    minutes: u32,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Parse a numeric string field, falling back to 0.0.
fn parse_decimal(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

fn parse_kickoff(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(kickoff = raw, "unparseable kickoff time: {e}");
            None
        }
    }
}

impl RawElement {
    fn into_player(self) -> Option<Player> {
        let Some(position) = Position::from_element_type(self.element_type) else {
            warn!(
                player_id = self.id,
                element_type = self.element_type,
                "dropping player with unknown element_type"
            );
            return None;
        };
        Some(Player {
            id: self.id,
            first_name: self.first_name,
            second_name: self.second_name,
            web_name: self.web_name,
            team_id: self.team,
            position,
            status: PlayerStatus::from_code(&self.status),
            minutes: self.minutes,
            appearances: self.starts,
            form: parse_decimal(&self.form),
            total_points: self.total_points,
            cost: self.now_cost as f64 / 10.0,
            ownership: parse_decimal(&self.selected_by_percent),
            points_per_game: parse_decimal(&self.points_per_game),
            goals: self.goals_scored,
            assists: self.assists,
            clean_sheets: self.clean_sheets,
        })
    }
}

impl From<RawFixture> for Fixture {
    fn from(raw: RawFixture) -> Self {
        Fixture {
            id: raw.id,
            gameweek: raw.event,
            home_team_id: raw.team_h,
            away_team_id: raw.team_a,
            finished: raw.finished,
            started: raw.started.unwrap_or(false),
            kickoff_time: parse_kickoff(raw.kickoff_time.as_deref()),
            home_difficulty: raw.team_h_difficulty,
            away_difficulty: raw.team_a_difficulty,
            home_score: raw.team_h_score,
            away_score: raw.team_a_score,
        }
    }
}

pub fn parse_bootstrap(json: &str) -> Result<Bootstrap, serde_json::Error> {
    let raw: RawBootstrap = serde_json::from_str(json)?;
    Ok(Bootstrap {
        players: raw
            .elements
            .into_iter()
            .filter_map(RawElement::into_player)
            .collect(),
        teams: raw
            .teams
            .into_iter()
            .map(|t| Team {
                id: t.id,
                name: t.name,
                short_name: t.short_name,
            })
            .collect(),
    })
}

pub fn parse_fixtures(json: &str) -> Result<Vec<Fixture>, serde_json::Error> {
    let raw: Vec<RawFixture> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(Fixture::from).collect())
}

pub fn parse_player_history(json: &str) -> Result<PlayerHistory, serde_json::Error> {
    let raw: RawElementSummary = serde_json::from_str(json)?;
    Ok(PlayerHistory {
        history: raw
            .history
            .into_iter()
            .map(|h| GameweekRecord {
                gameweek: h.round,
                fixture_id: h.fixture,
                opponent_team_id: h.opponent_team,
                was_home: h.was_home,
                minutes: h.minutes,
                points: h.total_points,
            })
            .collect(),
        upcoming: raw
            .fixtures
            .into_iter()
            .map(|f| ScheduledFixture {
                fixture_id: f.id,
                gameweek: f.event,
                is_home: f.is_home,
                difficulty: f.difficulty,
            })
            .collect(),
        previous_seasons: raw
            .history_past
            .into_iter()
            .map(|s| SeasonSummary {
                season: s.season_name,
                total_points: s.total_points,
                minutes: s.minutes,
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTSTRAP: &str = r#"{
        "events": [],
        "teams": [
            {"id": 1, "name": "Arsenal", "short_name": "ARS", "strength": 4},
            {"id": 12, "name": "Liverpool", "short_name": "LIV", "strength": 5}
        ],
        "elements": [
            {
                "id": 328, "first_name": "Mohamed", "second_name": "Salah",
                "web_name": "M.Salah", "team": 12, "element_type": 3, "status": "a",
                "minutes": 2700, "starts": 30, "form": "8.2", "total_points": 210,
                "now_cost": 131, "selected_by_percent": "61.4", "points_per_game": "7.0",
                "goals_scored": 20, "assists": 12, "clean_sheets": 10, "news": ""
            },
            {
                "id": 5, "first_name": "Gabriel", "second_name": "dos Santos",
                "web_name": "Gabriel", "team": 1, "element_type": 2, "status": "i",
                "minutes": 1500, "starts": 17, "form": "", "total_points": 90,
                "now_cost": 60, "selected_by_percent": "n/a", "points_per_game": "5.3"
            },
            {
                "id": 900, "first_name": "Coach", "second_name": "Person",
                "web_name": "Coach", "team": 1, "element_type": 5, "status": "a",
                "now_cost": 15
            }
        ]
    }"#;

    #[test]
    fn bootstrap_maps_players_and_teams() {
        let bootstrap = parse_bootstrap(BOOTSTRAP).unwrap();
        assert_eq!(bootstrap.teams.len(), 2);
        assert_eq!(bootstrap.teams[1].short_name, "LIV");

        // The element_type 5 entry is dropped.
        assert_eq!(bootstrap.players.len(), 2);

        let salah = &bootstrap.players[0];
        assert_eq!(salah.position, Position::Midfielder);
        assert_eq!(salah.status, PlayerStatus::Available);
        assert_eq!(salah.appearances, 30);
        assert!((salah.cost - 13.1).abs() < 1e-9);
        assert!((salah.form - 8.2).abs() < 1e-9);
        assert!((salah.ownership - 61.4).abs() < 1e-9);
        assert_eq!(salah.goals, 20);

        let gabriel = &bootstrap.players[1];
        assert_eq!(gabriel.status, PlayerStatus::Injured);
        assert_eq!(gabriel.form, 0.0);
        assert_eq!(gabriel.ownership, 0.0);
        assert_eq!(gabriel.goals, 0);
    }

    #[test]
    fn fixtures_handle_nullable_fields() {
        let json = r#"[
            {"id": 1, "event": 1, "team_h": 1, "team_a": 12, "finished": true,
             "started": true, "kickoff_time": "2024-08-17T14:00:00Z",
             "team_h_difficulty": 4, "team_a_difficulty": 3,
             "team_h_score": 2, "team_a_score": 0},
            {"id": 2, "event": null, "team_h": 12, "team_a": 1, "finished": false,
             "started": null, "kickoff_time": null,
             "team_h_difficulty": 4, "team_a_difficulty": 5,
             "team_h_score": null, "team_a_score": null}
        ]"#;
        let fixtures = parse_fixtures(json).unwrap();
        assert_eq!(fixtures.len(), 2);

        assert_eq!(fixtures[0].gameweek, Some(1));
        assert!(fixtures[0].finished);
        assert_eq!(fixtures[0].home_score, Some(2));
        assert_eq!(
            fixtures[0].kickoff_time.map(|k| k.to_rfc3339()),
            Some("2024-08-17T14:00:00+00:00".to_string())
        );

        assert_eq!(fixtures[1].gameweek, None);
        assert!(!fixtures[1].started);
        assert!(fixtures[1].kickoff_time.is_none());
        assert_eq!(fixtures[1].away_difficulty, 5);
    }

    #[test]
    fn bad_kickoff_becomes_none() {
        let json = r#"[{"id": 3, "event": 4, "team_h": 1, "team_a": 2,
                        "kickoff_time": "next tuesday"}]"#;
        let fixtures = parse_fixtures(json).unwrap();
        assert!(fixtures[0].kickoff_time.is_none());
    }

    #[test]
    fn element_summary_maps_all_sections() {
        let json = r#"{
            "fixtures": [
                {"id": 300, "event": 30, "is_home": false, "difficulty": 4,
                 "team_h": 1, "team_a": 12}
            ],
            "history": [
                {"element": 328, "fixture": 10, "opponent_team": 1, "round": 1,
                 "was_home": true, "minutes": 90, "total_points": 13},
                {"element": 328, "fixture": 20, "opponent_team": 4, "round": 2,
                 "was_home": false, "minutes": 0, "total_points": 0}
            ],
            "history_past": [
                {"season_name": "2023/24", "total_points": 211, "minutes": 2536}
            ]
        }"#;
        let summary = parse_player_history(json).unwrap();

        assert_eq!(summary.history.len(), 2);
        assert_eq!(summary.history[0].gameweek, 1);
        assert_eq!(summary.history[0].opponent_team_id, 1);
        assert_eq!(summary.history[0].points, 13);
        assert_eq!(summary.history[1].minutes, 0);

        assert_eq!(
            summary.upcoming,
            vec![ScheduledFixture {
                fixture_id: 300,
                gameweek: Some(30),
                is_home: false,
                difficulty: 4,
            }]
        );
        assert_eq!(summary.previous_seasons[0].season, "2023/24");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let summary = parse_player_history("{}").unwrap();
        assert!(summary.history.is_empty());
        assert!(summary.upcoming.is_empty());
        assert!(summary.previous_seasons.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_bootstrap("{\"elements\": 3}").is_err());
        assert!(parse_fixtures("not json").is_err());
    }
}
