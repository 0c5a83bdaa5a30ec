// Detail lookups. Unlike bulk aggregation, a lookup that cannot resolve its
// target is an error.

use serde::Serialize;

use crate::error::AnalysisError;
use crate::model::{Fixture, GameweekRecord, Player, Position, SeasonSummary, Team};

pub fn find_player(players: &[Player], id: u32) -> Result<&Player, AnalysisError> {
    players
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AnalysisError::PlayerNotFound {
            query: id.to_string(),
        })
}

/// Case-insensitive match on web name first, then full name.
pub fn find_player_by_name<'a>(
    players: &'a [Player],
    name: &str,
) -> Result<&'a Player, AnalysisError> {
    let needle = name.trim().to_lowercase();
    players
        .iter()
        .find(|p| p.web_name.to_lowercase() == needle)
        .or_else(|| players.iter().find(|p| p.full_name().to_lowercase() == needle))
        .ok_or_else(|| AnalysisError::PlayerNotFound {
            query: name.to_string(),
        })
}

pub fn find_team(teams: &[Team], team_id: u32) -> Result<&Team, AnalysisError> {
    teams
        .iter()
        .find(|t| t.id == team_id)
        .ok_or(AnalysisError::TeamNotFound { team_id })
}

// ---------------------------------------------------------------------------
// Player report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentGame {
    pub gameweek: u32,
    pub opponent: String,
    pub was_home: bool,
    pub minutes: u32,
    pub points: i32,
    /// Goals for and against the player's side, once the fixture has a score.
    pub goals_for: Option<u32>,
    pub goals_against: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextFixture {
    pub gameweek: Option<u32>,
    pub opponent: String,
    pub is_home: bool,
    pub difficulty: u8,
}

/// Season summary for one player with their most recent games.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerReport {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub cost: f64,
    pub total_points: i32,
    pub form: f64,
    pub points_per_game: f64,
    pub minutes: u32,
    pub recent: Vec<RecentGame>,
    /// Average points over `recent`, 0.0 when empty.
    pub recent_average: f64,
    pub next_fixtures: Vec<NextFixture>,
    pub previous_seasons: Vec<SeasonSummary>,
}

fn team_name(teams: &[Team], team_id: u32) -> String {
    find_team(teams, team_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|_| "?".to_string())
}

/// Build a [`PlayerReport`]. `recent` caps how many of the latest gameweek
/// records are included and `next` caps the upcoming fixtures listed.
pub fn player_report(
    player: &Player,
    history: &[GameweekRecord],
    previous_seasons: &[SeasonSummary],
    teams: &[Team],
    fixtures: &[Fixture],
    recent: usize,
    next: usize,
) -> PlayerReport {
    let mut ordered: Vec<&GameweekRecord> = history.iter().collect();
    ordered.sort_by_key(|r| r.gameweek);

    let skip = ordered.len().saturating_sub(recent);
    let recent_games: Vec<RecentGame> = ordered[skip..]
        .iter()
        .map(|r| {
            // Read from the opponent's side; the player may have changed team since.
            let score = fixtures
                .iter()
                .find(|f| f.id == r.fixture_id)
                .and_then(|f| f.score_for(r.opponent_team_id))
                .map(|(against, scored)| (scored, against));
            RecentGame {
                gameweek: r.gameweek,
                opponent: team_name(teams, r.opponent_team_id),
                was_home: r.was_home,
                minutes: r.minutes,
                points: r.points,
                goals_for: score.map(|(scored, _)| scored),
                goals_against: score.map(|(_, against)| against),
            }
        })
        .collect();

    let recent_average = if recent_games.is_empty() {
        0.0
    } else {
        recent_games.iter().map(|g| g.points as f64).sum::<f64>() / recent_games.len() as f64
    };

    let mut pending: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.is_pending() && f.involves(player.team_id))
        .collect();
    pending.sort_by_key(|f| f.schedule_key());

    let next_fixtures: Vec<NextFixture> = pending
        .into_iter()
        .take(next)
        .filter_map(|f| {
            let (opponent, is_home) = f.opponent_of(player.team_id)?;
            Some(NextFixture {
                gameweek: f.gameweek,
                opponent: team_name(teams, opponent),
                is_home,
                difficulty: f.difficulty_for(player.team_id).unwrap_or(0),
            })
        })
        .collect();

    PlayerReport {
        id: player.id,
        name: player.web_name.clone(),
        team: team_name(teams, player.team_id),
        position: player.position,
        cost: player.cost,
        total_points: player.total_points,
        form: player.form,
        points_per_game: player.points_per_game,
        minutes: player.minutes,
        recent: recent_games,
        recent_average: (recent_average * 100.0).round() / 100.0,
        next_fixtures,
        previous_seasons: previous_seasons.to_vec(),
    }
}
