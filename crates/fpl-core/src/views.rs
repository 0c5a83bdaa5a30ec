// Filter/sort projections over the player snapshot: top scorers, value,
// form, differentials, team performance and the fixture-difficulty ticker.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Fixture, Player, Position, Team};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Minimum season minutes for a regular starter.
pub const REGULAR_MIN_MINUTES: u32 = 450;

/// Minimum average minutes per appearance for a regular starter.
pub const REGULAR_MIN_AVG_MINUTES: f64 = 60.0;

/// Minutes above which zero form no longer disqualifies a starter.
pub const REGULAR_FORM_EXEMPT_MINUTES: u32 = 1800;

/// Value and form views need strictly more points than this.
pub const VIEW_MIN_POINTS: i32 = 20;

/// Value picks need a price strictly above this (millions).
pub const VALUE_MIN_COST: f64 = 4.0;

/// A current first-choice player judged on minutes and recent form.
pub fn is_regular_starter(player: &Player) -> bool {
    player.minutes >= REGULAR_MIN_MINUTES
        && player.minutes_per_appearance() >= REGULAR_MIN_AVG_MINUTES
        && (player.form != 0.0 || player.minutes >= REGULAR_FORM_EXEMPT_MINUTES)
}

// ---------------------------------------------------------------------------
// Player rows
// ---------------------------------------------------------------------------

/// Flat projection of the player fields every view displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub cost: f64,
    pub total_points: i32,
    pub form: f64,
    pub ownership: f64,
    pub points_per_million: f64,
    pub minutes: u32,
}

impl PlayerRow {
    fn from_player(player: &Player, team_names: &HashMap<u32, &str>) -> Self {
        PlayerRow {
            id: player.id,
            name: player.web_name.clone(),
            team: team_names.get(&player.team_id).copied().unwrap_or("?").to_string(),
            position: player.position,
            cost: player.cost,
            total_points: player.total_points,
            form: player.form,
            ownership: player.ownership,
            points_per_million: (player.points_per_million() * 100.0).round() / 100.0,
            minutes: player.minutes,
        }
    }
}

fn short_names(teams: &[Team]) -> HashMap<u32, &str> {
    teams.iter().map(|t| (t.id, t.short_name.as_str())).collect()
}

/// Keep players matching `predicate`, order them by `key` descending (stable)
/// and return at most `limit` rows.
pub fn project<P, K>(
    players: &[Player],
    teams: &[Team],
    predicate: P,
    key: K,
    limit: usize,
) -> Vec<PlayerRow>
where
    P: Fn(&Player) -> bool,
    K: Fn(&Player) -> f64,
{
    let mut selected: Vec<&Player> = players.iter().filter(|p| predicate(*p)).collect();
    selected.sort_by(|a, b| key(*b).partial_cmp(&key(*a)).unwrap_or(Ordering::Equal));

    let team_names = short_names(teams);
    selected
        .into_iter()
        .take(limit)
        .map(|p| PlayerRow::from_player(p, &team_names))
        .collect()
}

pub fn top_scorers(
    players: &[Player],
    teams: &[Team],
    position: Option<Position>,
    limit: usize,
) -> Vec<PlayerRow> {
    project(
        players,
        teams,
        |p| position.map_or(true, |pos| p.position == pos),
        |p| p.total_points as f64,
        limit,
    )
}

pub fn value_picks(players: &[Player], teams: &[Team], limit: usize) -> Vec<PlayerRow> {
    project(
        players,
        teams,
        |p| is_regular_starter(p) && p.total_points > VIEW_MIN_POINTS && p.cost > VALUE_MIN_COST,
        Player::points_per_million,
        limit,
    )
}

pub fn form_players(players: &[Player], teams: &[Team], limit: usize) -> Vec<PlayerRow> {
    project(
        players,
        teams,
        |p| is_regular_starter(p) && p.total_points > VIEW_MIN_POINTS,
        |p| p.form,
        limit,
    )
}

/// Low-ownership, high-scoring regular starters.
pub fn differentials(
    players: &[Player],
    teams: &[Team],
    max_ownership: f64,
    min_points: i32,
    limit: usize,
) -> Vec<PlayerRow> {
    project(
        players,
        teams,
        |p| p.ownership <= max_ownership && p.total_points >= min_points && is_regular_starter(p),
        |p| p.total_points as f64,
        limit,
    )
}

// ---------------------------------------------------------------------------
// Team performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPerformance {
    pub team_id: u32,
    pub team_name: String,
    pub squad_points: i32,
    pub goals: u32,
    pub assists: u32,
    /// Best clean-sheet tally among the team's goalkeepers and defenders.
    pub clean_sheets: u32,
    /// Average form of regular starters, 0.0 when there are none.
    pub avg_starter_form: f64,
    pub top_scorer: String,
    pub top_scorer_points: i32,
}

/// Season totals per team, highest squad points first.
pub fn team_performance(players: &[Player], teams: &[Team]) -> Vec<TeamPerformance> {
    let mut rows: Vec<TeamPerformance> = teams
        .iter()
        .map(|team| {
            let squad: Vec<&Player> = players.iter().filter(|p| p.team_id == team.id).collect();

            let starters_form: Vec<f64> = squad
                .iter()
                .filter(|p| is_regular_starter(p))
                .map(|p| p.form)
                .collect();
            let avg_starter_form = if starters_form.is_empty() {
                0.0
            } else {
                starters_form.iter().sum::<f64>() / starters_form.len() as f64
            };

            // First player wins on equal points.
            let top = squad.iter().fold(None::<&&Player>, |best, p| match best {
                Some(b) if b.total_points >= p.total_points => Some(b),
                _ => Some(p),
            });

            TeamPerformance {
                team_id: team.id,
                team_name: team.name.clone(),
                squad_points: squad.iter().map(|p| p.total_points).sum(),
                goals: squad.iter().map(|p| p.goals).sum(),
                assists: squad.iter().map(|p| p.assists).sum(),
                clean_sheets: squad
                    .iter()
                    .filter(|p| matches!(p.position, Position::Goalkeeper | Position::Defender))
                    .map(|p| p.clean_sheets)
                    .max()
                    .unwrap_or(0),
                avg_starter_form: (avg_starter_form * 100.0).round() / 100.0,
                top_scorer: top.map(|p| p.web_name.clone()).unwrap_or_default(),
                top_scorer_points: top.map(|p| p.total_points).unwrap_or(0),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.squad_points.cmp(&a.squad_points));
    rows
}

// ---------------------------------------------------------------------------
// Fixture-difficulty ticker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFixture {
    pub gameweek: u32,
    pub opponent: String,
    pub is_home: bool,
    pub difficulty: u8,
}

/// A team's run of fixtures over the next few gameweeks.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamFixtureRun {
    pub team_id: u32,
    pub team_name: String,
    pub fixtures: Vec<TickerFixture>,
    pub avg_difficulty: f64,
}

/// Upcoming difficulty per team for gameweeks `current..current + horizon`.
/// Easiest runs first; teams without fixtures in the window go last.
pub fn fixture_ticker(
    teams: &[Team],
    fixtures: &[Fixture],
    current_gameweek: u32,
    horizon: u32,
) -> Vec<TeamFixtureRun> {
    let window = current_gameweek..current_gameweek.saturating_add(horizon);
    let team_names = short_names(teams);

    let mut runs: Vec<TeamFixtureRun> = teams
        .iter()
        .map(|team| {
            let mut run: Vec<TickerFixture> = fixtures
                .iter()
                .filter(|f| !f.finished)
                .filter_map(|f| {
                    let gameweek = f.gameweek.filter(|gw| window.contains(gw))?;
                    let (opponent, is_home) = f.opponent_of(team.id)?;
                    Some(TickerFixture {
                        gameweek,
                        opponent: team_names.get(&opponent).copied().unwrap_or("?").to_string(),
                        is_home,
                        difficulty: f.difficulty_for(team.id).unwrap_or(0),
                    })
                })
                .collect();
            run.sort_by_key(|f| f.gameweek);

            let avg_difficulty = if run.is_empty() {
                0.0
            } else {
                run.iter().map(|f| f.difficulty as f64).sum::<f64>() / run.len() as f64
            };

            TeamFixtureRun {
                team_id: team.id,
                team_name: team.name.clone(),
                fixtures: run,
                avg_difficulty,
            }
        })
        .collect();

    runs.sort_by(|a, b| {
        a.fixtures
            .is_empty()
            .cmp(&b.fixtures.is_empty())
            .then_with(|| {
                a.avg_difficulty
                    .partial_cmp(&b.avg_difficulty)
                    .unwrap_or(Ordering::Equal)
            })
    });
    runs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
