// Points conceded per team to each position.
//
// Every gameweek record a player logs against an opponent is points that
// opponent "allowed" to the player's position. Summed across the whole player
// pool this gives a per-position picture of which defences leak points.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{GameweekRecord, Player, Position, Team};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Running totals for one (position, team) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefenseStat {
    pub points_allowed: i32,
    pub games_counted: u32,
}

impl DefenseStat {
    /// Average points allowed per counted game, or 0.0 for an empty cell.
    pub fn average(&self) -> f64 {
        if self.games_counted == 0 {
            return 0.0;
        }
        self.points_allowed as f64 / self.games_counted as f64
    }
}

/// A team's row in the ranked output for one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamDefenseSummary {
    pub position: Position,
    pub team_id: u32,
    pub team_name: String,
    pub points_allowed: i32,
    pub games_counted: u32,
    /// Rounded to two decimals.
    pub avg_points_allowed: f64,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Team ids up to this value are resolved by direct index. FPL uses 1..=20;
/// larger ids fall back to a linear scan.
const MAX_INDEXED_TEAM_ID: u32 = 255;

/// Fixed grid of [`DefenseStat`] cells: one row per position, one column per
/// team in the snapshot.
#[derive(Debug, Clone)]
pub struct DefenseTable {
    teams: Vec<Team>,
    /// Team id -> column for ids up to `MAX_INDEXED_TEAM_ID`.
    columns: Vec<Option<usize>>,
    /// (team id, column) for ids beyond the direct index.
    outliers: Vec<(u32, usize)>,
    cells: [Vec<DefenseStat>; Position::COUNT],
}

impl DefenseTable {
    /// Create a zeroed table with a column for every distinct team.
    pub fn new(teams: &[Team]) -> Self {
        let mut table = DefenseTable {
            teams: Vec::with_capacity(teams.len()),
            columns: Vec::new(),
            outliers: Vec::new(),
            cells: Default::default(),
        };
        let max_indexed = teams
            .iter()
            .map(|t| t.id)
            .filter(|&id| id <= MAX_INDEXED_TEAM_ID)
            .max()
            .unwrap_or(0);
        table.columns = vec![None; max_indexed as usize + 1];

        for team in teams {
            if table.column(team.id).is_some() {
                continue;
            }
            let column = table.teams.len();
            if team.id <= MAX_INDEXED_TEAM_ID {
                table.columns[team.id as usize] = Some(column);
            } else {
                table.outliers.push((team.id, column));
            }
            table.teams.push(team.clone());
        }

        let width = table.teams.len();
        table.cells = std::array::from_fn(|_| vec![DefenseStat::default(); width]);
        table
    }

    fn column(&self, team_id: u32) -> Option<usize> {
        if team_id <= MAX_INDEXED_TEAM_ID {
            self.columns.get(team_id as usize).copied().flatten()
        } else {
            self.outliers
                .iter()
                .find(|&&(id, _)| id == team_id)
                .map(|&(_, column)| column)
        }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team_name(&self, team_id: u32) -> Option<&str> {
        self.column(team_id).map(|c| self.teams[c].name.as_str())
    }

    /// Look up a cell. `None` when the team is not part of the snapshot.
    pub fn cell(&self, position: Position, team_id: u32) -> Option<&DefenseStat> {
        let column = self.column(team_id)?;
        self.cells[position.index()].get(column)
    }

    /// Add one game's points to a cell. Returns false for unknown teams.
    pub fn record(&mut self, position: Position, team_id: u32, points: i32) -> bool {
        let Some(column) = self.column(team_id) else {
            return false;
        };
        let cell = &mut self.cells[position.index()][column];
        cell.points_allowed += points;
        cell.games_counted += 1;
        true
    }

    /// Teams with at least one counted game for `position`, most points
    /// allowed first. Equal totals keep snapshot team order.
    pub fn ranked(&self, position: Position) -> Vec<TeamDefenseSummary> {
        let mut rows: Vec<TeamDefenseSummary> = self.cells[position.index()]
            .iter()
            .zip(&self.teams)
            .filter(|(cell, _)| cell.games_counted > 0)
            .map(|(cell, team)| TeamDefenseSummary {
                position,
                team_id: team.id,
                team_name: team.name.clone(),
                points_allowed: cell.points_allowed,
                games_counted: cell.games_counted,
                avg_points_allowed: round2(cell.average()),
            })
            .collect();

        rows.sort_by(|a, b| b.points_allowed.cmp(&a.points_allowed));
        rows
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Build the defence table from every player's gameweek history.
///
/// Records where the player did not play, or whose opponent is not in
/// `teams`, are skipped. Histories keyed by unknown player ids are ignored
/// since their position cannot be resolved.
pub fn aggregate(
    players: &[Player],
    teams: &[Team],
    histories: &HashMap<u32, Vec<GameweekRecord>>,
) -> DefenseTable {
    let mut table = DefenseTable::new(teams);
    let mut counted = 0usize;
    let mut skipped = 0usize;

    for player in players {
        let Some(history) = histories.get(&player.id) else {
            continue;
        };
        for record in history.iter().filter(|r| r.minutes > 0) {
            if table.record(player.position, record.opponent_team_id, record.points) {
                counted += 1;
            } else {
                skipped += 1;
            }
        }
    }

    tracing::debug!(counted, skipped, "defence table aggregated");
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
