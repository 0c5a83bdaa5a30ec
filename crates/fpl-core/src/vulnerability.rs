// Vulnerability score: a 0-10 reading of how many points a team concedes to
// one position.

use crate::defense::DefenseTable;
use crate::model::Position;

/// Multiplier from average points allowed per game onto the 0-10 scale.
pub const VULNERABILITY_SCALE: f64 = 2.5;

/// Upper bound of the scale.
pub const VULNERABILITY_MAX: f64 = 10.0;

/// Map an average points-allowed figure onto the clamped scale.
pub fn scale_average(avg_points_allowed: f64) -> f64 {
    (avg_points_allowed * VULNERABILITY_SCALE).clamp(0.0, VULNERABILITY_MAX)
}

/// Score `team_id`'s vulnerability against `position`.
///
/// Unknown teams and cells without games score 0.0.
pub fn score(team_id: u32, position: Position, table: &DefenseTable) -> f64 {
    match table.cell(position, team_id) {
        Some(cell) if cell.games_counted > 0 => scale_average(cell.average()),
        _ => 0.0,
    }
}
