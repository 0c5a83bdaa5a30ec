// Library root: pure analysis over a fetched FPL snapshot. Nothing in this
// crate performs I/O; the app crate supplies the data.

pub mod defense;
pub mod error;
pub mod lookup;
pub mod model;
pub mod recommend;
pub mod views;
pub mod vulnerability;

/// Number of gameweeks in a Premier League season.
pub const SEASON_GAMEWEEKS: u32 = 38;
