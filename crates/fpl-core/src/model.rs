// Snapshot types shared by every analysis: teams, players, fixtures and
// per-player gameweek history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// FPL playing positions. The discriminants match the API's `element_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper = 1,
    #[serde(rename = "DEF")]
    Defender = 2,
    #[serde(rename = "MID")]
    Midfielder = 3,
    #[serde(rename = "FWD")]
    Forward = 4,
}

impl Position {
    pub const COUNT: usize = 4;

    /// All positions in `element_type` order.
    pub const ALL: [Position; Position::COUNT] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Map the API's `element_type` id onto a position.
    pub fn from_element_type(id: u8) -> Option<Self> {
        match id {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    /// Zero-based row index into position-keyed tables.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player status
// ---------------------------------------------------------------------------

/// Availability flag attached to every player in the bootstrap snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    Available,
    Doubtful,
    Injured,
    Suspended,
    Unavailable,
    NotInSquad,
    Unknown,
}

impl PlayerStatus {
    /// Parse the single-letter status code used by the API.
    pub fn from_code(code: &str) -> Self {
        match code {
            "a" => PlayerStatus::Available,
            "d" => PlayerStatus::Doubtful,
            "i" => PlayerStatus::Injured,
            "s" => PlayerStatus::Suspended,
            "u" => PlayerStatus::Unavailable,
            "n" => PlayerStatus::NotInSquad,
            _ => PlayerStatus::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Teams and players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub first_name: String,
    pub second_name: String,
    pub web_name: String,
    pub team_id: u32,
    pub position: Position,
    pub status: PlayerStatus,
    pub minutes: u32,
    /// Number of starts this season.
    pub appearances: u32,
    pub form: f64,
    pub total_points: i32,
    /// Price in millions.
    pub cost: f64,
    /// Percentage of managers owning the player.
    pub ownership: f64,
    pub points_per_game: f64,
    pub goals: u32,
    pub assists: u32,
    pub clean_sheets: u32,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.second_name)
    }

    /// Season points divided by price. Zero when the price is missing.
    pub fn points_per_million(&self) -> f64 {
        if self.cost <= 0.0 {
            return 0.0;
        }
        self.total_points as f64 / self.cost
    }

    /// Average minutes per appearance, zero when the player has not appeared.
    pub fn minutes_per_appearance(&self) -> f64 {
        if self.appearances == 0 {
            return 0.0;
        }
        self.minutes as f64 / self.appearances as f64
    }
}

// ---------------------------------------------------------------------------
// Fixtures and history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    /// `None` until the fixture has been scheduled into a gameweek.
    pub gameweek: Option<u32>,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub finished: bool,
    pub started: bool,
    pub kickoff_time: Option<DateTime<Utc>>,
    pub home_difficulty: u8,
    pub away_difficulty: u8,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl Fixture {
    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// The opponent of `team_id` and whether `team_id` plays at home.
    pub fn opponent_of(&self, team_id: u32) -> Option<(u32, bool)> {
        if self.home_team_id == team_id {
            Some((self.away_team_id, true))
        } else if self.away_team_id == team_id {
            Some((self.home_team_id, false))
        } else {
            None
        }
    }

    /// Difficulty rating from the point of view of `team_id`.
    pub fn difficulty_for(&self, team_id: u32) -> Option<u8> {
        self.opponent_of(team_id).map(|(_, is_home)| {
            if is_home {
                self.home_difficulty
            } else {
                self.away_difficulty
            }
        })
    }

    /// Not yet kicked off and not finished.
    pub fn is_pending(&self) -> bool {
        !self.started && !self.finished
    }

    /// Chronological sort key: kickoff time with untimed fixtures last, then
    /// gameweek.
    pub fn schedule_key(&self) -> (bool, Option<DateTime<Utc>>, Option<u32>) {
        (self.kickoff_time.is_none(), self.kickoff_time, self.gameweek)
    }

    /// Final or live score as (goals for, goals against) from the point of
    /// view of `team_id`. `None` until both scores are known.
    pub fn score_for(&self, team_id: u32) -> Option<(u32, u32)> {
        let (_, is_home) = self.opponent_of(team_id)?;
        let (home, away) = (self.home_score?, self.away_score?);
        Some(if is_home { (home, away) } else { (away, home) })
    }
}

/// One fixture a player took part in (or sat out) this season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameweekRecord {
    pub gameweek: u32,
    pub fixture_id: u32,
    pub opponent_team_id: u32,
    pub was_home: bool,
    pub minutes: u32,
    pub points: i32,
}

/// Season total from a previous campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: String,
    pub total_points: i32,
    pub minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(home: u32, away: u32) -> Fixture {
        Fixture {
            id: 1,
            gameweek: Some(3),
            home_team_id: home,
            away_team_id: away,
            finished: false,
            started: false,
            kickoff_time: None,
            home_difficulty: 2,
            away_difficulty: 4,
            home_score: None,
            away_score: None,
        }
    }

    #[test]
    fn position_round_trips_through_element_type() {
        for pos in Position::ALL {
            assert_eq!(Position::from_element_type(pos as u8), Some(pos));
        }
        assert_eq!(Position::from_element_type(0), None);
        assert_eq!(Position::from_element_type(5), None);
    }

    #[test]
    fn position_indices_are_dense() {
        let indices: Vec<usize> = Position::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn status_codes() {
        assert_eq!(PlayerStatus::from_code("a"), PlayerStatus::Available);
        assert_eq!(PlayerStatus::from_code("i"), PlayerStatus::Injured);
        assert_eq!(PlayerStatus::from_code("x"), PlayerStatus::Unknown);
    }

    #[test]
    fn difficulty_follows_side() {
        let f = fixture(1, 2);
        assert_eq!(f.difficulty_for(1), Some(2));
        assert_eq!(f.difficulty_for(2), Some(4));
        assert_eq!(f.difficulty_for(3), None);
        assert_eq!(f.opponent_of(2), Some((1, false)));
    }
}
