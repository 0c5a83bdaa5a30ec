// Fixture-based player recommendations.
//
// For every eligible player, collect the fixtures their team plays in the next
// N gameweeks, score each opponent's vulnerability against the player's
// position, and rank players within each position by the summed score.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::defense::DefenseTable;
use crate::model::{Fixture, Player, PlayerStatus, Position};
use crate::vulnerability;
use crate::SEASON_GAMEWEEKS;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Two totals closer than this are treated as level and separated by form.
pub const DEFAULT_TIE_THRESHOLD: f64 = 0.5;

/// Players must have strictly more minutes than this to be recommended.
pub const DEFAULT_MIN_MINUTES: u32 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendOptions {
    /// Look-ahead windows in gameweeks.
    pub horizons: Vec<u32>,
    pub min_minutes: u32,
    pub tie_threshold: f64,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        RecommendOptions {
            horizons: vec![1, 3, 5],
            min_minutes: DEFAULT_MIN_MINUTES,
            tie_threshold: DEFAULT_TIE_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One upcoming fixture seen from a player's side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingFixture {
    pub gameweek: u32,
    pub fixture_id: u32,
    pub opponent_id: u32,
    pub opponent_name: String,
    pub is_home: bool,
    pub difficulty: u8,
    /// Opponent's vulnerability against the player's position.
    pub vulnerability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub player: Player,
    pub fixtures: Vec<UpcomingFixture>,
    pub total_vulnerability: f64,
    pub avg_vulnerability: f64,
}

impl Recommendation {
    fn new(player: Player, fixtures: Vec<UpcomingFixture>) -> Self {
        let total_vulnerability: f64 = fixtures.iter().map(|f| f.vulnerability).sum();
        let avg_vulnerability = if fixtures.is_empty() {
            0.0
        } else {
            total_vulnerability / fixtures.len() as f64
        };
        Recommendation {
            player,
            fixtures,
            total_vulnerability,
            avg_vulnerability,
        }
    }
}

/// Ranked recommendations per horizon and position.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationReport {
    pub current_gameweek: u32,
    pub horizons: BTreeMap<u32, BTreeMap<Position, Vec<Recommendation>>>,
}

impl RecommendationReport {
    /// Ranked list for one horizon and position; empty when either is absent.
    pub fn ranked(&self, horizon: u32, position: Position) -> &[Recommendation] {
        self.horizons
            .get(&horizon)
            .and_then(|by_pos| by_pos.get(&position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Current gameweek
// ---------------------------------------------------------------------------

/// The gameweek of the earliest fixture that has neither started nor
/// finished. Fixtures without a kickoff time sort after timed ones.
///
/// When nothing is pending the next gameweek after the last observed one is
/// used, capped at the final gameweek of the season.
pub fn resolve_current_gameweek(fixtures: &[Fixture]) -> u32 {
    let next = fixtures
        .iter()
        .filter(|f| f.is_pending() && f.gameweek.is_some())
        .min_by_key(|f| f.schedule_key())
        .and_then(|f| f.gameweek);

    if let Some(gw) = next {
        return gw;
    }

    let max_observed = fixtures.iter().filter_map(|f| f.gameweek).max().unwrap_or(0);
    max_observed.saturating_add(1).min(SEASON_GAMEWEEKS)
}

// ---------------------------------------------------------------------------
// Per-player fixtures
// ---------------------------------------------------------------------------

/// Whether a player is fit and has played enough to be worth ranking.
pub fn is_eligible(player: &Player, min_minutes: u32) -> bool {
    player.status == PlayerStatus::Available && player.minutes > min_minutes
}

/// Unfinished fixtures for `player`'s team in gameweeks
/// `current..current + horizon`, in gameweek order.
pub fn upcoming_fixtures(
    player: &Player,
    fixtures: &[Fixture],
    current_gameweek: u32,
    horizon: u32,
    table: &DefenseTable,
) -> Vec<UpcomingFixture> {
    let window = current_gameweek..current_gameweek.saturating_add(horizon);

    let mut upcoming: Vec<UpcomingFixture> = fixtures
        .iter()
        .filter(|f| !f.finished)
        .filter_map(|f| {
            let gameweek = f.gameweek.filter(|gw| window.contains(gw))?;
            let (opponent_id, is_home) = f.opponent_of(player.team_id)?;
            let difficulty = if is_home {
                f.home_difficulty
            } else {
                f.away_difficulty
            };
            Some(UpcomingFixture {
                gameweek,
                fixture_id: f.id,
                opponent_id,
                opponent_name: table.team_name(opponent_id).unwrap_or("?").to_string(),
                is_home,
                difficulty,
                vulnerability: vulnerability::score(opponent_id, player.position, table),
            })
        })
        .collect();

    upcoming.sort_by_key(|f| f.gameweek);
    upcoming
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Whether `a` belongs above `b`: higher total vulnerability wins unless the
/// totals are within `tie_threshold`, in which case higher form wins.
pub fn ranks_ahead(a: &Recommendation, b: &Recommendation, tie_threshold: f64) -> bool {
    let diff = a.total_vulnerability - b.total_vulnerability;
    if diff.abs() <= tie_threshold {
        a.player.form > b.player.form
    } else {
        diff > 0.0
    }
}

/// Order candidates with [`ranks_ahead`].
///
/// The threshold comparison is not transitive, so candidates are placed one
/// at a time in input order, each ahead of the first already-placed entry it
/// beats. The result is deterministic and entries that never beat each other
/// keep their input order.
pub fn rank(candidates: Vec<Recommendation>, tie_threshold: f64) -> Vec<Recommendation> {
    let mut ranked: Vec<Recommendation> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let slot = ranked
            .iter()
            .position(|placed| ranks_ahead(&candidate, placed, tie_threshold))
            .unwrap_or(ranked.len());
        ranked.insert(slot, candidate);
    }
    ranked
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Rank eligible players by upcoming fixture vulnerability for every
/// requested horizon. Players without a fixture in a horizon are left out of
/// that horizon entirely.
pub fn recommend(
    players: &[Player],
    fixtures: &[Fixture],
    table: &DefenseTable,
    options: &RecommendOptions,
) -> RecommendationReport {
    let current_gameweek = resolve_current_gameweek(fixtures);
    let eligible: Vec<&Player> = players
        .iter()
        .filter(|p| is_eligible(p, options.min_minutes))
        .collect();

    let mut horizons = BTreeMap::new();
    for &horizon in &options.horizons {
        if horizons.contains_key(&horizon) {
            continue;
        }

        let mut by_position: BTreeMap<Position, Vec<Recommendation>> =
            Position::ALL.iter().map(|&p| (p, Vec::new())).collect();

        for player in &eligible {
            let upcoming = upcoming_fixtures(player, fixtures, current_gameweek, horizon, table);
            if upcoming.is_empty() {
                continue;
            }
            if let Some(list) = by_position.get_mut(&player.position) {
                list.push(Recommendation::new((*player).clone(), upcoming));
            }
        }

        for list in by_position.values_mut() {
            let candidates = std::mem::take(list);
            *list = rank(candidates, options.tie_threshold);
        }

        horizons.insert(horizon, by_position);
    }

    tracing::debug!(
        current_gameweek,
        eligible = eligible.len(),
        horizons = horizons.len(),
        "recommendations ranked"
    );

    RecommendationReport {
        current_gameweek,
        horizons,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Team;
    use chrono::{TimeZone, Utc};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn teams() -> Vec<Team> {
        (1..=4)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
                short_name: format!("T{id}"),
            })
            .collect()
    }

    fn make_player(id: u32, team_id: u32, position: Position, form: f64) -> Player {
        Player {
            id,
            first_name: "Test".into(),
            second_name: format!("Player{id}"),
            web_name: format!("P{id}"),
            team_id,
            position,
            status: PlayerStatus::Available,
            minutes: 900,
            appearances: 10,
            form,
            total_points: 50,
            cost: 6.0,
            ownership: 10.0,
            points_per_game: 5.0,
            goals: 0,
            assists: 0,
            clean_sheets: 0,
        }
    }

    fn make_fixture(id: u32, gameweek: Option<u32>, home: u32, away: u32) -> Fixture {
        Fixture {
            id,
            gameweek,
            home_team_id: home,
            away_team_id: away,
            finished: false,
            started: false,
            kickoff_time: gameweek.map(|gw| {
                Utc.with_ymd_and_hms(2025, 8, 1, 15, 0, 0).unwrap()
                    + chrono::Duration::weeks(gw as i64)
            }),
            home_difficulty: 2,
            away_difficulty: 4,
            home_score: None,
            away_score: None,
        }
    }

    /// Table where team 3 concedes 4.0 per game to forwards and team 4
    /// concedes 1.0.
    fn vulnerable_table() -> DefenseTable {
        let mut table = DefenseTable::new(&teams());
        table.record(Position::Forward, 3, 4);
        table.record(Position::Forward, 4, 1);
        table
    }

    fn rec(id: u32, total: f64, form: f64) -> Recommendation {
        Recommendation {
            player: make_player(id, 1, Position::Forward, form),
            fixtures: Vec::new(),
            total_vulnerability: total,
            avg_vulnerability: total,
        }
    }

    fn ids(list: &[Recommendation]) -> Vec<u32> {
        list.iter().map(|r| r.player.id).collect()
    }

    #[test]
    fn current_gameweek_is_earliest_pending_by_kickoff() {
        let mut early = make_fixture(1, Some(7), 1, 2);
        early.kickoff_time = Some(Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap());
        let mut late = make_fixture(2, Some(6), 3, 4);
        late.kickoff_time = Some(Utc.with_ymd_and_hms(2025, 9, 2, 12, 0, 0).unwrap());
        let mut done = make_fixture(3, Some(5), 1, 3);
        done.finished = true;

        assert_eq!(resolve_current_gameweek(&[late, early, done]), 7);
    }

    #[test]
    fn current_gameweek_skips_started_and_unscheduled() {
        let mut started = make_fixture(1, Some(4), 1, 2);
        started.started = true;
        let unscheduled = make_fixture(2, None, 3, 4);
        let mut untimed = make_fixture(3, Some(9), 1, 3);
        untimed.kickoff_time = None;
        let timed = make_fixture(4, Some(10), 2, 4);

        assert_eq!(resolve_current_gameweek(&[started, unscheduled, untimed, timed]), 10);
    }

    #[test]
    fn current_gameweek_falls_back_at_season_end() {
        let mut fixtures = Vec::new();
        for gw in 36..=38 {
            let mut f = make_fixture(gw, Some(gw), 1, 2);
            f.finished = true;
            fixtures.push(f);
        }
        let mut last = make_fixture(99, Some(38), 3, 4);
        last.started = true;
        fixtures.push(last);

        assert_eq!(resolve_current_gameweek(&fixtures), 38);
    }

    #[test]
    fn current_gameweek_fallback_mid_season() {
        let mut f = make_fixture(1, Some(12), 1, 2);
        f.finished = true;
        assert_eq!(resolve_current_gameweek(&[f]), 13);
        assert_eq!(resolve_current_gameweek(&[]), 1);
    }

    #[test]
    fn current_gameweek_fallback_survives_corrupt_gameweek() {
        let mut f = make_fixture(1, Some(u32::MAX), 1, 2);
        f.finished = true;
        assert_eq!(resolve_current_gameweek(&[f]), SEASON_GAMEWEEKS);
    }

    #[test]
    fn upcoming_respects_window_side_and_finished() {
        let table = vulnerable_table();
        let player = make_player(1, 1, Position::Forward, 5.0);
        let mut finished = make_fixture(10, Some(5), 1, 4);
        finished.finished = true;
        let fixtures = vec![
            make_fixture(11, Some(6), 3, 1), // away at team 3
            make_fixture(12, Some(5), 1, 4), // home vs team 4
            make_fixture(13, Some(8), 1, 3), // outside a 3-week window
            make_fixture(14, Some(5), 2, 3), // not involving team 1
            finished,
        ];

        let upcoming = upcoming_fixtures(&player, &fixtures, 5, 3, &table);
        assert_eq!(upcoming.len(), 2);

        assert_eq!(upcoming[0].gameweek, 5);
        assert_eq!(upcoming[0].opponent_id, 4);
        assert!(upcoming[0].is_home);
        assert_eq!(upcoming[0].difficulty, 2);
        assert!(approx_eq(upcoming[0].vulnerability, 2.5, 1e-9));

        assert_eq!(upcoming[1].gameweek, 6);
        assert_eq!(upcoming[1].opponent_id, 3);
        assert_eq!(upcoming[1].opponent_name, "Team 3");
        assert!(!upcoming[1].is_home);
        assert_eq!(upcoming[1].difficulty, 4);
        assert!(approx_eq(upcoming[1].vulnerability, 10.0, 1e-9));
    }

    #[test]
    fn eligibility_requires_available_and_minutes() {
        let mut p = make_player(1, 1, Position::Forward, 5.0);
        assert!(is_eligible(&p, 200));
        p.minutes = 200;
        assert!(!is_eligible(&p, 200));
        p.minutes = 900;
        p.status = PlayerStatus::Injured;
        assert!(!is_eligible(&p, 200));
    }

    #[test]
    fn players_facing_leakier_defence_rank_first() {
        let table = vulnerable_table();
        // Player 1 (team 1) faces team 4; player 2 (team 2) faces team 3.
        let players = vec![
            make_player(1, 1, Position::Forward, 5.0),
            make_player(2, 2, Position::Forward, 5.0),
        ];
        let fixtures = vec![make_fixture(1, Some(5), 1, 4), make_fixture(2, Some(5), 2, 3)];

        let report = recommend(&players, &fixtures, &table, &RecommendOptions::default());
        assert_eq!(report.current_gameweek, 5);

        let ranked = report.ranked(1, Position::Forward);
        assert_eq!(ids(ranked), vec![2, 1]);
        assert!(approx_eq(ranked[0].total_vulnerability, 10.0, 1e-9));
        assert!(approx_eq(ranked[1].total_vulnerability, 2.5, 1e-9));
    }

    #[test]
    fn player_without_fixtures_is_excluded() {
        let table = vulnerable_table();
        let players = vec![
            make_player(1, 1, Position::Forward, 5.0),
            make_player(2, 2, Position::Forward, 9.0),
        ];
        // Team 2 blanks in gameweek 5.
        let fixtures = vec![make_fixture(1, Some(5), 1, 4), make_fixture(2, Some(6), 2, 3)];

        let report = recommend(&players, &fixtures, &table, &RecommendOptions::default());
        assert_eq!(ids(report.ranked(1, Position::Forward)), vec![1]);
        assert_eq!(ids(report.ranked(3, Position::Forward)).len(), 2);
    }

    #[test]
    fn ineligible_players_are_filtered() {
        let table = vulnerable_table();
        let mut injured = make_player(1, 1, Position::Forward, 5.0);
        injured.status = PlayerStatus::Injured;
        let mut fringe = make_player(2, 1, Position::Forward, 5.0);
        fringe.minutes = 150;
        let fixtures = vec![make_fixture(1, Some(5), 1, 4)];

        let report = recommend(&[injured, fringe], &fixtures, &table, &RecommendOptions::default());
        assert!(report.ranked(1, Position::Forward).is_empty());
    }

    #[test]
    fn double_gameweek_sums_both_fixtures() {
        let table = vulnerable_table();
        let players = vec![make_player(1, 1, Position::Forward, 5.0)];
        let fixtures = vec![make_fixture(1, Some(5), 1, 3), make_fixture(2, Some(5), 4, 1)];

        let report = recommend(&players, &fixtures, &table, &RecommendOptions::default());
        let ranked = report.ranked(1, Position::Forward);
        assert_eq!(ranked[0].fixtures.len(), 2);
        assert!(approx_eq(ranked[0].total_vulnerability, 12.5, 1e-9));
        assert!(approx_eq(ranked[0].avg_vulnerability, 6.25, 1e-9));
    }

    #[test]
    fn tie_within_threshold_broken_by_form() {
        let ranked = rank(vec![rec(1, 10.0, 1.0), rec(2, 9.6, 8.0)], DEFAULT_TIE_THRESHOLD);
        assert_eq!(ids(&ranked), vec![2, 1]);

        let ranked = rank(vec![rec(1, 10.0, 1.0), rec(2, 9.4, 8.0)], DEFAULT_TIE_THRESHOLD);
        assert_eq!(ids(&ranked), vec![1, 2]);
    }

    #[test]
    fn threshold_boundary_counts_as_tie() {
        let ranked = rank(vec![rec(1, 10.0, 1.0), rec(2, 9.5, 2.0)], DEFAULT_TIE_THRESHOLD);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let ranked = rank(
            vec![rec(3, 5.0, 4.0), rec(1, 5.0, 4.0), rec(2, 5.0, 4.0)],
            DEFAULT_TIE_THRESHOLD,
        );
        assert_eq!(ids(&ranked), vec![3, 1, 2]);
    }

    #[test]
    fn ranking_is_descending_and_repeatable() {
        let input = vec![
            rec(1, 3.0, 2.0),
            rec(2, 12.0, 1.0),
            rec(3, 7.0, 6.0),
            rec(4, 7.2, 3.0),
            rec(5, 0.0, 9.0),
        ];
        let first = rank(input.clone(), DEFAULT_TIE_THRESHOLD);
        let second = rank(input, DEFAULT_TIE_THRESHOLD);
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec![2, 3, 4, 1, 5]);
    }

    #[test]
    fn duplicate_and_zero_horizons() {
        let table = vulnerable_table();
        let players = vec![make_player(1, 1, Position::Forward, 5.0)];
        let fixtures = vec![make_fixture(1, Some(5), 1, 3)];
        let options = RecommendOptions {
            horizons: vec![0, 3, 3],
            ..RecommendOptions::default()
        };

        let report = recommend(&players, &fixtures, &table, &options);
        assert_eq!(report.horizons.len(), 2);
        assert!(report.ranked(0, Position::Forward).is_empty());
        assert_eq!(report.ranked(3, Position::Forward).len(), 1);
        assert!(report.ranked(7, Position::Forward).is_empty());
    }
}
