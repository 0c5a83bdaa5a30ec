// Analysis pipeline: fetch -> aggregate -> score -> recommend -> views.
//
// Bootstrap and fixtures are required; if either fetch fails the run aborts.
// Player histories are best-effort, and when too few of them load the
// recommendations are withheld rather than computed from a thin sample.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, warn};

use fpl_core::defense::{self, TeamDefenseSummary};
use fpl_core::error::AnalysisError;
use fpl_core::lookup::{self, PlayerReport};
use fpl_core::model::{Fixture, Player, Position, Team};
use fpl_core::recommend::{self, RecommendationReport};
use fpl_core::views::{self, PlayerRow, TeamFixtureRun, TeamPerformance};

use crate::collect::{self, FetchFailure, FetchLimits, HistoryCollection};
use crate::config::{AnalysisConfig, Config};
use crate::source::{DataSource, SourceError};

/// Next fixtures listed in a player report.
const REPORT_NEXT_FIXTURES: usize = 5;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Lookup(#[from] AnalysisError),
}

/// The fetched data every analysis runs over.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub fixtures: Vec<Fixture>,
}

/// Recommendations, or the reason there are none.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    Ready(RecommendationReport),
    InsufficientData {
        requested: usize,
        fetched: usize,
        failed: usize,
    },
}

impl RecommendationOutcome {
    pub fn report(&self) -> Option<&RecommendationReport> {
        match self {
            RecommendationOutcome::Ready(report) => Some(report),
            RecommendationOutcome::InsufficientData { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub snapshot: Snapshot,
    pub current_gameweek: u32,
    pub top_scorers: Vec<PlayerRow>,
    pub top_scorers_by_position: BTreeMap<Position, Vec<PlayerRow>>,
    pub value_picks: Vec<PlayerRow>,
    pub form: Vec<PlayerRow>,
    pub differentials: Vec<PlayerRow>,
    pub team_performance: Vec<TeamPerformance>,
    pub fixture_ticker: Vec<TeamFixtureRun>,
    pub defense: BTreeMap<Position, Vec<TeamDefenseSummary>>,
    pub recommendations: RecommendationOutcome,
    pub history_failures: Vec<FetchFailure>,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Fetch bootstrap and fixtures. Either failing aborts the run.
pub async fn fetch_snapshot<S>(source: &S) -> Result<Snapshot, PipelineError>
where
    S: DataSource + ?Sized,
{
    let bootstrap = source
        .fetch_bootstrap()
        .await
        .map_err(|source| PipelineError::Fetch {
            what: "bootstrap",
            source,
        })?;
    let fixtures = source
        .fetch_fixtures()
        .await
        .map_err(|source| PipelineError::Fetch {
            what: "fixtures",
            source,
        })?;

    info!(
        players = bootstrap.players.len(),
        teams = bootstrap.teams.len(),
        fixtures = fixtures.len(),
        "snapshot fetched"
    );

    Ok(Snapshot {
        players: bootstrap.players,
        teams: bootstrap.teams,
        fixtures,
    })
}

/// Run every analysis over a snapshot and the histories that loaded.
pub fn analyze(
    snapshot: Snapshot,
    histories: &HistoryCollection,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let players = &snapshot.players;
    let teams = &snapshot.teams;
    let fixtures = &snapshot.fixtures;
    let top_n = config.top_n;

    let table = defense::aggregate(players, teams, &histories.histories);
    let defense_by_position = Position::ALL
        .iter()
        .map(|&pos| (pos, table.ranked(pos)))
        .collect();

    let recommendations = if histories.coverage() < config.min_history_coverage {
        warn!(
            coverage = histories.coverage(),
            required = config.min_history_coverage,
            "insufficient history data, withholding recommendations"
        );
        RecommendationOutcome::InsufficientData {
            requested: histories.requested,
            fetched: histories.fetched(),
            failed: histories.failures.len(),
        }
    } else {
        RecommendationOutcome::Ready(recommend::recommend(
            players,
            fixtures,
            &table,
            &config.recommend_options(),
        ))
    };

    let current_gameweek = recommend::resolve_current_gameweek(fixtures);
    let ticker_horizon = config.horizons.iter().copied().max().unwrap_or(1);

    AnalysisReport {
        current_gameweek,
        top_scorers: views::top_scorers(players, teams, None, top_n),
        top_scorers_by_position: Position::ALL
            .iter()
            .map(|&pos| (pos, views::top_scorers(players, teams, Some(pos), top_n)))
            .collect(),
        value_picks: views::value_picks(players, teams, top_n),
        form: views::form_players(players, teams, top_n),
        differentials: views::differentials(
            players,
            teams,
            config.differentials.max_ownership,
            config.differentials.min_points,
            top_n,
        ),
        team_performance: views::team_performance(players, teams),
        fixture_ticker: views::fixture_ticker(teams, fixtures, current_gameweek, ticker_horizon),
        defense: defense_by_position,
        recommendations,
        history_failures: histories.failures.clone(),
        snapshot,
    }
}

/// Full run: snapshot, best-effort histories, analysis.
pub async fn run_analysis<S>(source: &S, config: &Config) -> Result<AnalysisReport, PipelineError>
where
    S: DataSource + ?Sized,
{
    let snapshot = fetch_snapshot(source).await?;

    let player_ids = collect::players_to_fetch(&snapshot.players);
    info!(players = player_ids.len(), "fetching player histories");
    let histories =
        collect::collect_histories(source, &player_ids, FetchLimits::from_config(&config.api))
            .await;

    let report = analyze(snapshot, &histories, &config.analysis);
    info!(
        current_gameweek = report.current_gameweek,
        failures = report.history_failures.len(),
        "analysis complete"
    );
    Ok(report)
}

/// Look a player up by name and build their report, fetching their history
/// on demand.
pub async fn player_report<S>(
    source: &S,
    snapshot: &Snapshot,
    name: &str,
    config: &AnalysisConfig,
) -> Result<PlayerReport, PipelineError>
where
    S: DataSource + ?Sized,
{
    let player = lookup::find_player_by_name(&snapshot.players, name)?;
    let summary = source
        .fetch_player_history(player.id)
        .await
        .map_err(|source| PipelineError::Fetch {
            what: "player history",
            source,
        })?;

    Ok(lookup::player_report(
        player,
        &summary.history,
        &summary.previous_seasons,
        &snapshot.teams,
        &snapshot.fixtures,
        config.recent_gameweeks,
        REPORT_NEXT_FIXTURES,
    ))
}
