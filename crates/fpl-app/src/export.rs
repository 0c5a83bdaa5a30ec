// CSV export of the analysis report, one file per table.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use fpl_core::model::Position;
use fpl_core::recommend::UpcomingFixture;

use crate::pipeline::AnalysisReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Flattened rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RecommendationRow<'a> {
    horizon: u32,
    position: Position,
    rank: usize,
    player_id: u32,
    name: &'a str,
    form: f64,
    fixture_count: usize,
    total_vulnerability: f64,
    avg_vulnerability: f64,
    fixtures: String,
}

#[derive(Debug, Serialize)]
struct TickerRow<'a> {
    team_id: u32,
    team: &'a str,
    avg_difficulty: f64,
    fixtures: String,
}

/// `GW12 Arsenal (H) 7.5; GW13 Chelsea (A) 2.0`
fn describe_fixtures(fixtures: &[UpcomingFixture]) -> String {
    fixtures
        .iter()
        .map(|f| {
            format!(
                "GW{} {} ({}) {:.1}",
                f.gameweek,
                f.opponent_name,
                if f.is_home { "H" } else { "A" },
                f.vulnerability
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

// Header rows are written up front so an empty table still yields a
// well-formed CSV. Each list must match its row type's field order.

const PLAYER_HEADER: &[&str] = &[
    "id",
    "name",
    "team",
    "position",
    "cost",
    "total_points",
    "form",
    "ownership",
    "points_per_million",
    "minutes",
];

const TEAM_PERFORMANCE_HEADER: &[&str] = &[
    "team_id",
    "team_name",
    "squad_points",
    "goals",
    "assists",
    "clean_sheets",
    "avg_starter_form",
    "top_scorer",
    "top_scorer_points",
];

const DEFENSE_HEADER: &[&str] = &[
    "position",
    "team_id",
    "team_name",
    "points_allowed",
    "games_counted",
    "avg_points_allowed",
];

const TICKER_HEADER: &[&str] = &["team_id", "team", "avg_difficulty", "fixtures"];

const FAILURE_HEADER: &[&str] = &["player_id", "reason"];

const RECOMMENDATION_HEADER: &[&str] = &[
    "horizon",
    "position",
    "rank",
    "player_id",
    "name",
    "form",
    "fixture_count",
    "total_vulnerability",
    "avg_vulnerability",
    "fixtures",
];

fn write_rows<T, I>(
    dir: &Path,
    file_name: &str,
    header: &[&str],
    rows: I,
) -> Result<PathBuf, ExportError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let path = dir.join(file_name);
    let csv_err = |source| ExportError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;

    let mut count = 0usize;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
        count += 1;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), rows = count, "wrote export");
    Ok(path)
}

/// Write every table of `report` into `dir`, creating it if needed. Returns
/// the paths written. Recommendation files are only produced when
/// recommendations were computed.
pub fn export_report(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = vec![
        write_rows(dir, "top_scorers.csv", PLAYER_HEADER, &report.top_scorers)?,
        write_rows(dir, "value_picks.csv", PLAYER_HEADER, &report.value_picks)?,
        write_rows(dir, "form.csv", PLAYER_HEADER, &report.form)?,
        write_rows(dir, "differentials.csv", PLAYER_HEADER, &report.differentials)?,
        write_rows(
            dir,
            "team_performance.csv",
            TEAM_PERFORMANCE_HEADER,
            &report.team_performance,
        )?,
        write_rows(
            dir,
            "defense.csv",
            DEFENSE_HEADER,
            report.defense.values().flatten(),
        )?,
        write_rows(
            dir,
            "fixture_ticker.csv",
            TICKER_HEADER,
            report.fixture_ticker.iter().map(|run| TickerRow {
                team_id: run.team_id,
                team: &run.team_name,
                avg_difficulty: run.avg_difficulty,
                fixtures: run
                    .fixtures
                    .iter()
                    .map(|f| {
                        format!(
                            "GW{} {} ({}) {}",
                            f.gameweek,
                            f.opponent,
                            if f.is_home { "H" } else { "A" },
                            f.difficulty
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        )?,
        write_rows(
            dir,
            "history_failures.csv",
            FAILURE_HEADER,
            &report.history_failures,
        )?,
    ];

    if let Some(recommendations) = report.recommendations.report() {
        let rows = recommendations
            .horizons
            .iter()
            .flat_map(|(&horizon, by_position)| {
                by_position.iter().flat_map(move |(&position, ranked)| {
                    ranked.iter().enumerate().map(move |(i, rec)| RecommendationRow {
                        horizon,
                        position,
                        rank: i + 1,
                        player_id: rec.player.id,
                        name: &rec.player.web_name,
                        form: rec.player.form,
                        fixture_count: rec.fixtures.len(),
                        total_vulnerability: rec.total_vulnerability,
                        avg_vulnerability: rec.avg_vulnerability,
                        fixtures: describe_fixtures(&rec.fixtures),
                    })
                })
            });
        written.push(write_rows(
            dir,
            "recommendations.csv",
            RECOMMENDATION_HEADER,
            rows,
        )?);
    }

    info!(dir = %dir.display(), files = written.len(), "exported report");
    Ok(written)
}
