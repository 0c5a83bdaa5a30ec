// FPL analyzer entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the FPL client
// 4. Run the analysis pipeline
// 5. Print a summary and export CSVs
// 6. Optional player report for the name given on the command line

use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use tracing::info;

use fpl_app::config::{self, Config};
use fpl_app::export;
use fpl_app::pipeline::{self, AnalysisReport, RecommendationOutcome};
use fpl_app::source::FplClient;
use fpl_core::lookup::PlayerReport;
use fpl_core::model::Position;
use fpl_core::views::PlayerRow;

/// Rows printed per table in the console summary.
const SUMMARY_ROWS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("FPL analyzer starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(base_url = %config.api.base_url, "config loaded");

    let client = FplClient::new(&config.api).context("failed to build FPL client")?;

    let report = pipeline::run_analysis(&client, &config)
        .await
        .context("analysis failed")?;
    print_summary(&report);

    if config.export.enabled {
        export_tables(&report, &config)?;
    }

    let name = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !name.trim().is_empty() {
        let player = pipeline::player_report(&client, &report.snapshot, &name, &config.analysis)
            .await
            .with_context(|| format!("no report for {name:?}"))?;
        print_player(&player);
    }

    info!("FPL analyzer finished");
    Ok(())
}

fn export_tables(report: &AnalysisReport, config: &Config) -> anyhow::Result<()> {
    let dir = Path::new(&config.export.directory);
    let written = export::export_report(report, dir)
        .with_context(|| format!("failed to export to {}", dir.display()))?;
    println!("\nWrote {} CSV files to {}", written.len(), dir.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

fn print_rows(title: &str, rows: &[PlayerRow]) {
    println!("\n{title}");
    if rows.is_empty() {
        println!("  (none)");
    }
    for row in rows.iter().take(SUMMARY_ROWS) {
        println!(
            "  {:<18} {:<4} {:<3} £{:>5.1}m {:>4} pts  form {:>4.1}  {:>5.1}%",
            row.name, row.team, row.position, row.cost, row.total_points, row.form, row.ownership
        );
    }
}

fn print_summary(report: &AnalysisReport) {
    println!(
        "FPL analysis: {} players, {} teams, {} fixtures. Current gameweek {}.",
        report.snapshot.players.len(),
        report.snapshot.teams.len(),
        report.snapshot.fixtures.len(),
        report.current_gameweek
    );

    print_rows("Top scorers", &report.top_scorers);
    print_rows("Value picks (points per £m)", &report.value_picks);
    print_rows("In form", &report.form);
    print_rows("Differentials", &report.differentials);

    println!("\nMost points conceded");
    for (position, ranked) in &report.defense {
        let worst: Vec<String> = ranked
            .iter()
            .take(3)
            .map(|s| format!("{} ({:.2}/game)", s.team_name, s.avg_points_allowed))
            .collect();
        println!("  {:<3} to: {}", position, worst.join(", "));
    }

    println!("\nEasiest fixture runs");
    for run in report.fixture_ticker.iter().take(SUMMARY_ROWS) {
        println!("  {:<16} avg difficulty {:.2}", run.team_name, run.avg_difficulty);
    }

    match &report.recommendations {
        RecommendationOutcome::Ready(recs) => {
            for &horizon in recs.horizons.keys() {
                println!("\nNext {horizon} gameweek(s) from GW{}", recs.current_gameweek);
                for position in Position::ALL {
                    let picks: Vec<String> = recs
                        .ranked(horizon, position)
                        .iter()
                        .take(3)
                        .map(|r| format!("{} ({:.1})", r.player.web_name, r.total_vulnerability))
                        .collect();
                    println!("  {:<3} {}", position, picks.join(", "));
                }
            }
        }
        RecommendationOutcome::InsufficientData {
            requested,
            fetched,
            failed,
        } => {
            println!(
                "\nRecommendations withheld: only {fetched} of {requested} player histories \
                 loaded ({failed} failed)."
            );
        }
    }

    if !report.history_failures.is_empty() {
        println!(
            "\n{} player histories could not be fetched (see log).",
            report.history_failures.len()
        );
    }
}

fn print_player(report: &PlayerReport) {
    println!(
        "\n{} ({}, {}) £{:.1}m",
        report.name, report.team, report.position, report.cost
    );
    println!(
        "  {} pts, {:.2} per game, form {:.1}, {} minutes",
        report.total_points, report.points_per_game, report.form, report.minutes
    );

    if !report.recent.is_empty() {
        println!("  Recent (avg {:.2}):", report.recent_average);
        for game in &report.recent {
            let score = match (game.goals_for, game.goals_against) {
                (Some(scored), Some(conceded)) => format!(" {scored}-{conceded}"),
                _ => String::new(),
            };
            println!(
                "    GW{:<2} {} ({}){} {} min, {} pts",
                game.gameweek,
                game.opponent,
                if game.was_home { "H" } else { "A" },
                score,
                game.minutes,
                game.points
            );
        }
    }

    if !report.next_fixtures.is_empty() {
        println!("  Next:");
        for fixture in &report.next_fixtures {
            let gw = fixture
                .gameweek
                .map_or_else(|| "TBC".to_string(), |gw| format!("GW{gw}"));
            println!(
                "    {gw:<5} {} ({}) difficulty {}",
                fixture.opponent,
                if fixture.is_home { "H" } else { "A" },
                fixture.difficulty
            );
        }
    }

    for season in &report.previous_seasons {
        println!(
            "  {}: {} pts, {} minutes",
            season.season, season.total_points, season.minutes
        );
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn log_dir() -> PathBuf {
    ProjectDirs::from("", "", "fpl-analyzer")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("fpl-analyzer.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fpl_app=info,fpl_analyzer=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
