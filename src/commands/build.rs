//! Build command implementation.

use anyhow::{Context, Result};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::BuildArgs;
use crate::commands::load_request;
use crate::config::Config;
use crate::orchestrator::{BuildProgress, JobReport, Orchestrator};
use crate::request::BuildRequest;
use crate::workspace::{validate_project_name, ShutdownMode};

/// Run the build command. `quiet` hides the progress spinner.
pub fn run(args: BuildArgs, config: &Config, quiet: bool) -> Result<()> {
    let requests = args
        .inputs
        .iter()
        .map(|input| prepare(input, &args))
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let jobs = args.jobs.unwrap_or(config.build.parallel_jobs);
    let orchestrator = Orchestrator::new(config.clone())?;
    let progress = Arc::new(BuildProgress::new(requests.len()));

    let reports = std::thread::scope(|scope| {
        let worker =
            scope.spawn(|| orchestrator.run_all(&requests, jobs, Some(Arc::clone(&progress))));
        show_progress(&progress, quiet, || worker.is_finished());
        worker.join()
    })
    .map_err(|_| anyhow::anyhow!("Build worker panicked"))?;

    let summary = Orchestrator::summarize(&reports);
    print_reports(&reports, &args.output)?;

    println!(
        "\nBuilt {} of {} project{} ({})",
        summary.success_count,
        reports.len(),
        if reports.len() == 1 { "" } else { "s" },
        format_size(summary.total_bytes, BINARY)
    );

    orchestrator.shutdown(ShutdownMode::Force);

    if summary.failed_count > 0 {
        std::process::exit(5); // Partial failure
    }

    Ok(())
}

/// Load one input and apply the command-line overrides.
fn prepare(input: &Path, args: &BuildArgs) -> Result<BuildRequest> {
    let mut request = load_request(input)?;

    if let Some(language) = &args.language {
        request.language = Some(language.clone());
    }
    if let Some(name) = &args.name {
        request.project_name = Some(name.clone());
    } else if request.project_name.is_none() && input.is_dir() {
        // a directory names its own project when the name is usable
        request.project_name = input
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .filter(|n| validate_project_name(n).is_ok());
    }

    Ok(request)
}

fn show_progress(progress: &BuildProgress, quiet: bool, finished: impl Fn() -> bool) {
    let bar = if quiet {
        ProgressBar::with_draw_target(Some(progress.total as u64), ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new(progress.total as u64)
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    while !finished() {
        bar.set_position(progress.completed() as u64);
        if let Some(current) = progress.current() {
            bar.set_message(format!("Building {}", current));
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    bar.finish_and_clear();
}

fn print_reports(reports: &[JobReport], output: &Path) -> Result<()> {
    println!(
        "\n  {:<12} {:<24} {:<32} {:>10}",
        "LANGUAGE", "PROJECT", "ARTIFACT", "SIZE"
    );
    println!("  {}", "─".repeat(81));

    let names = output_names(reports);
    for (report, name) in reports.iter().zip(&names) {
        match (&report.result, name) {
            (Ok(artifact), Some(name)) => {
                let path = output.join(name);
                std::fs::write(&path, &artifact.payload)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!(
                    "  {:<12} {:<24} {:<32} {:>10}",
                    report.language,
                    report.project_name,
                    name,
                    format_size(artifact.len() as u64, BINARY),
                );
            }
            (Err(e), _) => {
                println!(
                    "  {:<12} {:<24} {:<32} {:>10}",
                    report.language, report.project_name, "-", "failed"
                );
                eprintln!("  Error building {}: {}", report.project_name, e);
            }
            (Ok(_), None) => {}
        }
    }

    Ok(())
}

/// File name each successful report is written under.
///
/// Artifacts that would land on a name already taken in this run get a
/// numeric suffix after the project name: `app.jar`, `app-2.jar`, ...
fn output_names(reports: &[JobReport]) -> Vec<Option<String>> {
    let mut taken = HashSet::new();

    reports
        .iter()
        .map(|report| {
            let artifact = report.result.as_ref().ok()?;
            let filename = artifact.filename.as_str();
            let (stem, rest) = match filename.strip_prefix(report.project_name.as_str()) {
                Some(rest) => (report.project_name.as_str(), rest),
                None => (filename, ""),
            };

            let mut name = filename.to_string();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}-{}{}", stem, n, rest);
                n += 1;
            }
            if name != filename {
                tracing::warn!("{} already produced in this run, writing {}", filename, name);
            }
            Some(name)
        })
        .collect()
}
