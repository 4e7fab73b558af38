//! fetch / pull / merge / run commands - Apply one operation to many repositories

use anyhow::{bail, Context as _, Result};

use crate::cli::args::BatchArgs;
use crate::engine::{discover, Batch, BatchReport, Context, Mode};
use crate::repo::RepositoryEntity;
use crate::ui::output;

/// Load repositories, queue them and run `mode` over the queue.
///
/// Repositories that cannot take part (load errors, empty, no remote,
/// detached HEAD) are reported and skipped.
///
/// # Errors
///
/// Fails if the batch cannot run or if any repository failed.
pub fn batch(ctx: &Context, mode: Mode, args: &BatchArgs) -> Result<()> {
    let verbosity = ctx.verbosity();
    let dirs = super::resolve_dirs(ctx, &args.dirs);
    let depth = super::resolve_depth(ctx, args.depth)?;
    let jobs = args.jobs.unwrap_or_else(|| ctx.config.jobs());

    let mut options = ctx.config.load_options();
    options.prune |= args.prune;

    let candidates = discover::discover(&dirs, depth);
    let mut entities: Vec<RepositoryEntity> = Vec::new();
    for (path, result) in discover::load_all(&candidates, &options) {
        match result {
            Ok(loaded) => match loaded.diagnostic {
                None => entities.push(loaded.entity),
                Some(diagnostic) => {
                    output::warn(format!("skipping {}: {}", loaded.entity.name(), diagnostic), verbosity)
                }
            },
            Err(err) => output::warn(format!("skipping {}: {}", path.display(), err), verbosity),
        }
    }

    let mut batch = Batch::new(entities);
    for name in &args.only {
        if batch.named(name).next().is_none() {
            output::warn(format!("no repository named '{}'", name), verbosity);
        }
    }
    let queued = batch.queue_where(|e| args.only.is_empty() || args.only.iter().any(|n| n == e.name()));
    if queued == 0 {
        output::print("Nothing to do.", verbosity);
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let report = rt.block_on(batch.run(mode, jobs))?;

    if args.json {
        output::json(&report)?;
    } else {
        print_report(&report, ctx);
    }

    if !report.all_succeeded() {
        bail!(
            "{} of {} repositories failed to {}",
            report.failed(),
            report.outcomes.len(),
            mode
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport, ctx: &Context) {
    let verbosity = ctx.verbosity();
    for outcome in &report.outcomes {
        match &outcome.error {
            Some(err) => output::error(format!("{}: {}", outcome.name, err)),
            None => {
                let note = if outcome.changed { "" } else { " (no changes)" };
                output::print(
                    format!("{}: {}{}", outcome.name, report.mode.done(), note),
                    verbosity,
                );
            }
        }
    }
    output::print(
        format!(
            "{} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        ),
        verbosity,
    );
}
