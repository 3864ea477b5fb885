//! Bandwidth command: estimate kernel bandwidths and persist them.

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use smi_io::write_bandwidths;
use smi_kde::{BandwidthStatus, estimate_bandwidths};

use crate::cli::RunArgs;
use crate::run_cmd::{self, BANDWIDTH_FILE};

/// Estimate bandwidths over the estimation period and write them to the
/// output directory.
pub fn run(args: RunArgs) -> Result<()> {
    let _cmd = info_span!("bandwidth").entered();
    let prep = run_cmd::prepare(&args)?;
    let estimation = prep.estimation()?;

    let field = estimate_bandwidths(estimation.view(), &prep.periods.estimation, &prep.kde)
        .context("bandwidth estimation failed")?;
    if field.n_unusable_cells() > 0 {
        warn!(
            n_unusable_cells = field.n_unusable_cells(),
            "cells without any usable bandwidth"
        );
    }

    let path = prep.output_dir.join(BANDWIDTH_FILE);
    write_bandwidths(&path, prep.data.mask(), &field)
        .with_context(|| format!("failed to write bandwidths: {}", path.display()))?;

    info!(
        path = %path.display(),
        n_cross_validated = field.count(BandwidthStatus::CrossValidated),
        n_rule_of_thumb = field.count(BandwidthStatus::RuleOfThumb),
        n_fallback = field.count(BandwidthStatus::Fallback),
        n_unusable = field.n_unusable(),
        "bandwidths written"
    );
    Ok(())
}
