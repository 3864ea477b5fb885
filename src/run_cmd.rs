//! Run command: SMI, drought indicator, drought events and SAD curves.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use ndarray::Array2;
use tracing::{info, info_span, warn};

use smi_calendar::Period;
use smi_drought::{
    cell_statistics, drought_indicator, event_statistics, sad_analysis, track_events,
};
use smi_io::{
    BasinReport, CellReport, DroughtReport, EstimationReport, RunSummary, SoilMoistureData,
    read_bandwidths, read_soil_moisture, write_bandwidths, write_cluster_ids, write_field,
    write_indicator, write_report,
};
use smi_kde::{BandwidthField, KdeConfig, compute_smi, estimate_bandwidths, invert_smi};

use crate::cli::RunArgs;
use crate::config::SmiConfig;
use crate::convert::{self, RunPeriods};

pub const BANDWIDTH_FILE: &str = "bandwidth.nc";
const SMI_FILE: &str = "SMI.nc";
const INVERTED_FILE: &str = "SM_inverted.nc";
const INDICATOR_FILE: &str = "drought_indicator.nc";
const CLUSTER_FILE: &str = "cluster_ids.nc";
const REPORT_FILE: &str = "drought_report.json";

/// Inputs shared by every subcommand.
pub struct Prepared {
    pub config: SmiConfig,
    pub output_dir: PathBuf,
    pub data: SoilMoistureData,
    pub file_period: Period,
    pub periods: RunPeriods,
    pub kde: KdeConfig,
}

impl Prepared {
    /// Soil moisture of the estimation period, `(n_cells, n_steps)`.
    pub fn estimation(&self) -> Result<Array2<f64>> {
        self.data
            .cells(&self.file_period, &self.periods.estimation)
            .context("failed to extract estimation period")
    }
}

/// Load the config, apply CLI overrides, set up the thread pool and read
/// the input file.
pub fn prepare(args: &RunArgs) -> Result<Prepared> {
    let toml_str = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config file: {}", args.config.display()))?;
    let mut config: SmiConfig = toml::from_str(&toml_str).context("failed to parse TOML config")?;

    if let Some(input) = &args.input {
        config.io.input = Some(input.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.io.output_dir = dir.clone();
    }
    if let Some(threads) = args.threads.or(config.threads) {
        if threads == 0 {
            bail!("threads must be at least 1");
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "configured thread pool");
    }

    let kde = convert::build_kde_config(&config.kde)?;
    let reader_cfg = convert::build_reader_config(&config.io);

    let input =
        config.io.input.clone().ok_or_else(|| {
            anyhow::anyhow!("no input path: set [io].input in config or use --input")
        })?;
    info!(path = %input.display(), "reading soil moisture");
    let data = read_soil_moisture(&input, &reader_cfg)
        .with_context(|| format!("failed to read NetCDF: {}", input.display()))?;
    let file_period = data
        .period(config.period.steps_per_year)
        .with_context(|| format!("invalid time axis in {}", input.display()))?;
    let periods = convert::build_periods(&config.period, &file_period)?;
    info!(
        n_cells = data.mask().n_cells(),
        estimation = %format!("{}..={}", periods.estimation.start(), periods.estimation.end()),
        evaluation = %format!("{}..={}", periods.evaluation.start(), periods.evaluation.end()),
        "input loaded"
    );

    let output_dir = config.io.output_dir.clone();
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("failed to create output directory: {}", output_dir.display())
    })?;

    Ok(Prepared {
        config,
        output_dir,
        data,
        file_period,
        periods,
        kde,
    })
}

/// Read supplied bandwidths, or estimate and persist them.
fn bandwidths(prep: &Prepared, estimation: &Array2<f64>) -> Result<BandwidthField> {
    let mask = prep.data.mask();
    let spy = prep.periods.estimation.steps_per_year();
    if let Some(path) = &prep.config.io.bandwidth_file {
        info!(path = %path.display(), "reading bandwidths");
        return read_bandwidths(path, mask, spy)
            .with_context(|| format!("failed to read bandwidths: {}", path.display()));
    }

    let field = estimate_bandwidths(estimation.view(), &prep.periods.estimation, &prep.kde)
        .context("bandwidth estimation failed")?;
    let path = prep.output_dir.join(BANDWIDTH_FILE);
    write_bandwidths(&path, mask, &field)
        .with_context(|| format!("failed to write bandwidths: {}", path.display()))?;
    Ok(field)
}

/// Run the full pipeline.
pub fn run(args: RunArgs) -> Result<()> {
    let _cmd = info_span!("run").entered();
    let prep = prepare(&args)?;
    let mask = prep.data.mask();
    let RunPeriods {
        estimation: est_period,
        evaluation: eval_period,
        output: out_period,
    } = prep.periods;
    let drought_cfg = convert::build_drought_config(&prep.config.drought)?;

    // 1. SMI
    let estimation = prep.estimation()?;
    let evaluation = prep
        .data
        .cells(&prep.file_period, &eval_period)
        .context("failed to extract evaluation period")?;
    let bandwidths = bandwidths(&prep, &estimation)?;

    let smi = compute_smi(
        estimation.view(),
        &est_period,
        evaluation.view(),
        &eval_period,
        &bandwidths,
        &prep.kde,
    )
    .context("SMI computation failed")?;
    let summary = *smi.summary();
    if summary.n_nodata_introduced > 0 {
        warn!(
            n_nodata_introduced = summary.n_nodata_introduced,
            n_unusable_cells = summary.n_unusable_cells,
            "estimation introduced no-data values"
        );
    }
    let dir = &prep.output_dir;
    write_field(&dir.join(SMI_FILE), mask, "SMI", smi.values(), &eval_period, &out_period)
        .context("failed to write SMI")?;

    if prep.config.io.write_inverted {
        let inverted = invert_smi(
            smi.values(),
            estimation.view(),
            &est_period,
            &eval_period,
            &bandwidths,
            &prep.kde,
        )
        .context("SMI inversion failed")?;
        if inverted.summary().n_clamped > 0 {
            warn!(
                n_clamped = inverted.summary().n_clamped,
                "inversion clamped to the support bracket"
            );
        }
        write_field(
            &dir.join(INVERTED_FILE),
            mask,
            &prep.config.io.sm_var,
            inverted.values(),
            &eval_period,
            &out_period,
        )
        .context("failed to write inverted soil moisture")?;
    }

    // 2. Drought indicator and events
    let indicator = drought_indicator(smi.values(), drought_cfg.threshold())
        .context("drought indicator failed")?;
    let registry =
        track_events(mask, &indicator, &drought_cfg).context("cluster tracking failed")?;
    write_indicator(&dir.join(INDICATOR_FILE), mask, &indicator, &eval_period, &out_period)
        .context("failed to write drought indicator")?;
    write_cluster_ids(
        &dir.join(CLUSTER_FILE),
        mask,
        registry.cluster_ids(),
        &eval_period,
        &out_period,
    )
    .context("failed to write cluster ids")?;

    // 3. Statistics
    let events = event_statistics(&registry, smi.values())
        .context("event statistics failed")?;
    let sad = sad_analysis(&registry, smi.values(), &drought_cfg).context("SAD analysis failed")?;
    let cells = cell_statistics(&indicator, smi.values()).context("cell statistics failed")?;
    let basins = match prep.data.basins() {
        Some(map) => map
            .average(smi.values())
            .context("basin averaging failed")?
            .iter()
            .map(BasinReport::from)
            .collect(),
        None => Vec::new(),
    };

    let report = DroughtReport {
        summary: RunSummary {
            evaluation_start: eval_period.start().to_string(),
            evaluation_end: eval_period.end().to_string(),
            steps_per_year: eval_period.steps_per_year(),
            rows: mask.rows(),
            cols: mask.cols(),
            n_cells: mask.n_cells(),
            threshold: drought_cfg.threshold(),
            n_events: registry.len(),
        },
        estimation: EstimationReport::from(&summary),
        events,
        sad,
        cells: CellReport::new(mask, cells),
        basins,
    };
    let report_path = dir.join(REPORT_FILE);
    write_report(&report_path, &report)
        .with_context(|| format!("failed to write report: {}", report_path.display()))?;

    info!(
        n_events = registry.len(),
        n_nodata_introduced = summary.n_nodata_introduced,
        output_dir = %dir.display(),
        "run complete"
    );
    Ok(())
}
