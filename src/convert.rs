//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use smi_calendar::Period;
use smi_drought::DroughtConfig;
use smi_io::ReaderConfig;
use smi_kde::{BandwidthMethod, KdeConfig};

use crate::config::*;

/// Parses a bandwidth method name string into the corresponding enum variant.
pub fn parse_method(s: &str) -> Result<BandwidthMethod> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "cross_validation" | "cv" => Ok(BandwidthMethod::CrossValidation),
        "rule_of_thumb" | "silverman" => Ok(BandwidthMethod::RuleOfThumb),
        other => bail!("unknown bandwidth method: {other:?}"),
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date: {s:?}"))
}

/// Builds a [`ReaderConfig`] from the TOML I/O configuration.
pub fn build_reader_config(io: &IoConfig) -> ReaderConfig {
    ReaderConfig::default()
        .with_sm_var(&io.sm_var)
        .with_time_var(&io.time_var)
        .with_mask_var(io.mask_var.as_deref())
        .with_basin_var(io.basin_var.as_deref())
}

/// Builds a [`KdeConfig`] from the TOML kde configuration.
pub fn build_kde_config(kde: &KdeToml) -> Result<KdeConfig> {
    let cfg = KdeConfig::new()
        .with_method(parse_method(&kde.method)?)
        .with_min_samples(kde.min_samples)
        .with_min_cv_samples(kde.min_cv_samples)
        .with_window(kde.window)
        .with_n_candidates(kde.n_candidates)
        .with_max_iters(kde.max_iters);
    cfg.validate().context("invalid [kde] configuration")?;
    Ok(cfg)
}

/// Builds a [`DroughtConfig`] from the TOML drought configuration.
pub fn build_drought_config(drought: &DroughtToml) -> Result<DroughtConfig> {
    let cfg = DroughtConfig::new()
        .with_threshold(drought.threshold)
        .with_th_cell_clus(drought.th_cell_clus)
        .with_n_cell_inter(drought.n_cell_inter)
        .with_sad_durations(drought.sad_durations.clone())
        .with_delta_area(drought.delta_area)
        .with_sad_percentiles(drought.sad_percentiles.clone());
    cfg.validate().context("invalid [drought] configuration")?;
    Ok(cfg)
}

/// Estimation, evaluation and output periods of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunPeriods {
    pub estimation: Period,
    pub evaluation: Period,
    pub output: Period,
}

/// Resolves a period from optional bounds, defaulting to `fallback` and
/// counting days in its calendar.
fn resolve(
    start: Option<&str>,
    end: Option<&str>,
    fallback: &Period,
    name: &str,
) -> Result<Period> {
    let start = start.map(parse_date).transpose()?.unwrap_or(fallback.start());
    let end = end.map(parse_date).transpose()?.unwrap_or(fallback.end());
    Period::new(start, end, fallback.steps_per_year())
        .and_then(|p| p.with_calendar(fallback.calendar()))
        .with_context(|| format!("invalid {name} period"))
}

/// Builds the run periods inside the period covered by the input file.
///
/// The estimation and evaluation periods must both lie inside the file; the
/// output period must lie inside the evaluation period.
pub fn build_periods(period: &PeriodToml, file: &Period) -> Result<RunPeriods> {
    let estimation = resolve(
        period.estimation_start.as_deref(),
        period.estimation_end.as_deref(),
        file,
        "estimation",
    )?;
    let evaluation = resolve(
        period.evaluation_start.as_deref(),
        period.evaluation_end.as_deref(),
        &estimation,
        "evaluation",
    )?;
    let output = resolve(
        period.output_start.as_deref(),
        period.output_end.as_deref(),
        &evaluation,
        "output",
    )?;

    for (name, p) in [("estimation", &estimation), ("evaluation", &evaluation)] {
        if !file.contains(p) {
            bail!(
                "{name} period {}..={} is not covered by the input ({}..={})",
                p.start(),
                p.end(),
                file.start(),
                file.end()
            );
        }
    }
    if !evaluation.contains(&output) {
        bail!(
            "output period {}..={} lies outside the evaluation period",
            output.start(),
            output.end()
        );
    }

    Ok(RunPeriods {
        estimation,
        evaluation,
        output,
    })
}
