//! End-to-end runs of the `smi` binary on a synthetic NetCDF input.

use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const NX: usize = 4;
const NY: usize = 3;
const YEARS: usize = 12;

/// Monthly soil moisture from 1990-01 with a seasonal cycle, per-cell noise
/// and a dry spell over the western half in 1999. Position (2, 3) is water.
fn write_input(path: &Path) {
    let nt = YEARS * 12;
    let n_grid = NX * NY;
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", nt).unwrap();
    file.add_dimension("y", NY).unwrap();
    file.add_dimension("x", NX).unwrap();

    {
        let offsets: Vec<f64> = (0..nt).map(|t| month_start_offset(1990, t) as f64).collect();
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_attribute("units", "days since 1990-01-01").unwrap();
        var.put_attribute("calendar", "standard").unwrap();
        var.put_values(&offsets, ..).unwrap();
    }
    {
        let data: Vec<f64> = (0..nt * n_grid)
            .map(|i| {
                let (t, g) = (i / n_grid, i % n_grid);
                let (row, col) = (g / NX, g % NX);
                if (row, col) == (2, 3) {
                    return -9999.0;
                }
                let season = (2.0 * std::f64::consts::PI * (t % 12) as f64 / 12.0).sin();
                let noise = ((t * 7919 + g * 104_729) % 1000) as f64 / 1000.0;
                let dry = if t / 12 == 9 && col < 2 { -0.3 } else { 0.0 };
                0.5 + 0.1 * season + 0.1 * noise + dry
            })
            .collect();
        let mut var = file.add_variable::<f64>("SM", &["time", "y", "x"]).unwrap();
        var.put_attribute("_FillValue", -9999.0).unwrap();
        var.put_values(&data, ..).unwrap();
    }
    {
        let basin: Vec<i32> = (0..n_grid).map(|g| if g % NX < 2 { 1 } else { 2 }).collect();
        let mut var = file.add_variable::<i32>("basin", &["y", "x"]).unwrap();
        var.put_values(&basin, ..).unwrap();
    }
}

/// Days from `start_year`-01-01 to the first day of month `t`.
fn month_start_offset(start_year: i32, t: usize) -> i64 {
    const DAYS: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut days = 0;
    for m in 0..t {
        let year = start_year + (m / 12) as i32;
        let month = m % 12;
        let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
        days += DAYS[month] + i64::from(month == 1 && leap);
    }
    days
}

fn write_config(dir: &Path, extra_io: &str) -> std::path::PathBuf {
    let config = format!(
        r#"
threads = 2

[io]
input = "{input}"
output_dir = "{out}"
basin_var = "basin"
write_inverted = true
{extra_io}

[period]
steps_per_year = 12
estimation_start = "1990-01-01"
estimation_end = "2001-12-31"
evaluation_start = "1998-01-01"
evaluation_end = "2001-12-31"
output_start = "1999-01-01"
output_end = "1999-12-31"

[kde]
method = "rule_of_thumb"

[drought]
threshold = 0.2
th_cell_clus = 2
sad_durations = [1, 3]
delta_area = 2
"#,
        input = dir.join("sm.nc").display(),
        out = dir.join("out").display(),
    );
    let path = dir.join("smi.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn smi(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_smi"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn run_writes_all_outputs() {
    let dir = tempdir().unwrap();
    write_input(&dir.path().join("sm.nc"));
    let config = write_config(dir.path(), "");

    let output = smi(&["run", "--config", config.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = dir.path().join("out");
    for name in [
        "bandwidth.nc",
        "SMI.nc",
        "SM_inverted.nc",
        "drought_indicator.nc",
        "cluster_ids.nc",
        "drought_report.json",
    ] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let smi_file = netcdf::open(out.join("SMI.nc")).unwrap();
    let time = smi_file.variable("time").unwrap();
    assert_eq!(time.get_values::<f64, _>(..).unwrap().len(), 12);
    let values: Vec<f64> = smi_file.variable("SMI").unwrap().get_values::<f64, _>(..).unwrap();
    for (i, v) in values.iter().enumerate() {
        if i % (NX * NY) == 2 * NX + 3 {
            assert_eq!(*v, -9999.0);
        } else {
            assert!((0.0..=1.0).contains(v), "SMI {v} out of range");
        }
    }

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("drought_report.json")).unwrap())
            .unwrap();
    assert_eq!(report["summary"]["n_cells"], 11);
    assert_eq!(report["basins"].as_array().unwrap().len(), 2);
    assert_eq!(report["sad"].as_array().unwrap().len(), 2);
    assert!(report["summary"]["n_events"].as_u64().unwrap() >= 1);
}

#[test]
fn bandwidth_then_run_with_supplied_bandwidths() {
    let dir = tempdir().unwrap();
    write_input(&dir.path().join("sm.nc"));
    let config = write_config(dir.path(), "");

    let output = smi(&["bandwidth", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    let bw = dir.path().join("out").join("bandwidth.nc");
    assert!(bw.exists());

    let supplied = format!("bandwidth_file = \"{}\"", bw.display());
    let config = write_config(dir.path(), &supplied);
    let rerun_dir = dir.path().join("rerun");
    let output = smi(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--output-dir",
        rerun_dir.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(rerun_dir.join("SMI.nc").exists());
    assert!(!rerun_dir.join("bandwidth.nc").exists());
}

#[test]
fn missing_config_fails() {
    let output = smi(&["run", "--config", "/nonexistent/smi.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read config file"));
}
