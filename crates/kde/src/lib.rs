//! # smi-kde
//!
//! Kernel density estimation of per-cell soil moisture distributions and
//! the soil moisture index (SMI) derived from them.
//!
//! # Pipeline
//!
//! 1. **Estimate** a Gaussian kernel bandwidth for every (cell, calendar
//!    step) from the estimation period ([`estimate_bandwidths`]), or wrap a
//!    pre-computed field ([`BandwidthField::from_values`]).
//! 2. **Map** evaluation-period soil moisture through the kernel CDF of its
//!    (cell, calendar step) sample ([`compute_smi`]).
//! 3. Optionally **invert** index values back to soil moisture
//!    ([`invert_smi`]).
//!
//! Entries that cannot be estimated are never errors: they become
//! [`BandwidthStatus::Unusable`], propagate as `NODATA`, and are counted in
//! the [`EstimationSummary`].
//!
//! # Quick Start
//!
//! ```no_run
//! use ndarray::Array2;
//! use smi_calendar::Period;
//! use smi_kde::{KdeConfig, compute_smi, estimate_bandwidths};
//!
//! let period = Period::from_ymd((1981, 1, 1), (2010, 12, 31), 12).unwrap();
//! let sm = Array2::from_shape_fn((4, period.n_steps()), |(c, t)| {
//!     0.25 + 0.01 * c as f64 + 0.05 * (t as f64).sin()
//! });
//!
//! let config = KdeConfig::new();
//! let bandwidths = estimate_bandwidths(sm.view(), &period, &config).unwrap();
//! let smi = compute_smi(sm.view(), &period, sm.view(), &period, &bandwidths, &config).unwrap();
//! assert_eq!(smi.values().dim(), (4, 360));
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bandwidth` | Rule of thumb and cross-validated bandwidth selection |
//! | `cdf` | Kernel CDF and its inverse |
//! | `field` | Bandwidth field and parallel estimation |
//! | `smi` | Index mapping and inversion |
//! | `kernel` | Gaussian kernel primitives |

mod bandwidth;
mod cdf;
mod config;
mod error;
mod field;
pub(crate) mod kernel;
mod result;
mod smi;

pub use bandwidth::BandwidthStatus;
pub use cdf::{Inversion, KernelCdf};
pub use config::{BandwidthMethod, KdeConfig};
pub use error::KdeError;
pub use field::{BandwidthField, estimate_bandwidths};
pub use result::{EstimationSummary, MappedField};
pub use smi::{compute_smi, invert_smi};
