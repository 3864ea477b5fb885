//! # smi-drought
//!
//! Drought detection on a soil moisture index field: per-cell drought
//! flags, spatio-temporal drought events, and severity-area-duration (SAD)
//! statistics.
//!
//! # Pipeline
//!
//! 1. **Flag** cells whose SMI is below the threshold ([`drought_indicator`]).
//! 2. **Track** 8-connected drought clusters through time into events
//!    ([`track_events`]).
//! 3. **Summarize** events ([`event_statistics`]), SAD curves
//!    ([`sad_analysis`]) and per-cell spells ([`cell_statistics`]).
//!
//! No-data SMI is never drought and never joins a cluster.
//!
//! # Quick Start
//!
//! ```
//! use ndarray::array;
//! use smi_drought::{DroughtConfig, drought_indicator, event_statistics, track_events};
//! use smi_grid::GridMask;
//!
//! let mask = GridMask::all_valid(2, 2).unwrap();
//! // 4 cells × 3 steps.
//! let smi = array![
//!     [0.05, 0.10, 0.60],
//!     [0.15, 0.12, 0.70],
//!     [0.50, 0.18, 0.80],
//!     [0.90, 0.40, 0.65],
//! ];
//!
//! let config = DroughtConfig::new().with_threshold(0.2);
//! let indicator = drought_indicator(smi.view(), config.threshold()).unwrap();
//! let events = track_events(&mask, &indicator, &config).unwrap();
//! let stats = event_statistics(&events, smi.view()).unwrap();
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(stats[0].duration, 2);
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `indicator` | Drought flags |
//! | `label` | 8-connected component labeling |
//! | `tracker` | Event tracking across time steps |
//! | `events` | Per-event statistics |
//! | `sad` | Severity-area-duration curves |
//! | `cell_stats` | Per-cell drought spells |

mod cell_stats;
mod config;
mod error;
mod events;
mod indicator;
mod label;
mod sad;
mod tracker;

pub use cell_stats::{CellDroughtStats, cell_statistics};
pub use config::DroughtConfig;
pub use error::DroughtError;
pub use events::{EventStats, event_statistics};
pub use indicator::{DroughtFlag, IndicatorField, drought_indicator};
pub use sad::{SadTable, sad_analysis};
pub use tracker::{DroughtEvent, EventRegistry, EventState, track_events};
