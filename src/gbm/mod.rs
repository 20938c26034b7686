//! Gradient boosting training core: a chunked frame over huge paged arrays
//! (`frame`), a histogram-based split finder dispatched across Rayon
//! (`histogram`, `histogram_builder`, `split`), and a boosting driver that
//! fits successive per-class trees to a pluggable loss (`distribution`,
//! `residual`, `gamma`, `ensemble`, `driver`).

pub mod binning;
pub mod config;
pub mod distribution;
pub mod ensemble;
pub mod frame;
pub mod gamma;
pub mod histogram;
pub mod histogram_builder;
pub mod driver;
pub mod quantile;
pub mod residual;
pub mod sampler;
pub mod split;
pub mod tree;

pub use config::{GbmConfig, GbmConfigBuilder};
pub use distribution::{Distribution, DistributionParams, Family};
pub use driver::{train, TrainedModel};
pub use frame::{ChunkedFrame, Column, ColumnKind};
pub use histogram::{Bin, DHistogram, Edges};
pub use tree::{DTree, HistogramSet, NaDirection, Node, SplitPredicate};
