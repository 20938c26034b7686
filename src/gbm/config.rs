//! GBM hyperparameter surface (spec.md §6 "Hyperparameter surface") and its
//! builder, following `config::validation`'s builder-then-validate pattern.

use crate::config::{Config, ConcurrencyConfig, ConfigError, ConfigValidation};
use crate::gbm::distribution::{Distribution, DistributionParams, Family};

/// The full hyperparameter surface from spec.md §6, plus the histogram
/// engine knobs from the same section.
#[derive(Debug, Clone)]
pub struct GbmConfig {
    pub family: Family,
    pub distribution_params: DistributionParams,

    pub ntrees: usize,
    pub max_depth: usize,
    pub learn_rate: f64,
    pub learn_rate_annealing: f64,

    pub nbins: usize,
    pub nbins_top_level: usize,
    pub nbins_cats: usize,

    pub min_rows: f64,
    pub min_split_improvement: f64,

    pub sample_rate: f64,
    pub sample_rate_per_class: Option<Vec<f64>>,
    pub col_sample_rate: f64,
    pub col_sample_rate_per_tree: f64,

    pub max_abs_leafnode_pred: f64,
    pub pred_noise_bandwidth: f64,

    pub huber_alpha: f64,
    pub quantile_alpha: f64,

    pub seed: u64,

    // Histogram engine knobs (spec.md §6). `shared_histo` picks between the
    // two concurrency modes `gbm::histogram_builder` implements; the other
    // three are accepted and validated but don't change dispatch shape —
    // Rayon's own scheduler stands in for the manual thread-count policy
    // and unordered/column-major layout they configure (see DESIGN.md).
    pub col_block_sz: usize,
    pub shared_histo: bool,
    pub min_threads: usize,
    pub unordered: bool,

    pub concurrency: usize,
}

impl Config for GbmConfig {}

impl ConcurrencyConfig for GbmConfig {
    fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl GbmConfig {
    pub fn distribution(&self) -> Distribution {
        Distribution::new(self.family, self.distribution_params)
    }

    /// Effective learning rate at `round` (1-indexed), spec.md §"Effective
    /// learning rate" glossary entry and §4.1 step 8's convergence check.
    pub fn effective_learn_rate(&self, round: usize) -> f64 {
        self.learn_rate * self.learn_rate_annealing.powi(round.saturating_sub(1) as i32)
    }

    /// Convergence threshold from spec.md §3/§4.1: stop once the effective
    /// learning rate falls below this.
    pub const CONVERGENCE_THRESHOLD: f64 = 1e-6;

    pub fn has_converged(&self, round: usize) -> bool {
        self.effective_learn_rate(round) < Self::CONVERGENCE_THRESHOLD
    }

    pub fn nbins_for_depth(&self, depth: usize) -> usize {
        if depth == 0 {
            self.nbins_top_level
        } else {
            self.nbins
        }
    }

    pub fn builder() -> GbmConfigBuilder {
        GbmConfigBuilder::default()
    }
}

impl Default for GbmConfig {
    fn default() -> Self {
        Self {
            family: Family::Gaussian,
            distribution_params: DistributionParams::default(),
            ntrees: 50,
            max_depth: 5,
            learn_rate: 0.1,
            learn_rate_annealing: 1.0,
            nbins: 20,
            nbins_top_level: 1024,
            nbins_cats: 1024,
            min_rows: 10.0,
            min_split_improvement: 1e-5,
            sample_rate: 1.0,
            sample_rate_per_class: None,
            col_sample_rate: 1.0,
            col_sample_rate_per_tree: 1.0,
            max_abs_leafnode_pred: 1e4,
            pred_noise_bandwidth: 0.0,
            huber_alpha: 0.9,
            quantile_alpha: 0.5,
            seed: 0,
            col_block_sz: 64,
            shared_histo: true,
            min_threads: num_cpus::get(),
            unordered: false,
            concurrency: num_cpus::get(),
        }
    }
}

/// Fluent builder mirroring `config::algo_config`'s shape: all-`Option`
/// fields over a `Default` base, `build()` validates then returns the
/// config or the first `ConfigError` found.
#[derive(Debug, Clone, Default)]
pub struct GbmConfigBuilder {
    family: Option<Family>,
    distribution_params: Option<DistributionParams>,
    ntrees: Option<usize>,
    max_depth: Option<usize>,
    learn_rate: Option<f64>,
    learn_rate_annealing: Option<f64>,
    nbins: Option<usize>,
    nbins_top_level: Option<usize>,
    nbins_cats: Option<usize>,
    min_rows: Option<f64>,
    min_split_improvement: Option<f64>,
    sample_rate: Option<f64>,
    sample_rate_per_class: Option<Vec<f64>>,
    col_sample_rate: Option<f64>,
    col_sample_rate_per_tree: Option<f64>,
    max_abs_leafnode_pred: Option<f64>,
    pred_noise_bandwidth: Option<f64>,
    huber_alpha: Option<f64>,
    quantile_alpha: Option<f64>,
    seed: Option<u64>,
    col_block_sz: Option<usize>,
    shared_histo: Option<bool>,
    min_threads: Option<usize>,
    unordered: Option<bool>,
    concurrency: Option<usize>,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = Some(value);
            self
        }
    };
}

impl GbmConfigBuilder {
    setter!(family, Family);
    setter!(distribution_params, DistributionParams);
    setter!(ntrees, usize);
    setter!(max_depth, usize);
    setter!(learn_rate, f64);
    setter!(learn_rate_annealing, f64);
    setter!(nbins, usize);
    setter!(nbins_top_level, usize);
    setter!(nbins_cats, usize);
    setter!(min_rows, f64);
    setter!(min_split_improvement, f64);
    setter!(sample_rate, f64);
    setter!(sample_rate_per_class, Vec<f64>);
    setter!(col_sample_rate, f64);
    setter!(col_sample_rate_per_tree, f64);
    setter!(max_abs_leafnode_pred, f64);
    setter!(pred_noise_bandwidth, f64);
    setter!(huber_alpha, f64);
    setter!(quantile_alpha, f64);
    setter!(seed, u64);
    setter!(col_block_sz, usize);
    setter!(shared_histo, bool);
    setter!(min_threads, usize);
    setter!(unordered, bool);
    setter!(concurrency, usize);

    pub fn build(self) -> Result<GbmConfig, ConfigError> {
        let defaults = GbmConfig::default();
        let config = GbmConfig {
            family: self.family.unwrap_or(defaults.family),
            distribution_params: self.distribution_params.unwrap_or(defaults.distribution_params),
            ntrees: self.ntrees.unwrap_or(defaults.ntrees),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            learn_rate: self.learn_rate.unwrap_or(defaults.learn_rate),
            learn_rate_annealing: self.learn_rate_annealing.unwrap_or(defaults.learn_rate_annealing),
            nbins: self.nbins.unwrap_or(defaults.nbins),
            nbins_top_level: self.nbins_top_level.unwrap_or(defaults.nbins_top_level),
            nbins_cats: self.nbins_cats.unwrap_or(defaults.nbins_cats),
            min_rows: self.min_rows.unwrap_or(defaults.min_rows),
            min_split_improvement: self.min_split_improvement.unwrap_or(defaults.min_split_improvement),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            sample_rate_per_class: self.sample_rate_per_class.or(defaults.sample_rate_per_class),
            col_sample_rate: self.col_sample_rate.unwrap_or(defaults.col_sample_rate),
            col_sample_rate_per_tree: self
                .col_sample_rate_per_tree
                .unwrap_or(defaults.col_sample_rate_per_tree),
            max_abs_leafnode_pred: self.max_abs_leafnode_pred.unwrap_or(defaults.max_abs_leafnode_pred),
            pred_noise_bandwidth: self.pred_noise_bandwidth.unwrap_or(defaults.pred_noise_bandwidth),
            huber_alpha: self.huber_alpha.unwrap_or(defaults.huber_alpha),
            quantile_alpha: self.quantile_alpha.unwrap_or(defaults.quantile_alpha),
            seed: self.seed.unwrap_or(defaults.seed),
            col_block_sz: self.col_block_sz.unwrap_or(defaults.col_block_sz),
            shared_histo: self.shared_histo.unwrap_or(defaults.shared_histo),
            min_threads: self.min_threads.unwrap_or(defaults.min_threads),
            unordered: self.unordered.unwrap_or(defaults.unordered),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
        };
        config.validate()?;
        Ok(config)
    }
}

impl GbmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ConfigValidation::validate_positive("ntrees", self.ntrees as f64)?;
        ConfigValidation::validate_range("learn_rate", self.learn_rate, f64::MIN_POSITIVE, 1.0)?;
        ConfigValidation::validate_range(
            "learn_rate_annealing",
            self.learn_rate_annealing,
            f64::MIN_POSITIVE,
            1.0,
        )?;
        ConfigValidation::validate_positive("nbins", self.nbins as f64)?;
        ConfigValidation::validate_range("sample_rate", self.sample_rate, f64::MIN_POSITIVE, 1.0)?;
        ConfigValidation::validate_range(
            "col_sample_rate",
            self.col_sample_rate,
            f64::MIN_POSITIVE,
            1.0,
        )?;
        ConfigValidation::validate_range(
            "col_sample_rate_per_tree",
            self.col_sample_rate_per_tree,
            f64::MIN_POSITIVE,
            1.0,
        )?;
        ConfigValidation::validate_positive("max_abs_leafnode_pred", self.max_abs_leafnode_pred)?;
        if self.pred_noise_bandwidth < 0.0 {
            return Err(ConfigError::MustBePositive {
                name: "pred_noise_bandwidth",
                value: self.pred_noise_bandwidth,
            });
        }
        ConfigValidation::validate_range("huber_alpha", self.huber_alpha, f64::MIN_POSITIVE, 1.0)?;
        ConfigValidation::validate_range("quantile_alpha", self.quantile_alpha, f64::MIN_POSITIVE, 1.0)?;
        if let Some(rates) = &self.sample_rate_per_class {
            ConfigValidation::validate_non_empty("sample_rate_per_class", rates)?;
        }
        Ok(())
    }
}
