//! Boosting control loop (`spec.md` §4.1): the top-level orchestration that
//! fits `ntrees` rounds of one tree per class, each round chaining the
//! residual, histogram/split, leaf-fit and ensemble-update passes.

use log::{debug, info};

use crate::errors::GbmResult;
use crate::gbm::binning::Binning;
use crate::gbm::config::GbmConfig;
use crate::gbm::distribution::{Distribution, Family};
use crate::gbm::ensemble;
use crate::gbm::frame::ChunkedFrame;
use crate::gbm::gamma;
use crate::gbm::histogram_builder;
use crate::gbm::quantile;
use crate::gbm::sampler;
use crate::gbm::split::{self, SplitParams};
use crate::gbm::tree::DTree;
use crate::termination::TerminationFlag;

/// A fully trained model: one tree per class per round, plus the constant
/// per-class offset every round's prediction is computed relative to.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    /// `trees[round][k]`.
    pub trees: Vec<Vec<DTree>>,
    /// The effective learning rate actually applied at each trained round,
    /// needed to replay out-of-sample predictions (`spec.md` §4.1's
    /// "effective learning rate" applies per round, not per tree).
    pub effective_learn_rates: Vec<f64>,
    pub init_f: Vec<f64>,
    pub distribution: Distribution,
    pub num_classes: usize,
}

impl TrainedModel {
    /// Link-space prediction for a row not necessarily in the training
    /// frame, given a callback returning that row's value for a feature
    /// column (or `None` for NA).
    pub fn predict_link<F>(&self, feature_value: F) -> Vec<f64>
    where
        F: Fn(usize) -> Option<f64> + Copy,
    {
        let mut out = self.init_f.clone();
        for (round_trees, &rate) in self.trees.iter().zip(self.effective_learn_rates.iter()) {
            for (k, tree) in round_trees.iter().enumerate() {
                out[k] += rate * score_tree(tree, feature_value);
            }
        }
        out
    }

    /// Prediction on the response's natural scale (applies the
    /// distribution's inverse link to each class's link-space score).
    pub fn predict<F>(&self, feature_value: F) -> Vec<f64>
    where
        F: Fn(usize) -> Option<f64> + Copy,
    {
        self.predict_link(feature_value)
            .into_iter()
            .map(|f| self.distribution.link_inv(f))
            .collect()
    }
}

fn score_tree<F>(tree: &DTree, feature_value: F) -> f64
where
    F: Fn(usize) -> Option<f64>,
{
    use crate::gbm::tree::Node;
    let mut nid = tree.root();
    loop {
        match tree.node(nid) {
            Node::Leaf { prediction } => return *prediction,
            Node::Undecided { .. } => return 0.0,
            Node::Decided { .. } => nid = tree.route(nid, &feature_value),
        }
    }
}

/// Distribution-appropriate initial per-class offset (`spec.md` §4.1 step
/// 0): the weighted mean in link space for the closed-form families, the
/// weighted median/quantile for Laplace/Quantile/Huber, and the per-class
/// log-proportion for multinomial with more than two classes.
fn compute_init_f(frame: &ChunkedFrame, distribution: Distribution, num_classes: usize) -> Vec<f64> {
    if num_classes > 1 {
        let mut weight_per_class = vec![0.0; num_classes];
        let mut total_weight = 0.0;
        for row in 0..frame.num_rows() {
            let w = frame.weight_for_row(row);
            let y = frame.response_value(row);
            if w <= 0.0 || y.is_nan() {
                continue;
            }
            let class = y.round() as i64;
            if class >= 0 && (class as usize) < num_classes {
                weight_per_class[class as usize] += w;
                total_weight += w;
            }
        }
        return weight_per_class
            .iter()
            .map(|&w| {
                let p = if total_weight > 0.0 {
                    (w / total_weight).max(1e-9)
                } else {
                    1.0 / num_classes as f64
                };
                p.ln()
            })
            .collect();
    }

    let mut values = Vec::new();
    let mut weights = Vec::new();
    for row in 0..frame.num_rows() {
        let w = frame.weight_for_row(row);
        let y = frame.response_value(row);
        if w <= 0.0 || y.is_nan() {
            continue;
        }
        values.push(y);
        weights.push(w);
    }
    if values.is_empty() {
        return vec![0.0];
    }

    let init = if matches!(distribution.family, Family::Bernoulli | Family::ModifiedHuber) {
        let total_w: f64 = weights.iter().sum();
        let mean_y: f64 = values.iter().zip(&weights).map(|(y, w)| y * w).sum::<f64>() / total_w;
        distribution.link(mean_y.clamp(1e-6, 1.0 - 1e-6))
    } else if distribution.needs_quantile_fit() {
        let q = match distribution.family {
            Family::Laplace => 0.5,
            _ => distribution.params.quantile_alpha,
        };
        let strata = vec![0usize; values.len()];
        quantile::stratified_quantile(&values, &weights, &strata, q)
            .get(&0)
            .copied()
            .unwrap_or(0.0)
    } else if distribution.needs_huber_fit() {
        let strata = vec![0usize; values.len()];
        quantile::weighted_median(&values, &weights, &strata)
            .get(&0)
            .copied()
            .unwrap_or(0.0)
    } else {
        let total_w: f64 = weights.iter().sum();
        let mean_y: f64 = values.iter().zip(&weights).map(|(y, w)| y * w).sum::<f64>() / total_w;
        distribution.link(mean_y)
    };
    vec![init]
}

/// True when at least one active row belongs to class `k` — a degenerate
/// class with zero representation this round grows no tree (its leaf would
/// fit nothing but noise), per `spec.md` §4.1's per-class iteration note.
fn class_has_signal(frame: &ChunkedFrame, k: usize, num_classes: usize) -> bool {
    if num_classes <= 1 {
        return true;
    }
    (0..frame.num_rows()).any(|row| {
        let w = frame.weight_for_row(row);
        let y = frame.response_value(row);
        w > 0.0 && !y.is_nan() && y.round() as i64 == k as i64
    })
}

/// Truncates a log-space link prediction to a safe range before
/// `link_inv`'s exponentiation (`spec.md` §4.1 step 6): `exp(20)` already
/// overflows a fitted rate variable long before `f64::MAX`, so predictions
/// are clamped well inside it.
fn clamp_log_space(frame: &mut ChunkedFrame, k: usize, distribution: Distribution) {
    if !distribution.truncate_log_space() {
        return;
    }
    const LOG_SPACE_BOUND: f64 = 19.0;
    let tree = frame.tree_mut(k);
    for row in 0..tree.size() {
        let v = tree.get(row);
        if v > LOG_SPACE_BOUND {
            tree.set(row, LOG_SPACE_BOUND);
        } else if v < -LOG_SPACE_BOUND {
            tree.set(row, -LOG_SPACE_BOUND);
        }
    }
}

fn grow_tree(
    frame: &mut ChunkedFrame,
    k: usize,
    round: usize,
    config: &GbmConfig,
    binning: &dyn Binning,
    termination: &TerminationFlag,
) -> GbmResult<DTree> {
    let mut tree = DTree::with_root(Vec::new());
    let tree_columns = sampler::sample_tree_columns(
        frame.num_features(),
        config.col_sample_rate_per_tree,
        round,
        k,
        config.seed,
    );

    for depth in 0..config.max_depth {
        let layer = tree.undecided_in_range(0);
        if layer.is_empty() {
            break;
        }
        let nbins = config.nbins_for_depth(depth);
        histogram_builder::build_layer(
            frame,
            &mut tree,
            &layer,
            k,
            &tree_columns,
            config.col_sample_rate,
            round,
            config.seed,
            binning,
            nbins,
            config.shared_histo,
            termination,
        )?;

        let params = SplitParams {
            min_rows: config.min_rows,
            min_split_improvement: config.min_split_improvement,
        };
        split::split_layer(&mut tree, frame, &layer, k, params);
    }

    for nid in tree.undecided_in_range(0) {
        tree.make_leaf(nid);
    }

    Ok(tree)
}

/// Fits `config.ntrees` rounds of boosting over `frame`, returning the
/// trained ensemble. `frame`'s scratch columns (`TREE`/`WORK`/`NIDS`) are
/// mutated in place over the course of training.
///
/// Every round's histogram build, split search, leaf fit and ensemble update
/// runs on a dedicated Rayon pool sized by `config.concurrency`, so callers
/// embedding this crate alongside other Rayon consumers don't contend with
/// the process-wide global pool.
pub fn train(
    frame: &mut ChunkedFrame,
    config: &GbmConfig,
    binning: &dyn Binning,
    termination: &TerminationFlag,
) -> GbmResult<TrainedModel> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency)
        .build()
        .expect("failed to size the training thread pool");
    pool.install(|| train_on_current_pool(frame, config, binning, termination))
}

fn train_on_current_pool(
    frame: &mut ChunkedFrame,
    config: &GbmConfig,
    binning: &dyn Binning,
    termination: &TerminationFlag,
) -> GbmResult<TrainedModel> {
    let distribution = config.distribution();
    let num_classes = distribution.num_classes(frame.num_classes());
    let init_f = compute_init_f(frame, distribution, num_classes);

    let mut trees: Vec<Vec<DTree>> = Vec::with_capacity(config.ntrees);
    let mut effective_learn_rates = Vec::with_capacity(config.ntrees);

    for round in 1..=config.ntrees {
        if !termination.running() {
            return Err(crate::errors::GbmError::Terminated(
                crate::termination::TerminatedException,
            ));
        }
        if config.has_converged(round) {
            info!("boosting converged at round {round}, stopping early");
            break;
        }
        let learn_rate = config.effective_learn_rate(round);

        for k in 0..num_classes {
            let rate = config
                .sample_rate_per_class
                .as_ref()
                .and_then(|rates| rates.get(k))
                .copied()
                .unwrap_or(config.sample_rate);
            sampler::mark_oob(frame, k, round, config.seed, rate);
        }

        let residual_summary =
            crate::gbm::residual::compute_residuals(frame, distribution, &init_f, num_classes);

        let mut round_trees = Vec::with_capacity(num_classes);
        for k in 0..num_classes {
            if !class_has_signal(frame, k, num_classes) {
                debug!("round {round} class {k} has no active rows, skipping tree growth");
                round_trees.push(DTree::new());
                continue;
            }

            let mut tree = grow_tree(frame, k, round, config, binning, termination)?;
            gamma::fit_leaves(
                frame,
                &mut tree,
                k,
                distribution,
                init_f[k],
                num_classes,
                residual_summary.huber_delta,
                config.max_abs_leafnode_pred,
            );
            ensemble::update_ensemble(
                frame,
                &tree,
                k,
                learn_rate,
                config.pred_noise_bandwidth,
                config.seed,
                round,
            );
            clamp_log_space(frame, k, distribution);
            round_trees.push(tree);
        }

        let tree_sizes: Vec<usize> = round_trees.iter().map(DTree::len).collect();
        info!("round {round}/{} done, learn_rate={learn_rate:.6}, tree sizes={tree_sizes:?}", config.ntrees);

        frame.reset_nids_to_fresh();
        trees.push(round_trees);
        effective_learn_rates.push(learn_rate);
    }

    info!("training finished after {} rounds", trees.len());

    Ok(TrainedModel {
        trees,
        effective_learn_rates,
        init_f,
        distribution,
        num_classes,
    })
}
