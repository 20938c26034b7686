//! Weighted row/column sampling primitives shared by the boosting engine.

mod weighted_uniform_sampler;

pub use weighted_uniform_sampler::WeightedUniformSampler;
