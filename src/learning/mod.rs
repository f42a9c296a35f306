//Mlnpll
//Copyright (C) 2022-2023 A. Dubray
//
//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.
//
//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.
//
//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;

use crate::common::Regularization;
use sampler::SampleSize;

pub mod counts;
pub mod undo;
pub mod cache;
pub mod sampler;
pub mod pll;
mod evaluator;
pub mod lbfgs;
pub mod owlqn;
pub mod learner;
pub mod logger;
pub mod utils;

/// Configuration of the pseudo-log-likelihood
#[derive(Debug, Clone)]
pub struct PllParameters {
    /// For each predicate, whether its ground atoms contribute to the objective. Every predicate
    /// contributes if not given
    pub non_evidence: Option<Vec<bool>>,
    /// Normalizes the contribution of each predicate by its number of true and false atoms
    pub weight_by_predicate: bool,
    /// If given, the ground atoms of each predicate are sampled at construction
    pub sampling: Option<SampleSize>,
    /// Seed of the random number generator used for sampling
    pub seed: u64,
}

impl Default for PllParameters {
    fn default() -> Self {
        Self {
            non_evidence: None,
            weight_by_predicate: false,
            sampling: None,
            seed: crate::common::DEFAULT_SEED,
        }
    }
}

/// Gaussian prior on each clause weight
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianPrior {
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl GaussianPrior {
    /// Same prior for the `n` weights
    pub fn uniform(n: usize, mean: f64, std_dev: f64) -> Self {
        Self {
            means: vec![mean; n],
            std_devs: vec![std_dev; n],
        }
    }
}

/// Configuration of the weight learner
#[derive(Debug, Clone)]
pub struct LearnParameters {
    /// L2 adds a Gaussian prior to the objective, L1 minimizes with orthant-wise steps
    pub regularization: Regularization,
    /// Coefficient of the L1 norm
    pub l1_coefficient: f64,
    /// Mean of the Gaussian prior
    pub prior_mean: f64,
    /// Standard deviation of the Gaussian prior
    pub prior_std_dev: f64,
    /// Multiplies the prior of each clause by its number of groundings
    pub scale_prior_by_groundings: bool,
    /// Maximum number of iterations of the optimizer, 0 for no limit
    pub max_iterations: usize,
    /// Convergence tolerance on the norm of the gradient
    pub epsilon: f64,
    /// Number of corrections kept by the optimizer
    pub memory: usize,
    /// Folder of the CSV trace of the optimizer, if any
    pub outfolder: Option<PathBuf>,
}

impl Default for LearnParameters {
    fn default() -> Self {
        Self {
            regularization: Regularization::L2,
            l1_coefficient: 1.0,
            prior_mean: 0.0,
            prior_std_dev: 100.0,
            scale_prior_by_groundings: false,
            max_iterations: 10000,
            epsilon: 1e-5,
            memory: 6,
            outfolder: None,
        }
    }
}
