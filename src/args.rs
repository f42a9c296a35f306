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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::common::*;

#[derive(Debug, Parser)]
#[clap(name="Mlnpll", version, author, about)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Learns the weights of the clauses of a model
    Learn {
        /// The model (.mln)
        #[clap(long, value_parser)]
        mln: PathBuf,
        /// The databases (.db), one domain each
        #[clap(long, value_parser, num_args=1.., required=true)]
        db: Vec<PathBuf>,
        /// Regularization of the weights
        #[clap(long, value_enum, default_value_t=Regularization::L2)]
        regularization: Regularization,
        /// Coefficient of the L1 norm
        #[clap(long, default_value_t=1.0)]
        l1: f64,
        /// Mean of the Gaussian prior
        #[clap(long, default_value_t=0.0)]
        prior_mean: f64,
        /// Standard deviation of the Gaussian prior
        #[clap(long, default_value_t=100.0)]
        prior_std_dev: f64,
        /// If present, the prior of each clause is multiplied by its number of groundings
        #[clap(long, action)]
        scale_prior: bool,
        /// Maximum number of iterations of the optimizer, 0 for no limit
        #[clap(long, default_value_t=10000)]
        max_iterations: usize,
        /// Convergence tolerance of the optimizer
        #[clap(short, long, default_value_t=1e-5)]
        epsilon: f64,
        /// Number of corrections kept by the optimizer
        #[clap(long, default_value_t=6)]
        memory: usize,
        /// Predicates whose ground atoms are in the objective. Every predicate if absent
        #[clap(long, value_delimiter=',')]
        non_evidence: Vec<String>,
        /// If present, each predicate contributes in proportion to its number of ground atoms
        #[clap(long, action)]
        weight_by_predicate: bool,
        /// If present, only a sample of the ground atoms is used
        #[clap(long, action)]
        sample: bool,
        /// Fraction of the true (and of the false) ground atoms sampled
        #[clap(long, default_value_t=0.5)]
        sample_fraction: f64,
        /// Minimum number of sampled atoms in each partition
        #[clap(long)]
        min_sample: Option<usize>,
        /// Maximum number of sampled atoms in each partition
        #[clap(long)]
        max_sample: Option<usize>,
        /// Seed of the random number generator
        #[clap(long, default_value_t=DEFAULT_SEED)]
        seed: u64,
        /// If present, folder in which to store the trace of the optimizer
        #[clap(long)]
        outfolder: Option<PathBuf>,
        /// If present, write the trace of the optimizer in the output folder
        #[clap(long, action)]
        do_log: bool,
        /// Collect stats on the sufficient statistics
        #[clap(long, action)]
        statistics: bool,
    },
    /// Prints the probability of each ground atom of a predicate given the other atoms
    Infer {
        /// The model (.mln), with its learned weights
        #[clap(long, value_parser)]
        mln: PathBuf,
        /// The database (.db)
        #[clap(long, value_parser)]
        db: PathBuf,
        /// Name of the predicate
        #[clap(long)]
        predicate: String,
    },
}
