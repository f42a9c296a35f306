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

// Re-export the modules
pub mod args;
pub mod common;
pub mod core;
pub mod errors;
pub mod learning;
pub mod log;
pub mod parsers;
mod statistics;

use std::path::PathBuf;

use crate::core::domain::DomainIndex;
use learning::learner::{LearnOutcome, WeightLearner};
use learning::logger::Logger;
use learning::sampler::SampleSize;
use learning::{LearnParameters, PllParameters};
use parsers::{parse_model, ParsedModel};

pub use args::*;
pub use common::*;
pub use errors::{Error, Result};
pub use statistics::Statistics;

use peak_alloc::PeakAlloc;
#[global_allocator]
pub static PEAK_ALLOC: PeakAlloc = PeakAlloc;

pub fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Learn { .. } => learn(args).map(|_| ()),
        Command::Infer { .. } => infer(args).map(|_| ()),
    }
}

/// Returns, for each predicate, whether it is named in `names`. None if no name is given.
fn non_evidence_flags(model: &ParsedModel, names: &[String]) -> Result<Option<Vec<bool>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let mut flags = vec![false; model.predicates.len()];
    for name in names.iter() {
        match model.predicate_index(name) {
            Some(predicate) => flags[predicate.0] = true,
            None => return Err(Error::Contract(format!("unknown non-evidence predicate {}", name))),
        }
    }
    Ok(Some(flags))
}

fn train_model<const S: bool, const B: bool>(model: &ParsedModel, pll_parameters: &PllParameters, parameters: LearnParameters) -> Result<LearnOutcome> {
    let mut logger = Logger::<B>::new(parameters.outfolder.as_deref())?;
    let mut learner = WeightLearner::<S>::new(&model.domains, model.clauses.clone(), model.weights.clone(), pll_parameters, parameters)?;
    let outcome = learner.train(&mut logger)?;
    learner.pll().statistics().print();
    Ok(outcome)
}

/// Learns the weights of the clauses of the model and prints them
pub fn learn(args: Args) -> Result<Vec<f64>> {
    if let Command::Learn { mln,
                    db,
                    regularization,
                    l1,
                    prior_mean,
                    prior_std_dev,
                    scale_prior,
                    max_iterations,
                    epsilon,
                    memory,
                    non_evidence,
                    weight_by_predicate,
                    sample,
                    sample_fraction,
                    min_sample,
                    max_sample,
                    seed,
                    outfolder,
                    do_log,
                    statistics } = args.command {
        let model = parse_model(&mln, &db)?;
        let pll_parameters = PllParameters {
            non_evidence: non_evidence_flags(&model, &non_evidence)?,
            weight_by_predicate,
            sampling: if sample { Some(SampleSize { fraction: sample_fraction, min: min_sample, max: max_sample }) } else { None },
            seed,
        };
        let parameters = LearnParameters {
            regularization,
            l1_coefficient: l1,
            prior_mean,
            prior_std_dev,
            scale_prior_by_groundings: scale_prior,
            max_iterations,
            epsilon,
            memory,
            outfolder: if do_log { outfolder.or_else(|| Some(PathBuf::from("."))) } else { None },
        };
        let outcome = match (statistics, do_log) {
            (true, true) => train_model::<true, true>(&model, &pll_parameters, parameters)?,
            (true, false) => train_model::<true, false>(&model, &pll_parameters, parameters)?,
            (false, true) => train_model::<false, true>(&model, &pll_parameters, parameters)?,
            (false, false) => train_model::<false, false>(&model, &pll_parameters, parameters)?,
        };
        for (clause, weight) in model.clauses.iter().zip(outcome.weights.iter()) {
            println!("{:.6}  {}", weight, model.format_clause(clause));
        }
        println!("// {} after {} iterations, negated pseudo-log-likelihood {:.6}", outcome.status, outcome.iterations, outcome.value);
        ::log::info!(target: crate::log::targets::LEARNER, "Peak memory usage {:.2} MB", PEAK_ALLOC.peak_usage_as_mb());
        Ok(outcome.weights)
    } else {
        Err(Error::Contract("the learn command is expected".to_string()))
    }
}

/// Prints the probability of each ground atom of a predicate given the other atoms, with the
/// weights of the model
pub fn infer(args: Args) -> Result<Vec<f64>> {
    if let Command::Infer { mln, db, predicate } = args.command {
        let model = parse_model(&mln, &[db])?;
        let index = match model.predicate_index(&predicate) {
            Some(index) => index,
            None => return Err(Error::Contract(format!("unknown predicate {}", predicate))),
        };
        let learner = WeightLearner::<false>::new(&model.domains, model.clauses.clone(), model.weights.clone(), &PllParameters::default(), LearnParameters::default())?;
        let probabilities = learner.pll().ground_atom_probabilities(learner.weights(), DomainIndex(0), index)?;
        let domain = &model.domains[0];
        for (grounding, probability) in probabilities.iter().enumerate() {
            let constants = domain.constants_of_grounding(index, grounding);
            println!("{} {:.6}", model.format_atom(index, &constants), probability);
        }
        Ok(probabilities)
    } else {
        Err(Error::Contract("the infer command is expected".to_string()))
    }
}
