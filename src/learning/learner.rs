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

//! Weight learning over a fixed set of clauses, and scoring of candidate clauses.
//!
//! Every clause of the model is inserted once in the statistics of every domain. A candidate
//! clause is scored by inserting it tentatively (the insertion being recorded in an undo log),
//! optimizing the weights with the candidate, and rolling the insertion back. The counts of the
//! candidate are kept in a cache so that accepting it does not ground it a second time.

use super::cache::CountCache;
use super::lbfgs::{LbfgsOutcome, LbfgsStatus};
use super::logger::Logger;
use super::owlqn::OwlQn;
use super::pll::PseudoLogLikelihood;
use super::undo::UndoLog;
use super::{GaussianPrior, LearnParameters, PllParameters};
use crate::common::Regularization;
use crate::core::clause::Clause;
use crate::core::domain::{ClauseIndex, Domain, DomainIndex};
use crate::errors::{Error, Result};
use crate::log::targets;

#[derive(Debug, Clone, PartialEq)]
pub struct LearnOutcome {
    pub weights: Vec<f64>,
    /// Negated pseudo-log-likelihood, with the regularization, at the learned weights
    pub value: f64,
    pub status: LbfgsStatus,
    pub iterations: usize,
}

/// Result of the tentative insertion of a clause
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub value: f64,
    /// Weight learned for the candidate
    pub weight: f64,
    /// Weights of the model clauses followed by the weight of the candidate
    pub weights: Vec<f64>,
    pub status: LbfgsStatus,
    pub cache: CountCache,
}

pub struct WeightLearner<'a, const S: bool = false> {
    domains: &'a [Domain],
    pll: PseudoLogLikelihood<'a, S>,
    clauses: Vec<Clause>,
    weights: Vec<f64>,
    /// Number of groundings of each clause, summed over the domains
    groundings: Vec<f64>,
    parameters: LearnParameters,
    solver: OwlQn,
}

impl<'a, const S: bool> WeightLearner<'a, S> {

    /// Inserts the clauses in every domain. `weights` are the starting weights of the clauses.
    pub fn new(domains: &'a [Domain], clauses: Vec<Clause>, weights: Vec<f64>, pll_parameters: &PllParameters, parameters: LearnParameters) -> Result<Self> {
        if clauses.len() != weights.len() {
            return Err(Error::Contract(format!("{} weights for {} clauses", weights.len(), clauses.len())));
        }
        let mut pll = PseudoLogLikelihood::new(domains, pll_parameters)?;
        let mut groundings = Vec::with_capacity(clauses.len());
        for (i, clause) in clauses.iter().enumerate() {
            for d in 0..domains.len() {
                pll.compute_counts_for_new_clause(clause, ClauseIndex(i), DomainIndex(d), None, None)?;
            }
            groundings.push(Self::clause_groundings(domains, clause)?);
        }
        log::info!(target: targets::LEARNER, "{} clauses inserted in {} domains", clauses.len(), domains.len());
        let solver = OwlQn::from_learn_parameters(&parameters);
        let mut learner = Self { domains, pll, clauses, weights, groundings, parameters, solver };
        learner.configure_prior(None)?;
        Ok(learner)
    }

    fn clause_groundings(domains: &[Domain], clause: &Clause) -> Result<f64> {
        let mut total = 0.0;
        for domain in domains.iter() {
            total += clause.number_groundings(domain)?;
        }
        Ok(total)
    }

    /// Sets the prior of the model clauses, plus the candidate (with its number of groundings)
    /// if given
    fn configure_prior(&mut self, candidate: Option<f64>) -> Result<()> {
        let n = self.clauses.len() + candidate.map(|_| 1).unwrap_or(0);
        match self.parameters.regularization {
            Regularization::L2 => {
                self.pll.set_means_std_devs(Some(GaussianPrior::uniform(n, self.parameters.prior_mean, self.parameters.prior_std_dev)))?;
            },
            Regularization::L1 => self.pll.set_means_std_devs(None)?,
        }
        if self.parameters.scale_prior_by_groundings {
            let mut groundings = self.groundings.clone();
            groundings.extend(candidate);
            self.pll.set_clause_groundings(Some(groundings));
        } else {
            self.pll.set_clause_groundings(None);
        }
        Ok(())
    }

    // --- GETTERS --- //

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn pll(&self) -> &PseudoLogLikelihood<'a, S> {
        &self.pll
    }

    pub fn pll_mut(&mut self) -> &mut PseudoLogLikelihood<'a, S> {
        &mut self.pll
    }

    // --- LEARNING --- //

    /// Optimizes the weights of the clauses. The learned weights are kept whatever the status
    /// of the optimizer.
    pub fn train<const B: bool>(&mut self, logger: &mut Logger<B>) -> Result<LearnOutcome> {
        let mut weights = self.weights.clone();
        let outcome = self.solver.minimize(&mut self.pll, &mut weights, logger)?;
        self.weights = weights;
        log::info!(target: targets::LEARNER, "Learned {} weights ({}), value {}", self.weights.len(), outcome.status, outcome.value);
        Ok(LearnOutcome {
            weights: self.weights.clone(),
            value: outcome.value,
            status: outcome.status,
            iterations: outcome.iterations,
        })
    }

    /// Scores a candidate clause: the clause is inserted, the weights are optimized with the
    /// candidate starting at 0, and the insertion is rolled back. The statistics and the weights
    /// of the model are left unchanged.
    pub fn score_candidate<const B: bool>(&mut self, clause: &Clause, logger: &mut Logger<B>) -> Result<CandidateScore> {
        let index = ClauseIndex(self.clauses.len());
        let mut undo = UndoLog::default();
        let mut cache = CountCache::new(self.domains);
        let mut weights = self.weights.clone();
        weights.push(0.0);
        let result = self.try_candidate(clause, index, &mut weights, &mut undo, &mut cache, logger);
        // The insertion is rolled back even if the evaluation failed
        self.pll.undo_append_remove_counts(&mut undo)?;
        self.configure_prior(None)?;
        let outcome = result?;
        let score = CandidateScore {
            value: outcome.value,
            weight: weights[index.0],
            weights,
            status: outcome.status,
            cache,
        };
        log::debug!(target: targets::LEARNER, "Candidate {}: weight {} value {} ({})", index.0, score.weight, score.value, score.status);
        Ok(score)
    }

    fn try_candidate<const B: bool>(&mut self, clause: &Clause, index: ClauseIndex, weights: &mut [f64], undo: &mut UndoLog, cache: &mut CountCache, logger: &mut Logger<B>) -> Result<LbfgsOutcome> {
        for d in 0..self.domains.len() {
            self.pll.compute_counts_for_new_clause(clause, index, DomainIndex(d), Some(&mut *undo), Some(&mut *cache))?;
        }
        self.configure_prior(Some(Self::clause_groundings(self.domains, clause)?))?;
        self.solver.minimize(&mut self.pll, weights, logger)
    }

    /// Adds a scored candidate to the model, with the weights learned when scoring it. The counts
    /// are taken from the cache of the score.
    pub fn accept_candidate(&mut self, clause: Clause, score: CandidateScore) -> Result<()> {
        let index = ClauseIndex(self.clauses.len());
        if score.weights.len() != self.clauses.len() + 1 {
            return Err(Error::Contract(format!("score with {} weights for {} clauses", score.weights.len(), self.clauses.len() + 1)));
        }
        let indexes = vec![index; self.domains.len()];
        self.pll.insert_counts_in_all_domains(&indexes, &score.cache, None)?;
        self.groundings.push(Self::clause_groundings(self.domains, &clause)?);
        self.clauses.push(clause);
        self.weights = score.weights;
        self.configure_prior(None)?;
        log::info!(target: targets::LEARNER, "Clause {} accepted with weight {}", index.0, self.weights[index.0]);
        Ok(())
    }
}
