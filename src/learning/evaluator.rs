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

//! Evaluation of the negated pseudo-log-likelihood and of its gradient from the sufficient
//! statistics.
//!
//! For a ground atom and one of its combinations, let wdotn be the sum of w_i * n_i over the entries
//! of the list, n_i being the change in satisfied groundings of clause i when the atom is flipped.
//! The log-probability of the atom keeping its value is log(1 / (1 + e^wdotn)) and its derivative
//! with respect to w_i is (P - 1) * n_i. The objective is the negated sum of these terms over every
//! non-evidence ground atom and combination, plus the Gaussian prior if enabled.

use std::f64::consts::LN_2;

use super::counts::PredicateCounts;
use super::pll::PseudoLogLikelihood;
use super::sampler::SampledGroundings;
use super::utils::log_probability;
use crate::core::domain::{Domain, DomainIndex, PredicateIndex};
use crate::errors::{Error, Result};
use crate::log::targets;

/// Adds the log-probability of every combination of the grounding to `pll`, and its derivative
/// to `gradient`. A grounding never visited has no clause and contributes log(1/2) for each of
/// its combinations.
fn grounding_pll(world: &Domain, predicate: PredicateIndex, counts: &PredicateCounts, grounding: usize, weights: &[f64], pll: &mut f64, gradient: &mut [f64]) -> Result<()> {
    let combinations = counts.combinations(grounding);
    if combinations.is_empty() {
        *pll -= LN_2 * world.number_combinations(predicate, grounding) as f64;
        return Ok(());
    }
    for list in combinations.iter() {
        let mut wdotn = 0.0;
        for entry in list.iter() {
            match weights.get(entry.clause.0) {
                Some(weight) => wdotn += weight * entry.count,
                None => return Err(Error::ClauseOutOfRange { clause: entry.clause.0, size: weights.len() }),
            }
        }
        let log_p = log_probability(wdotn);
        *pll += log_p;
        let factor = log_p.exp() - 1.0;
        for entry in list.iter() {
            gradient[entry.clause.0] += factor * entry.count;
        }
    }
    Ok(())
}

/// Same as `grounding_pll` over a sample of the ground atoms, reweighted by the inverse of the
/// sampling rate. `gradient` must be zero on entry.
fn sampled_pll(world: &Domain, predicate: PredicateIndex, counts: &PredicateCounts, groundings: &[usize], total: usize, weights: &[f64], gradient: &mut [f64]) -> Result<f64> {
    if groundings.is_empty() {
        return Ok(0.0);
    }
    let mut pll = 0.0;
    for grounding in groundings.iter().copied() {
        grounding_pll(world, predicate, counts, grounding, weights, &mut pll, gradient)?;
    }
    let scale = total as f64 / groundings.len() as f64;
    for g in gradient.iter_mut() {
        *g *= scale;
    }
    Ok(pll * scale)
}

impl<'a, const S: bool> PseudoLogLikelihood<'a, S> {

    /// Returns the negated pseudo-log-likelihood for the weights and writes its gradient in
    /// `gradient`
    pub fn value_and_gradient(&mut self, weights: &[f64], gradient: &mut [f64]) -> Result<f64> {
        if gradient.len() != weights.len() {
            return Err(Error::Contract(format!("gradient of size {} for {} weights", gradient.len(), weights.len())));
        }
        self.statistics.evaluation();
        gradient.fill(0.0);
        let mut value = 0.0;
        for d in 0..self.domains.len() {
            self.value_and_gradient_for_domain(DomainIndex(d), weights, &mut value, gradient)?;
        }
        if let Some(prior) = &self.prior {
            if prior.means.len() < weights.len() {
                return Err(Error::Contract(format!("prior given for {} weights instead of {}", prior.means.len(), weights.len())));
            }
            for (i, weight) in weights.iter().enumerate() {
                let n = self.clause_groundings.as_ref().and_then(|c| c.get(i).copied()).unwrap_or(1.0);
                let deviation = weight - prior.means[i];
                let variance = prior.std_devs[i] * prior.std_devs[i];
                value += n * deviation * deviation / (2.0 * variance);
                gradient[i] += n * deviation / variance;
            }
            check_numerical(None, "prior", value, gradient)?;
        }
        log::trace!(target: targets::EVALUATION, "value {} gradient {:?}", value, gradient);
        Ok(value)
    }

    fn sampled_if_enabled(&self, domain: DomainIndex, predicate: PredicateIndex) -> Option<&SampledGroundings> {
        if self.sample_ground_atoms {
            self.sampled_groundings(domain, predicate)
        } else {
            None
        }
    }

    fn value_and_gradient_for_domain(&self, domain: DomainIndex, weights: &[f64], value: &mut f64, gradient: &mut [f64]) -> Result<()> {
        let world = &self.domains[domain.0];
        let mut gradient_true = vec![0.0; weights.len()];
        let mut gradient_false = vec![0.0; weights.len()];
        for predicate in world.predicates_iter() {
            if !self.non_evidence[predicate.0] {
                continue;
            }
            let number_true = self.number_true[domain.0][predicate.0];
            let number_false = self.number_false[domain.0][predicate.0];
            let mut pll_true = 0.0;
            let mut pll_false = 0.0;
            gradient_true.fill(0.0);
            gradient_false.fill(0.0);
            match self.counts.predicate(domain, predicate) {
                None => {
                    // No clause touches the predicate, every term has probability 1/2
                    pll_true = -LN_2 * self.terms_true[domain.0][predicate.0];
                    pll_false = -LN_2 * self.terms_false[domain.0][predicate.0];
                },
                Some(counts) => match self.sampled_if_enabled(domain, predicate) {
                    Some(sampled) => {
                        pll_true = sampled_pll(world, predicate, counts, sampled.true_groundings(), sampled.total_true(), weights, &mut gradient_true)?;
                        pll_false = sampled_pll(world, predicate, counts, sampled.false_groundings(), sampled.total_false(), weights, &mut gradient_false)?;
                    },
                    None => {
                        for grounding in 0..counts.number_groundings() {
                            let truth = counts.truth_value(grounding).unwrap_or_else(|| world.truth_value(predicate, grounding));
                            if truth {
                                grounding_pll(world, predicate, counts, grounding, weights, &mut pll_true, &mut gradient_true)?;
                            } else {
                                grounding_pll(world, predicate, counts, grounding, weights, &mut pll_false, &mut gradient_false)?;
                            }
                        }
                    },
                },
            }
            if self.weight_by_predicate {
                let scale = if self.total_groundings > 0.0 { self.domain_groundings[domain.0] / self.total_groundings } else { 0.0 };
                let weight_true = if number_true > 0.0 { 1.0 / number_true } else { 0.0 };
                let weight_false = if number_false > 0.0 { 1.0 / number_false } else { 0.0 };
                *value -= (pll_true * weight_true + pll_false * weight_false) * scale;
                for (i, g) in gradient.iter_mut().enumerate() {
                    *g -= (gradient_true[i] * weight_true + gradient_false[i] * weight_false) * scale;
                }
            } else {
                *value -= pll_true + pll_false;
                for (i, g) in gradient.iter_mut().enumerate() {
                    *g -= gradient_true[i] + gradient_false[i];
                }
            }
            check_numerical(Some(domain), world[predicate].name(), *value, gradient)?;
        }
        Ok(())
    }

    /// Returns, for each ground atom of the predicate, the probability that it is true given the
    /// other atoms of the domain
    pub fn ground_atom_probabilities(&self, weights: &[f64], domain: DomainIndex, predicate: PredicateIndex) -> Result<Vec<f64>> {
        let world = &self.domains[domain.0];
        let counts = self.counts.predicate(domain, predicate);
        let mut probabilities = Vec::with_capacity(world.number_groundings(predicate));
        if world[predicate].block_argument().is_some() {
            return Err(Error::Contract(format!("{} is blocked, its atoms have no independent probability", world[predicate].name())));
        }
        for grounding in 0..world.number_groundings(predicate) {
            let combinations = counts.map(|c| c.combinations(grounding)).unwrap_or(&[]);
            let mut wdotn = 0.0;
            if let Some(list) = combinations.first() {
                for entry in list.iter() {
                    match weights.get(entry.clause.0) {
                        Some(weight) => wdotn += weight * entry.count,
                        None => return Err(Error::ClauseOutOfRange { clause: entry.clause.0, size: weights.len() }),
                    }
                }
            }
            let keep = log_probability(wdotn).exp();
            let probability = if world.truth_value(predicate, grounding) { keep } else { 1.0 - keep };
            if !(0.0..=1.0).contains(&probability) {
                return Err(Error::Numerical { domain: domain.0, predicate: world[predicate].name().to_string(), what: format!("probability of grounding {}", grounding), value: probability });
            }
            probabilities.push(probability);
        }
        Ok(probabilities)
    }
}

/// Fails if the value or an entry of the gradient is NaN or infinite
fn check_numerical(domain: Option<DomainIndex>, predicate: &str, value: f64, gradient: &[f64]) -> Result<()> {
    let domain = domain.map(|d| d.0).unwrap_or(usize::MAX);
    if !value.is_finite() {
        log::error!(target: targets::EVALUATION, "Value is {} after predicate {} of domain {}", value, predicate, domain);
        return Err(Error::Numerical { domain, predicate: predicate.to_string(), what: "value".to_string(), value });
    }
    if let Some((i, g)) = gradient.iter().enumerate().find(|(_, g)| !g.is_finite()) {
        log::error!(target: targets::EVALUATION, "Gradient of clause {} is {} after predicate {} of domain {}", i, g, predicate, domain);
        return Err(Error::Numerical { domain, predicate: predicate.to_string(), what: format!("gradient[{}]", i), value: *g });
    }
    Ok(())
}
