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

//! Minimization of the pseudo-log-likelihood with the quasi-Newton solver.

use super::lbfgs::{Lbfgs, LbfgsOutcome, LbfgsParameters, Objective, Progress};
use super::logger::Logger;
use super::pll::PseudoLogLikelihood;
use super::LearnParameters;
use crate::common::Regularization;
use crate::errors::Result;
use crate::log::targets;

struct PllObjective<'p, 'a, const S: bool, const B: bool> {
    pll: &'p mut PseudoLogLikelihood<'a, S>,
    logger: &'p mut Logger<B>,
    run: usize,
    iterations: usize,
}

impl<'p, 'a, const S: bool, const B: bool> Objective for PllObjective<'p, 'a, S, B> {

    fn evaluate(&mut self, x: &[f64], gradient: &mut [f64], _step: f64) -> Result<f64> {
        self.pll.value_and_gradient(x, gradient)
    }

    fn progress(&mut self, report: &Progress) -> bool {
        self.iterations = report.iteration;
        if let Err(error) = self.logger.log_iteration(self.run, report) {
            log::warn!(target: targets::OPTIMIZER, "Could not write the trace of iteration {}: {}", report.iteration, error);
        }
        true
    }
}

/// Solver configured for the regularization of the weights. With L1, the norm of the weights is
/// added to the objective by the solver itself.
pub struct OwlQn {
    solver: Lbfgs,
    runs: usize,
}

impl OwlQn {

    pub fn new(parameters: LbfgsParameters) -> Self {
        Self { solver: Lbfgs::new(parameters), runs: 0 }
    }

    pub fn from_learn_parameters(parameters: &LearnParameters) -> Self {
        let orthantwise_c = match parameters.regularization {
            Regularization::L1 => parameters.l1_coefficient,
            Regularization::L2 => 0.0,
        };
        Self::new(LbfgsParameters {
            m: parameters.memory,
            epsilon: parameters.epsilon,
            max_iterations: parameters.max_iterations,
            orthantwise_c,
            ..LbfgsParameters::default()
        })
    }

    pub fn parameters(&self) -> &LbfgsParameters {
        self.solver.parameters()
    }

    /// Minimizes the negated pseudo-log-likelihood starting from `weights`, which hold the best
    /// weights found on return. The number of iterations is recorded on the engine.
    pub fn minimize<const S: bool, const B: bool>(&mut self, pll: &mut PseudoLogLikelihood<'_, S>, weights: &mut [f64], logger: &mut Logger<B>) -> Result<LbfgsOutcome> {
        logger.start();
        let run = self.runs;
        self.runs += 1;
        let mut objective = PllObjective { pll: &mut *pll, logger: &mut *logger, run, iterations: 0 };
        let outcome = self.solver.minimize(weights, &mut objective)?;
        let iterations = objective.iterations;
        pll.set_number_steps(iterations);
        if outcome.status.is_success() {
            log::info!(target: targets::OPTIMIZER, "Run {}: {} after {} iterations, value {}", run, outcome.status, iterations, outcome.value);
        } else {
            log::warn!(target: targets::OPTIMIZER, "Run {}: optimizer stopped with {} after {} iterations, value {}", run, outcome.status, iterations, outcome.value);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod test_owlqn {
    use super::*;
    use crate::core::clause::Clause;
    use crate::core::domain::{ClauseIndex, ConstantIndex, Domain, DomainBuilder, DomainIndex, PredicateIndex, TypeIndex};
    use crate::core::literal::{Literal, Term};
    use crate::core::predicate::PredicateTemplate;
    use crate::learning::{GaussianPrior, PllParameters};
    use assert_float_eq::*;

    // P(x) with `true_atoms` true atoms among `size` constants
    fn unary(size: usize, true_atoms: usize) -> Domain {
        let mut builder = DomainBuilder::new(vec![PredicateTemplate::new("P".to_string(), vec![TypeIndex(0)])], 1);
        for c in 0..size {
            builder.add_constant(TypeIndex(0), ConstantIndex(c));
        }
        for c in 0..true_atoms {
            builder.set_true(PredicateIndex(0), vec![ConstantIndex(c)]).unwrap();
        }
        builder.build().unwrap()
    }

    fn unit_clause() -> Clause {
        Clause::new(vec![Literal::new(PredicateIndex(0), true, vec![Term::Variable(0)])])
    }

    #[test]
    pub fn unit_clause_weight_is_the_log_odds() {
        // With a unit clause, the pseudo-likelihood is the likelihood of independent atoms and
        // the optimal weight is log(#true / #false)
        let domains = vec![unary(4, 3)];
        let mut pll = PseudoLogLikelihood::<false>::new(&domains, &PllParameters::default()).unwrap();
        pll.compute_counts_for_new_clause(&unit_clause(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        let mut weights = vec![0.0];
        let mut logger = Logger::<false>::default();
        let mut solver = OwlQn::new(LbfgsParameters { epsilon: 1e-8, ..LbfgsParameters::default() });
        let outcome = solver.minimize(&mut pll, &mut weights, &mut logger).unwrap();
        assert!(outcome.status.is_success());
        assert_float_absolute_eq!(3.0_f64.ln(), weights[0], 1e-4);
        assert_eq!(outcome.iterations, pll.number_steps());
    }

    #[test]
    pub fn prior_pulls_towards_the_mean() {
        let domains = vec![unary(4, 3)];
        let mut pll = PseudoLogLikelihood::<false>::new(&domains, &PllParameters::default()).unwrap();
        pll.compute_counts_for_new_clause(&unit_clause(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        pll.set_means_std_devs(Some(GaussianPrior::uniform(1, 0.0, 0.5))).unwrap();
        let mut weights = vec![0.0];
        let mut solver = OwlQn::new(LbfgsParameters::default());
        solver.minimize(&mut pll, &mut weights, &mut Logger::<false>::default()).unwrap();
        assert!(weights[0] > 0.0);
        assert!(weights[0] < 3.0_f64.ln());
    }

    #[test]
    pub fn strong_l1_zeroes_the_weight() {
        let domains = vec![unary(4, 3)];
        let mut pll = PseudoLogLikelihood::<false>::new(&domains, &PllParameters::default()).unwrap();
        pll.compute_counts_for_new_clause(&unit_clause(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        // The derivative of the objective at 0 is 4 * 1/2 - 3 = -1 in magnitude, below the coefficient
        let parameters = LearnParameters { regularization: Regularization::L1, l1_coefficient: 2.0, ..LearnParameters::default() };
        let mut solver = OwlQn::from_learn_parameters(&parameters);
        let mut weights = vec![0.0];
        let outcome = solver.minimize(&mut pll, &mut weights, &mut Logger::<false>::default()).unwrap();
        assert_eq!(crate::learning::lbfgs::LbfgsStatus::AlreadyMinimized, outcome.status);
        assert_eq!(0.0, weights[0]);
    }
}
