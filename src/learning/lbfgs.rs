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

//! Limited-memory quasi-Newton minimization (L-BFGS).
//!
//! The search direction is computed with the two-loop recursion over the last `m` corrections.
//! The step length is found by backtracking, accepting a step satisfying the sufficient decrease
//! (Armijo) condition and the weak Wolfe curvature condition.
//!
//! When `orthantwise_c` is positive, the objective is f(x) + c * |x|_1 and the minimization follows
//! the orthant-wise method (OWL-QN): the pseudo-gradient replaces the gradient, the direction is
//! restricted to the orthant of the pseudo-gradient, and each trial point is projected on the
//! orthant of the current point. The L1 term only covers the variables in
//! `orthantwise_start..orthantwise_end`.

use std::collections::VecDeque;
use std::fmt;

use nalgebra::DVector;

use crate::errors::Result;
use crate::log::targets;

/// A function to minimize
pub trait Objective {
    /// Returns the value of the function at `x` and writes its gradient in `gradient`
    fn evaluate(&mut self, x: &[f64], gradient: &mut [f64], step: f64) -> Result<f64>;

    /// Called after each iteration. Returning false stops the minimization
    fn progress(&mut self, _report: &Progress) -> bool {
        true
    }
}

/// State of the minimization after an iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub iteration: usize,
    pub value: f64,
    pub xnorm: f64,
    pub gnorm: f64,
    pub step: f64,
    /// Number of evaluations done by the line search of the iteration
    pub evaluations: usize,
}

#[derive(Debug, Clone)]
pub struct LbfgsParameters {
    /// Number of corrections kept to approximate the inverse Hessian
    pub m: usize,
    /// Convergence is reached when |g| / max(1, |x|) < epsilon
    pub epsilon: f64,
    /// Maximum number of iterations, 0 for no limit
    pub max_iterations: usize,
    pub max_linesearch: usize,
    pub min_step: f64,
    pub max_step: f64,
    /// Sufficient decrease parameter of the line search
    pub ftol: f64,
    /// Curvature parameter of the line search
    pub gtol: f64,
    /// Machine precision for the step length
    pub xtol: f64,
    /// Coefficient of the L1 norm, 0 for plain L-BFGS
    pub orthantwise_c: f64,
    pub orthantwise_start: usize,
    /// End (excluded) of the L1 range, every variable if None
    pub orthantwise_end: Option<usize>,
}

impl Default for LbfgsParameters {
    fn default() -> Self {
        Self {
            m: 6,
            epsilon: 1e-5,
            max_iterations: 0,
            max_linesearch: 20,
            min_step: 1e-20,
            max_step: 1e20,
            ftol: 1e-4,
            gtol: 0.9,
            xtol: 1e-16,
            orthantwise_c: 0.0,
            orthantwise_start: 0,
            orthantwise_end: None,
        }
    }
}

/// Outcome of a minimization. Only `Success` and `AlreadyMinimized` denote convergence, the other
/// statuses are reported to the caller which decides what to do with the last point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LbfgsStatus {
    Success,
    AlreadyMinimized,
    Canceled,
    OutOfMemory,
    InvalidParameters,
    InvalidN,
    InvalidEpsilon,
    InvalidMinStep,
    InvalidMaxStep,
    InvalidFtol,
    InvalidGtol,
    InvalidXtol,
    InvalidMaxLineSearch,
    InvalidOrthantwise,
    InvalidOrthantwiseStart,
    MinimumStep,
    MaximumStep,
    MaximumLineSearch,
    MaximumIteration,
    IncreaseGradient,
}

impl LbfgsStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, LbfgsStatus::Success | LbfgsStatus::AlreadyMinimized)
    }
}

impl fmt::Display for LbfgsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LbfgsStatus::Success => "SUCCESS",
            LbfgsStatus::AlreadyMinimized => "ALREADY_MINIMIZED",
            LbfgsStatus::Canceled => "CANCELED",
            LbfgsStatus::OutOfMemory => "OUTOFMEMORY",
            LbfgsStatus::InvalidParameters => "INVALIDPARAMETERS",
            LbfgsStatus::InvalidN => "INVALID_N",
            LbfgsStatus::InvalidEpsilon => "INVALID_EPSILON",
            LbfgsStatus::InvalidMinStep => "INVALID_MINSTEP",
            LbfgsStatus::InvalidMaxStep => "INVALID_MAXSTEP",
            LbfgsStatus::InvalidFtol => "INVALID_FTOL",
            LbfgsStatus::InvalidGtol => "INVALID_GTOL",
            LbfgsStatus::InvalidXtol => "INVALID_XTOL",
            LbfgsStatus::InvalidMaxLineSearch => "INVALID_MAXLINESEARCH",
            LbfgsStatus::InvalidOrthantwise => "INVALID_ORTHANTWISE",
            LbfgsStatus::InvalidOrthantwiseStart => "INVALID_ORTHANTWISE_START",
            LbfgsStatus::MinimumStep => "MINIMUMSTEP",
            LbfgsStatus::MaximumStep => "MAXIMUMSTEP",
            LbfgsStatus::MaximumLineSearch => "MAXIMUMLINESEARCH",
            LbfgsStatus::MaximumIteration => "MAXIMUMITERATION",
            LbfgsStatus::IncreaseGradient => "INCREASEGRADIENT",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsOutcome {
    pub status: LbfgsStatus,
    /// Value of the objective (with the L1 term) at the returned point. NaN if the parameters
    /// were rejected before any evaluation
    pub value: f64,
    pub iterations: usize,
}

/// One correction pair of the inverse Hessian approximation
struct Correction {
    s: DVector<f64>,
    y: DVector<f64>,
    ys: f64,
}

/// Point of the line search and the objective at that point
struct Iterate {
    x: DVector<f64>,
    g: DVector<f64>,
    fx: f64,
}

const DEC: f64 = 0.5;
const INC: f64 = 2.1;

pub struct Lbfgs {
    parameters: LbfgsParameters,
}

impl Lbfgs {

    pub fn new(parameters: LbfgsParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &LbfgsParameters {
        &self.parameters
    }

    fn orthantwise_end(&self, n: usize) -> usize {
        self.parameters.orthantwise_end.unwrap_or(n)
    }

    fn is_orthantwise(&self) -> bool {
        self.parameters.orthantwise_c != 0.0
    }

    fn validate(&self, n: usize) -> Option<LbfgsStatus> {
        let p = &self.parameters;
        if n == 0 {
            return Some(LbfgsStatus::InvalidN);
        }
        if p.m == 0 {
            return Some(LbfgsStatus::InvalidParameters);
        }
        if p.epsilon < 0.0 {
            return Some(LbfgsStatus::InvalidEpsilon);
        }
        if p.min_step < 0.0 {
            return Some(LbfgsStatus::InvalidMinStep);
        }
        if p.max_step < p.min_step {
            return Some(LbfgsStatus::InvalidMaxStep);
        }
        if p.ftol < 0.0 {
            return Some(LbfgsStatus::InvalidFtol);
        }
        if p.gtol < 0.0 || (!self.is_orthantwise() && p.gtol <= p.ftol) {
            return Some(LbfgsStatus::InvalidGtol);
        }
        if p.xtol < 0.0 {
            return Some(LbfgsStatus::InvalidXtol);
        }
        if p.max_linesearch == 0 {
            return Some(LbfgsStatus::InvalidMaxLineSearch);
        }
        if p.orthantwise_c < 0.0 {
            return Some(LbfgsStatus::InvalidOrthantwise);
        }
        if p.orthantwise_start >= self.orthantwise_end(n) || self.orthantwise_end(n) > n {
            return Some(LbfgsStatus::InvalidOrthantwiseStart);
        }
        None
    }

    fn l1_norm(&self, x: &DVector<f64>) -> f64 {
        (self.parameters.orthantwise_start..self.orthantwise_end(x.len())).map(|i| x[i].abs()).sum()
    }

    /// Sub-gradient of f(x) + c * |x|_1 with the smallest norm
    fn pseudo_gradient(&self, x: &DVector<f64>, g: &DVector<f64>) -> DVector<f64> {
        let c = self.parameters.orthantwise_c;
        let mut pg = g.clone();
        for i in self.parameters.orthantwise_start..self.orthantwise_end(x.len()) {
            pg[i] = if x[i] < 0.0 {
                g[i] - c
            } else if x[i] > 0.0 {
                g[i] + c
            } else if g[i] < -c {
                g[i] + c
            } else if g[i] > c {
                g[i] - c
            } else {
                0.0
            };
        }
        pg
    }

    fn evaluate<O: Objective>(&self, objective: &mut O, x: &DVector<f64>, g: &mut DVector<f64>, step: f64) -> Result<f64> {
        let fx = objective.evaluate(x.as_slice(), g.as_mut_slice(), step)?;
        if self.is_orthantwise() {
            Ok(fx + self.parameters.orthantwise_c * self.l1_norm(x))
        } else {
            Ok(fx)
        }
    }

    /// Minimizes the objective starting from `x`. On return, `x` holds the best point found.
    /// Errors of the objective are propagated, failures of the minimization are reported in the
    /// status of the outcome.
    pub fn minimize<O: Objective>(&self, x: &mut [f64], objective: &mut O) -> Result<LbfgsOutcome> {
        let n = x.len();
        if let Some(status) = self.validate(n) {
            log::warn!(target: targets::OPTIMIZER, "Invalid parameters: {}", status);
            return Ok(LbfgsOutcome { status, value: f64::NAN, iterations: 0 });
        }
        let p = &self.parameters;
        let mut history: VecDeque<Correction> = VecDeque::new();
        if history.try_reserve(p.m).is_err() {
            return Ok(LbfgsOutcome { status: LbfgsStatus::OutOfMemory, value: f64::NAN, iterations: 0 });
        }

        let mut current = Iterate { x: DVector::from_column_slice(x), g: DVector::zeros(n), fx: 0.0 };
        current.fx = self.evaluate(objective, &current.x, &mut current.g, 0.0)?;
        let mut pg = if self.is_orthantwise() { self.pseudo_gradient(&current.x, &current.g) } else { current.g.clone() };

        let xnorm = current.x.norm().max(1.0);
        if pg.norm() / xnorm <= p.epsilon {
            return Ok(LbfgsOutcome { status: LbfgsStatus::AlreadyMinimized, value: current.fx, iterations: 0 });
        }

        let mut d = -&pg;
        let mut step = 1.0 / d.norm();
        let mut k = 1;
        loop {
            let previous = Iterate { x: current.x.clone(), g: current.g.clone(), fx: current.fx };
            let search = if self.is_orthantwise() {
                self.backtracking_owlqn(objective, &mut current, &d, &mut step, &previous, &pg)?
            } else {
                self.backtracking(objective, &mut current, &d, &mut step, &previous)?
            };
            let evaluations = match search {
                Ok(evaluations) => evaluations,
                Err(status) => {
                    // Back to the last point accepted
                    x.copy_from_slice(previous.x.as_slice());
                    log::debug!(target: targets::OPTIMIZER, "Line search stopped at iteration {}: {}", k, status);
                    return Ok(LbfgsOutcome { status, value: previous.fx, iterations: k - 1 });
                },
            };
            pg = if self.is_orthantwise() { self.pseudo_gradient(&current.x, &current.g) } else { current.g.clone() };
            x.copy_from_slice(current.x.as_slice());

            let xnorm = current.x.norm();
            let gnorm = pg.norm();
            let report = Progress { iteration: k, value: current.fx, xnorm, gnorm, step, evaluations };
            log::trace!(target: targets::OPTIMIZER, "Iteration {}: f = {} |x| = {} |g| = {} step = {}", k, current.fx, xnorm, gnorm, step);
            if !objective.progress(&report) {
                return Ok(LbfgsOutcome { status: LbfgsStatus::Canceled, value: current.fx, iterations: k });
            }
            if gnorm / xnorm.max(1.0) <= p.epsilon {
                return Ok(LbfgsOutcome { status: LbfgsStatus::Success, value: current.fx, iterations: k });
            }
            if p.max_iterations != 0 && k >= p.max_iterations {
                return Ok(LbfgsOutcome { status: LbfgsStatus::MaximumIteration, value: current.fx, iterations: k });
            }

            let s = &current.x - &previous.x;
            let y = &current.g - &previous.g;
            let ys = y.dot(&s);
            let yy = y.dot(&y);
            if ys > 0.0 {
                if history.len() == p.m {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, ys });
            }

            // Two-loop recursion
            d = -&pg;
            let mut alphas = Vec::with_capacity(history.len());
            for correction in history.iter().rev() {
                let alpha = correction.s.dot(&d) / correction.ys;
                d.axpy(-alpha, &correction.y, 1.0);
                alphas.push(alpha);
            }
            if let Some(last) = history.back() {
                let yy = if ys > 0.0 { yy } else { last.y.dot(&last.y) };
                d *= last.ys / yy;
            }
            for (correction, alpha) in history.iter().zip(alphas.iter().rev()) {
                let beta = correction.y.dot(&d) / correction.ys;
                d.axpy(alpha - beta, &correction.s, 1.0);
            }
            if self.is_orthantwise() {
                for i in p.orthantwise_start..self.orthantwise_end(n) {
                    if d[i] * pg[i] >= 0.0 {
                        d[i] = 0.0;
                    }
                }
            }
            step = 1.0;
            k += 1;
        }
    }

    /// Backtracking line search with the Armijo and weak Wolfe conditions. Returns the number of
    /// evaluations, or the status explaining why no step was accepted.
    fn backtracking<O: Objective>(&self, objective: &mut O, current: &mut Iterate, d: &DVector<f64>, step: &mut f64, previous: &Iterate) -> Result<std::result::Result<usize, LbfgsStatus>> {
        let p = &self.parameters;
        if *step <= 0.0 {
            return Ok(Err(LbfgsStatus::InvalidParameters));
        }
        let dginit = previous.g.dot(d);
        if dginit > 0.0 {
            return Ok(Err(LbfgsStatus::IncreaseGradient));
        }
        let dgtest = p.ftol * dginit;
        let mut count = 0;
        loop {
            current.x = &previous.x + d * *step;
            current.fx = self.evaluate(objective, &current.x, &mut current.g, *step)?;
            count += 1;
            let width = if current.fx > previous.fx + *step * dgtest {
                DEC
            } else if current.g.dot(d) < p.gtol * dginit {
                INC
            } else {
                return Ok(Ok(count));
            };
            if *step < p.min_step {
                return Ok(Err(LbfgsStatus::MinimumStep));
            }
            if *step > p.max_step {
                return Ok(Err(LbfgsStatus::MaximumStep));
            }
            if count >= p.max_linesearch {
                return Ok(Err(LbfgsStatus::MaximumLineSearch));
            }
            *step *= width;
        }
    }

    /// Backtracking line search of the orthant-wise method. Trial points are projected on the
    /// orthant of the previous point and only the sufficient decrease condition is checked.
    fn backtracking_owlqn<O: Objective>(&self, objective: &mut O, current: &mut Iterate, d: &DVector<f64>, step: &mut f64, previous: &Iterate, pg: &DVector<f64>) -> Result<std::result::Result<usize, LbfgsStatus>> {
        let p = &self.parameters;
        if *step <= 0.0 {
            return Ok(Err(LbfgsStatus::InvalidParameters));
        }
        let start = p.orthantwise_start;
        let end = self.orthantwise_end(previous.x.len());
        // Orthant in which the trial points must stay
        let orthant: Vec<f64> = (start..end).map(|i| if previous.x[i] == 0.0 { -pg[i] } else { previous.x[i] }).collect();
        let mut count = 0;
        loop {
            current.x = &previous.x + d * *step;
            for i in start..end {
                if current.x[i] * orthant[i - start] <= 0.0 {
                    current.x[i] = 0.0;
                }
            }
            current.fx = self.evaluate(objective, &current.x, &mut current.g, *step)?;
            count += 1;
            let dgtest = (&current.x - &previous.x).dot(pg);
            if current.fx <= previous.fx + p.ftol * dgtest {
                return Ok(Ok(count));
            }
            if *step < p.min_step {
                return Ok(Err(LbfgsStatus::MinimumStep));
            }
            if *step > p.max_step {
                return Ok(Err(LbfgsStatus::MaximumStep));
            }
            if count >= p.max_linesearch {
                return Ok(Err(LbfgsStatus::MaximumLineSearch));
            }
            *step *= DEC;
        }
    }
}
