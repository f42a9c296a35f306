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

//! Errors raised by the engine. Every variant except `Parse` and `Io` denotes a caller bug or a
//! corrupted objective; they are returned to the caller instead of aborting the process so that
//! embedding code (tests, long-running drivers) can report them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A schema or contract violation (arity, argument type, truth value, ...)
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Two entries of the same sufficient-statistic list reference the same clause
    #[error("Repeated clause index {clause} in domain {domain}, predicate {predicate}, grounding {grounding}, combination {combination}")]
    RepeatedIndex {
        domain: usize,
        predicate: String,
        grounding: usize,
        combination: usize,
        clause: usize,
    },

    /// NaN or infinity showed up in the value or the gradient
    #[error("Numerical corruption in domain {domain}, predicate {predicate}: {what} = {value}")]
    Numerical {
        domain: usize,
        predicate: String,
        what: String,
        value: f64,
    },

    /// The clauses of the databases do not share the same indexes
    #[error("Clause indexes must line up across databases")]
    MisalignedClauses,

    /// A clause index stored in the statistics has no matching weight
    #[error("Clause index {clause} is out of range for {size} weights")]
    ClauseOutOfRange { clause: usize, size: usize },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
