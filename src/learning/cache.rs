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

use crate::core::domain::{Domain, DomainIndex, PredicateIndex};

/// A non-zero count computed for a clause, kept to insert the clause again without grounding it
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CachedCount {
    pub grounding: usize,
    pub combination: usize,
    pub count: f64,
}

/// Counts of one clause, for each domain and predicate, in the order they were computed
#[derive(Debug, Clone, Default)]
pub struct CountCache {
    counts: Vec<Vec<Vec<CachedCount>>>,
}

impl CountCache {

    pub fn new(domains: &[Domain]) -> Self {
        Self {
            counts: domains.iter().map(|d| vec![vec![]; d.number_predicates()]).collect(),
        }
    }

    pub fn record(&mut self, domain: DomainIndex, predicate: PredicateIndex, count: CachedCount) {
        self.counts[domain.0][predicate.0].push(count);
    }

    pub fn number_domains(&self) -> usize {
        self.counts.len()
    }

    /// Iterates over the predicates of a domain with their recorded counts
    pub fn domain_iter(&self, domain: DomainIndex) -> impl Iterator<Item = (PredicateIndex, &[CachedCount])> {
        self.counts[domain.0].iter().enumerate().map(|(p, counts)| (PredicateIndex(p), counts.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().flatten().all(|c| c.is_empty())
    }

    pub fn clear(&mut self) {
        for counts in self.counts.iter_mut().flatten() {
            counts.clear();
        }
    }
}
