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

//! Sufficient statistics of the pseudo-log-likelihood.
//!
//! For each domain, predicate, ground atom and combination, the index keeps a list of
//! (clause, count) entries where count is the difference in the number of satisfied groundings of
//! the clause when the atom is flipped. The lists are unordered, never hold a zero count and never
//! hold two entries for the same clause.
//!
//! The storage of a predicate is only allocated the first time one of its atoms is visited, and
//! the lists of a ground atom are only allocated the first time the atom itself is visited.
//! Removal swaps the removed entry with the last one so that it runs in constant time. The position
//! of the removed entry is enough to undo it (see `undo.rs`).

use rustc_hash::FxHashSet;

use crate::core::domain::{ClauseIndex, Domain, DomainIndex, PredicateIndex};
use crate::errors::{Error, Result};
use crate::log::targets;

/// A clause and the signed difference of its satisfied groundings when an atom is flipped
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IndexAndCount {
    pub clause: ClauseIndex,
    pub count: f64,
}

/// Address of one list of the index
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub domain: DomainIndex,
    pub predicate: PredicateIndex,
    pub grounding: usize,
    pub combination: usize,
}

/// Statistics of the ground atoms of one predicate in one domain
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateCounts {
    /// For each grounding, one list per combination. Empty until the grounding is visited
    groundings: Vec<Vec<Vec<IndexAndCount>>>,
    /// Truth value of each visited grounding
    truth_values: Vec<Option<bool>>,
}

impl PredicateCounts {

    fn new(number_groundings: usize) -> Self {
        Self {
            groundings: vec![vec![]; number_groundings],
            truth_values: vec![None; number_groundings],
        }
    }

    pub fn number_groundings(&self) -> usize {
        self.groundings.len()
    }

    /// Returns the lists of each combination of the grounding. The slice is empty if the grounding
    /// was never visited.
    pub fn combinations(&self, grounding: usize) -> &[Vec<IndexAndCount>] {
        &self.groundings[grounding]
    }

    /// Returns the truth value cached when the grounding was first visited
    pub fn truth_value(&self, grounding: usize) -> Option<bool> {
        self.truth_values[grounding]
    }

    pub fn is_visited(&self, grounding: usize) -> bool {
        self.truth_values[grounding].is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistics {
    counts: Vec<Vec<Option<PredicateCounts>>>,
}

impl SufficientStatistics {

    pub fn new(domains: &[Domain]) -> Self {
        Self {
            counts: domains.iter().map(|d| vec![None; d.number_predicates()]).collect(),
        }
    }

    pub fn number_domains(&self) -> usize {
        self.counts.len()
    }

    /// Returns the statistics of the predicate, None if none of its atom was visited
    pub fn predicate(&self, domain: DomainIndex, predicate: PredicateIndex) -> Option<&PredicateCounts> {
        self.counts[domain.0][predicate.0].as_ref()
    }

    /// Allocates, if needed, the storage of a ground atom and checks that its truth value did not
    /// change since its first visit
    pub fn touch(&mut self, domain: DomainIndex, predicate: PredicateIndex, number_groundings: usize, grounding: usize, number_combinations: usize, truth_value: bool) -> Result<()> {
        let counts = self.counts[domain.0][predicate.0].get_or_insert_with(|| PredicateCounts::new(number_groundings));
        match counts.truth_values[grounding] {
            None => {
                counts.truth_values[grounding] = Some(truth_value);
                counts.groundings[grounding] = vec![vec![]; number_combinations];
            },
            Some(value) if value != truth_value => {
                log::error!(target: targets::COUNTS, "Ground atom {} of predicate {} changed its truth value in domain {}", grounding, predicate.0, domain.0);
                return Err(Error::Contract(format!("ground atom {} of predicate {} changed its truth value", grounding, predicate.0)));
            },
            Some(_) => {
                if counts.groundings[grounding].len() != number_combinations {
                    return Err(Error::Contract(format!("ground atom {} of predicate {} changed its number of combinations", grounding, predicate.0)));
                }
            },
        }
        Ok(())
    }

    /// Returns the list at the given key, None if it is not allocated
    pub fn list(&self, key: ListKey) -> Option<&[IndexAndCount]> {
        self.counts[key.domain.0][key.predicate.0].as_ref()
            .and_then(|c| c.groundings[key.grounding].get(key.combination))
            .map(|l| l.as_slice())
    }

    fn list_mut(&mut self, key: ListKey) -> Result<&mut Vec<IndexAndCount>> {
        self.counts[key.domain.0][key.predicate.0].as_mut()
            .and_then(|c| c.groundings[key.grounding].get_mut(key.combination))
            .ok_or_else(|| Error::Contract(format!("no list is allocated for {:?}", key)))
    }

    /// Returns true iff no list holds an entry. Allocated lists may remain after the entries are
    /// removed.
    pub fn is_empty(&self) -> bool {
        self.lists_iter().all(|(_, list)| list.is_empty())
    }

    /// Number of combinations allocated for a grounding, zero if it was not visited
    pub fn number_combinations(&self, domain: DomainIndex, predicate: PredicateIndex, grounding: usize) -> usize {
        self.predicate(domain, predicate).map(|c| c.groundings[grounding].len()).unwrap_or(0)
    }

    // --- MUTATIONS --- //

    /// Appends an entry at the end of the list. Fails if the clause already has an entry in it.
    pub fn append(&mut self, key: ListKey, entry: IndexAndCount) -> Result<()> {
        let list = self.list_mut(key)?;
        if list.iter().any(|e| e.clause == entry.clause) {
            log::error!(target: targets::COUNTS, "Clause {} appended twice to {:?}", entry.clause.0, key);
            return Err(repeated(key, entry.clause));
        }
        list.push(entry);
        Ok(())
    }

    /// Removes the entry of the clause from the list, if any, by swapping it with the last entry.
    /// Returns the removed entry and the position it occupied.
    pub fn remove(&mut self, key: ListKey, clause: ClauseIndex) -> Result<Option<(IndexAndCount, usize)>> {
        let list = self.list_mut(key)?;
        Ok(list.iter().position(|e| e.clause == clause).map(|position| (list.swap_remove(position), position)))
    }

    /// Removes the last entry of the list
    pub fn pop(&mut self, key: ListKey) -> Result<IndexAndCount> {
        self.list_mut(key)?.pop().ok_or_else(|| Error::Contract(format!("cannot pop the empty list {:?}", key)))
    }

    /// Puts back an entry removed by `remove`. The entry that took its place goes back to the end
    pub fn reinsert(&mut self, key: ListKey, entry: IndexAndCount, position: usize) -> Result<()> {
        let list = self.list_mut(key)?;
        if position > list.len() {
            return Err(Error::Contract(format!("cannot reinsert at position {} in a list of size {}", position, list.len())));
        }
        if position == list.len() {
            list.push(entry);
        } else {
            let moved = std::mem::replace(&mut list[position], entry);
            list.push(moved);
        }
        Ok(())
    }

    /// Shrinks every allocated list to its size
    pub fn compress(&mut self) {
        for counts in self.counts.iter_mut().flatten().flatten() {
            for combinations in counts.groundings.iter_mut() {
                for list in combinations.iter_mut() {
                    list.shrink_to_fit();
                }
                combinations.shrink_to_fit();
            }
        }
    }

    // --- INVARIANTS --- //

    /// Returns the first clause appearing twice in the list, if any
    pub fn repeated_index(list: &[IndexAndCount]) -> Option<ClauseIndex> {
        let mut seen = FxHashSet::default();
        list.iter().find(|e| !seen.insert(e.clause)).map(|e| e.clause)
    }

    pub fn check_list(&self, key: ListKey) -> Result<()> {
        match self.list(key).and_then(Self::repeated_index) {
            Some(clause) => {
                log::error!(target: targets::COUNTS, "Clause {} is repeated in {:?}", clause.0, key);
                Err(repeated(key, clause))
            },
            None => Ok(()),
        }
    }

    /// Returns the keys of the lists holding a repeated clause
    pub fn lists_with_repeated_index(&self) -> Vec<(ListKey, ClauseIndex)> {
        self.lists_iter().filter_map(|(key, list)| Self::repeated_index(list).map(|c| (key, c))).collect()
    }

    // --- ITERATORS --- //

    /// Iterates over every allocated list
    pub fn lists_iter(&self) -> impl Iterator<Item = (ListKey, &[IndexAndCount])> {
        self.counts.iter().enumerate().flat_map(|(d, predicates)| {
            predicates.iter().enumerate().flat_map(move |(p, counts)| {
                counts.iter().flat_map(move |c| {
                    c.groundings.iter().enumerate().flat_map(move |(g, combinations)| {
                        combinations.iter().enumerate().map(move |(combination, list)| {
                            let key = ListKey {
                                domain: DomainIndex(d),
                                predicate: PredicateIndex(p),
                                grounding: g,
                                combination,
                            };
                            (key, list.as_slice())
                        })
                    })
                })
            })
        })
    }
}

fn repeated(key: ListKey, clause: ClauseIndex) -> Error {
    Error::RepeatedIndex {
        domain: key.domain.0,
        predicate: key.predicate.0.to_string(),
        grounding: key.grounding,
        combination: key.combination,
        clause: clause.0,
    }
}

#[cfg(test)]
mod test_counts {
    use super::*;
    use crate::core::domain::{ConstantIndex, DomainBuilder, TypeIndex};
    use crate::core::predicate::PredicateTemplate;

    fn statistics() -> SufficientStatistics {
        let mut builder = DomainBuilder::new(vec![PredicateTemplate::new("P".to_string(), vec![TypeIndex(0)])], 1);
        builder.add_constant(TypeIndex(0), ConstantIndex(0));
        builder.add_constant(TypeIndex(0), ConstantIndex(1));
        let domains = vec![builder.build().unwrap()];
        let mut statistics = SufficientStatistics::new(&domains);
        statistics.touch(DomainIndex(0), PredicateIndex(0), 2, 1, 1, true).unwrap();
        statistics
    }

    fn key() -> ListKey {
        ListKey { domain: DomainIndex(0), predicate: PredicateIndex(0), grounding: 1, combination: 0 }
    }

    fn entry(clause: usize, count: f64) -> IndexAndCount {
        IndexAndCount { clause: ClauseIndex(clause), count }
    }

    #[test]
    pub fn lazy_allocation() {
        let statistics = statistics();
        let counts = statistics.predicate(DomainIndex(0), PredicateIndex(0)).unwrap();
        assert!(!counts.is_visited(0));
        assert!(counts.combinations(0).is_empty());
        assert_eq!(Some(true), counts.truth_value(1));
        assert_eq!(Some(&[][..]), statistics.list(key()));
    }

    #[test]
    pub fn truth_value_must_not_change() {
        let mut statistics = statistics();
        assert!(statistics.touch(DomainIndex(0), PredicateIndex(0), 2, 1, 1, false).is_err());
        assert!(statistics.touch(DomainIndex(0), PredicateIndex(0), 2, 1, 1, true).is_ok());
    }

    #[test]
    pub fn append_rejects_repeated_clauses() {
        let mut statistics = statistics();
        statistics.append(key(), entry(0, 1.0)).unwrap();
        statistics.append(key(), entry(1, -1.0)).unwrap();
        assert!(statistics.append(key(), entry(0, 2.0)).is_err());
        assert!(statistics.check_list(key()).is_ok());
    }

    #[test]
    pub fn remove_and_reinsert() {
        let mut statistics = statistics();
        for c in 0..4 {
            statistics.append(key(), entry(c, c as f64 + 1.0)).unwrap();
        }
        let before = statistics.clone();
        let (removed, position) = statistics.remove(key(), ClauseIndex(1)).unwrap().unwrap();
        assert_eq!(entry(1, 2.0), removed);
        assert_eq!(1, position);
        assert_eq!(&[entry(0, 1.0), entry(3, 4.0), entry(2, 3.0)], statistics.list(key()).unwrap());
        statistics.reinsert(key(), removed, position).unwrap();
        assert_eq!(&[entry(0, 1.0), entry(1, 2.0), entry(2, 3.0), entry(3, 4.0)], statistics.list(key()).unwrap());
        assert_eq!(before, statistics);
        assert!(statistics.remove(key(), ClauseIndex(7)).unwrap().is_none());
    }

    #[test]
    pub fn remove_last_and_reinsert() {
        let mut statistics = statistics();
        statistics.append(key(), entry(0, 1.0)).unwrap();
        statistics.append(key(), entry(1, 1.0)).unwrap();
        let (removed, position) = statistics.remove(key(), ClauseIndex(1)).unwrap().unwrap();
        assert_eq!(1, position);
        statistics.reinsert(key(), removed, position).unwrap();
        assert_eq!(&[entry(0, 1.0), entry(1, 1.0)], statistics.list(key()).unwrap());
    }

    #[test]
    pub fn repeated_index_detection() {
        assert_eq!(None, SufficientStatistics::repeated_index(&[entry(0, 1.0), entry(1, 1.0)]));
        assert_eq!(Some(ClauseIndex(0)), SufficientStatistics::repeated_index(&[entry(0, 1.0), entry(1, 1.0), entry(0, 1.0)]));
    }

    #[test]
    pub fn iterate_over_allocated_lists() {
        let mut statistics = statistics();
        statistics.append(key(), entry(0, 1.0)).unwrap();
        let lists: Vec<(ListKey, &[IndexAndCount])> = statistics.lists_iter().collect();
        assert_eq!(1, lists.len());
        assert_eq!(key(), lists[0].0);
        statistics.compress();
        assert!(statistics.lists_with_repeated_index().is_empty());
    }

    #[test]
    pub fn emptiness_ignores_allocated_lists() {
        let mut statistics = statistics();
        assert!(statistics.is_empty());
        statistics.append(key(), entry(0, 1.0)).unwrap();
        assert!(!statistics.is_empty());
        statistics.remove(key(), ClauseIndex(0)).unwrap();
        assert!(statistics.is_empty());
        assert!(statistics.list(key()).is_some());
    }
}
