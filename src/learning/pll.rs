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

//! Incremental maintenance of the sufficient statistics of the pseudo-log-likelihood.
//!
//! A structure search evaluates thousands of candidate clauses. Each candidate is inserted in the
//! statistics, scored, then removed. Grounding a clause is expensive, so the engine supports
//!     - inserting a clause with an undo log, rolled back with `undo_append_remove_counts`;
//!     - removing a clause with an undo log, rolled back the same way;
//!     - recording the counts computed for a clause in a `CountCache` and replaying them later
//!       with `insert_counts`, without grounding the clause again.
//!
//! Only the ground atoms of the literals of a clause can have a non-zero count for that clause,
//! hence inserting a clause only visits the groundings of its literals. Literals that produce the
//! same ground atoms are visited once. The exception are blocks: exchanging the values of two
//! members changes both, so every member of a block touched by the clause is visited.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashSet;

use super::cache::{CachedCount, CountCache};
use super::counts::{IndexAndCount, ListKey, SufficientStatistics};
use super::sampler::{sample_predicate_groundings, SampleSize, SampledGroundings};
use super::undo::{UndoInfo, UndoLog};
use super::{GaussianPrior, PllParameters};
use crate::core::clause::Clause;
use crate::core::domain::{BlockIndex, ClauseIndex, Domain, DomainIndex, PredicateIndex};
use crate::core::grounding::{groundings, GroundAtom};
use crate::core::literal::Literal;
use crate::errors::{Error, Result};
use crate::log::targets;
use crate::statistics::Statistics;

pub struct PseudoLogLikelihood<'a, const S: bool = false> {
    pub(super) domains: &'a [Domain],
    /// For each predicate, whether its atoms contribute to the objective
    pub(super) non_evidence: Vec<bool>,
    pub(super) counts: SufficientStatistics,
    /// Number of true and false ground atoms of each (domain, predicate)
    pub(super) number_true: Vec<Vec<f64>>,
    pub(super) number_false: Vec<Vec<f64>>,
    /// Number of logistic terms of the true and false ground atoms of each (domain, predicate),
    /// one per combination
    pub(super) terms_true: Vec<Vec<f64>>,
    pub(super) terms_false: Vec<Vec<f64>>,
    /// Number of non-evidence ground atoms of each domain, and across every domain
    pub(super) domain_groundings: Vec<f64>,
    pub(super) total_groundings: f64,
    pub(super) weight_by_predicate: bool,
    pub(super) sampled: Option<Vec<Vec<Option<SampledGroundings>>>>,
    pub(super) sample_ground_atoms: bool,
    pub(super) prior: Option<GaussianPrior>,
    pub(super) clause_groundings: Option<Vec<f64>>,
    number_steps: usize,
    pub(super) statistics: Statistics<S>,
}

impl<'a, const S: bool> PseudoLogLikelihood<'a, S> {

    pub fn new(domains: &'a [Domain], parameters: &PllParameters) -> Result<Self> {
        let number_predicates = match domains.first() {
            Some(domain) => domain.number_predicates(),
            None => return Err(Error::Contract("at least one domain is needed".to_string())),
        };
        if domains.iter().any(|d| d.number_predicates() != number_predicates) {
            return Err(Error::Contract("every domain must declare the same predicates".to_string()));
        }
        let non_evidence = match &parameters.non_evidence {
            Some(non_evidence) => {
                if non_evidence.len() != number_predicates {
                    return Err(Error::Contract(format!("{} non-evidence flags for {} predicates", non_evidence.len(), number_predicates)));
                }
                non_evidence.clone()
            },
            None => vec![true; number_predicates],
        };
        let mut pll = Self {
            domains,
            non_evidence,
            counts: SufficientStatistics::new(domains),
            number_true: vec![],
            number_false: vec![],
            terms_true: vec![],
            terms_false: vec![],
            domain_groundings: vec![0.0; domains.len()],
            total_groundings: 0.0,
            weight_by_predicate: parameters.weight_by_predicate,
            sampled: None,
            sample_ground_atoms: false,
            prior: None,
            clause_groundings: None,
            number_steps: 0,
            statistics: Statistics::default(),
        };
        pll.create_number_groundings();
        if let Some(size) = parameters.sampling {
            pll.sample_groundings(size, parameters.seed);
        }
        Ok(pll)
    }

    fn create_number_groundings(&mut self) {
        let domains = self.domains;
        self.number_true = domains.iter().map(|d| vec![0.0; d.number_predicates()]).collect();
        self.number_false = domains.iter().map(|d| vec![0.0; d.number_predicates()]).collect();
        self.terms_true = domains.iter().map(|d| vec![0.0; d.number_predicates()]).collect();
        self.terms_false = domains.iter().map(|d| vec![0.0; d.number_predicates()]).collect();
        for (d, domain) in domains.iter().enumerate() {
            for predicate in domain.predicates_iter() {
                if !self.non_evidence[predicate.0] {
                    continue;
                }
                let total = domain.number_groundings(predicate);
                let number_true = domain.number_true_groundings(predicate);
                self.number_true[d][predicate.0] = number_true as f64;
                self.number_false[d][predicate.0] = (total - number_true) as f64;
                for g in 0..total {
                    let terms = domain.number_combinations(predicate, g) as f64;
                    if domain.truth_value(predicate, g) {
                        self.terms_true[d][predicate.0] += terms;
                    } else {
                        self.terms_false[d][predicate.0] += terms;
                    }
                }
                self.domain_groundings[d] += total as f64;
                log::debug!(target: targets::EVALUATION, "Domain {}, {}: {} true and {} false ground atoms", d, domain[predicate].name(), number_true, total - number_true);
            }
            log::debug!(target: targets::EVALUATION, "Domain {}: {} non-evidence ground atoms", d, self.domain_groundings[d]);
            self.total_groundings += self.domain_groundings[d];
        }
    }

    fn sample_groundings(&mut self, size: SampleSize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let domains = self.domains;
        let sampled: Vec<Vec<Option<SampledGroundings>>> = domains.iter().map(|domain| {
            domain.predicates_iter().map(|predicate| {
                if self.non_evidence[predicate.0] {
                    Some(sample_predicate_groundings(domain, predicate, size, &mut rng))
                } else {
                    None
                }
            }).collect::<Vec<Option<SampledGroundings>>>()
        }).collect();
        self.sampled = Some(sampled);
        self.sample_ground_atoms = true;
    }

    // --- GETTERS --- //

    pub fn number_domains(&self) -> usize {
        self.domains.len()
    }

    pub fn counts(&self) -> &SufficientStatistics {
        &self.counts
    }

    pub fn statistics(&self) -> &Statistics<S> {
        &self.statistics
    }

    pub fn is_non_evidence(&self, predicate: PredicateIndex) -> bool {
        self.non_evidence[predicate.0]
    }

    pub fn sampled_groundings(&self, domain: DomainIndex, predicate: PredicateIndex) -> Option<&SampledGroundings> {
        self.sampled.as_ref().and_then(|s| s[domain.0][predicate.0].as_ref())
    }

    /// Number of iterations done by the optimizer in its last run
    pub fn number_steps(&self) -> usize {
        self.number_steps
    }

    pub fn set_number_steps(&mut self, steps: usize) {
        self.number_steps = steps;
    }

    // --- CONFIGURATION --- //

    /// Enables the Gaussian prior on the weights, or disables it with None
    pub fn set_means_std_devs(&mut self, prior: Option<GaussianPrior>) -> Result<()> {
        if let Some(prior) = &prior {
            if prior.means.len() != prior.std_devs.len() {
                return Err(Error::Contract(format!("{} means for {} standard deviations", prior.means.len(), prior.std_devs.len())));
            }
            if prior.std_devs.iter().any(|s| *s <= 0.0) {
                return Err(Error::Contract("standard deviations of the prior must be positive".to_string()));
            }
        }
        self.prior = prior;
        Ok(())
    }

    /// Switches between the sampled ground atoms and all the ground atoms. Sampling must have been
    /// requested at construction. The clauses are inserted and removed on the ground atoms selected
    /// by this flag, hence it can only change while no count is stored.
    pub fn set_sample_ground_atoms(&mut self, sample: bool) -> Result<()> {
        if sample && self.sampled.is_none() {
            return Err(Error::Contract("no ground atom was sampled at construction".to_string()));
        }
        if sample != self.sample_ground_atoms && !self.counts.is_empty() {
            log::error!(target: targets::SAMPLING, "Sampling switched while the statistics hold counts");
            return Err(Error::Contract("the sampling of the ground atoms cannot change while the statistics hold counts".to_string()));
        }
        self.sample_ground_atoms = sample;
        Ok(())
    }

    /// Sets the number of groundings of each clause, used to scale the prior
    pub fn set_clause_groundings(&mut self, groundings: Option<Vec<f64>>) {
        self.clause_groundings = groundings;
    }

    // --- INCREMENTAL MAINTENANCE --- //

    /// Returns the literals whose groundings must be visited for the clause. If a literal of a
    /// predicate has only distinct variables, its groundings cover every other literal of the
    /// same predicate.
    fn literals_to_ground<'c>(&self, clause: &'c Clause) -> Vec<&'c Literal> {
        let covering: FxHashSet<PredicateIndex> = clause.literals().iter()
            .filter(|l| l.all_terms_are_different_variables())
            .map(|l| l.predicate())
            .collect();
        let mut seen = FxHashSet::default();
        clause.literals().iter()
            .filter(|l| self.non_evidence[l.predicate().0])
            .filter(|l| l.all_terms_are_different_variables() || !covering.contains(&l.predicate()))
            .filter(|l| seen.insert(l.canonical_key()))
            .collect()
    }

    /// Returns every member of the block as a ground atom
    fn block_members(world: &Domain, block: BlockIndex) -> Vec<GroundAtom> {
        let predicate = world[block].predicate();
        world[block].members().iter().map(|g| GroundAtom {
            predicate,
            grounding: *g,
            constants: world.constants_of_grounding(predicate, *g),
        }).collect()
    }

    /// Returns the ground atoms whose counts may depend on the clause: the groundings of the
    /// literals and, for those in a block, every member of the block. Each block is given once.
    fn atoms_to_visit(&self, clause: &Clause, world: &Domain) -> Result<Vec<GroundAtom>> {
        let mut atoms = vec![];
        let mut blocks: FxHashSet<BlockIndex> = FxHashSet::default();
        for literal in self.literals_to_ground(clause) {
            for atom in groundings(literal, world)? {
                match world.block_of(atom.predicate, atom.grounding) {
                    None => atoms.push(atom),
                    Some(block) => {
                        if blocks.insert(block) {
                            atoms.extend(Self::block_members(world, block));
                        }
                    },
                }
            }
        }
        Ok(atoms)
    }

    fn is_sampled(&self, domain: DomainIndex, atom: &GroundAtom) -> bool {
        if !self.sample_ground_atoms {
            return true;
        }
        match self.sampled_groundings(domain, atom.predicate) {
            Some(sampled) => sampled.contains(atom.grounding),
            None => false,
        }
    }

    /// Adds the counts of the clause to the statistics of the domain. Every appended entry is
    /// recorded in `undo` and every non-zero count in `cache`, if given.
    pub fn compute_counts_for_new_clause(&mut self, clause: &Clause, index: ClauseIndex, domain: DomainIndex, mut undo: Option<&mut UndoLog>, mut cache: Option<&mut CountCache>) -> Result<()> {
        let domains = self.domains;
        let world = &domains[domain.0];
        for atom in self.atoms_to_visit(clause, world)? {
            if self.is_sampled(domain, &atom) {
                self.compute_and_set_counts(clause, index, domain, &atom, undo.as_deref_mut(), cache.as_deref_mut())?;
            }
        }
        Ok(())
    }

    fn compute_and_set_counts(&mut self, clause: &Clause, index: ClauseIndex, domain: DomainIndex, atom: &GroundAtom, mut undo: Option<&mut UndoLog>, mut cache: Option<&mut CountCache>) -> Result<()> {
        let domains = self.domains;
        let world = &domains[domain.0];
        let predicate = atom.predicate;
        let grounding = atom.grounding;
        let number_combinations = world.number_combinations(predicate, grounding);
        self.counts.touch(domain, predicate, world.number_groundings(predicate), grounding, number_combinations, world.truth_value(predicate, grounding))?;
        self.statistics.visit();
        for combination in 0..number_combinations {
            let key = ListKey { domain, predicate, grounding, combination };
            // The atom was already visited for this clause from another literal
            if self.counts.list(key).and_then(|l| l.last()).map(|e| e.clause == index).unwrap_or(false) {
                continue;
            }
            let count = clause.count_diff_true_groundings(atom, world, combination)?;
            if count != 0.0 {
                self.counts.append(key, IndexAndCount { clause: index, count })?;
                self.statistics.append();
                log::trace!(target: targets::COUNTS, "Clause {}: {}[{}][{}] += {}", index.0, world[predicate].name(), grounding, combination, count);
                if let Some(log) = undo.as_deref_mut() {
                    log.push(UndoInfo::Append(key));
                }
                if let Some(cache) = cache.as_deref_mut() {
                    cache.record(domain, predicate, CachedCount { grounding, combination, count });
                }
            }
        }
        Ok(())
    }

    /// Removes every entry of the clause from the statistics of the domain. The removals are
    /// recorded in `undo`, if given.
    pub fn remove_counts_for_clause(&mut self, clause: &Clause, index: ClauseIndex, domain: DomainIndex, mut undo: Option<&mut UndoLog>) -> Result<()> {
        let domains = self.domains;
        let world = &domains[domain.0];
        for atom in self.atoms_to_visit(clause, world)? {
            if self.is_sampled(domain, &atom) {
                self.remove_counts(index, domain, atom.predicate, atom.grounding, undo.as_deref_mut())?;
            }
        }
        Ok(())
    }

    fn remove_counts(&mut self, index: ClauseIndex, domain: DomainIndex, predicate: PredicateIndex, grounding: usize, mut undo: Option<&mut UndoLog>) -> Result<()> {
        for combination in 0..self.counts.number_combinations(domain, predicate, grounding) {
            let key = ListKey { domain, predicate, grounding, combination };
            if let Some((entry, position)) = self.counts.remove(key, index)? {
                self.statistics.remove();
                if let Some(log) = undo.as_deref_mut() {
                    log.push(UndoInfo::Removal { list: key, entry, position });
                }
            }
        }
        Ok(())
    }

    /// Inserts again the counts recorded in the cache for one domain, without grounding the
    /// clause. The appended entries are recorded in `undo`, if given.
    pub fn insert_counts(&mut self, index: ClauseIndex, domain: DomainIndex, cache: &CountCache, mut undo: Option<&mut UndoLog>) -> Result<()> {
        if domain.0 >= cache.number_domains() {
            return Err(Error::Contract(format!("the cache has no count for domain {}", domain.0)));
        }
        let domains = self.domains;
        let world = &domains[domain.0];
        for (predicate, counts) in cache.domain_iter(domain) {
            for cached in counts.iter() {
                let grounding = cached.grounding;
                let number_combinations = world.number_combinations(predicate, grounding);
                self.counts.touch(domain, predicate, world.number_groundings(predicate), grounding, number_combinations, world.truth_value(predicate, grounding))?;
                let key = ListKey { domain, predicate, grounding, combination: cached.combination };
                self.counts.append(key, IndexAndCount { clause: index, count: cached.count })?;
                self.statistics.replay();
                if let Some(log) = undo.as_deref_mut() {
                    log.push(UndoInfo::Append(key));
                }
            }
        }
        Ok(())
    }

    /// Inserts the cached counts in every domain. The clause must have the same index in every
    /// domain.
    pub fn insert_counts_in_all_domains(&mut self, indexes: &[ClauseIndex], cache: &CountCache, mut undo: Option<&mut UndoLog>) -> Result<()> {
        if indexes.len() != self.domains.len() {
            return Err(Error::Contract(format!("{} clause indexes for {} domains", indexes.len(), self.domains.len())));
        }
        if indexes.iter().any(|i| *i != indexes[0]) {
            log::error!(target: targets::COUNTS, "Clause indexes differ across domains: {:?}", indexes);
            return Err(Error::MisalignedClauses);
        }
        for (d, index) in indexes.iter().enumerate() {
            self.insert_counts(*index, DomainIndex(d), cache, undo.as_deref_mut())?;
        }
        Ok(())
    }

    /// Rolls back, in reverse order, every mutation recorded in the log. The log is empty
    /// afterwards.
    pub fn undo_append_remove_counts(&mut self, undo: &mut UndoLog) -> Result<()> {
        log::debug!(target: targets::UNDO, "Undoing {} mutations", undo.len());
        while let Some(info) = undo.pop() {
            let key = info.list();
            match info {
                UndoInfo::Append(list) => {
                    self.counts.pop(list)?;
                },
                UndoInfo::Removal { list, entry, position } => {
                    self.counts.reinsert(list, entry, position)?;
                },
            }
            self.statistics.undo();
            self.counts.check_list(key)?;
        }
        Ok(())
    }

    // --- MAINTENANCE --- //

    /// Checks that no list of the index holds the same clause twice. Every offending list is
    /// logged, the first one is returned.
    pub fn check_no_repeated_index(&self) -> Result<()> {
        let repeated = self.counts.lists_with_repeated_index();
        for (key, clause) in repeated.iter() {
            log::error!(target: targets::COUNTS, "Clause {} is repeated in domain {}, {}[{}][{}]", clause.0, key.domain.0, self.domains[key.domain.0][key.predicate].name(), key.grounding, key.combination);
        }
        match repeated.first() {
            Some((key, clause)) => Err(Error::RepeatedIndex {
                domain: key.domain.0,
                predicate: self.domains[key.domain.0][key.predicate].name().to_string(),
                grounding: key.grounding,
                combination: key.combination,
                clause: clause.0,
            }),
            None => Ok(()),
        }
    }

    pub fn compress(&mut self) {
        self.counts.compress();
    }

    /// Logs every non-empty list of the index
    pub fn dump(&self) {
        for (key, list) in self.counts.lists_iter() {
            if list.is_empty() {
                continue;
            }
            let entries: Vec<String> = list.iter().map(|e| format!("({}, {})", e.clause.0, e.count)).collect();
            log::trace!(target: targets::COUNTS, "domain {} {}[{}][{}]: {}", key.domain.0, self.domains[key.domain.0][key.predicate].name(), key.grounding, key.combination, entries.join(" "));
        }
    }
}

#[cfg(test)]
mod test_pll {
    use super::*;
    use crate::core::domain::{ConstantIndex, DomainBuilder, TypeIndex};
    use crate::core::literal::Term;
    use crate::core::predicate::PredicateTemplate;

    // Smokes(person), Friends(person, person), Cancer(person)
    fn smokers(people: usize) -> Domain {
        let predicates = vec![
            PredicateTemplate::new("Smokes".to_string(), vec![TypeIndex(0)]),
            PredicateTemplate::new("Friends".to_string(), vec![TypeIndex(0), TypeIndex(0)]),
            PredicateTemplate::new("Cancer".to_string(), vec![TypeIndex(0)]),
        ];
        let mut builder = DomainBuilder::new(predicates, 1);
        for c in 0..people {
            builder.add_constant(TypeIndex(0), ConstantIndex(c));
        }
        for c in 0..people {
            if c % 2 == 0 {
                builder.set_true(PredicateIndex(0), vec![ConstantIndex(c)]).unwrap();
            }
            if c % 3 == 0 {
                builder.set_true(PredicateIndex(2), vec![ConstantIndex(c)]).unwrap();
            }
            builder.set_true(PredicateIndex(1), vec![ConstantIndex(c), ConstantIndex((c + 1) % people)]).unwrap();
        }
        builder.build().unwrap()
    }

    fn var(v: usize) -> Term {
        Term::Variable(v)
    }

    // Friends(x, y) ^ Smokes(x) => Smokes(y)
    fn friends_smoke() -> Clause {
        Clause::new(vec![
            Literal::new(PredicateIndex(1), false, vec![var(0), var(1)]),
            Literal::new(PredicateIndex(0), false, vec![var(0)]),
            Literal::new(PredicateIndex(0), true, vec![var(1)]),
        ])
    }

    // Smokes(x) => Cancer(x)
    fn smoke_cancer() -> Clause {
        Clause::new(vec![
            Literal::new(PredicateIndex(0), false, vec![var(0)]),
            Literal::new(PredicateIndex(2), true, vec![var(0)]),
        ])
    }

    // Friends(x, x) v Friends(x, y)
    fn self_friend() -> Clause {
        Clause::new(vec![
            Literal::new(PredicateIndex(1), true, vec![var(0), var(0)]),
            Literal::new(PredicateIndex(1), true, vec![var(0), var(1)]),
        ])
    }

    fn entries_of(pll: &PseudoLogLikelihood, clause: ClauseIndex) -> usize {
        pll.counts().lists_iter().map(|(_, l)| l.iter().filter(|e| e.clause == clause).count()).sum()
    }

    #[test]
    pub fn untouched_predicates_are_not_allocated() {
        let domains = vec![smokers(4)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        assert!(pll.counts().predicate(DomainIndex(0), PredicateIndex(0)).is_some());
        assert!(pll.counts().predicate(DomainIndex(0), PredicateIndex(1)).is_none());
        assert!(pll.counts().predicate(DomainIndex(0), PredicateIndex(2)).is_some());
        assert!(pll.counts().lists_iter().all(|(_, l)| l.iter().all(|e| e.count != 0.0)));
    }

    #[test]
    pub fn undo_restores_the_statistics() {
        let domains = vec![smokers(5)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        pll.compute_counts_for_new_clause(&friends_smoke(), ClauseIndex(1), DomainIndex(0), None, None).unwrap();
        let snapshot = pll.counts().clone();

        let mut undo = UndoLog::default();
        pll.remove_counts_for_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), Some(&mut undo)).unwrap();
        assert_eq!(0, entries_of(&pll, ClauseIndex(0)));
        assert!(!undo.is_empty());
        pll.undo_append_remove_counts(&mut undo).unwrap();
        assert!(undo.is_empty());
        assert_eq!(&snapshot, pll.counts());

        pll.compute_counts_for_new_clause(&self_friend(), ClauseIndex(2), DomainIndex(0), Some(&mut undo), None).unwrap();
        assert!(entries_of(&pll, ClauseIndex(2)) > 0);
        pll.undo_append_remove_counts(&mut undo).unwrap();
        assert_eq!(0, entries_of(&pll, ClauseIndex(2)));
        pll.check_no_repeated_index().unwrap();
    }

    #[test]
    pub fn insert_then_remove_leaves_no_entry() {
        let domains = vec![smokers(4)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        for clause in [smoke_cancer(), friends_smoke(), self_friend()] {
            pll.compute_counts_for_new_clause(&clause, ClauseIndex(3), DomainIndex(0), None, None).unwrap();
            pll.check_no_repeated_index().unwrap();
            pll.remove_counts_for_clause(&clause, ClauseIndex(3), DomainIndex(0), None).unwrap();
            assert_eq!(0, entries_of(&pll, ClauseIndex(3)));
        }
    }

    #[test]
    pub fn repeated_literals_are_visited_once() {
        let domains = vec![smokers(3)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        // Friends(x, y) v Friends(y, x) v !Friends(x, x)
        let clause = Clause::new(vec![
            Literal::new(PredicateIndex(1), true, vec![var(0), var(1)]),
            Literal::new(PredicateIndex(1), true, vec![var(1), var(0)]),
            Literal::new(PredicateIndex(1), false, vec![var(0), var(0)]),
        ]);
        pll.compute_counts_for_new_clause(&clause, ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        pll.check_no_repeated_index().unwrap();
        pll.compute_counts_for_new_clause(&clause, ClauseIndex(1), DomainIndex(0), None, None).unwrap();
        pll.check_no_repeated_index().unwrap();
        assert_eq!(entries_of(&pll, ClauseIndex(0)), entries_of(&pll, ClauseIndex(1)));
    }

    #[test]
    pub fn cache_replay_matches_computation() {
        let domains = vec![smokers(4), smokers(6)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        let mut cache = CountCache::new(&domains);
        for d in 0..2 {
            pll.compute_counts_for_new_clause(&friends_smoke(), ClauseIndex(0), DomainIndex(d), None, Some(&mut cache)).unwrap();
        }
        let computed = pll.counts().clone();
        for d in 0..2 {
            pll.remove_counts_for_clause(&friends_smoke(), ClauseIndex(0), DomainIndex(d), None).unwrap();
        }
        let mut undo = UndoLog::default();
        pll.insert_counts_in_all_domains(&[ClauseIndex(0), ClauseIndex(0)], &cache, Some(&mut undo)).unwrap();
        assert_eq!(&computed, pll.counts());
        pll.undo_append_remove_counts(&mut undo).unwrap();
        assert_eq!(0, entries_of(&pll, ClauseIndex(0)));
    }

    #[test]
    pub fn misaligned_clause_indexes() {
        let domains = vec![smokers(3), smokers(3)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        let cache = CountCache::new(&domains);
        assert!(matches!(pll.insert_counts_in_all_domains(&[ClauseIndex(0), ClauseIndex(1)], &cache, None), Err(Error::MisalignedClauses)));
        assert!(pll.insert_counts_in_all_domains(&[ClauseIndex(0)], &cache, None).is_err());
    }

    #[test]
    pub fn evidence_predicates_are_skipped() {
        let domains = vec![smokers(4)];
        let parameters = PllParameters { non_evidence: Some(vec![false, false, true]), ..PllParameters::default() };
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &parameters).unwrap();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        assert!(pll.counts().predicate(DomainIndex(0), PredicateIndex(0)).is_none());
        assert!(pll.counts().predicate(DomainIndex(0), PredicateIndex(2)).is_some());
        let wrong = PllParameters { non_evidence: Some(vec![true]), ..PllParameters::default() };
        assert!(PseudoLogLikelihood::<false>::new(&domains, &wrong).is_err());
    }

    #[test]
    pub fn sampled_groundings_restrict_the_insertion() {
        let domains = vec![smokers(20)];
        let parameters = PllParameters {
            sampling: Some(SampleSize { fraction: 0.25, min: None, max: None }),
            ..PllParameters::default()
        };
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &parameters).unwrap();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        let sampled = pll.sampled_groundings(DomainIndex(0), PredicateIndex(0)).unwrap().clone();
        let counts = pll.counts().predicate(DomainIndex(0), PredicateIndex(0)).unwrap();
        for g in 0..20 {
            assert_eq!(sampled.contains(g), counts.is_visited(g));
        }
    }

    #[test]
    pub fn sampling_is_fixed_while_counts_are_stored() {
        let domains = vec![smokers(6)];
        let parameters = PllParameters {
            sampling: Some(SampleSize { fraction: 1.0, min: None, max: None }),
            ..PllParameters::default()
        };
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &parameters).unwrap();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        assert!(!pll.counts().is_empty());
        assert!(pll.set_sample_ground_atoms(false).is_err());
        // Setting the current value is accepted
        assert!(pll.set_sample_ground_atoms(true).is_ok());
        pll.remove_counts_for_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None).unwrap();
        assert!(pll.counts().is_empty());
        assert!(pll.set_sample_ground_atoms(false).is_ok());
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        pll.remove_counts_for_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), None).unwrap();
        assert_eq!(0, entries_of(&pll, ClauseIndex(0)));
    }

    // Position(person, job!) where the person c holds the job c % jobs
    fn positions(people: usize, jobs: usize) -> Domain {
        let predicates = vec![PredicateTemplate::new("Position".to_string(), vec![TypeIndex(0), TypeIndex(1)]).with_block_argument(1)];
        let mut builder = DomainBuilder::new(predicates, 2);
        for c in 0..people {
            builder.add_constant(TypeIndex(0), ConstantIndex(c));
        }
        for j in 0..jobs {
            builder.add_constant(TypeIndex(1), ConstantIndex(people + j));
        }
        for c in 0..people {
            builder.set_true(PredicateIndex(0), vec![ConstantIndex(c), ConstantIndex(people + c % jobs)]).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    pub fn blocks_are_inserted_and_removed_in_full() {
        let domains = vec![positions(3, 3)];
        let mut pll: PseudoLogLikelihood = PseudoLogLikelihood::new(&domains, &PllParameters::default()).unwrap();
        // Position(x, last job), true for the third person only
        let clause = Clause::new(vec![Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(5))])]);
        let mut undo = UndoLog::default();
        pll.compute_counts_for_new_clause(&clause, ClauseIndex(0), DomainIndex(0), Some(&mut undo), None).unwrap();
        pll.check_no_repeated_index().unwrap();
        // Two swaps satisfy a grounding and two lose one, each seen from both members
        assert_eq!(8, entries_of(&pll, ClauseIndex(0)));
        let counts = pll.counts().predicate(DomainIndex(0), PredicateIndex(0)).unwrap();
        for g in 0..9 {
            assert!(counts.is_visited(g));
        }
        pll.remove_counts_for_clause(&clause, ClauseIndex(0), DomainIndex(0), None).unwrap();
        assert_eq!(0, entries_of(&pll, ClauseIndex(0)));
        pll.compute_counts_for_new_clause(&clause, ClauseIndex(0), DomainIndex(0), None, None).unwrap();
        assert_eq!(8, entries_of(&pll, ClauseIndex(0)));
    }

    #[test]
    pub fn statistics_are_collected() {
        let domains = vec![smokers(4)];
        let mut pll = PseudoLogLikelihood::<true>::new(&domains, &PllParameters::default()).unwrap();
        let mut undo = UndoLog::default();
        pll.compute_counts_for_new_clause(&smoke_cancer(), ClauseIndex(0), DomainIndex(0), Some(&mut undo), None).unwrap();
        pll.undo_append_remove_counts(&mut undo).unwrap();
        assert!(format!("{}", pll.statistics()).contains("undone"));
    }
}
