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

//! Sampling of the ground atoms of a predicate. The true and false atoms are sampled separately
//! so that the pseudo-log-likelihood can reweight each part by the inverse of its sampling rate.

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::core::domain::{Domain, PredicateIndex};
use crate::log::targets;

/// How many atoms of each partition are kept
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SampleSize {
    /// Fraction of the atoms kept, in [0, 1]
    pub fraction: f64,
    /// If set, partitions with fewer atoms than this bound after applying the fraction are
    /// raised to it
    pub min: Option<usize>,
    /// If set, partitions with more atoms than this bound after applying the fraction are
    /// lowered to it
    pub max: Option<usize>,
}

impl Default for SampleSize {
    fn default() -> Self {
        Self {
            fraction: 1.0,
            min: None,
            max: None,
        }
    }
}

impl SampleSize {

    /// Number of atoms to keep from a partition of the given size
    pub fn target(&self, size: usize) -> usize {
        let target = (self.fraction * size as f64).round() as usize;
        match (self.min, self.max) {
            (Some(min), _) if target < min => min.min(size),
            (_, Some(max)) if target > max => max,
            _ => target.min(size),
        }
    }
}

/// Sampled ground atoms of one predicate in one domain
#[derive(Debug, Clone)]
pub struct SampledGroundings {
    true_groundings: Vec<usize>,
    false_groundings: Vec<usize>,
    members: FxHashSet<usize>,
    total_true: usize,
    total_false: usize,
}

impl SampledGroundings {

    pub fn true_groundings(&self) -> &[usize] {
        &self.true_groundings
    }

    pub fn false_groundings(&self) -> &[usize] {
        &self.false_groundings
    }

    pub fn total_true(&self) -> usize {
        self.total_true
    }

    pub fn total_false(&self) -> usize {
        self.total_false
    }

    pub fn contains(&self, grounding: usize) -> bool {
        self.members.contains(&grounding)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Removes random elements until `target` are left
fn randomly_select(groundings: &mut Vec<usize>, target: usize, rng: &mut StdRng) {
    while groundings.len() > target {
        let index = rng.gen_range(0..groundings.len());
        groundings.swap_remove(index);
    }
}

/// Partitions the ground atoms of the predicate by truth value and samples each partition
pub fn sample_predicate_groundings(domain: &Domain, predicate: PredicateIndex, size: SampleSize, rng: &mut StdRng) -> SampledGroundings {
    let (mut true_groundings, mut false_groundings): (Vec<usize>, Vec<usize>) = (0..domain.number_groundings(predicate))
        .partition(|g| domain.truth_value(predicate, *g));
    let total_true = true_groundings.len();
    let total_false = false_groundings.len();
    randomly_select(&mut true_groundings, size.target(total_true), rng);
    randomly_select(&mut false_groundings, size.target(total_false), rng);
    log::info!(target: targets::SAMPLING, "{}: sampled/total true ground atoms = {}/{}", domain[predicate].name(), true_groundings.len(), total_true);
    log::info!(target: targets::SAMPLING, "{}: sampled/total false ground atoms = {}/{}", domain[predicate].name(), false_groundings.len(), total_false);
    let members = true_groundings.iter().chain(false_groundings.iter()).copied().collect();
    SampledGroundings {
        true_groundings,
        false_groundings,
        members,
        total_true,
        total_false,
    }
}
