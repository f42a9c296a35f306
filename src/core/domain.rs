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

//! A domain is one relational database: typed constants, predicate templates and a closed-world
//! truth assignment over every ground atom.
//!
//! The ground atoms of a predicate are numbered with a radix encoding of the position of each
//! argument in the constant list of its type. For a predicate P(t1, ..., tn) the index of the
//! ground atom P(c1, ..., cn) is sum_j pos(cj) * m_j where m_n = 1 and m_j = m_{j+1} * |t_{j+1}|.
//! Hence the last argument varies the fastest when the ground atoms are enumerated in order.
//!
//! A predicate may declare one of its argument as a block argument. In that case, for every
//! assignment of the other arguments, the ground atoms obtained by varying the block argument form
//! a block of mutually exclusive atoms.

use rustc_hash::FxHashMap;

use super::predicate::PredicateTemplate;
use crate::errors::{Error, Result};
use crate::log::targets;

/// Abstraction used as a typesafe way of retrieving a type in the `Domain` structure
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeIndex(pub usize);

/// Abstraction used as a typesafe way of identifying a constant. Constant indexes are shared by
/// every domain built from the same vocabulary.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstantIndex(pub usize);

/// Abstraction used as a typesafe way of retrieving a predicate template in the `Domain` structure
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PredicateIndex(pub usize);

/// Abstraction used as a typesafe way of retrieving a block in the `Domain` structure
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockIndex(pub usize);

/// Handle of a clause of the model. It is the index of the clause weight in the weight vector and
/// is the same in every domain.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClauseIndex(pub usize);

/// Index of a domain in the set of databases given to the learner
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainIndex(pub usize);

/// A set of mutually exclusive ground atoms of the same predicate
#[derive(Debug)]
pub struct Block {
    predicate: PredicateIndex,
    /// Grounding indexes of the members, by increasing position of the block argument
    members: Vec<usize>,
}

impl Block {
    pub fn predicate(&self) -> PredicateIndex {
        self.predicate
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

#[derive(Debug)]
pub struct Domain {
    predicates: Vec<PredicateTemplate>,
    /// Constants of each type, in the order used to number the ground atoms
    constants_by_type: Vec<Vec<ConstantIndex>>,
    /// For each type, position of a constant in `constants_by_type`
    positions: Vec<FxHashMap<ConstantIndex, usize>>,
    /// Dense truth table of each predicate, indexed by grounding
    truth_values: Vec<Vec<bool>>,
    blocks: Vec<Block>,
    /// For each predicate with a block argument, the block of each grounding. Empty otherwise
    block_of: Vec<Vec<BlockIndex>>,
}

impl Domain {

    // --- GETTERS --- //

    pub fn number_predicates(&self) -> usize {
        self.predicates.len()
    }

    pub fn number_types(&self) -> usize {
        self.constants_by_type.len()
    }

    pub fn constants_by_type(&self, ty: TypeIndex) -> &[ConstantIndex] {
        &self.constants_by_type[ty.0]
    }

    pub fn number_constants_by_type(&self, ty: TypeIndex) -> usize {
        self.constants_by_type[ty.0].len()
    }

    /// Returns the position of the constant in the list of its type, if the constant belongs to
    /// this domain
    pub fn position_of(&self, ty: TypeIndex, constant: ConstantIndex) -> Option<usize> {
        self.positions[ty.0].get(&constant).copied()
    }

    /// Returns the number of ground atoms of the predicate
    pub fn number_groundings(&self, predicate: PredicateIndex) -> usize {
        self[predicate].arg_types().iter().map(|t| self.number_constants_by_type(*t)).product()
    }

    /// Returns the radix weight of each argument position of the predicate, right to left
    pub fn multipliers(&self, predicate: PredicateIndex) -> Vec<usize> {
        let template = &self[predicate];
        let mut multipliers = vec![0; template.arity()];
        let mut mult = 1;
        for j in (0..template.arity()).rev() {
            multipliers[j] = mult;
            mult *= self.number_constants_by_type(template.arg_type(j));
        }
        multipliers
    }

    /// Returns the index of the ground atom `predicate(constants)`, or None if one of the constant
    /// is not part of the domain. Ground atoms that do not exist in the domain are false.
    pub fn ground_atom_index(&self, predicate: PredicateIndex, constants: &[ConstantIndex]) -> Option<usize> {
        let template = &self[predicate];
        debug_assert_eq!(template.arity(), constants.len());
        let mut index = 0;
        for (j, constant) in constants.iter().copied().enumerate() {
            let ty = template.arg_type(j);
            let position = self.position_of(ty, constant)?;
            index = index * self.number_constants_by_type(ty) + position;
        }
        Some(index)
    }

    /// Decodes a grounding index into the constants of the ground atom
    pub fn constants_of_grounding(&self, predicate: PredicateIndex, grounding: usize) -> Vec<ConstantIndex> {
        let template = &self[predicate];
        let mut constants = vec![ConstantIndex(0); template.arity()];
        let mut rest = grounding;
        for j in (0..template.arity()).rev() {
            let ty = template.arg_type(j);
            let size = self.number_constants_by_type(ty);
            constants[j] = self.constants_by_type[ty.0][rest % size];
            rest /= size;
        }
        constants
    }

    pub fn truth_value(&self, predicate: PredicateIndex, grounding: usize) -> bool {
        self.truth_values[predicate.0][grounding]
    }

    /// Returns the value of the ground atom, false if it does not belong to the domain
    pub fn truth_value_of(&self, predicate: PredicateIndex, constants: &[ConstantIndex]) -> bool {
        match self.ground_atom_index(predicate, constants) {
            Some(g) => self.truth_value(predicate, g),
            None => false,
        }
    }

    /// Returns the number of true ground atoms of the predicate
    pub fn number_true_groundings(&self, predicate: PredicateIndex) -> usize {
        self.truth_values[predicate.0].iter().filter(|v| **v).count()
    }

    pub fn block_of(&self, predicate: PredicateIndex, grounding: usize) -> Option<BlockIndex> {
        self.block_of[predicate.0].get(grounding).copied()
    }

    pub fn block_size(&self, block: BlockIndex) -> usize {
        self.blocks[block.0].members.len()
    }

    /// Number of alternative worlds against which a ground atom is evaluated: one if the atom is
    /// not in a block, the size of the block minus one otherwise. The only member of a singleton
    /// block has no alternative world, its value is fixed by the block.
    pub fn number_combinations(&self, predicate: PredicateIndex, grounding: usize) -> usize {
        match self.block_of(predicate, grounding) {
            Some(block) => self.block_size(block) - 1,
            None => 1,
        }
    }

    // --- ITERATORS --- //

    pub fn predicates_iter(&self) -> impl Iterator<Item = PredicateIndex> + use<> {
        (0..self.predicates.len()).map(PredicateIndex)
    }

    pub fn blocks_iter(&self) -> impl Iterator<Item = BlockIndex> + use<> {
        (0..self.blocks.len()).map(BlockIndex)
    }
}

// --- Indexing the domain with the various indexes --- //

impl std::ops::Index<PredicateIndex> for Domain {
    type Output = PredicateTemplate;

    fn index(&self, index: PredicateIndex) -> &Self::Output {
        &self.predicates[index.0]
    }
}

impl std::ops::Index<BlockIndex> for Domain {
    type Output = Block;

    fn index(&self, index: BlockIndex) -> &Self::Output {
        &self.blocks[index.0]
    }
}

/// Collects the constants and the true atoms of a database before fixing the size of the truth
/// tables. Constants must all be known before the ground atom indexes are computed, hence the two
/// phases.
pub struct DomainBuilder {
    predicates: Vec<PredicateTemplate>,
    constants_by_type: Vec<Vec<ConstantIndex>>,
    positions: Vec<FxHashMap<ConstantIndex, usize>>,
    true_atoms: Vec<(PredicateIndex, Vec<ConstantIndex>)>,
}

impl DomainBuilder {

    pub fn new(predicates: Vec<PredicateTemplate>, number_types: usize) -> Self {
        Self {
            predicates,
            constants_by_type: vec![vec![]; number_types],
            positions: vec![FxHashMap::default(); number_types],
            true_atoms: vec![],
        }
    }

    /// Adds a constant to a type. Adding twice the same constant has no effect.
    pub fn add_constant(&mut self, ty: TypeIndex, constant: ConstantIndex) {
        if !self.positions[ty.0].contains_key(&constant) {
            self.positions[ty.0].insert(constant, self.constants_by_type[ty.0].len());
            self.constants_by_type[ty.0].push(constant);
        }
    }

    /// Sets the ground atom to true. Every atom not set is false.
    pub fn set_true(&mut self, predicate: PredicateIndex, constants: Vec<ConstantIndex>) -> Result<()> {
        let template = &self.predicates[predicate.0];
        if template.arity() != constants.len() {
            return Err(Error::Contract(format!("{} expects {} arguments, got {}", template.name(), template.arity(), constants.len())));
        }
        self.true_atoms.push((predicate, constants));
        Ok(())
    }

    pub fn build(self) -> Result<Domain> {
        let mut domain = Domain {
            predicates: self.predicates,
            constants_by_type: self.constants_by_type,
            positions: self.positions,
            truth_values: vec![],
            blocks: vec![],
            block_of: vec![],
        };
        domain.truth_values = domain.predicates_iter().map(|p| vec![false; domain.number_groundings(p)]).collect();
        for (predicate, constants) in self.true_atoms.iter() {
            match domain.ground_atom_index(*predicate, constants) {
                Some(g) => domain.truth_values[predicate.0][g] = true,
                None => {
                    return Err(Error::Contract(format!("a constant of a true atom of {} does not have the type of its argument", domain[*predicate].name())));
                },
            }
        }
        domain.block_of = domain.predicates_iter().map(|_| vec![]).collect();
        for predicate in domain.predicates_iter() {
            if let Some(argument) = domain[predicate].block_argument() {
                let multipliers = domain.multipliers(predicate);
                let size = domain.number_constants_by_type(domain[predicate].arg_type(argument));
                // Zeroing the block argument of a grounding gives the representative of its block
                let mut blocks: FxHashMap<usize, BlockIndex> = FxHashMap::default();
                let mut block_of = Vec::with_capacity(domain.number_groundings(predicate));
                for g in 0..domain.number_groundings(predicate) {
                    let representative = g - ((g / multipliers[argument]) % size) * multipliers[argument];
                    let block = *blocks.entry(representative).or_insert_with(|| {
                        domain.blocks.push(Block { predicate, members: vec![] });
                        BlockIndex(domain.blocks.len() - 1)
                    });
                    domain.blocks[block.0].members.push(g);
                    block_of.push(block);
                }
                domain.block_of[predicate.0] = block_of;
                if size == 1 {
                    log::warn!(target: targets::GROUNDING, "The block argument of {} has a single constant, its ground atoms are not evaluated", domain[predicate].name());
                }
            }
        }
        Ok(domain)
    }
}

#[cfg(test)]
mod test_domain {
    use super::*;
    use crate::core::predicate::PredicateTemplate;

    fn two_types() -> DomainBuilder {
        let predicates = vec![
            PredicateTemplate::new("Advises".to_string(), vec![TypeIndex(0), TypeIndex(1)]),
            PredicateTemplate::new("Position".to_string(), vec![TypeIndex(0), TypeIndex(1)]).with_block_argument(1),
        ];
        let mut builder = DomainBuilder::new(predicates, 2);
        builder.add_constant(TypeIndex(0), ConstantIndex(0));
        builder.add_constant(TypeIndex(0), ConstantIndex(1));
        builder.add_constant(TypeIndex(1), ConstantIndex(2));
        builder.add_constant(TypeIndex(1), ConstantIndex(3));
        builder.add_constant(TypeIndex(1), ConstantIndex(4));
        builder
    }

    #[test]
    pub fn radix_encoding() {
        let domain = two_types().build().unwrap();
        assert_eq!(6, domain.number_groundings(PredicateIndex(0)));
        assert_eq!(vec![3, 1], domain.multipliers(PredicateIndex(0)));
        assert_eq!(Some(4), domain.ground_atom_index(PredicateIndex(0), &[ConstantIndex(1), ConstantIndex(3)]));
        assert_eq!(vec![ConstantIndex(1), ConstantIndex(3)], domain.constants_of_grounding(PredicateIndex(0), 4));
        assert_eq!(None, domain.ground_atom_index(PredicateIndex(0), &[ConstantIndex(2), ConstantIndex(3)]));
    }

    #[test]
    pub fn truth_values() {
        let mut builder = two_types();
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(0), ConstantIndex(4)]).unwrap();
        let domain = builder.build().unwrap();
        assert!(domain.truth_value(PredicateIndex(0), 2));
        assert_eq!(1, domain.number_true_groundings(PredicateIndex(0)));
        assert!(!domain.truth_value_of(PredicateIndex(0), &[ConstantIndex(1), ConstantIndex(4)]));
    }

    #[test]
    pub fn wrong_arity_is_a_contract_violation() {
        let mut builder = two_types();
        assert!(builder.set_true(PredicateIndex(0), vec![ConstantIndex(0)]).is_err());
    }

    #[test]
    pub fn blocks_vary_the_block_argument() {
        let domain = two_types().build().unwrap();
        assert_eq!(None, domain.block_of(PredicateIndex(0), 0));
        assert_eq!(2, domain.blocks_iter().count());
        let block = domain.block_of(PredicateIndex(1), 4).unwrap();
        assert_eq!(&[3, 4, 5], domain[block].members());
        assert_eq!(2, domain.number_combinations(PredicateIndex(1), 4));
        assert_eq!(1, domain.number_combinations(PredicateIndex(0), 4));
    }

    #[test]
    pub fn singleton_blocks_have_no_combination() {
        let predicates = vec![PredicateTemplate::new("Position".to_string(), vec![TypeIndex(0), TypeIndex(1)]).with_block_argument(1)];
        let mut builder = DomainBuilder::new(predicates, 2);
        builder.add_constant(TypeIndex(0), ConstantIndex(0));
        builder.add_constant(TypeIndex(0), ConstantIndex(1));
        builder.add_constant(TypeIndex(1), ConstantIndex(2));
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(0), ConstantIndex(2)]).unwrap();
        let domain = builder.build().unwrap();
        assert_eq!(2, domain.blocks_iter().count());
        for g in 0..2 {
            assert_eq!(1, domain.block_size(domain.block_of(PredicateIndex(0), g).unwrap()));
            assert_eq!(0, domain.number_combinations(PredicateIndex(0), g));
        }
    }
}
