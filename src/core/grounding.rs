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

//! Enumeration of the ground atoms of a literal in a domain.
//!
//! The enumeration is driven by a Cartesian product over the constants of each distinct variable
//! of the literal, the last array varying the fastest. Each assignment is mapped to the index of the
//! ground atom using the radix multipliers of the predicate (see `Domain`). When every argument
//! of the literal is a distinct variable, the counter of the product is directly the grounding
//! index and no multiplication is needed.

use super::domain::{ConstantIndex, Domain, PredicateIndex, TypeIndex};
use super::literal::{Literal, Term};
use crate::errors::{Error, Result};
use crate::log::targets;

/// Iterator over the Cartesian product of `0..sizes[0] x ... x 0..sizes[n-1]`. The product of zero
/// arrays contains exactly one (empty) element, and any empty array makes the product empty.
pub struct CartesianProduct {
    sizes: Vec<usize>,
    indexes: Vec<usize>,
    exhausted: bool,
}

impl CartesianProduct {

    pub fn new(sizes: Vec<usize>) -> Self {
        let exhausted = sizes.iter().any(|s| *s == 0);
        let indexes = vec![0; sizes.len()];
        Self {
            sizes,
            indexes,
            exhausted,
        }
    }

    pub fn number_combinations(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Moves to the next combination. Returns false when every combination has been visited.
    fn advance(&mut self) -> bool {
        for i in (0..self.sizes.len()).rev() {
            self.indexes[i] += 1;
            if self.indexes[i] < self.sizes[i] {
                return true;
            }
            self.indexes[i] = 0;
        }
        false
    }
}

impl Iterator for CartesianProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self.indexes.clone();
        self.exhausted = !self.advance();
        Some(current)
    }
}

/// A ground atom, as produced by the enumeration of a literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundAtom {
    pub predicate: PredicateIndex,
    pub grounding: usize,
    pub constants: Vec<ConstantIndex>,
}

/// A distinct variable of the literal with the argument positions it fills
struct VariableSlots {
    ty: TypeIndex,
    positions: Vec<usize>,
}

pub struct LiteralGroundings<'d> {
    domain: &'d Domain,
    predicate: PredicateIndex,
    /// Constants of the current atom. Positions filled by variables are overwritten at each step
    constants: Vec<ConstantIndex>,
    variables: Vec<VariableSlots>,
    multipliers: Vec<usize>,
    /// Contribution of the constant arguments to the grounding index
    offset: usize,
    product: CartesianProduct,
    all_different_variables: bool,
    counter: usize,
}

/// Returns an iterator over the ground atoms of the literal in the domain, in increasing order of
/// grounding index when every argument is a distinct variable.
///
/// Fails if the literal does not have the arity of its predicate or if a variable occupies
/// arguments of different types. A constant that does not belong to the domain yields no
/// grounding.
pub fn groundings<'d>(literal: &Literal, domain: &'d Domain) -> Result<LiteralGroundings<'d>> {
    let predicate = literal.predicate();
    let template = &domain[predicate];
    if template.arity() != literal.arity() {
        log::error!(target: targets::GROUNDING, "Literal of {} has {} arguments instead of {}", template.name(), literal.arity(), template.arity());
        return Err(Error::Contract(format!("literal of {} has {} arguments instead of {}", template.name(), literal.arity(), template.arity())));
    }
    let multipliers = domain.multipliers(predicate);
    let mut constants = vec![ConstantIndex(0); literal.arity()];
    let mut variables: Vec<(usize, VariableSlots)> = vec![];
    let mut offset = 0;
    let mut missing_constant = false;
    for (position, term) in literal.terms().iter().enumerate() {
        let ty = template.arg_type(position);
        match term {
            Term::Constant(c) => {
                constants[position] = *c;
                match domain.position_of(ty, *c) {
                    Some(p) => offset += p * multipliers[position],
                    None => missing_constant = true,
                }
            },
            Term::Variable(v) => {
                match variables.iter_mut().find(|(id, _)| id == v) {
                    Some((_, slots)) => {
                        if slots.ty != ty {
                            log::error!(target: targets::GROUNDING, "Variable {} of a literal of {} is used with two types", v, template.name());
                            return Err(Error::Contract(format!("variable {} of a literal of {} is used with two types", v, template.name())));
                        }
                        slots.positions.push(position);
                    },
                    None => variables.push((*v, VariableSlots { ty, positions: vec![position] })),
                }
            },
        }
    }
    let variables: Vec<VariableSlots> = variables.into_iter().map(|(_, slots)| slots).collect();
    let sizes = if missing_constant {
        vec![0]
    } else {
        variables.iter().map(|slots| domain.number_constants_by_type(slots.ty)).collect()
    };
    Ok(LiteralGroundings {
        domain,
        predicate,
        constants,
        variables,
        multipliers,
        offset,
        product: CartesianProduct::new(sizes),
        all_different_variables: literal.all_terms_are_different_variables(),
        counter: 0,
    })
}

impl<'d> LiteralGroundings<'d> {
    /// Number of ground atoms that the iterator yields in total
    pub fn number_groundings(&self) -> usize {
        self.product.number_combinations()
    }
}

impl<'d> Iterator for LiteralGroundings<'d> {
    type Item = GroundAtom;

    fn next(&mut self) -> Option<Self::Item> {
        let combination = self.product.next()?;
        let mut grounding = self.offset;
        for (slots, index) in self.variables.iter().zip(combination.iter().copied()) {
            let constant = self.domain.constants_by_type(slots.ty)[index];
            for position in slots.positions.iter().copied() {
                self.constants[position] = constant;
                if !self.all_different_variables {
                    grounding += index * self.multipliers[position];
                }
            }
        }
        if self.all_different_variables {
            grounding = self.counter;
        }
        self.counter += 1;
        Some(GroundAtom {
            predicate: self.predicate,
            grounding,
            constants: self.constants.clone(),
        })
    }
}

#[cfg(test)]
mod test_grounding {
    use super::*;
    use crate::core::domain::DomainBuilder;
    use crate::core::predicate::PredicateTemplate;

    fn domain() -> Domain {
        let predicates = vec![
            PredicateTemplate::new("R".to_string(), vec![TypeIndex(0), TypeIndex(1), TypeIndex(0)]),
            PredicateTemplate::new("Q".to_string(), vec![]),
        ];
        let mut builder = DomainBuilder::new(predicates, 2);
        for c in 0..3 {
            builder.add_constant(TypeIndex(0), ConstantIndex(c));
        }
        builder.add_constant(TypeIndex(1), ConstantIndex(10));
        builder.add_constant(TypeIndex(1), ConstantIndex(11));
        builder.build().unwrap()
    }

    #[test]
    pub fn product_last_varies_fastest() {
        let product: Vec<Vec<usize>> = CartesianProduct::new(vec![2, 3]).collect();
        assert_eq!(vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1, 0], vec![1, 1], vec![1, 2]], product);
    }

    #[test]
    pub fn empty_products() {
        assert_eq!(vec![Vec::<usize>::new()], CartesianProduct::new(vec![]).collect::<Vec<Vec<usize>>>());
        assert_eq!(0, CartesianProduct::new(vec![3, 0]).count());
    }

    #[test]
    pub fn distinct_variables_use_the_counter() {
        let domain = domain();
        let literal = Literal::new(PredicateIndex(0), true, vec![Term::Variable(0), Term::Variable(1), Term::Variable(2)]);
        let atoms: Vec<GroundAtom> = groundings(&literal, &domain).unwrap().collect();
        assert_eq!(18, atoms.len());
        for (i, atom) in atoms.iter().enumerate() {
            assert_eq!(i, atom.grounding);
            assert_eq!(Some(i), domain.ground_atom_index(PredicateIndex(0), &atom.constants));
        }
    }

    #[test]
    pub fn repeated_variables_and_constants() {
        let domain = domain();
        let literal = Literal::new(PredicateIndex(0), true, vec![Term::Variable(0), Term::Constant(ConstantIndex(11)), Term::Variable(0)]);
        let atoms: Vec<GroundAtom> = groundings(&literal, &domain).unwrap().collect();
        assert_eq!(3, atoms.len());
        for atom in atoms.iter() {
            assert_eq!(atom.constants[0], atom.constants[2]);
            assert_eq!(ConstantIndex(11), atom.constants[1]);
            assert_eq!(Some(atom.grounding), domain.ground_atom_index(PredicateIndex(0), &atom.constants));
        }
    }

    #[test]
    pub fn ground_literals() {
        let domain = domain();
        let literal = Literal::new(PredicateIndex(0), false, vec![Term::Constant(ConstantIndex(2)), Term::Constant(ConstantIndex(10)), Term::Constant(ConstantIndex(1))]);
        let atoms: Vec<GroundAtom> = groundings(&literal, &domain).unwrap().collect();
        assert_eq!(1, atoms.len());
        assert_eq!(13, atoms[0].grounding);
        let nullary = Literal::new(PredicateIndex(1), true, vec![]);
        assert_eq!(1, groundings(&nullary, &domain).unwrap().count());
    }

    #[test]
    pub fn unknown_constant_has_no_grounding() {
        let domain = domain();
        let literal = Literal::new(PredicateIndex(0), true, vec![Term::Constant(ConstantIndex(42)), Term::Variable(0), Term::Variable(1)]);
        assert_eq!(0, groundings(&literal, &domain).unwrap().count());
    }

    #[test]
    pub fn contract_violations() {
        let domain = domain();
        let wrong_arity = Literal::new(PredicateIndex(0), true, vec![Term::Variable(0)]);
        assert!(groundings(&wrong_arity, &domain).is_err());
        let wrong_type = Literal::new(PredicateIndex(0), true, vec![Term::Variable(0), Term::Variable(0), Term::Variable(1)]);
        assert!(groundings(&wrong_type, &domain).is_err());
    }
}
