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

//! A first-order clause, that is a disjunction of literals whose variables are implicitly
//! universally quantified. Variables are identified by an index local to the clause.
//!
//! Besides the model itself, a clause computes the quantity the pseudo-log-likelihood is built on:
//! for a ground atom, by how much the number of satisfied groundings of the clause changes when the
//! atom is flipped (see `count_diff_true_groundings`).

use super::domain::{ConstantIndex, Domain, PredicateIndex, TypeIndex};
use super::grounding::{CartesianProduct, GroundAtom};
use super::literal::{Literal, Term};
use crate::errors::{Error, Result};
use crate::log::targets;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    literals: Vec<Literal>,
    number_variables: usize,
}

impl Clause {

    pub fn new(literals: Vec<Literal>) -> Self {
        let number_variables = literals.iter().flat_map(|l| l.terms().iter()).filter_map(|t| match t {
            Term::Variable(v) => Some(*v + 1),
            Term::Constant(_) => None,
        }).max().unwrap_or(0);
        Self {
            literals,
            number_variables,
        }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn number_literals(&self) -> usize {
        self.literals.len()
    }

    pub fn number_variables(&self) -> usize {
        self.number_variables
    }

    /// Puts the clause in a canonical form: the literals are sorted by predicate, sense and shape,
    /// then the variables are renumbered by order of first appearance.
    pub fn canonicalize(&mut self) {
        self.literals.sort_by_key(|l| (l.predicate(), !l.sense(), l.canonical_key()));
        let mut renaming = vec![usize::MAX; self.number_variables];
        let mut next = 0;
        for literal in self.literals.iter() {
            for term in literal.terms() {
                if let Term::Variable(v) = term {
                    if renaming[*v] == usize::MAX {
                        renaming[*v] = next;
                        next += 1;
                    }
                }
            }
        }
        for literal in self.literals.iter_mut() {
            literal.rename_variables(&renaming);
        }
        self.number_variables = next;
    }

    /// Returns the type of each variable, checking that the literals agree with the predicate
    /// templates of the domain. Variable indexes not used by any literal have no type.
    pub fn variable_types(&self, domain: &Domain) -> Result<Vec<Option<TypeIndex>>> {
        let mut types: Vec<Option<TypeIndex>> = vec![None; self.number_variables];
        for literal in self.literals.iter() {
            let template = &domain[literal.predicate()];
            if template.arity() != literal.arity() {
                log::error!(target: targets::GROUNDING, "Literal of {} has {} arguments instead of {}", template.name(), literal.arity(), template.arity());
                return Err(Error::Contract(format!("literal of {} has {} arguments instead of {}", template.name(), literal.arity(), template.arity())));
            }
            for (position, term) in literal.terms().iter().enumerate() {
                if let Term::Variable(v) = term {
                    let ty = template.arg_type(position);
                    match types[*v] {
                        Some(t) if t != ty => {
                            log::error!(target: targets::GROUNDING, "Variable {} is used with types {} and {}", v, t.0, ty.0);
                            return Err(Error::Contract(format!("variable {} is used with two types", v)));
                        },
                        _ => types[*v] = Some(ty),
                    }
                }
            }
        }
        Ok(types)
    }

    /// Returns the number of groundings of the clause in the domain
    pub fn number_groundings(&self, domain: &Domain) -> Result<f64> {
        let types = self.variable_types(domain)?;
        Ok(types.iter().flatten().map(|t| domain.number_constants_by_type(*t) as f64).product())
    }

    /// Returns the values the ground atoms take in the world where `atom` is flipped. For an
    /// atom in a block, the `combination`-th other member of the block exchanges its value with
    /// the atom.
    fn flipped_world(&self, atom: &GroundAtom, domain: &Domain, combination: usize) -> Result<Vec<(PredicateIndex, usize, bool)>> {
        let value = domain.truth_value(atom.predicate, atom.grounding);
        match domain.block_of(atom.predicate, atom.grounding) {
            None => {
                if combination != 0 {
                    return Err(Error::Contract(format!("combination {} of a ground atom of {} which is not in a block", combination, domain[atom.predicate].name())));
                }
                Ok(vec![(atom.predicate, atom.grounding, !value)])
            },
            Some(block) => {
                let other = domain[block].members().iter().copied().filter(|g| *g != atom.grounding).nth(combination);
                match other {
                    Some(other) => {
                        let other_value = domain.truth_value(atom.predicate, other);
                        Ok(vec![(atom.predicate, atom.grounding, other_value), (atom.predicate, other, value)])
                    },
                    None => Err(Error::Contract(format!("combination {} is out of the block of a ground atom of {}", combination, domain[atom.predicate].name()))),
                }
            },
        }
    }

    /// Returns true iff the ground clause is satisfied. `world` overrides the value of some atoms
    fn is_satisfied(&self, assignment: &[ConstantIndex], domain: &Domain, world: &[(PredicateIndex, usize, bool)]) -> bool {
        self.literals.iter().any(|literal| {
            let constants = literal.ground(assignment);
            let value = match domain.ground_atom_index(literal.predicate(), &constants) {
                Some(g) => world.iter()
                    .find(|(p, index, _)| *p == literal.predicate() && *index == g)
                    .map(|(_, _, v)| *v)
                    .unwrap_or_else(|| domain.truth_value(literal.predicate(), g)),
                None => false,
            };
            value == literal.sense()
        })
    }

    /// Returns the number of satisfied groundings of the clause when the atom is flipped minus the
    /// number of satisfied groundings in the domain. For an atom in a block, the atom exchanges its
    /// value with the `combination`-th other member of the block. Both members may change, so the
    /// groundings containing either of them are counted, each grounding once.
    pub fn count_diff_true_groundings(&self, atom: &GroundAtom, domain: &Domain, combination: usize) -> Result<f64> {
        let types = self.variable_types(domain)?;
        // Only the atoms whose value changes matter, a swap of two false members changes nothing
        let changed: Vec<(PredicateIndex, usize, bool)> = self.flipped_world(atom, domain, combination)?
            .into_iter()
            .filter(|(p, g, v)| domain.truth_value(*p, *g) != *v)
            .collect();
        let changed_constants: Vec<Vec<ConstantIndex>> = changed.iter()
            .map(|(p, g, _)| if *p == atom.predicate && *g == atom.grounding { atom.constants.clone() } else { domain.constants_of_grounding(*p, *g) })
            .collect();
        let mut diff = 0.0;
        let mut binding: Vec<Option<ConstantIndex>> = vec![None; self.number_variables];
        let mut assignment = vec![ConstantIndex(0); self.number_variables];
        for (k, (predicate, _, _)) in changed.iter().enumerate() {
            let constants = &changed_constants[k];
            for (position, literal) in self.literals.iter().enumerate() {
                if literal.predicate() != *predicate {
                    continue;
                }
                binding.fill(None);
                if !literal.unify(constants, &mut binding) {
                    continue;
                }
                let free: Vec<usize> = (0..self.number_variables).filter(|v| binding[*v].is_none() && types[*v].is_some()).collect();
                let sizes: Vec<usize> = free.iter().map(|v| types[*v].map(|t| domain.number_constants_by_type(t)).unwrap_or(0)).collect();
                for (v, bound) in binding.iter().enumerate() {
                    if let Some(c) = bound {
                        assignment[v] = *c;
                    }
                }
                for indexes in CartesianProduct::new(sizes) {
                    for (v, index) in free.iter().zip(indexes.iter()) {
                        if let Some(ty) = types[*v] {
                            assignment[*v] = domain.constants_by_type(ty)[*index];
                        }
                    }
                    // Already counted from an earlier literal
                    if self.literals[..position].iter().any(|l| l.grounds_to(&assignment, *predicate, constants)) {
                        continue;
                    }
                    // Already counted from an earlier changed atom
                    let seen = changed[..k].iter().zip(changed_constants[..k].iter())
                        .any(|((p, _, _), c)| self.literals.iter().any(|l| l.grounds_to(&assignment, *p, c)));
                    if seen {
                        continue;
                    }
                    let actual = self.is_satisfied(&assignment, domain, &[]);
                    let flipped = self.is_satisfied(&assignment, domain, &changed);
                    diff += (flipped as i32 - actual as i32) as f64;
                }
            }
        }
        log::trace!(target: targets::GROUNDING, "Flipping grounding {} (combination {}) changes {} satisfied groundings", atom.grounding, combination, diff);
        Ok(diff)
    }
}

#[cfg(test)]
mod test_clause {
    use super::*;
    use crate::core::domain::DomainBuilder;
    use crate::core::predicate::PredicateTemplate;

    // Smokes(person), Friends(person, person), Cancer(person) over {Anna, Bob, Chris}
    fn smokers() -> Domain {
        let predicates = vec![
            PredicateTemplate::new("Smokes".to_string(), vec![TypeIndex(0)]),
            PredicateTemplate::new("Friends".to_string(), vec![TypeIndex(0), TypeIndex(0)]),
            PredicateTemplate::new("Cancer".to_string(), vec![TypeIndex(0)]),
        ];
        let mut builder = DomainBuilder::new(predicates, 1);
        for c in 0..3 {
            builder.add_constant(TypeIndex(0), ConstantIndex(c));
        }
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(0)]).unwrap();
        builder.set_true(PredicateIndex(1), vec![ConstantIndex(0), ConstantIndex(1)]).unwrap();
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(1)]).unwrap();
        builder.set_true(PredicateIndex(2), vec![ConstantIndex(0)]).unwrap();
        builder.build().unwrap()
    }

    fn atom(domain: &Domain, predicate: usize, constants: Vec<usize>) -> GroundAtom {
        let constants: Vec<ConstantIndex> = constants.into_iter().map(ConstantIndex).collect();
        GroundAtom {
            predicate: PredicateIndex(predicate),
            grounding: domain.ground_atom_index(PredicateIndex(predicate), &constants).unwrap(),
            constants,
        }
    }

    fn var(v: usize) -> Term {
        Term::Variable(v)
    }

    #[test]
    pub fn number_groundings() {
        let domain = smokers();
        // !Friends(x, y) v !Smokes(x) v Smokes(y)
        let clause = Clause::new(vec![
            Literal::new(PredicateIndex(1), false, vec![var(0), var(1)]),
            Literal::new(PredicateIndex(0), false, vec![var(0)]),
            Literal::new(PredicateIndex(0), true, vec![var(1)]),
        ]);
        assert_eq!(9.0, clause.number_groundings(&domain).unwrap());
    }

    #[test]
    pub fn unit_clause_difference() {
        let domain = smokers();
        let clause = Clause::new(vec![Literal::new(PredicateIndex(2), true, vec![var(0)])]);
        // Cancer(Anna) is true, flipping it loses one satisfied grounding
        assert_eq!(-1.0, clause.count_diff_true_groundings(&atom(&domain, 2, vec![0]), &domain, 0).unwrap());
        assert_eq!(1.0, clause.count_diff_true_groundings(&atom(&domain, 2, vec![1]), &domain, 0).unwrap());
    }

    #[test]
    pub fn implication_difference() {
        let domain = smokers();
        // Smokes(x) => Cancer(x)
        let clause = Clause::new(vec![
            Literal::new(PredicateIndex(0), false, vec![var(0)]),
            Literal::new(PredicateIndex(2), true, vec![var(0)]),
        ]);
        // Bob smokes without cancer: the only grounding is violated, flipping Smokes(Bob) fixes it
        assert_eq!(1.0, clause.count_diff_true_groundings(&atom(&domain, 0, vec![1]), &domain, 0).unwrap());
        // Anna smokes with cancer: flipping Smokes(Anna) keeps the grounding satisfied
        assert_eq!(0.0, clause.count_diff_true_groundings(&atom(&domain, 0, vec![0]), &domain, 0).unwrap());
        assert_eq!(-1.0, clause.count_diff_true_groundings(&atom(&domain, 2, vec![0]), &domain, 0).unwrap());
    }

    #[test]
    pub fn atom_appearing_twice_is_counted_once() {
        let domain = smokers();
        // !Friends(x, y) v Friends(y, x)
        let clause = Clause::new(vec![
            Literal::new(PredicateIndex(1), false, vec![var(0), var(1)]),
            Literal::new(PredicateIndex(1), true, vec![var(1), var(0)]),
        ]);
        // Groundings containing Friends(Anna, Bob): (x=Anna, y=Bob) and (x=Bob, y=Anna). The first is
        // violated and becomes satisfied, the second stays satisfied by !Friends(Bob, Anna).
        assert_eq!(1.0, clause.count_diff_true_groundings(&atom(&domain, 1, vec![0, 1]), &domain, 0).unwrap());
        // Friends(Anna, Anna) appears in a single grounding, in both literals. It is a tautology.
        assert_eq!(0.0, clause.count_diff_true_groundings(&atom(&domain, 1, vec![0, 0]), &domain, 0).unwrap());
    }

    #[test]
    pub fn canonical_form() {
        let mut clause = Clause::new(vec![
            Literal::new(PredicateIndex(2), true, vec![var(4)]),
            Literal::new(PredicateIndex(0), false, vec![var(4)]),
        ]);
        clause.canonicalize();
        assert_eq!(1, clause.number_variables());
        assert_eq!(PredicateIndex(0), clause.literals()[0].predicate());
        assert_eq!(&[var(0)], clause.literals()[1].terms());
    }

    #[test]
    pub fn blocked_atom_swaps_with_the_other_member() {
        let predicates = vec![PredicateTemplate::new("Color".to_string(), vec![TypeIndex(0), TypeIndex(1)]).with_block_argument(1)];
        let mut builder = DomainBuilder::new(predicates, 2);
        builder.add_constant(TypeIndex(0), ConstantIndex(0));
        for c in 1..4 {
            builder.add_constant(TypeIndex(1), ConstantIndex(c));
        }
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(0), ConstantIndex(1)]).unwrap();
        let domain = builder.build().unwrap();
        let clause = Clause::new(vec![Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(1))])]);
        let red = atom(&domain, 0, vec![0, 1]);
        // Moving the true value away from the first color loses the grounding, for both alternatives
        assert_eq!(-1.0, clause.count_diff_true_groundings(&red, &domain, 0).unwrap());
        assert_eq!(-1.0, clause.count_diff_true_groundings(&red, &domain, 1).unwrap());
        assert!(clause.count_diff_true_groundings(&red, &domain, 2).is_err());
    }

    // Color(item, color!) with one item and the colors 1, 2, 3. Only Color(0, 1) is true.
    fn one_item_three_colors() -> Domain {
        let predicates = vec![PredicateTemplate::new("Color".to_string(), vec![TypeIndex(0), TypeIndex(1)]).with_block_argument(1)];
        let mut builder = DomainBuilder::new(predicates, 2);
        builder.add_constant(TypeIndex(0), ConstantIndex(0));
        for c in 1..4 {
            builder.add_constant(TypeIndex(1), ConstantIndex(c));
        }
        builder.set_true(PredicateIndex(0), vec![ConstantIndex(0), ConstantIndex(1)]).unwrap();
        builder.build().unwrap()
    }

    #[test]
    pub fn block_swap_counts_the_groundings_of_the_other_member() {
        let domain = one_item_three_colors();
        // Color(x, 2) only contains the second member of the block
        let clause = Clause::new(vec![Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(2))])]);
        let first = atom(&domain, 0, vec![0, 1]);
        let second = atom(&domain, 0, vec![0, 2]);
        let third = atom(&domain, 0, vec![0, 3]);
        // Moving the true value from the first to the second color satisfies the grounding
        assert_eq!(1.0, clause.count_diff_true_groundings(&first, &domain, 0).unwrap());
        assert_eq!(0.0, clause.count_diff_true_groundings(&first, &domain, 1).unwrap());
        // The same swap seen from the second member, the other alternative swaps two false atoms
        assert_eq!(1.0, clause.count_diff_true_groundings(&second, &domain, 0).unwrap());
        assert_eq!(0.0, clause.count_diff_true_groundings(&second, &domain, 1).unwrap());
        assert_eq!(0.0, clause.count_diff_true_groundings(&third, &domain, 0).unwrap());
        assert_eq!(0.0, clause.count_diff_true_groundings(&third, &domain, 1).unwrap());
    }

    #[test]
    pub fn block_swap_counts_a_grounding_with_both_members_once() {
        let domain = one_item_three_colors();
        // Color(x, 1) v Color(x, 2) stays satisfied when the true value moves between them
        let clause = Clause::new(vec![
            Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(1))]),
            Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(2))]),
        ]);
        let first = atom(&domain, 0, vec![0, 1]);
        assert_eq!(0.0, clause.count_diff_true_groundings(&first, &domain, 0).unwrap());
        assert_eq!(-1.0, clause.count_diff_true_groundings(&first, &domain, 1).unwrap());
    }
}
