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

//! A first-order literal: a predicate, a sense (false for negated literals) and one term per
//! argument. A term is either a variable, identified by its index in the clause, or a constant.

use super::domain::{ConstantIndex, PredicateIndex};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Term {
    Variable(usize),
    Constant(ConstantIndex),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

/// Key identifying the set of ground atoms a literal can produce. Two literals with the same key
/// (up to a renaming of their variables) ground to the same atoms.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LiteralKey {
    predicate: PredicateIndex,
    terms: Vec<Term>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Literal {
    predicate: PredicateIndex,
    sense: bool,
    terms: Vec<Term>,
}

impl Literal {

    pub fn new(predicate: PredicateIndex, sense: bool, terms: Vec<Term>) -> Self {
        Self {
            predicate,
            sense,
            terms,
        }
    }

    pub fn predicate(&self) -> PredicateIndex {
        self.predicate
    }

    /// Returns true iff the literal is not negated
    pub fn sense(&self) -> bool {
        self.sense
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(|t| !t.is_variable())
    }

    /// Returns true iff every argument is a variable and no variable appears twice
    pub fn all_terms_are_different_variables(&self) -> bool {
        for (i, term) in self.terms.iter().enumerate() {
            match term {
                Term::Constant(_) => return false,
                Term::Variable(_) => {
                    if self.terms[..i].contains(term) {
                        return false;
                    }
                },
            }
        }
        true
    }

    /// Returns the key of the literal, with its variables renumbered by first appearance. The
    /// sense is ignored since it does not change the ground atoms.
    pub fn canonical_key(&self) -> LiteralKey {
        let mut renaming: Vec<usize> = vec![];
        let terms = self.terms.iter().map(|term| match term {
            Term::Constant(c) => Term::Constant(*c),
            Term::Variable(v) => {
                let id = match renaming.iter().position(|r| r == v) {
                    Some(id) => id,
                    None => {
                        renaming.push(*v);
                        renaming.len() - 1
                    },
                };
                Term::Variable(id)
            },
        }).collect();
        LiteralKey { predicate: self.predicate, terms }
    }

    /// Binds the variables of the literal so that it matches the ground atom. Returns false if the
    /// atom can not be obtained from the literal with the bindings already present.
    pub fn unify(&self, constants: &[ConstantIndex], binding: &mut [Option<ConstantIndex>]) -> bool {
        debug_assert_eq!(constants.len(), self.terms.len());
        for (term, constant) in self.terms.iter().zip(constants.iter().copied()) {
            match term {
                Term::Constant(c) => {
                    if *c != constant {
                        return false;
                    }
                },
                Term::Variable(v) => match binding[*v] {
                    Some(bound) if bound != constant => return false,
                    Some(_) => (),
                    None => binding[*v] = Some(constant),
                },
            }
        }
        true
    }

    /// Returns the constants of the literal under a full assignment of the clause variables
    pub fn ground(&self, assignment: &[ConstantIndex]) -> Vec<ConstantIndex> {
        self.terms.iter().map(|term| match term {
            Term::Constant(c) => *c,
            Term::Variable(v) => assignment[*v],
        }).collect()
    }

    /// Returns true iff the literal grounds to the given atom under the assignment
    pub fn grounds_to(&self, assignment: &[ConstantIndex], predicate: PredicateIndex, constants: &[ConstantIndex]) -> bool {
        self.predicate == predicate && self.terms.iter().zip(constants.iter()).all(|(term, constant)| match term {
            Term::Constant(c) => c == constant,
            Term::Variable(v) => assignment[*v] == *constant,
        })
    }

    pub(crate) fn rename_variables(&mut self, renaming: &[usize]) {
        for term in self.terms.iter_mut() {
            if let Term::Variable(v) = term {
                *v = renaming[*v];
            }
        }
    }
}

#[cfg(test)]
mod test_literal {
    use super::*;

    fn var(v: usize) -> Term {
        Term::Variable(v)
    }

    #[test]
    pub fn different_variables() {
        assert!(Literal::new(PredicateIndex(0), true, vec![var(0), var(1)]).all_terms_are_different_variables());
        assert!(!Literal::new(PredicateIndex(0), true, vec![var(0), var(0)]).all_terms_are_different_variables());
        assert!(!Literal::new(PredicateIndex(0), true, vec![var(0), Term::Constant(ConstantIndex(1))]).all_terms_are_different_variables());
    }

    #[test]
    pub fn canonical_keys_ignore_names_and_sense() {
        let a = Literal::new(PredicateIndex(0), true, vec![var(3), var(1), var(3)]);
        let b = Literal::new(PredicateIndex(0), false, vec![var(0), var(2), var(0)]);
        let c = Literal::new(PredicateIndex(0), true, vec![var(0), var(2), var(2)]);
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    pub fn unification() {
        let literal = Literal::new(PredicateIndex(0), true, vec![var(0), var(0), Term::Constant(ConstantIndex(5))]);
        let mut binding = vec![None; 1];
        assert!(literal.unify(&[ConstantIndex(1), ConstantIndex(1), ConstantIndex(5)], &mut binding));
        assert_eq!(Some(ConstantIndex(1)), binding[0]);
        let mut binding = vec![None; 1];
        assert!(!literal.unify(&[ConstantIndex(1), ConstantIndex(2), ConstantIndex(5)], &mut binding));
        let mut binding = vec![None; 1];
        assert!(!literal.unify(&[ConstantIndex(1), ConstantIndex(1), ConstantIndex(4)], &mut binding));
    }
}
