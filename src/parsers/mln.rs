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

//! Parser of the models. An example of valid file is given next
//!
//! // Predicate declarations. The type of each argument is named, a '!' after a type marks
//! // the argument varying inside the blocks of mutually exclusive atoms
//! Smokes(person)
//! Friends(person, person)
//! Position(person, job!)
//! // Constants known before reading the databases
//! job = {Student, Professor}
//! // Weighted clauses. Names starting with a lowercase letter are variables
//! 1.5  !Smokes(x) v Cancer(x)
//! -0.3 !Friends(x, y) v Position(y, Professor)
//!
//! Every clause must have a weight, which is its starting weight when learning.

use rustc_hash::FxHashMap;

use super::{is_variable, parse_atom, parse_error, strip_comment, Symbols};
use crate::core::clause::Clause;
use crate::core::domain::{ConstantIndex, PredicateIndex, TypeIndex};
use crate::core::literal::{Literal, Term};
use crate::core::predicate::PredicateTemplate;
use crate::errors::Result;
use crate::log::targets;

pub struct MlnFile {
    pub predicates: Vec<PredicateTemplate>,
    pub predicate_names: FxHashMap<String, PredicateIndex>,
    /// Constants declared, or named in a clause, with their type
    pub constants: Vec<(TypeIndex, ConstantIndex)>,
    pub clauses: Vec<Clause>,
    pub weights: Vec<f64>,
}

impl MlnFile {

    pub fn predicate(&self, name: &str, line: usize) -> Result<PredicateIndex> {
        match self.predicate_names.get(name) {
            Some(predicate) => Ok(*predicate),
            None => Err(parse_error(line, format!("unknown predicate {}", name))),
        }
    }
}

pub fn parse_mln(content: &str, symbols: &mut Symbols) -> Result<MlnFile> {
    let mut mln = MlnFile {
        predicates: vec![],
        predicate_names: FxHashMap::default(),
        constants: vec![],
        clauses: vec![],
        weights: vec![],
    };
    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }
        if let Some((name, values)) = text.split_once('=') {
            parse_constants(name, values, line, symbols, &mut mln)?;
            continue;
        }
        let mut tokens = text.splitn(2, char::is_whitespace);
        let weight = tokens.next().and_then(|t| t.parse::<f64>().ok());
        match weight {
            Some(weight) => {
                let formula = tokens.next().unwrap_or("");
                let clause = parse_clause(formula, line, symbols, &mut mln)?;
                mln.clauses.push(clause);
                mln.weights.push(weight);
            },
            None => {
                if text.contains(" v ") {
                    return Err(parse_error(line, "clauses must start with a weight".to_string()));
                }
                parse_declaration(text, line, symbols, &mut mln)?;
            },
        }
    }
    Ok(mln)
}

fn parse_constants(name: &str, values: &str, line: usize, symbols: &mut Symbols, mln: &mut MlnFile) -> Result<()> {
    let name = name.trim();
    let values = values.trim();
    if name.is_empty() || !values.starts_with('{') || !values.ends_with('}') {
        return Err(parse_error(line, format!("invalid constant declaration {} = {}", name, values)));
    }
    let ty = symbols.type_index(name);
    for constant in values[1..values.len() - 1].split(',').map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if is_variable(constant) {
            return Err(parse_error(line, format!("constant {} must not start with a lowercase letter", constant)));
        }
        let index = symbols.constant_index(constant);
        mln.constants.push((ty, index));
    }
    Ok(())
}

fn parse_declaration(text: &str, line: usize, symbols: &mut Symbols, mln: &mut MlnFile) -> Result<()> {
    let atom = parse_atom(text, line)?;
    if atom.negated {
        return Err(parse_error(line, format!("negated declaration of {}", atom.name)));
    }
    if mln.predicate_names.contains_key(&atom.name) {
        return Err(parse_error(line, format!("predicate {} is declared twice", atom.name)));
    }
    let mut types = Vec::with_capacity(atom.arguments.len());
    let mut block_argument = None;
    for (position, argument) in atom.arguments.iter().enumerate() {
        let name = match argument.strip_suffix('!') {
            Some(name) => {
                if block_argument.is_some() {
                    return Err(parse_error(line, format!("predicate {} has two block arguments", atom.name)));
                }
                block_argument = Some(position);
                name.trim()
            },
            None => argument.as_str(),
        };
        types.push(symbols.type_index(name));
    }
    let mut template = PredicateTemplate::new(atom.name.clone(), types);
    if let Some(argument) = block_argument {
        template = template.with_block_argument(argument);
    }
    log::debug!(target: targets::PARSER, "Predicate {} with {} arguments", atom.name, template.arity());
    mln.predicate_names.insert(atom.name, PredicateIndex(mln.predicates.len()));
    mln.predicates.push(template);
    Ok(())
}

fn parse_clause(formula: &str, line: usize, symbols: &mut Symbols, mln: &mut MlnFile) -> Result<Clause> {
    let formula = formula.trim();
    if formula.is_empty() {
        return Err(parse_error(line, "weight without clause".to_string()));
    }
    let mut variables: Vec<String> = vec![];
    let mut literals = vec![];
    for text in formula.split(" v ") {
        let atom = parse_atom(text, line)?;
        let predicate = mln.predicate(&atom.name, line)?;
        let arity = mln.predicates[predicate.0].arity();
        if arity != atom.arguments.len() {
            return Err(parse_error(line, format!("{} expects {} arguments, got {}", atom.name, arity, atom.arguments.len())));
        }
        let mut terms = Vec::with_capacity(arity);
        for (position, argument) in atom.arguments.iter().enumerate() {
            if is_variable(argument) {
                let id = match variables.iter().position(|v| v == argument) {
                    Some(id) => id,
                    None => {
                        variables.push(argument.clone());
                        variables.len() - 1
                    },
                };
                terms.push(Term::Variable(id));
            } else {
                let constant = symbols.constant_index(argument);
                mln.constants.push((mln.predicates[predicate.0].arg_type(position), constant));
                terms.push(Term::Constant(constant));
            }
        }
        literals.push(Literal::new(predicate, !atom.negated, terms));
    }
    Ok(Clause::new(literals))
}

#[cfg(test)]
mod test_mln {
    use super::*;
    use crate::errors::Error;

    const MODEL: &str = "
// People and jobs
Smokes(person)
Friends(person, person)
Position(person, job!)
job = {Student, Professor}

1.5  !Smokes(x) v Smokes(y) v !Friends(x, y)   // friends smoke alike
-0.3 !Friends(x, y) v Position(y, Professor)
";

    #[test]
    pub fn declarations() {
        let mut symbols = Symbols::default();
        let mln = parse_mln(MODEL, &mut symbols).unwrap();
        assert_eq!(3, mln.predicates.len());
        assert_eq!(2, symbols.number_types());
        let position = mln.predicate("Position", 1).unwrap();
        assert_eq!(Some(1), mln.predicates[position.0].block_argument());
        assert_eq!(None, mln.predicates[0].block_argument());
        assert_eq!(symbols.find_type("job"), Some(mln.predicates[position.0].arg_type(1)));
    }

    #[test]
    pub fn clauses() {
        let mut symbols = Symbols::default();
        let mln = parse_mln(MODEL, &mut symbols).unwrap();
        assert_eq!(vec![1.5, -0.3], mln.weights);
        let first = &mln.clauses[0];
        assert_eq!(3, first.number_literals());
        assert_eq!(2, first.number_variables());
        assert!(!first.literals()[0].sense());
        assert!(first.literals()[1].sense());
        assert_eq!(&[Term::Variable(0), Term::Variable(1)], first.literals()[2].terms());
        let professor = symbols.find_constant("Professor").unwrap();
        assert_eq!(Term::Constant(professor), mln.clauses[1].literals()[1].terms()[1]);
        // Declared constants, then the constant of the second clause
        assert_eq!(3, mln.constants.len());
    }

    #[test]
    pub fn errors() {
        let cases = [
            ("P(t)\n1.0 Q(x)", 2),
            ("P(t)\n1.0 P(x, y)", 2),
            ("P(t)\nP(t)", 2),
            ("P(t)\nP(x) v P(y)", 2),
            ("P(a!, b!)", 1),
            ("t = A, B", 1),
            ("P(t)\n\n2.0", 3),
        ];
        for (content, expected) in cases {
            let mut symbols = Symbols::default();
            match parse_mln(content, &mut symbols) {
                Err(Error::Parse { line, .. }) => assert_eq!(expected, line, "{}", content),
                _ => panic!("{} should not parse", content),
            }
        }
    }
}
