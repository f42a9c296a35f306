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

//! Parsers of the text formats of the models (.mln) and the databases (.db). The names of the
//! types and constants are shared by every file of a run and interned in a `Symbols` table.

pub mod mln;
pub mod db;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::core::clause::Clause;
use crate::core::domain::{ConstantIndex, Domain, DomainBuilder, PredicateIndex, TypeIndex};
use crate::core::literal::{Literal, Term};
use crate::core::predicate::PredicateTemplate;
use crate::errors::{Error, Result};
use crate::log::targets;

use db::{parse_db, DbAtom};
use mln::{parse_mln, MlnFile};

/// Names of the types and constants
#[derive(Debug, Default, Clone)]
pub struct Symbols {
    type_names: Vec<String>,
    types: FxHashMap<String, TypeIndex>,
    constant_names: Vec<String>,
    constants: FxHashMap<String, ConstantIndex>,
}

impl Symbols {

    /// Returns the index of the type, creating it if needed
    pub fn type_index(&mut self, name: &str) -> TypeIndex {
        if let Some(ty) = self.types.get(name) {
            return *ty;
        }
        let ty = TypeIndex(self.type_names.len());
        self.type_names.push(name.to_string());
        self.types.insert(name.to_string(), ty);
        ty
    }

    pub fn find_type(&self, name: &str) -> Option<TypeIndex> {
        self.types.get(name).copied()
    }

    /// Returns the index of the constant, creating it if needed
    pub fn constant_index(&mut self, name: &str) -> ConstantIndex {
        if let Some(constant) = self.constants.get(name) {
            return *constant;
        }
        let constant = ConstantIndex(self.constant_names.len());
        self.constant_names.push(name.to_string());
        self.constants.insert(name.to_string(), constant);
        constant
    }

    pub fn find_constant(&self, name: &str) -> Option<ConstantIndex> {
        self.constants.get(name).copied()
    }

    pub fn type_name(&self, ty: TypeIndex) -> &str {
        &self.type_names[ty.0]
    }

    pub fn constant_name(&self, constant: ConstantIndex) -> &str {
        &self.constant_names[constant.0]
    }

    pub fn number_types(&self) -> usize {
        self.type_names.len()
    }

    pub fn number_constants(&self) -> usize {
        self.constant_names.len()
    }
}

/// An atom as written in a file, before its names are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub negated: bool,
    pub name: String,
    pub arguments: Vec<String>,
}

pub(crate) fn parse_error(line: usize, message: String) -> Error {
    log::error!(target: targets::PARSER, "Line {}: {}", line, message);
    Error::Parse { line, message }
}

pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(start) => &line[..start],
        None => line,
    }
}

/// Parses `!Name(a, b)`. The negation and the arguments are optional.
pub(crate) fn parse_atom(text: &str, line: usize) -> Result<Atom> {
    let mut text = text.trim();
    let negated = text.starts_with('!');
    if negated {
        text = text[1..].trim_start();
    }
    let open = match text.find('(') {
        Some(open) => open,
        None => return Err(parse_error(line, format!("missing '(' in atom {}", text))),
    };
    if !text.ends_with(')') {
        return Err(parse_error(line, format!("missing ')' at the end of atom {}", text)));
    }
    let name = text[..open].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(parse_error(line, format!("invalid predicate name in {}", text)));
    }
    let inner = &text[open + 1..text.len() - 1];
    if inner.contains('(') || inner.contains(')') {
        return Err(parse_error(line, format!("nested parentheses in atom {}", text)));
    }
    let arguments: Vec<String> = if inner.trim().is_empty() {
        vec![]
    } else {
        inner.split(',').map(|a| a.trim().to_string()).collect()
    };
    if arguments.iter().any(|a| a.is_empty()) {
        return Err(parse_error(line, format!("empty argument in atom {}", text)));
    }
    Ok(Atom { negated, name: name.to_string(), arguments })
}

/// Names starting with a lowercase letter are variables, any other name is a constant
pub(crate) fn is_variable(name: &str) -> bool {
    name.chars().next().map(|c| c.is_lowercase()).unwrap_or(false)
}

/// A model with its clauses and the domains of its databases
pub struct ParsedModel {
    pub symbols: Symbols,
    pub predicates: Vec<PredicateTemplate>,
    predicate_names: FxHashMap<String, PredicateIndex>,
    pub clauses: Vec<Clause>,
    pub weights: Vec<f64>,
    pub domains: Vec<Domain>,
}

impl ParsedModel {

    pub fn predicate_index(&self, name: &str) -> Option<PredicateIndex> {
        self.predicate_names.get(name).copied()
    }

    pub fn format_atom(&self, predicate: PredicateIndex, constants: &[ConstantIndex]) -> String {
        let arguments: Vec<&str> = constants.iter().map(|c| self.symbols.constant_name(*c)).collect();
        format!("{}({})", self.predicates[predicate.0].name(), arguments.join(", "))
    }

    fn format_literal(&self, literal: &Literal) -> String {
        let arguments: Vec<String> = literal.terms().iter().map(|t| match t {
            Term::Variable(v) if *v < 26 => ((b'a' + *v as u8) as char).to_string(),
            Term::Variable(v) => format!("v{}", v),
            Term::Constant(c) => self.symbols.constant_name(*c).to_string(),
        }).collect();
        let negation = if literal.sense() { "" } else { "!" };
        format!("{}{}({})", negation, self.predicates[literal.predicate().0].name(), arguments.join(", "))
    }

    /// Writes the clause in the syntax of the .mln files
    pub fn format_clause(&self, clause: &Clause) -> String {
        clause.literals().iter().map(|l| self.format_literal(l)).collect::<Vec<String>>().join(" v ")
    }
}

fn build_domain(mln: &MlnFile, atoms: &[DbAtom], number_types: usize) -> Result<Domain> {
    let mut builder = DomainBuilder::new(mln.predicates.clone(), number_types);
    for (ty, constant) in mln.constants.iter() {
        builder.add_constant(*ty, *constant);
    }
    for atom in atoms.iter() {
        let template = &mln.predicates[atom.predicate.0];
        for (position, constant) in atom.constants.iter().enumerate() {
            builder.add_constant(template.arg_type(position), *constant);
        }
    }
    for atom in atoms.iter().filter(|a| a.truth_value) {
        builder.set_true(atom.predicate, atom.constants.clone())?;
    }
    builder.build()
}

/// Parses a model and its databases. Each database gives one domain. The constants declared in
/// the model, or named in its clauses, belong to every domain.
pub fn parse_model(mln: &Path, dbs: &[PathBuf]) -> Result<ParsedModel> {
    let mut symbols = Symbols::default();
    let content = std::fs::read_to_string(mln)?;
    let model = parse_mln(&content, &mut symbols)?;
    log::info!(target: targets::PARSER, "{}: {} predicates, {} clauses", mln.display(), model.predicates.len(), model.clauses.len());
    let mut atoms = Vec::with_capacity(dbs.len());
    for db in dbs.iter() {
        let content = std::fs::read_to_string(db)?;
        let parsed = parse_db(&content, &model, &mut symbols)?;
        log::info!(target: targets::PARSER, "{}: {} ground atoms", db.display(), parsed.len());
        atoms.push(parsed);
    }
    // Every type is known once the declarations are parsed
    let mut domains = Vec::with_capacity(dbs.len());
    for db_atoms in atoms.iter() {
        domains.push(build_domain(&model, db_atoms, symbols.number_types())?);
    }
    Ok(ParsedModel {
        symbols,
        predicates: model.predicates,
        predicate_names: model.predicate_names,
        clauses: model.clauses,
        weights: model.weights,
        domains,
    })
}
