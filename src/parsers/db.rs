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

//! Parser of the databases: one ground atom per line, `!` marking the false atoms. The atoms
//! not listed are false. The constants of an atom are added to the types of its arguments.

use super::mln::MlnFile;
use super::{parse_atom, parse_error, strip_comment, Symbols};
use crate::core::domain::{ConstantIndex, PredicateIndex};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbAtom {
    pub truth_value: bool,
    pub predicate: PredicateIndex,
    pub constants: Vec<ConstantIndex>,
}

pub fn parse_db(content: &str, mln: &MlnFile, symbols: &mut Symbols) -> Result<Vec<DbAtom>> {
    let mut atoms = vec![];
    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }
        let atom = parse_atom(text, line)?;
        let predicate = mln.predicate(&atom.name, line)?;
        let arity = mln.predicates[predicate.0].arity();
        if arity != atom.arguments.len() {
            return Err(parse_error(line, format!("{} expects {} arguments, got {}", atom.name, arity, atom.arguments.len())));
        }
        let constants = atom.arguments.iter().map(|a| symbols.constant_index(a)).collect();
        atoms.push(DbAtom { truth_value: !atom.negated, predicate, constants });
    }
    Ok(atoms)
}
