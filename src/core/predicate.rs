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

use super::domain::TypeIndex;

/// Schema of a first-order predicate: its name, the type of each argument and, optionally, the
/// argument that groups its ground atoms into blocks of mutually exclusive atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTemplate {
    name: String,
    arg_types: Vec<TypeIndex>,
    block_argument: Option<usize>,
}

impl PredicateTemplate {

    pub fn new(name: String, arg_types: Vec<TypeIndex>) -> Self {
        Self {
            name,
            arg_types,
            block_argument: None,
        }
    }

    pub fn with_block_argument(mut self, argument: usize) -> Self {
        debug_assert!(argument < self.arg_types.len());
        self.block_argument = Some(argument);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    pub fn arg_type(&self, position: usize) -> TypeIndex {
        self.arg_types[position]
    }

    pub fn arg_types(&self) -> &[TypeIndex] {
        &self.arg_types
    }

    pub fn block_argument(&self) -> Option<usize> {
        self.block_argument
    }
}
