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

//! Log of the mutations done on the sufficient statistics, so that a tentative insertion or
//! removal of a clause can be rolled back. The log is replayed in reverse order:
//!     - an `Append` is undone by popping the last entry of its list;
//!     - a `Removal` is undone by putting the entry back at its position, the entry that was
//!       swapped in its place going back to the end of the list.

use super::counts::{IndexAndCount, ListKey};

#[derive(Debug, Clone, PartialEq)]
pub enum UndoInfo {
    Append(ListKey),
    Removal {
        list: ListKey,
        entry: IndexAndCount,
        position: usize,
    },
}

impl UndoInfo {
    pub fn list(&self) -> ListKey {
        match self {
            UndoInfo::Append(list) => *list,
            UndoInfo::Removal { list, .. } => *list,
        }
    }
}

#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<UndoInfo>,
}

impl UndoLog {

    pub fn push(&mut self, info: UndoInfo) {
        self.entries.push(info);
    }

    /// Returns the last mutation of the log
    pub fn pop(&mut self) -> Option<UndoInfo> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UndoInfo> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
