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

use std::fmt;

/// Implements a bunch of statistics that are collected while maintaining the sufficient statistics
#[derive(Default)]
pub struct Statistics<const B: bool> {
    visited_groundings: usize,
    appended_entries: usize,
    removed_entries: usize,
    undone_entries: usize,
    replayed_entries: usize,
    evaluations: usize,
}

impl<const B: bool> Statistics<B> {
    pub fn visit(&mut self) {
        if B {
            self.visited_groundings += 1;
        }
    }

    pub fn append(&mut self) {
        if B {
            self.appended_entries += 1;
        }
    }

    pub fn remove(&mut self) {
        if B {
            self.removed_entries += 1;
        }
    }

    pub fn undo(&mut self) {
        if B {
            self.undone_entries += 1;
        }
    }

    pub fn replay(&mut self) {
        if B {
            self.replayed_entries += 1;
        }
    }

    pub fn evaluation(&mut self) {
        if B {
            self.evaluations += 1;
        }
    }

    pub fn print(&self) {
        if B {
            println!("{}", self);
        }
    }
}

impl<const B: bool> fmt::Display for Statistics<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if B {
            let avg_entries = if self.visited_groundings > 0 {
                self.appended_entries as f64 / self.visited_groundings as f64
            } else {
                0.0
            };
            writeln!(f,
                "visited groundings {} | appended {} (avg {:.3}) | removed {} | undone {} | replayed {} | evaluations {}",
                self.visited_groundings,
                self.appended_entries,
                avg_entries,
                self.removed_entries,
                self.undone_entries,
                self.replayed_entries,
                self.evaluations)
        } else {
            write!(f, "")
        }
    }
}
