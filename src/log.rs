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

pub mod targets {
    pub const GROUNDING: &str = "grounding";
    pub const COUNTS: &str = "counts";
    pub const UNDO: &str = "undo";
    pub const EVALUATION: &str = "evaluation";
    pub const SAMPLING: &str = "sampling";
    pub const OPTIMIZER: &str = "optimizer";
    pub const PARSER: &str = "parser";
    pub const LEARNER: &str = "learner";
}
