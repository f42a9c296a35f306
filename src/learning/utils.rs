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

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Returns log(1 / (1 + e^x)), the log-probability of an atom keeping its value when flipping it
/// changes the weighted sum of satisfied groundings by `wdotn`. The branches keep the exponential
/// argument non-positive.
pub fn log_probability(wdotn: f64) -> f64 {
    if wdotn > 0.0 {
        -(-wdotn).exp().ln_1p() - wdotn
    } else {
        -wdotn.exp().ln_1p()
    }
}

#[cfg(test)]
mod test_utils {
    use super::*;
    use assert_float_eq::*;

    #[test]
    pub fn log_probability_matches_sigmoid() {
        for wdotn in [-30.0, -2.5, -1.0, 0.0, 1.0, 2.5, 30.0] {
            assert_float_absolute_eq!(sigmoid(-wdotn).ln(), log_probability(wdotn), 1e-12);
        }
    }

    #[test]
    pub fn log_probability_is_stable() {
        assert!(log_probability(1000.0).is_finite());
        assert_float_absolute_eq!(-1000.0, log_probability(1000.0), 1e-9);
        assert_float_absolute_eq!(0.0, log_probability(-1000.0), 1e-12);
        assert_float_absolute_eq!(-std::f64::consts::LN_2, log_probability(0.0), 1e-15);
    }
}
