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

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::lbfgs::Progress;
use crate::errors::Result;

/// Writes the progress of the optimizer in a CSV file. Nothing is written when B is false.
#[cfg(not(tarpaulin_include))]
pub struct Logger<const B: bool> {
    global_timestamp: chrono::DateTime<chrono::Local>,
    outfile: Option<File>,
    path: Option<PathBuf>,
}

impl<const B: bool> Default for Logger<B> {
    fn default() -> Self {
        Self {
            global_timestamp: chrono::Local::now(),
            outfile: None,
            path: None,
        }
    }
}

impl<const B: bool> Logger<B> {

    /// Creates the file log_<timestamp>.csv in `outfolder`, if given
    pub fn new(outfolder: Option<&Path>) -> Result<Self> {
        let global_timestamp = chrono::Local::now();
        if !B {
            return Ok(Self { global_timestamp, outfile: None, path: None });
        }
        match outfolder {
            Some(folder) => {
                let path = folder.join(format!("log_{}.csv", global_timestamp.format("%Y%m%d-%H%M%S")));
                let mut file = File::create(&path)?;
                writeln!(file, "run,iteration,duration_ms,value,xnorm,gnorm,step,evaluations")?;
                Ok(Self { global_timestamp, outfile: Some(file), path: Some(path) })
            },
            None => Ok(Self { global_timestamp, outfile: None, path: None }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Resets the clock at the start of an optimizer run
    pub fn start(&mut self) {
        if B {
            self.global_timestamp = chrono::Local::now();
        }
    }

    pub fn log_iteration(&mut self, run: usize, progress: &Progress) -> Result<()> {
        if B {
            if let Some(file) = self.outfile.as_mut() {
                let duration = (chrono::Local::now() - self.global_timestamp).num_milliseconds();
                writeln!(file, "{},{},{},{:.8},{:.6},{:.6},{:.6e},{}", run, progress.iteration, duration, progress.value, progress.xnorm, progress.gnorm, progress.step, progress.evaluations)?;
            }
        }
        Ok(())
    }
}
