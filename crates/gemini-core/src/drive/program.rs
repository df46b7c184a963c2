//! Stored programs and profiles
//!
//! Programs use the drive's own flow control (`L`/`LN` loops, `GO1`,
//! `WAIT`); profiles are compiled motion segments driven by buffered
//! triggers (`PLOOP`/`PLN`, `GOBUF1`, `GOWHEN`).

use serde::{Deserialize, Serialize};

use crate::protocol::Terminators;

/// Kind of stored command sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramKind {
    /// Program run with `RUN`
    #[default]
    Program,
    /// Compiled motion profile run with `PRUN`
    Profile,
}

impl ProgramKind {
    /// Name prefix used by the drive (`PROG1`, `PROF1`)
    pub fn keyword(&self) -> &'static str {
        match self {
            ProgramKind::Program => "PROG",
            ProgramKind::Profile => "PROF",
        }
    }

    /// Name of number `n` on the drive
    pub fn name(&self, n: u32) -> String {
        format!("{}{}", self.keyword(), n)
    }

    /// Command that deletes number `n`
    pub fn delete_command(&self, n: u32) -> String {
        format!("DEL {}", self.name(n))
    }

    /// Command that opens a definition
    pub fn define_command(&self, n: u32) -> String {
        format!("DEF {}", self.name(n))
    }

    /// Command that starts the program or profile
    pub fn run_command(&self, n: u32) -> String {
        match self {
            ProgramKind::Program => format!("RUN {}", self.name(n)),
            ProgramKind::Profile => format!("PRUN {}", self.name(n)),
        }
    }

    /// Command that lists a stored program
    pub fn listing_command(n: u32) -> String {
        format!("TPROG {}", ProgramKind::Program.name(n))
    }

    /// Terminators for `DEL`, `DEF`, each body line and `END`
    ///
    /// After `DEF` and each body line the drive prompts with `"- "`.
    pub fn definition_terminators(body_len: usize) -> Vec<Terminators> {
        let mut terminators = Vec::with_capacity(body_len + 3);
        terminators.push(Terminators::line());
        terminators.extend(std::iter::repeat(Terminators::continuation()).take(body_len + 1));
        terminators.push(Terminators::line());
        terminators
    }

    /// Loop header repeating the body `iterations` times
    pub fn loop_start(&self, iterations: u32) -> String {
        match self {
            ProgramKind::Program => format!("L{}", iterations),
            ProgramKind::Profile => format!("PLOOP{}", iterations),
        }
    }

    /// Loop terminator
    pub fn loop_end(&self) -> &'static str {
        match self {
            ProgramKind::Program => "LN",
            ProgramKind::Profile => "PLN",
        }
    }
}
