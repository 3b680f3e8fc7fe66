// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::ConfigError;
use rustc_hash::{FxHashMap, FxHashSet};

lazy_static::lazy_static! {
    /// Words that cannot be used as identifiers in UPPAAL declarations
    static ref RESERVED_WORDS: FxHashSet<&'static str> = [
        "after_update", "and", "assign", "before_update", "bool", "break", "broadcast",
        "case", "chan", "clock", "commit", "committed", "const", "continue", "deadlock",
        "default", "do", "double", "else", "exists", "false", "for", "forall", "guard",
        "hybrid", "if", "imply", "init", "int", "meta", "not", "or", "priority", "process",
        "progress", "return", "scalar", "select", "state", "string", "struct", "sum",
        "switch", "sync", "system", "trans", "true", "typedef", "urgent", "void", "while",
        "xor",
    ]
    .into_iter()
    .collect();
}

/// Direction of a signal as seen from the controller
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Dir {
    In,
    Out,
}

/// Which side of the interface an automaton stands in for
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Role {
    Controller,
    Environment,
}

impl Role {
    /// The controller drives its outputs and reacts to its inputs,
    /// the environment does the opposite.
    pub fn drives(self, dir: Dir) -> bool {
        matches!(
            (self, dir),
            (Role::Controller, Dir::Out) | (Role::Environment, Dir::In)
        )
    }

    pub fn mirror(self) -> Role {
        match self {
            Role::Controller => Role::Environment,
            Role::Environment => Role::Controller,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Signal {
    name: String,
    dir: Dir,
}

impl Signal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> Dir {
        self.dir
    }
}

/// Checks that `name` can be declared as an UPPAAL variable
pub fn check_identifier(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(ConfigError::InvalidIdentifier {
            name: name.to_string(),
        });
    }
    if RESERVED_WORDS.contains(name) {
        return Err(ConfigError::ReservedIdentifier {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The ordered boolean inputs and outputs of the device under test.
/// Names are valid identifiers and unique across both directions.
/// Either direction may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalInterface {
    inputs: Vec<Signal>,
    outputs: Vec<Signal>,
}

impl SignalInterface {
    pub fn new(inputs: Vec<String>, outputs: Vec<String>) -> Result<Self, ConfigError> {
        {
            let mut seen: FxHashMap<&str, Dir> = FxHashMap::default();
            let tagged = inputs
                .iter()
                .map(|n| (n, Dir::In))
                .chain(outputs.iter().map(|n| (n, Dir::Out)));
            for (name, dir) in tagged {
                check_identifier(name)?;
                if seen.insert(name.as_str(), dir).is_some() {
                    return Err(ConfigError::DuplicateSignal { name: name.clone() });
                }
            }
        }

        let wrap = |names: Vec<String>, dir: Dir| {
            names
                .into_iter()
                .map(|name| Signal { name, dir })
                .collect::<Vec<_>>()
        };
        Ok(Self {
            inputs: wrap(inputs, Dir::In),
            outputs: wrap(outputs, Dir::Out),
        })
    }

    pub fn inputs(&self) -> &[Signal] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }

    pub fn by_dir(&self, dir: Dir) -> &[Signal] {
        match dir {
            Dir::In => &self.inputs,
            Dir::Out => &self.outputs,
        }
    }

    /// All signals, inputs first, each direction in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}
