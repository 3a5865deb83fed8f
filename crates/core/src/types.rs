//! Core type definitions

use crate::idgen::IdGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;

static MODULE_IDS: IdGenerator<u32> = IdGenerator::starting_at(1);

/// Module ID (32-bit unsigned, unique per process)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Allocate a fresh module id
    pub fn next() -> Self {
        Self(MODULE_IDS.get_available_id())
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ModuleId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Module origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Native functions provided by the host
    System = 0,
    /// DSL source authored by an end user
    User = 1,
}

impl ModuleKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::System),
            1 => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}
