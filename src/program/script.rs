//! Compiled script metadata

use std::fmt;

/// Script category bitmask. The scheduler and the stop helpers filter tasks
/// with `script.script_type & mask != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptType(pub u32);

impl ScriptType {
    pub const NONE: ScriptType = ScriptType(0);
    pub const SCRIPT: ScriptType = ScriptType(1);
    pub const HELP: ScriptType = ScriptType(2);
    pub const CHALLENGE_HELP: ScriptType = ScriptType(4);
    pub const TEMPLE_HELP: ScriptType = ScriptType(8);
    pub const TEMPLE_SPECIAL: ScriptType = ScriptType(16);
    pub const MULTIPLAYER_HELP: ScriptType = ScriptType(64);
    pub const ALL: ScriptType = ScriptType(0xFFFF_FFFF);

    /// True when any bit is shared with `mask`
    pub fn matches(self, mask: ScriptType) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn name(self) -> &'static str {
        match self {
            ScriptType::SCRIPT => "script",
            ScriptType::HELP => "help script",
            ScriptType::CHALLENGE_HELP => "challenge help script",
            ScriptType::TEMPLE_HELP => "temple help script",
            ScriptType::TEMPLE_SPECIAL => "temple special script",
            ScriptType::MULTIPLAYER_HELP => "multiplayer help script",
            _ => "unknown script",
        }
    }
}

impl std::ops::BitOr for ScriptType {
    type Output = ScriptType;

    fn bitor(self, rhs: ScriptType) -> ScriptType {
        ScriptType(self.0 | rhs.0)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled unit. Immutable once a program is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub filename: String,
    pub script_type: ScriptType,
    /// Highest variable id that still addresses the global table
    pub variables_offset: u32,
    /// Local names; the first `parameter_count` are the parameters
    pub variables: Vec<String>,
    pub instruction_address: u32,
    pub parameter_count: u32,
    /// 1-based, equal to the script's position in the table plus one
    pub script_id: u32,
}

impl Script {
    /// Parameter names in declaration order
    pub fn parameters(&self) -> &[String] {
        let n = (self.parameter_count as usize).min(self.variables.len());
        &self.variables[..n]
    }
}
