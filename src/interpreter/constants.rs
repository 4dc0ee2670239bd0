// Constants for the LHVM engine and its file format

/// Slots in every operand stack (tasks and the main stack)
pub const STACK_SIZE: usize = 32;

/// File signature at offset 0 of every program image
pub const MAGIC: [u8; 4] = *b"LHVM";

/// Program image version written by Black & White
pub const VERSION_BLACK_AND_WHITE: u32 = 7;

/// Program image version written by Creature Isle (recognised, not loadable)
pub const VERSION_CREATURE_ISLE: u32 = 8;

/// Program image version written by Black & White 2 (recognised, not loadable)
pub const VERSION_BLACK_AND_WHITE_2: u32 = 12;

/// Seconds represented by one scheduler tick
pub const DEFAULT_TICK_DURATION: f32 = 0.1;

/// Name given to the null variable at global index 0
pub const NULL_VARIABLE_NAME: &str = "Null variable";
