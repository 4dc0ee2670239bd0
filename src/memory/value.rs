//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the single 4-byte slot the VM moves
//! between stacks and variables. Every slot carries a [`DataType`] tag; the
//! payload variant always matches the tag.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 32-bit signed integer
//! - [`Value::Float`]: 32-bit IEEE754 float
//! - [`Value::Vector`]: one Float component of a vector (a vector occupies three slots)
//! - [`Value::Object`]: 32-bit host object id
//! - [`Value::Boolean`]: truth value; any nonzero payload is true and the
//!   payload itself is kept as loaded
//! - [`Value::None`], [`Value::Reserved5`], [`Value::Reserved7`]: untyped slots
//!   that keep their raw payload so save files round-trip unchanged
//!
//! # Raw Reinterpretation
//!
//! Instructions read their operands through the instruction's own type tag, not
//! the slot's. [`Value::bits`] and [`Value::from_bits`] are the raw 4-byte view
//! used for that, for `CAST`, and by the codec.

use std::fmt;

/// Type tag carried by every value, variable and instruction
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    None = 0,
    Int = 1,
    Float = 2,
    Vector = 3,
    Object = 4,
    Reserved5 = 5,
    Boolean = 6,
    Reserved7 = 7,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::None,
        DataType::Int,
        DataType::Float,
        DataType::Vector,
        DataType::Object,
        DataType::Reserved5,
        DataType::Boolean,
        DataType::Reserved7,
    ];

    /// Convert a raw tag, returns None for tags outside 0..=7
    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::None => "NONE",
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Vector => "VECTOR",
            DataType::Object => "OBJECT",
            DataType::Reserved5 => "UNK2",
            DataType::Boolean => "BOOLEAN",
            DataType::Reserved7 => "UNK4",
        }
    }

    /// Single-letter suffix used by the disassembler (`PUSHF`, `ADDV`, ...)
    pub fn suffix(self) -> &'static str {
        match self {
            DataType::Int => "I",
            DataType::Float => "F",
            DataType::Vector => "V",
            DataType::Object => "O",
            DataType::Boolean => "B",
            _ => "",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime values in the VM
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None(u32),
    Int(i32),
    Float(f32),
    Vector(f32),
    Object(u32),
    Reserved5(u32),
    Boolean(u32),
    Reserved7(u32),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    /// The value returned by a pop from an empty stack
    pub const ZERO: Value = Value::Int(0);
    pub const TRUE: Value = Value::Boolean(1);
    pub const FALSE: Value = Value::Boolean(0);

    /// Boolean with the canonical 0/1 payload
    pub fn bool(b: bool) -> Self {
        Value::Boolean(b as u32)
    }

    /// Build a value of type `ty` from a raw 4-byte payload
    pub fn from_bits(ty: DataType, bits: u32) -> Self {
        match ty {
            DataType::None => Value::None(bits),
            DataType::Int => Value::Int(bits as i32),
            DataType::Float => Value::Float(f32::from_bits(bits)),
            DataType::Vector => Value::Vector(f32::from_bits(bits)),
            DataType::Object => Value::Object(bits),
            DataType::Reserved5 => Value::Reserved5(bits),
            DataType::Boolean => Value::Boolean(bits),
            DataType::Reserved7 => Value::Reserved7(bits),
        }
    }

    /// The zero of a given type
    pub fn zero(ty: DataType) -> Self {
        Self::from_bits(ty, 0)
    }

    /// Raw 4-byte payload
    pub fn bits(&self) -> u32 {
        match *self {
            Value::None(bits)
            | Value::Object(bits)
            | Value::Reserved5(bits)
            | Value::Boolean(bits)
            | Value::Reserved7(bits) => bits,
            Value::Int(n) => n as u32,
            Value::Float(f) | Value::Vector(f) => f.to_bits(),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::None(_) => DataType::None,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Vector(_) => DataType::Vector,
            Value::Object(_) => DataType::Object,
            Value::Reserved5(_) => DataType::Reserved5,
            Value::Boolean(_) => DataType::Boolean,
            Value::Reserved7(_) => DataType::Reserved7,
        }
    }

    /// Same payload, different tag
    pub fn retag(&self, ty: DataType) -> Self {
        Self::from_bits(ty, self.bits())
    }

    /// Payload read as a signed integer
    pub fn as_int(&self) -> i32 {
        self.bits() as i32
    }

    /// Payload read as an IEEE754 float
    pub fn as_float(&self) -> f32 {
        f32::from_bits(self.bits())
    }

    /// Payload read as an object id
    pub fn as_object(&self) -> u32 {
        self.bits()
    }

    /// Nonzero payload is true
    pub fn is_truthy(&self) -> bool {
        self.bits() != 0
    }

    /// Returns the object id if this slot is Object-typed
    pub fn object_id(&self) -> Option<u32> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(v) | Value::Vector(v) => write!(f, "{:.6}f", v),
            Value::Boolean(_) => write!(f, "{}", self.is_truthy()),
            Value::Object(id) => write!(f, "{} (object)", id),
            other => write!(f, "{} (unk type)", other.as_int()),
        }
    }
}

/// A named variable slot (global or task-local)
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub value: Value,
    pub name: String,
}

impl Variable {
    /// A fresh variable initialised to Float 0.0
    pub fn new(name: impl Into<String>) -> Self {
        Variable {
            value: Value::default(),
            name: name.into(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: Value) -> Self {
        Variable {
            value,
            name: name.into(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}
