use std::fmt::Display;

use crate::error::MachineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cpu {
    pub a: i64,    // The seed register, its bits drive the output
    pub b: i64,    // Scratch register
    pub c: i64,    // Scratch register
    pub ip: usize, // Index of the next opcode in memory
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cpu [ a: {}, b: {}, c: {}, ip: {} ]", self.a, self.b, self.c, self.ip)
    }
}

impl Cpu {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        Cpu { a, b, c, ip: 0 }
    }

    pub fn read(&self, register: Register) -> i64 {
        match register {
            Register::A => self.a,
            Register::B => self.b,
            Register::C => self.c,
        }
    }

    pub fn write(&mut self, register: Register, value: i64) {
        match register {
            Register::A => self.a = value,
            Register::B => self.b = value,
            Register::C => self.c = value,
        }
    }

    /// Resolves a combo operand against the current registers.
    pub fn combo(&self, operand: Operand) -> i64 {
        match operand {
            Operand::Literal(value) => i64::from(value),
            Operand::Register(register) => self.read(register),
        }
    }

    /// Computes `A / 2^exponent`, truncating toward zero.
    ///
    /// Returns `None` for a negative exponent. Exponents of 64 and above
    /// always yield 0.
    pub fn divide_a(&self, exponent: i64) -> Option<i64> {
        let shift = u32::try_from(exponent).ok()?.min(64);
        // |A / 2^shift| <= |A|, so the quotient always fits back into i64.
        Some((i128::from(self.a) / (1_i128 << shift)) as i64)
    }
}

/// Keeps the lowest 3 bits of a value, also for negative values.
pub fn low_digit(value: i64) -> u8 {
    (value & 0b111) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    B,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(u8),
    Register(Register),
}

impl Operand {
    /// Decodes a combo operand: 0..=3 are literals, 4..=6 name A, B and C.
    pub fn combo(value: u8, ip: usize) -> Result<Self, MachineError> {
        match value {
            0..=3 => Ok(Self::Literal(value)),
            4 => Ok(Self::Register(Register::A)),
            5 => Ok(Self::Register(Register::B)),
            6 => Ok(Self::Register(Register::C)),
            _ => Err(MachineError::ReservedOperand { operand: value, ip }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    ADV = 0, // A = A / 2^combo
    BXL = 1, // B = B ^ literal
    BST = 2, // B = combo % 8
    JNZ = 3, // if A != 0 then IP = literal
    BXC = 4, // B = B ^ C, operand ignored
    OUT = 5, // output combo % 8
    BDV = 6, // B = A / 2^combo
    CDV = 7, // C = A / 2^combo
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::ADV),
            1 => Ok(Self::BXL),
            2 => Ok(Self::BST),
            3 => Ok(Self::JNZ),
            4 => Ok(Self::BXC),
            5 => Ok(Self::OUT),
            6 => Ok(Self::BDV),
            7 => Ok(Self::CDV),
            _ => Err(v),
        }
    }
}
