/// Errors raised while turning input text or raw digits into a [`crate::program::Program`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("malformed input on line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },
    #[error("program has odd length {len}, expected (opcode, operand) pairs")]
    InvalidLength { len: usize },
    #[error("digit {digit} at position {position} is not a 3-bit value")]
    InvalidDigit { position: usize, digit: u8 },
}

/// Internal invariant violations hit while executing a program.
///
/// None of these can happen for a well-formed program; they indicate corrupted
/// instruction memory and abort the run.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("unknown opcode `{op}` at ip {ip}")]
    UnknownOpcode { op: u8, ip: usize },
    #[error("reserved combo operand `{operand}` at ip {ip}")]
    ReservedOperand { operand: u8, ip: usize },
    #[error("negative shift amount {amount} at ip {ip}")]
    NegativeShift { amount: i64, ip: usize },
}

/// Errors raised by the reverse search.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("window of {bits} bits is outside {min}..={max}")]
    WindowBits { bits: u32, min: u32, max: u32 },
    #[error(transparent)]
    Machine(#[from] MachineError),
}
