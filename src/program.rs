use std::str::FromStr;

use crate::error::ProgramError;
use crate::memory::Memory;

/// A validated program listing together with its initial register values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub digits: Vec<u8>,
    pub initial_a: i64,
    pub initial_b: i64,
    pub initial_c: i64,
}

impl Program {
    pub fn new(
        digits: Vec<u8>,
        initial_a: i64,
        initial_b: i64,
        initial_c: i64,
    ) -> Result<Self, ProgramError> {
        if digits.len() % 2 != 0 {
            return Err(ProgramError::InvalidLength { len: digits.len() });
        }

        if let Some((position, &digit)) = digits.iter().enumerate().find(|&(_, &d)| d > 7) {
            return Err(ProgramError::InvalidDigit { position, digit });
        }

        Ok(Self {
            digits,
            initial_a,
            initial_b,
            initial_c,
        })
    }

    pub fn memory(&self) -> Memory {
        Memory::new(self.digits.clone())
    }
}

/// Non-blank input lines, numbered from 1.
struct Lines<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        let inner = input
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        Self {
            inner: Box::new(inner),
            last: 0,
        }
    }

    /// Returns the text after `prefix` on the next non-blank line.
    fn field(&mut self, prefix: &str) -> Result<(usize, &'a str), ProgramError> {
        let (line, text) = self.inner.next().ok_or_else(|| ProgramError::MalformedInput {
            line: self.last + 1,
            reason: format!("expected `{}` line", prefix),
        })?;
        self.last = line;

        let value = text
            .strip_prefix(prefix)
            .ok_or_else(|| ProgramError::MalformedInput {
                line,
                reason: format!("expected `{}`, found `{}`", prefix, text),
            })?;

        Ok((line, value.trim()))
    }

    fn register(&mut self, name: char) -> Result<i64, ProgramError> {
        let (line, value) = self.field(&format!("Register {}:", name))?;
        value.parse().map_err(|e| ProgramError::MalformedInput {
            line,
            reason: format!("register {} value `{}`: {}", name, value, e),
        })
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut lines = Lines::new(input);

        let a = lines.register('A')?;
        let b = lines.register('B')?;
        let c = lines.register('C')?;

        let (line, listing) = lines.field("Program:")?;
        let digits = listing
            .split(',')
            .map(|digit| {
                digit.trim().parse::<u8>().map_err(|e| ProgramError::MalformedInput {
                    line,
                    reason: format!("program digit `{}`: {}", digit.trim(), e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Program::new(digits, a, b, c)
    }
}
