//! Reverse search for the smallest register A value that makes a program
//! print its own listing.
//!
//! Each output digit is produced from a small window of A's low bits. The
//! search first tabulates, for every digit, which window values emit it, then
//! fixes A three bits at a time from the last output digit down to the first,
//! keeping only windows that agree with the bits already fixed.

use std::collections::{BTreeSet, HashSet};

use log::{debug, info, warn};

use crate::error::{MachineError, SearchError};
use crate::memory::Memory;
use crate::program::Program;
use crate::{Machine, RunMode};

/// Bits of A consumed per output digit.
pub const DIGIT_BITS: u32 = 3;

/// Width of the low-bit window tabulated in the [`DigitTable`].
pub const DEFAULT_WINDOW_BITS: u32 = 10;

/// Widest window the table may cover; building it runs the program once per seed.
pub const MAX_WINDOW_BITS: u32 = 20;

const DIGIT_MASK: u64 = (1 << DIGIT_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub window_bits: u32,
    /// Accept a complete assignment only after re-running the program on it.
    pub verify: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            window_bits: DEFAULT_WINDOW_BITS,
            verify: true,
        }
    }
}

/// Seeds below `2^window_bits`, bucketed by the first digit they emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitTable {
    buckets: [BTreeSet<u64>; 8],
    window_bits: u32,
}

impl DigitTable {
    /// Fails with [`SearchError::WindowBits`] unless
    /// `DIGIT_BITS <= window_bits <= MAX_WINDOW_BITS`.
    pub fn build(machine: &mut Machine, window_bits: u32) -> Result<Self, SearchError> {
        if !(DIGIT_BITS..=MAX_WINDOW_BITS).contains(&window_bits) {
            return Err(SearchError::WindowBits {
                bits: window_bits,
                min: DIGIT_BITS,
                max: MAX_WINDOW_BITS,
            });
        }

        let mut table = DigitTable {
            window_bits,
            ..Default::default()
        };

        for seed in 0..(1_i64 << window_bits) {
            machine.reset(seed, 0, 0);
            machine.run(RunMode::UntilFirstOutput)?;

            if let Some(&digit) = machine.output().first() {
                table.buckets[usize::from(digit)].insert(seed as u64);
            }
        }

        debug!(
            "digit table over {} bits: {} seeds, bucket sizes {:?}",
            window_bits,
            table.len(),
            table.buckets.iter().map(BTreeSet::len).collect::<Vec<_>>()
        );

        Ok(table)
    }

    /// Seeds whose first output is `digit`, in ascending order.
    pub fn bucket(&self, digit: u8) -> Option<&BTreeSet<u64>> {
        self.buckets.get(usize::from(digit))
    }

    pub fn window_bits(&self) -> u32 {
        self.window_bits
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One search session: the table plus the mutable state of the descent.
pub struct Searcher {
    table: DigitTable,
    state: Descent,
}

/// Memo of explored states and the best seed found so far.
struct Descent {
    machine: Machine,
    target: Vec<u8>,
    verify: bool,
    visited: HashSet<(u64, usize)>,
    best: Option<u64>,
}

impl Searcher {
    pub fn new(memory: Memory, options: SearchOptions) -> Result<Self, SearchError> {
        let target = memory.as_slice().to_vec();
        let mut machine = Machine::with_registers(memory, 0, 0, 0);
        let table = DigitTable::build(&mut machine, options.window_bits)?;

        if table.is_empty() {
            warn!("no seed below 2^{} emits any digit", table.window_bits());
        }

        Ok(Self {
            table,
            state: Descent {
                machine,
                target,
                verify: options.verify,
                visited: HashSet::new(),
                best: None,
            },
        })
    }

    pub fn table(&self) -> &DigitTable {
        &self.table
    }

    /// Number of distinct (partial value, remaining digits) states explored.
    pub fn visited(&self) -> usize {
        self.state.visited.len()
    }

    /// Runs the search. `None` means no seed reproduces the program.
    pub fn search(&mut self) -> Result<Option<i64>, SearchError> {
        let digits = self.state.target.len();
        self.state.descend(&self.table, 0, digits)?;

        match self.state.best {
            Some(seed) => info!("minimal seed {} after {} states", seed, self.visited()),
            None => info!("no seed found after {} states", self.visited()),
        }

        // `accept` only records values that fit in i64.
        Ok(self.state.best.and_then(|seed| i64::try_from(seed).ok()))
    }
}

impl Descent {
    fn exceeds_best(&self, candidate: u64) -> bool {
        self.best.is_some_and(|best| candidate > best)
    }

    /// Fixes the digit at `remaining - 1`; the digits above it are already
    /// pinned in `candidate` and the bits below are still zero.
    fn descend(
        &mut self,
        table: &DigitTable,
        candidate: u64,
        remaining: usize,
    ) -> Result<(), MachineError> {
        if !self.visited.insert((candidate, remaining)) || self.exceeds_best(candidate) {
            return Ok(());
        }

        let Some(position) = remaining.checked_sub(1) else {
            return self.accept(candidate);
        };

        let Some(shift) = u32::try_from(position)
            .ok()
            .and_then(|p| p.checked_mul(DIGIT_BITS))
            .filter(|&shift| shift < u64::BITS)
        else {
            return Ok(());
        };

        let Some(bucket) = table.bucket(self.target[position]) else {
            return Ok(());
        };
        let window_mask = (1_u64 << table.window_bits()) - 1;
        let outside = !(DIGIT_MASK << shift);

        for &seed in bucket {
            let shifted = seed << shift;
            if shifted >> shift != seed {
                continue;
            }

            // Only bits already pinned may appear outside this digit's slot.
            if shifted & outside & !candidate != 0 {
                continue;
            }

            let next = candidate | shifted;
            if (next >> shift) & window_mask != seed {
                continue;
            }

            // Seeds that pass the window check share their high bits with
            // `candidate`, so `next` grows with `seed` from here on.
            if self.exceeds_best(next) {
                break;
            }

            self.descend(table, next, position)?;
        }

        Ok(())
    }

    fn accept(&mut self, candidate: u64) -> Result<(), MachineError> {
        let Ok(seed) = i64::try_from(candidate) else {
            return Ok(());
        };

        if self.verify {
            self.machine.reset(seed, 0, 0);
            self.machine.run(RunMode::UntilDivergence)?;
            if !self.machine.matches_program() {
                debug!("rejecting {}: prints {}", seed, self.machine.output_string());
                return Ok(());
            }
        }

        if !self.exceeds_best(candidate) {
            debug!("new best seed {}", seed);
            self.best = Some(candidate);
        }
        Ok(())
    }
}

pub fn find_minimal_seed(
    program: &Program,
    options: SearchOptions,
) -> Result<Option<i64>, SearchError> {
    Searcher::new(program.memory(), options)?.search()
}
