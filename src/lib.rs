pub mod cpu;
pub mod error;
pub mod memory;
pub mod program;
pub mod search;


use cpu::{low_digit, Cpu, OpCode, Operand, Register};
use error::MachineError;
use log::trace;
use memory::{Addressable, Memory};
use program::Program;

/// When a call to [`Machine::run`] stops, besides the instruction pointer
/// leaving the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run until the instruction pointer leaves the program.
    ToCompletion,
    /// Stop as soon as one digit has been emitted.
    UntilFirstOutput,
    /// Stop as soon as the output is no longer a prefix of the program.
    UntilDivergence,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) cpu: Cpu,
    memory: Memory,
    output: Vec<u8>,
    steps: u64,
}

impl Machine {
    pub fn load(program: &Program) -> Self {
        Self::with_registers(
            program.memory(),
            program.initial_a,
            program.initial_b,
            program.initial_c,
        )
    }

    pub fn with_registers(memory: Memory, a: i64, b: i64, c: i64) -> Self {
        Self {
            cpu: Cpu::new(a, b, c),
            memory,
            output: Vec::new(),
            steps: 0,
        }
    }

    /// Rewinds the machine for a new trial, keeping the loaded program.
    pub fn reset(&mut self, a: i64, b: i64, c: i64) {
        self.cpu = Cpu::new(a, b, c);
        self.output.clear();
        self.steps = 0;
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_string(&self) -> String {
        self.output
            .iter()
            .map(|digit| digit.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Number of instructions executed since the last load or reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.memory.fetch(self.cpu.ip).is_none()
    }

    /// True iff the output is exactly the program listing.
    pub fn matches_program(&self) -> bool {
        self.output == self.memory.as_slice()
    }

    fn debug_state(&self) {
        let (opcode, operand) = self.memory.fetch(self.cpu.ip).unwrap_or_default();
        trace!(
            "State: {} | next: {},{} | out: {}",
            self.cpu,
            opcode,
            operand,
            self.output_string()
        );
    }

    fn divide(&self, operand: Operand) -> Result<i64, MachineError> {
        let exponent = self.cpu.combo(operand);
        self.cpu
            .divide_a(exponent)
            .ok_or(MachineError::NegativeShift {
                amount: exponent,
                ip: self.cpu.ip,
            })
    }

    /// Executes the instruction at the instruction pointer. Does nothing once
    /// the machine has halted.
    pub fn step(&mut self) -> Result<(), MachineError> {
        let ip = self.cpu.ip;
        let Some((code, operand)) = self.memory.fetch(ip) else {
            return Ok(());
        };

        let instr = OpCode::try_from(code).map_err(|op| MachineError::UnknownOpcode { op, ip })?;
        self.steps += 1;

        match instr {
            OpCode::ADV => {
                self.cpu.a = self.divide(Operand::combo(operand, ip)?)?;
            }
            OpCode::BXL => {
                self.cpu.b ^= i64::from(operand);
            }
            OpCode::BST => {
                let value = self.cpu.combo(Operand::combo(operand, ip)?);
                self.cpu.b = i64::from(low_digit(value));
            }
            OpCode::JNZ => {
                if self.cpu.a != 0 {
                    self.cpu.ip = usize::from(operand);
                    self.debug_state();
                    return Ok(());
                }
            }
            OpCode::BXC => {
                self.cpu.b ^= self.cpu.c;
            }
            OpCode::OUT => {
                let value = self.cpu.combo(Operand::combo(operand, ip)?);
                self.output.push(low_digit(value));
            }
            OpCode::BDV => {
                let value = self.divide(Operand::combo(operand, ip)?)?;
                self.cpu.write(Register::B, value);
            }
            OpCode::CDV => {
                let value = self.divide(Operand::combo(operand, ip)?)?;
                self.cpu.write(Register::C, value);
            }
        }

        self.cpu.ip += 2;
        self.debug_state();
        Ok(())
    }

    fn should_stop(&self, mode: RunMode) -> bool {
        match mode {
            RunMode::ToCompletion => false,
            RunMode::UntilFirstOutput => !self.output.is_empty(),
            RunMode::UntilDivergence => {
                self.output.len() > self.memory.len()
                    || !self.memory.as_slice().starts_with(&self.output)
            }
        }
    }

    pub fn run(&mut self, mode: RunMode) -> Result<(), MachineError> {
        while !self.is_halted() && !self.should_stop(mode) {
            self.step()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn machine(digits: Vec<u8>, a: i64, b: i64, c: i64) -> Machine {
        Machine::with_registers(Memory::new(digits), a, b, c)
    }

    fn run_to_completion(digits: Vec<u8>, a: i64, b: i64, c: i64) -> Machine {
        let mut vm = machine(digits, a, b, c);
        vm.run(RunMode::ToCompletion).unwrap();
        vm
    }

    #[test]
    pub fn scenario_bst_from_c() {
        init();
        let vm = run_to_completion(vec![2, 6], 0, 0, 9);
        assert_eq!(vm.cpu, Cpu { a: 0, b: 1, c: 9, ip: 2 });
    }

    #[test]
    pub fn scenario_out_literals_and_a() {
        init();
        let vm = run_to_completion(vec![5, 0, 5, 1, 5, 4], 10, 0, 0);
        assert_eq!(vm.output(), &[0, 1, 2]);
    }

    #[test]
    pub fn scenario_countdown_2024() {
        init();
        let vm = run_to_completion(vec![0, 1, 5, 4, 3, 0], 2024, 0, 0);
        assert_eq!(vm.output_string(), "4,2,5,6,7,7,7,7,3,1,0");
        assert_eq!(vm.cpu.a, 0);
    }

    #[test]
    pub fn scenario_bxl() {
        init();
        let vm = run_to_completion(vec![1, 7], 0, 29, 0);
        assert_eq!(vm.cpu.b, 26);
    }

    #[test]
    pub fn scenario_bxc() {
        init();
        let vm = run_to_completion(vec![4, 0], 0, 2024, 43690);
        assert_eq!(vm.cpu, Cpu { a: 0, b: 44354, c: 43690, ip: 2 });
    }

    #[test]
    pub fn scenario_729() {
        init();
        let program: Program = "Register A: 729\nRegister B: 0\nRegister C: 0\n\nProgram: 0,1,5,4,3,0"
            .parse()
            .unwrap();
        let mut vm = Machine::load(&program);
        vm.run(RunMode::ToCompletion).unwrap();
        assert_eq!(vm.output_string(), "4,6,3,5,6,3,5,2,1,0");
        assert!(vm.is_halted());
        assert!(!vm.matches_program());
    }

    #[test]
    pub fn jnz_jumps_without_advancing() {
        init();
        let mut vm = machine(vec![3, 4, 5, 0, 5, 1], 1, 0, 0);
        vm.step().unwrap();
        assert_eq!(vm.cpu.ip, 4);

        let mut vm = machine(vec![3, 4, 5, 0, 5, 1], 0, 0, 0);
        vm.step().unwrap();
        assert_eq!(vm.cpu.ip, 2);
    }

    #[test]
    pub fn jump_to_odd_address_halts_on_incomplete_pair() {
        init();
        // jnz 5 lands on the last digit, which has no operand after it.
        let vm = run_to_completion(vec![3, 5, 5, 4, 0, 0], 7, 0, 0);
        assert_eq!(vm.cpu.ip, 5);
        assert!(vm.is_halted());
        assert!(vm.output().is_empty());
    }

    #[test]
    pub fn division_by_large_register_clears() {
        init();
        let vm = run_to_completion(vec![0, 5], 5, 70, 0);
        assert_eq!(vm.cpu.a, 0);
    }

    #[test]
    pub fn negative_values_wrap_to_digits() {
        init();
        let vm = run_to_completion(vec![5, 4, 2, 4], -1, 0, 0);
        assert_eq!(vm.output(), &[7]);
        assert_eq!(vm.cpu.b, 7);
    }

    #[test]
    pub fn halt_on_first_output() {
        init();
        let mut vm = machine(vec![0, 1, 5, 4, 3, 0], 2024, 0, 0);
        vm.run(RunMode::UntilFirstOutput).unwrap();
        assert_eq!(vm.output(), &[4]);
        assert_eq!(vm.cpu.ip, 4);
        assert_eq!(vm.steps(), 2);
    }

    #[test]
    pub fn divergence_stops_early() {
        init();
        let mut vm = machine(vec![0, 3, 5, 4, 3, 0], 2024, 0, 0);
        vm.run(RunMode::UntilDivergence).unwrap();
        // 2024 >> 3 = 253, whose low digit 5 already differs from the leading 0.
        assert_eq!(vm.output(), &[5]);
        assert!(!vm.is_halted());
    }

    #[test]
    pub fn matches_program_for_quine_seed() {
        init();
        let mut vm = machine(vec![0, 3, 5, 4, 3, 0], 117440, 0, 0);
        vm.run(RunMode::UntilDivergence).unwrap();
        assert!(vm.is_halted());
        assert!(vm.matches_program());

        vm.reset(117440, 0, 0);
        assert_eq!(vm.steps(), 0);
        assert!(vm.output().is_empty());
        vm.run(RunMode::ToCompletion).unwrap();
        assert!(vm.matches_program());
    }

    #[test]
    pub fn divergence_runs_past_an_exact_match() {
        init();
        // An extra octal digit above the quine seed prints one more digit.
        let mut vm = machine(vec![0, 3, 5, 4, 3, 0], 117440 + (1 << 21), 0, 0);
        vm.run(RunMode::UntilDivergence).unwrap();
        assert_eq!(vm.output(), &[0, 3, 5, 4, 3, 0, 1]);
        assert!(!vm.matches_program());
    }

    #[test]
    pub fn unknown_opcode_is_fatal() {
        init();
        let mut vm = machine(vec![5, 1, 8, 0], 0, 0, 0);
        assert_eq!(
            vm.run(RunMode::ToCompletion),
            Err(MachineError::UnknownOpcode { op: 8, ip: 2 })
        );
        assert_eq!(vm.output(), &[1]);
    }

    #[test]
    pub fn reserved_operand_is_fatal() {
        init();
        let mut vm = machine(vec![5, 7], 0, 0, 0);
        assert_eq!(
            vm.step(),
            Err(MachineError::ReservedOperand { operand: 7, ip: 0 })
        );
    }

    #[test]
    pub fn negative_shift_is_fatal() {
        init();
        let mut vm = machine(vec![7, 5], 8, -1, 0);
        assert_eq!(
            vm.step(),
            Err(MachineError::NegativeShift { amount: -1, ip: 0 })
        );
    }

    #[test]
    pub fn step_after_halt_is_a_no_op() {
        init();
        let mut vm = run_to_completion(vec![1, 7], 0, 0, 0);
        let before = vm.cpu;
        vm.step().unwrap();
        assert_eq!(vm.cpu, before);
        assert_eq!(vm.steps(), 1);
    }
}
