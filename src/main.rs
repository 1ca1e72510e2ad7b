use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use octal_vm::{
    program::Program,
    search::{find_minimal_seed, SearchOptions, DEFAULT_WINDOW_BITS, DIGIT_BITS, MAX_WINDOW_BITS},
    Machine, RunMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Part {
    One,
    Two,
    Both,
}

/// Run a 3-bit program and search for the register A value that makes it print itself.
#[derive(Parser)]
#[command(name = "octal-vm", version)]
struct Args {
    /// Input file with the `Register A/B/C:` lines and the `Program:` listing.
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = Part::Both)]
    part: Part,

    /// Low bits of A tabulated per output digit.
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_BITS,
        value_parser = clap::value_parser!(u32).range(i64::from(DIGIT_BITS)..=i64::from(MAX_WINDOW_BITS))
    )]
    window_bits: u32,

    /// Trust the table and skip re-running the program on the found seed.
    #[arg(long)]
    no_verify: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let program: Program = source
        .parse()
        .with_context(|| format!("parsing {}", args.input.display()))?;
    info!(
        "loaded {} digits, a: {}, b: {}, c: {}",
        program.digits.len(),
        program.initial_a,
        program.initial_b,
        program.initial_c
    );

    if args.part != Part::Two {
        let mut vm = Machine::load(&program);
        vm.run(RunMode::ToCompletion)?;
        info!("{}", vm.cpu());
        println!("{}", vm.output_string());
    }

    if args.part != Part::One {
        let options = SearchOptions {
            window_bits: args.window_bits,
            verify: !args.no_verify,
        };
        match find_minimal_seed(&program, options)? {
            Some(seed) => println!("{}", seed),
            None => println!("no solution"),
        }
    }

    Ok(())
}
