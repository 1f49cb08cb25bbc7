//! Command line front-end of the prover.
//!
//! - `aigprove prove miter.aag` proves that the single output of a miter is always false
//! - `aigprove cec a.aag b.aag` checks two circuits with the same inputs are equivalent.
//!
//! Exit status: 0 when a verdict is reached (equivalent or not), 2 on timeout, 1 on error.

use std::{path::PathBuf, process::exit};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use aigprove::{
    Aig,
    miter::build_miter,
    prove::{NetworkHandle, ProofOutcome, ProveParams, ResourceBudget, StageSchedule, prove},
};

/// Escalating multi-engine prover for combinational AIG miters.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    params: ParamsArgs,

    /// Save the network the proof ended with (ASCII AIGER).
    #[arg(long, global = true)]
    write: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prove that the single output of a miter is always false.
    Prove {
        /// `.aag` or `.aig` file
        miter: PathBuf,
    },
    /// Check the combinational equivalence of two circuits.
    Cec {
        /// `.aag` or `.aig` file
        lhs: PathBuf,
        /// `.aag` or `.aig` file
        rhs: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ParamsArgs {
    /// Maximum number of iterations.
    #[arg(long, default_value_t = 6, global = true)]
    iters: u32,

    /// Use rewriting, refactoring and balancing.
    #[arg(long, default_value_t = true, global = true)]
    #[arg(action = clap::ArgAction::Set)]
    rewriting: bool,

    /// Use fraiging.
    #[arg(long, default_value_t = true, global = true)]
    #[arg(action = clap::ArgAction::Set)]
    fraiging: bool,

    /// Try a BDD collapse when the iterations are exhausted.
    #[arg(long, default_value_t = false, global = true)]
    #[arg(action = clap::ArgAction::Set)]
    bdds: bool,

    /// Print the progress of each stage.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Conflict limit of the first SAT attempt.
    #[arg(long, default_value_t = 5000, global = true)]
    mitering_start: u64,

    /// Growth of the SAT conflict limit at each iteration.
    #[arg(long, default_value_t = 2.0, global = true)]
    mitering_factor: f64,

    /// Number of local optimization steps of the first iteration.
    #[arg(long, default_value_t = 3, global = true)]
    rewriting_start: u64,

    /// Growth of the number of local optimization steps.
    #[arg(long, default_value_t = 1.0, global = true)]
    rewriting_factor: f64,

    /// Per-pair conflict limit of the first fraiging.
    #[arg(long, default_value_t = 2, global = true)]
    fraiging_start: u64,

    /// Growth of the per-pair fraiging conflict limit.
    #[arg(long, default_value_t = 8.0, global = true)]
    fraiging_factor: f64,

    /// Conflict limit of the last SAT attempt (0 for no limit).
    #[arg(long, default_value_t = 0, global = true)]
    last_resort_limit: u64,

    /// Global limit on SAT conflicts (0 for no limit).
    #[arg(long, default_value_t = 0, global = true)]
    work_limit: u64,

    /// Global limit on clause inspections (0 for no limit).
    #[arg(long, default_value_t = 0, global = true)]
    probe_limit: u64,

    /// Maximum number of BDD nodes.
    #[arg(long, default_value_t = 1_000_000, global = true)]
    bdd_node_limit: usize,

    /// Order BDD variables along a traversal of the network.
    #[arg(long, default_value_t = true, global = true)]
    #[arg(action = clap::ArgAction::Set)]
    bdd_reorder: bool,
}

impl From<&ParamsArgs> for ProveParams {
    fn from(args: &ParamsArgs) -> Self {
        ProveParams {
            iters: args.iters,
            use_rewriting: args.rewriting,
            use_fraiging: args.fraiging,
            use_bdds: args.bdds,
            verbose: args.verbose,
            mitering: StageSchedule::new(args.mitering_start, args.mitering_factor),
            rewriting: StageSchedule::new(args.rewriting_start, args.rewriting_factor),
            fraiging: StageSchedule::new(args.fraiging_start, args.fraiging_factor),
            last_resort_limit: args.last_resort_limit,
            budget: ResourceBudget::new(args.work_limit, args.probe_limit),
            bdd_node_limit: args.bdd_node_limit,
            bdd_reorder: args.bdd_reorder,
        }
    }
}

fn load(path: &PathBuf) -> anyhow::Result<Aig> {
    Aig::from_file(path).with_context(|| format!("failed to read AIG from {}", path.display()))
}

/// Builds the network to prove, strashed.
fn network(command: &Command) -> anyhow::Result<Aig> {
    match command {
        Command::Prove { miter } => {
            let aig = load(miter)?;
            Ok(aig.strash()?)
        }
        Command::Cec { lhs, rhs } => {
            let (a, b) = (load(lhs)?, load(rhs)?);
            build_miter(&a, &b).context("failed to build the miter")
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ProofOutcome> {
    let mut params = ProveParams::from(&cli.params);
    let mut handle = NetworkHandle::new(network(&cli.command)?);
    log::info!(
        "network: {} inputs, {} nodes, {} levels",
        handle.get().input_count(),
        handle.get().node_count(),
        handle.get().level_count()
    );

    let outcome = prove(&mut handle, &mut params)?;

    match (&cli.command, &outcome) {
        (Command::Cec { .. }, ProofOutcome::Unsat) => println!("Networks are equivalent."),
        (Command::Cec { .. }, ProofOutcome::Sat(_)) => println!("Networks are NOT equivalent."),
        (Command::Cec { .. }, ProofOutcome::Timeout) => println!("Networks are UNDECIDED."),
        (Command::Prove { .. }, _) => println!("{}", outcome),
    }
    if let Some(model) = outcome.model() {
        println!("counterexample: {}", model);
    }
    println!(
        "work = {}, probes = {}",
        params.budget.work_used, params.budget.probe_used
    );

    if let Some(path) = &cli.write {
        handle
            .get()
            .to_file(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(outcome)
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.params.verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();

    match run(&cli) {
        Ok(ProofOutcome::Timeout) => exit(2),
        Ok(_) => (),
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit(1);
        }
    }
}
