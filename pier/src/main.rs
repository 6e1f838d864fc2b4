use clap::{Parser, Subcommand};

mod auth;
mod cache;
mod config;
mod errors;
mod generate;
mod list;
mod palette;
mod scope;
mod tracing_support;

/// Build a kubeconfig from the clusters available in Palette.
#[derive(Debug, Parser)]
#[clap(name = "pier", version)]
struct Opt {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a kubeconfig covering every Palette cluster you can see.
    /// Contexts are named `<project>_<cluster>`.
    #[clap(visible_alias = "gen")]
    Generate(generate::Opt),

    /// List clusters and the context names `generate` would give them.
    #[clap(visible_alias = "ls")]
    List(list::Opt),
}

fn run() -> anyhow::Result<()> {
    let opt = Opt::parse();

    match &opt.cmd {
        Command::Generate(cmd) => generate::run(cmd),
        Command::List(cmd) => list::run(cmd),
    }
}

fn main() {
    tracing_support::initialize_tracing();
    if let Err(err) = run() {
        eprint!("{}", errors::DisplayCauses(&err));
        std::process::exit(errors::exit_code(&err));
    }
}
