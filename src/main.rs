use clap::Parser;
use walkforward::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
