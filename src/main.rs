use clap::Parser;

use movie_shelf::cli::{self, Cli};

fn main() {
    let args = Cli::parse();
    if let Err(err) = cli::execute(args) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
