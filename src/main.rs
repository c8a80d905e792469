use clap::Parser;
use log::error;
use std::io;

use roster::fetch::fetch_text;
use roster::report::WriterReporter;
use roster::session::Session;

const ERROR_LOG: &str = "error.log";

/// Look up birthdays in a people CSV published at a URL.
#[derive(Debug, Parser)]
#[command(name = "birthday-lookup", version)]
struct Args {
    /// URL to the datafile
    #[arg(long)]
    url: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut reporter = match WriterReporter::create(ERROR_LOG) {
        Ok(reporter) => reporter,
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(1);
        }
    };

    let csv_text = match fetch_text(&args.url) {
        Ok(text) => text,
        Err(err) => {
            println!("Failed to download data: {:#}", err);
            std::process::exit(1);
        }
    };

    let table = roster::parse_records(&csv_text, &mut reporter);

    let stdin = io::stdin();
    let mut session = Session::new(&table, stdin.lock(), io::stdout());
    if let Err(err) = session.run() {
        error!("session ended: {}", err);
        std::process::exit(1);
    }
}
