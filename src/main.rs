use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use treelox::lox::Lox;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts the interactive prompt when omitted
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::try_parse().unwrap_or_else(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),

        _ => {
            eprintln!("Usage: treelox [script]");
            process::exit(64);
        }
    });

    match args.script {
        Some(path) => run_file(&path),

        None => run_prompt(),
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    let mut lox = Lox::new(io::stdout());
    lox.run(&buf);

    if lox.had_error() {
        process::exit(65);
    }

    if lox.had_runtime_error() {
        process::exit(70);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lox = Lox::new(io::stdout());

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();

        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        lox.run(line.as_bytes());
        lox.clear_error();
    }

    Ok(())
}
