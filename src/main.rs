use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use quill::runner::{Outcome, Runner};

use anyhow::Context;
use clap::Parser as ClapParser;

/// The Quill interpreter. Runs a script when given a path, otherwise drops
/// into an interactive prompt.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; omit to start the REPL
    script: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.script.as_slice() {
        [] => run_prompt()?,

        [path] => {
            let code: i32 = run_file(path)?;
            std::process::exit(code);
        }

        _ => {
            eprintln!("Too many arguments passed.");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_file(path: &Path) -> anyhow::Result<i32> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );
    reader.read_to_end(&mut buf)?;

    let source: String = String::from_utf8(buf)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

    let mut runner: Runner<io::Stdout> = Runner::new(io::stdout());

    Ok(match runner.run(&source) {
        Outcome::Success => 0,
        Outcome::StaticError => 2,
        Outcome::RuntimeError => 3,
    })
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut runner: Runner<io::Stdout> = Runner::new(io::stdout());

    let mut input = String::new();
    loop {
        stdout.write_all(b"> ")?;
        stdout.flush()?;

        input.clear();
        let nbytes = stdin.lock().read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        // Diagnostics reset with every line; the interpreter (globals,
        // definitions, closures) carries over.
        runner.run(&input);
    }

    Ok(())
}
