use clap::Parser;
use lama_rs::bytefile::Bytefile;
use lama_rs::interpreter::Interpreter;
use std::fs::File;
use std::io::{self, Read};
use std::process::ExitCode;

/// Lama VM bytecode interpreter
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Path to the compiled bytecode image
    file: String,

    /// Parse the image and print its header metadata without executing it
    #[arg(long, default_value_t = false)]
    dump_header: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::open(&args.file)?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;

    let bytefile = Bytefile::parse(content)?;

    if args.dump_header {
        println!("{}", bytefile);
        return Ok(());
    }

    let stdin = io::BufReader::new(io::stdin());
    let stdout = io::stdout();
    let mut interp = Interpreter::new(bytefile, stdin, stdout);
    interp.run()?;

    Ok(())
}
