//! Entrypoint for CLI
use std::{env, error::Error, fs, path::Path, process};

use jack::{prelude::*, IMPL_VERSION};
use log::{error, info};

static USAGE: &str = r#"
usage: jackc CMD TARGET

commands:
    build   Compile the target .jack file, or every .jack file in the target directory
    tokens  Print the token stream of the target .jack file

examples:
    jackc build Square.jack
    jackc build src/
    jackc tokens Square.jack
"#;

fn run_build(target: impl AsRef<str>) -> Result<(), Box<dyn Error>> {
    let target = Path::new(target.as_ref());

    if target.is_dir() {
        for entry in fs::read_dir(target)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "jack") {
                build_file(&path)?;
            }
        }
        Ok(())
    } else {
        build_file(target)
    }
}

/// Compiles one source file, writing the VM instructions to a file
/// of the same name with a `.vm` extension.
fn build_file(source_path: &Path) -> Result<(), Box<dyn Error>> {
    info!("compiling {}", source_path.display());

    let source_code = fs::read_to_string(source_path)?;

    match jack::compile(source_code) {
        Ok(vm_code) => {
            let out_path = source_path.with_extension("vm");
            fs::write(&out_path, vm_code)?;
            info!("wrote {}", out_path.display());
            Ok(())
        }
        Err(err) => {
            error!("{}: {}", source_path.display(), err);
            // Exit process with error
            Err(err.into())
        }
    }
}

fn run_tokens(target: impl AsRef<str>) -> Result<(), Box<dyn Error>> {
    let source_code = fs::read_to_string(target.as_ref())?;

    let lexer = Lexer::new(source_code.as_str());
    let source = lexer.source_code();

    println!(" position |   offset | token              | fragment");
    for result in lexer {
        let token = result?;
        let position = format!("{}:{}", token.span.line, token.span.column);
        let offset = format!("{}..{}", token.span.start, token.span.end);
        let kind = format!("{:?}", token.kind); // cannot format debug print {:?} into columns
        let fragment = token.span.fragment(source);
        println!("{position:>9} {offset:>8} {kind: <18} {fragment:?}");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Build { target }) => run_build(target)?,
        Some(Cmd::Tokens { target }) => run_tokens(target)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => match cmd.as_str() {
            "build" => Some(Cmd::Build {
                target: consume_arg(args)?,
            }),
            "tokens" => Some(Cmd::Tokens {
                target: consume_arg(args)?,
            }),
            _ => None,
        },
        None => None,
    }
}

/// Consumes the next argument, and prints the usage text if it doesn't exist.
fn consume_arg(mut args: impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Jack compiler v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Compile source files
    Build { target: String },
    /// Dump the token stream
    Tokens { target: String },
}
