mod report;

use std::io::{self, IsTerminal, Read};
use wikirender::{dialects, render_verbose_with};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let res = match render_verbose_with(&config.input, &config.dialect) {
        Ok(res) => res,
        Err(err) => {
            eprintln!("error: {err} (known dialects: {})", dialects::names().join(", "));
            std::process::exit(2);
        }
    };

    println!("{}", res.text);

    if config.show_errors {
        report::print_errors(&res, config.color);
    }
    if config.stats {
        report::print_metrics(&config.dialect, &res, config.color);
    }
    if config.strict && !res.errors.is_empty() {
        std::process::exit(1);
    }
}

struct CliConfig {
    input: String,
    dialect: String,
    show_errors: bool,
    strict: bool,
    stats: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut dialect = dialects::DEFAULT.to_string();
    let mut show_errors = false;
    let mut strict = false;
    let mut stats = false;
    let mut color = io::stderr().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("wikirender {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--errors" => show_errors = true,
            "--strict" => strict = true,
            "--stats" => stats = true,
            "--dialect" | "-d" => {
                dialect = args.next().ok_or_else(|| "error: --dialect expects a value".to_string())?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                set_input(&mut input, value)?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    set_input(&mut input, rest)?;
                }
                break;
            }
            _ if arg.starts_with("--dialect=") => {
                dialect = arg.trim_start_matches("--dialect=").to_string();
            }
            _ if arg.starts_with("--input=") => {
                set_input(&mut input, arg.trim_start_matches("--input=").to_string())?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None if io::stdin().is_terminal() => {
            return Err(format!("error: no input provided\n\n{}", help_text()));
        }
        None => read_stdin_input()?,
    };

    Ok(CliConfig { input, dialect, show_errors, strict, stats, color })
}

fn set_input(input: &mut Option<String>, value: String) -> Result<(), String> {
    if input.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *input = Some(value);
    Ok(())
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "wikirender {version}

Convert wiki markup to XHTML or DocBook.

Usage:
  wikirender [OPTIONS] [--] <text...>
  wikirender [OPTIONS] --input <text>
  wikirender [OPTIONS] < document.wiki

Options:
  -i, --input <text>         Markup to convert. If omitted, reads remaining args
                             or stdin when no args are provided.
  -d, --dialect <name>       Markup dialect: {names}.
                             Default: {default}
  --errors                   Report lines with unresolved inline markup on stderr.
  --strict                   Exit with status 1 when any line has unresolved markup.
  --stats                    Print render metrics on stderr.
  --color                    Force ANSI color in reports.
  --no-color                 Disable ANSI color in reports.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  RUST_LOG                   Log filter, e.g. wikirender=debug. Default: warn

Exit codes:
  0  Success.
  1  Unresolved markup with --strict.
  2  Invalid arguments, unknown dialect or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        names = dialects::names().join(", "),
        default = dialects::DEFAULT
    )
}
