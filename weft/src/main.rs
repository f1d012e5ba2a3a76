use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};

use weft_lib::{Config, Grammar, ParseResult, ParseRun, StatsListener, TraceListener};
use weft_value::{format, Value};

mod arith;
mod json;

/// Grammars built into the binary
#[derive(Clone, Copy, Debug, ValueEnum)]
enum GrammarName {
    /// Integer calculator with `+ - * /` and parentheses
    Arith,
    /// JSON documents
    Json,
}

/// Enumeration of all sub commands supported by this binary
#[derive(Subcommand)]
enum Commands {
    /// Run a grammar against an input file.  If the input file is not
    /// provided, the user will be dropped into an interactive shell.
    Run {
        /// Grammar to be executed
        #[arg(short, long, value_enum)]
        grammar: GrammarName,

        /// Path to the content to be matched against the grammar;
        /// Omitting it will drop you in an interactive shell
        #[arg(short, long)]
        input_file: Option<PathBuf>,

        /// How values are printed out: compact, indented or debug
        #[arg(short, long)]
        output_format: Option<String>,

        /// Print every rule invocation after each run
        #[arg(long)]
        trace: bool,

        /// Print how many times each rule was tried before exiting
        #[arg(long)]
        stats: bool,

        /// Maximum nesting of rule invocations, unlimited if zero
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Print out the rules of a grammar
    Show {
        #[arg(short, long, value_enum)]
        grammar: GrammarName,
    },
}

/// weft matches inputs against parsing expression grammars
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug)]
pub enum Error {
    RuntimeError(weft_lib::Error),
    IOError(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::RuntimeError(e) => write!(f, "Runtime Error: {}", e),
            Error::IOError(e) => write!(f, "Input/Output Error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IOError(e)
    }
}

impl From<weft_lib::Error> for Error {
    fn from(e: weft_lib::Error) -> Self {
        Error::RuntimeError(e)
    }
}

type FormattingFunc = fn(v: &Value) -> String;

fn formatter(name: &str) -> FormattingFunc {
    match name {
        "compact" => format::compact,
        "indented" => format::indented,
        "debug" => format::raw,
        _ => {
            warn!("unknown output format {}, using compact", name);
            format::compact
        }
    }
}

fn load(name: GrammarName) -> Result<Grammar<Value>, Error> {
    let grammar = match name {
        GrammarName::Arith => arith::grammar()?,
        GrammarName::Json => json::grammar()?,
    };
    Ok(grammar)
}

/// A parse run plus the bits needed to report on it
struct Session {
    run: ParseRun<Value>,
    fmt: FormattingFunc,
    trace: Option<TraceListener>,
    stats: Option<StatsListener>,
}

impl Session {
    fn eval(&mut self, input: &str) -> Result<(), Error> {
        let result = self.run.run_str(input);
        if let Some(trace) = &self.trace {
            for line in trace.lines() {
                println!("{}", line);
            }
            trace.clear();
        }
        self.report(&result?);
        Ok(())
    }

    fn report(&self, result: &ParseResult<Value>) {
        if result.matched_entire_input {
            match result.top_value() {
                Some(v) => println!("{}", (self.fmt)(v)),
                None => println!("matched"),
            }
            return;
        }
        match &result.failure {
            Some(failure) => println!("no match at {}", failure),
            None => println!("matched only {:?}", result.matched_text),
        }
    }

    fn finish(&self) {
        if let Some(stats) = &self.stats {
            print!("{}", stats.stats());
        }
    }
}

fn shell(session: &mut Session) -> Result<(), Error> {
    loop {
        // display prompt
        print!("weft% ");
        io::stdout().flush()?;

        // read the next line typed in
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;

        // handle Ctrl-D
        if line.is_empty() {
            println!();
            break;
        }

        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            continue;
        }

        // errors abort a single line, not the whole shell
        if let Err(e) = session.eval(line) {
            println!("{}", e);
        }
    }
    Ok(())
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match &cli.command {
        None => {}
        Some(Commands::Show { grammar }) => {
            print!("{}", load(*grammar)?);
        }
        Some(Commands::Run {
            grammar,
            input_file,
            output_format,
            trace,
            stats,
            max_depth,
        }) => {
            let config = match max_depth {
                Some(0) => Config::unbounded(),
                Some(n) => Config::default().with_max_depth(*n),
                None => Config::default(),
            };
            let mut run = ParseRun::with_config(Arc::new(load(*grammar)?), config);
            let trace = trace.then(TraceListener::new);
            if let Some(t) = &trace {
                run.add_listener(t.clone());
            }
            let stats = stats.then(StatsListener::new);
            if let Some(s) = &stats {
                run.add_listener(s.clone());
            }
            let mut session = Session {
                run,
                fmt: formatter(output_format.as_deref().unwrap_or("compact")),
                trace,
                stats,
            };

            match input_file {
                Some(input_file) => {
                    let input_data = fs::read_to_string(input_file)?;
                    session.eval(&input_data)?;
                }
                None => shell(&mut session)?,
            }
            session.finish();
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        println!("{}", e);
    }
}
