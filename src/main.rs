//! Purpose: `ipset-bridge` CLI entry point.
//! Role: Binary crate root; parses args, runs one libipset command, streams listings on stdout.
//! Invariants: `list` writes libipset's XML to stdout verbatim, fragment by fragment.
//! Invariants: Errors are emitted as JSON on stderr unless stderr is a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ipset_bridge::api::{
    Command, ElementRequest, Error, ErrorKind, LibIpset, Sink, WriterSink, to_exit_code,
};

#[derive(Parser, Debug)]
#[command(
    name = "ipset-bridge",
    version,
    about = "Drive kernel ipsets through libipset",
    long_about = "Drive kernel ipsets through libipset.\n\n\
                  `list` prints the XML listing produced by libipset. `add`, `del` and `test` \
                  take the set name, the element, and type-specific options as KEY VALUE pairs.\n\n\
                  Set RUST_LOG (e.g. RUST_LOG=debug) to see diagnostics on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    #[command(about = "Print the XML listing of one set, or of all sets")]
    List {
        #[arg(help = "Set name (all sets when omitted)")]
        set: Option<String>,
    },
    #[command(about = "Add an element to a set")]
    Add(ElementArgs),
    #[command(about = "Delete an element from a set")]
    Del(ElementArgs),
    #[command(about = "Test whether an element is in a set")]
    Test(ElementArgs),
}

#[derive(Args, Debug)]
struct ElementArgs {
    #[arg(help = "Set name")]
    set: String,
    #[arg(help = "Element, e.g. 192.0.2.1 or 198.51.100.0/24")]
    element: String,
    #[arg(
        help = "Type-specific options as KEY VALUE pairs (e.g. timeout 60 comment web)",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    options: Vec<String>,
    #[arg(
        long = "no-exist",
        help = "Fail when the element already exists (add) or is missing (del)"
    )]
    no_exist: bool,
}

impl ElementArgs {
    fn request(&self) -> Result<ElementRequest, Error> {
        ElementRequest::new(&self.set, &self.element, &self.options)
            .map(|request| request.with_exist(!self.no_exist))
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `ipset-bridge --help` for usage."));
            }
        },
    };

    let library = LibIpset::new();
    let stdout = Arc::new(WriterSink::new(io::stdout()));
    let sink: Arc<dyn Sink> = stdout.clone();

    match cli.command {
        CliCommand::List { set } => library.list(set.as_deref(), sink)?,
        CliCommand::Add(args) => library.execute(Command::Add, &args.request()?, sink)?,
        CliCommand::Del(args) => library.execute(Command::Del, &args.request()?, sink)?,
        CliCommand::Test(args) => library.execute(Command::Test, &args.request()?, sink)?,
    }

    stdout.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush stdout")
            .with_source(err)
    })?;
    Ok(0)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .next()
        .map(|line| line.trim_start_matches("error: ").trim().to_string())
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<String>,
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::SessionInit => "failed to initialize ipset session".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Command => "ipset command failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> String {
    let report = ErrorReport {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: error_message(err),
            hint: err.hint(),
            code: err.code(),
            causes: error_causes(err),
        },
    };
    serde_json::to_string(&report).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    })
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(code) = err.code() {
        lines.push(format!("code: {code}"));
    }
    lines.join("\n")
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    eprintln!("{}", error_json(err));
}
