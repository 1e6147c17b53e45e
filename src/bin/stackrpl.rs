//! stackrpl command-line interface
//!
//! ```bash
//! stackrpl                      # interactive shell
//! stackrpl script.rpn           # run a script
//! stackrpl -e '3 4 ADD'         # evaluate and print the stack
//! ```

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use stackrpl::{Config, Feed, InterruptFlag, Interpreter, Session};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `stackrpl=debug`
const LOG_ENV: &str = "STACKRPL_LOG";

const PROMPT: &str = "rpl> ";
const CONTINUATION_PROMPT: &str = "...> ";

#[derive(Parser)]
#[command(name = "stackrpl", version)]
#[command(about = "Stack-based RPN scripting language", long_about = None)]
struct Cli {
    /// Script to run instead of starting the interactive shell
    script: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Namespace to start in
    #[arg(long, value_name = "NAME")]
    namespace: Option<String>,

    /// Evaluate SOURCE, print the resulting stack and exit
    #[arg(short, long, value_name = "SOURCE", conflicts_with = "script")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(namespace) = cli.namespace {
        config.session.namespace = namespace;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let interp = Interpreter::new(&config).with_interrupt(install_interrupt_handler());

    if let Some(source) = cli.eval {
        let mut session = Session::new(interp);
        return match session.feed_text(&source) {
            Ok(_) => {
                print_stack(&session);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if let Some(script) = cli.script {
        return run_script(interp, &script);
    }

    run_repl(Session::new(interp), &config)
}

/// Scripts stop at the first error
fn run_script(mut interp: Interpreter, path: &Path) -> ExitCode {
    let name = path.display().to_string();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: cannot read {name}: {e}");
            return ExitCode::FAILURE;
        }
    };
    match interp.run_source(&name, &text) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_repl(mut session: Session, config: &Config) -> ExitCode {
    println!("stackrpl {}", env!("CARGO_PKG_VERSION"));
    println!("Type HELP for the word list, WORD? for one word, EXIT or Ctrl-D to quit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: cannot initialize line editor: {e}");
            return ExitCode::FAILURE;
        }
    };
    let history = config.session.history_file.as_ref();
    if let Some(path) = history
        && let Err(e) = rl.load_history(path)
    {
        tracing::debug!(path = %path.display(), error = %e, "no history loaded");
    }

    loop {
        let prompt = if session.is_pending() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        };
        match rl.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match session.feed(&line) {
                    Feed::Ready => print_stack(&session),
                    Feed::NeedsMore => {}
                    Feed::Exit => break,
                }
            }
            // Ctrl-C abandons a continuation, otherwise it is ignored
            Err(ReadlineError::Interrupted) => session.cancel_pending(),
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(path) = history
        && let Err(e) = rl.save_history(path)
    {
        tracing::warn!(path = %path.display(), error = %e, "cannot save history");
    }
    println!("Goodbye!");
    ExitCode::SUCCESS
}

fn print_stack(session: &Session) {
    for line in session.stack_lines() {
        println!("{line}");
    }
}

/// Flag raised by SIGINT while a program is running; readline handles
/// Ctrl-C itself while waiting for input
static INTERRUPT: OnceLock<InterruptFlag> = OnceLock::new();

#[cfg(unix)]
extern "C" fn on_sigint(_: libc::c_int) {
    if let Some(flag) = INTERRUPT.get() {
        flag.raise();
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn install_interrupt_handler() -> InterruptFlag {
    let flag = INTERRUPT.get_or_init(InterruptFlag::new).clone();
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        tracing::warn!("cannot install SIGINT handler");
    }
    flag
}

#[cfg(not(unix))]
fn install_interrupt_handler() -> InterruptFlag {
    INTERRUPT.get_or_init(InterruptFlag::new).clone()
}
