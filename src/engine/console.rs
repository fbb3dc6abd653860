// src/engine/console.rs

//! Line-oriented control console on stdin.
//!
//! Each line is one command. The console only parses and forwards
//! [`ControlIntent`]s; it never touches supervisor state.
//!
//! Reading runs on a plain thread with blocking IO. A Tokio stdin read
//! would keep the runtime from shutting down until the user pressed enter.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ControlIntent;

pub const HELP: &str = "\
commands:
  start            enable supervision and start the command
  stop             stop the command and disable supervision
  toggle           flip between start and stop
  restart          restart the command now
  status           print the current state
  watch <path>     watch a different path
  dir <path>       working directory for the next start
  cmd <command>    command line for the next start
  help             show this text
  exit             stop everything and quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Intent(ControlIntent),
    Help,
    Empty,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let intent = match word {
        "" => return Ok(ConsoleCommand::Empty),
        "help" | "?" => return Ok(ConsoleCommand::Help),
        "start" => ControlIntent::SetRunning(true),
        "stop" => ControlIntent::SetRunning(false),
        "toggle" => ControlIntent::ToggleRunning,
        "restart" => ControlIntent::Restart,
        "status" => ControlIntent::Status,
        "exit" | "quit" => ControlIntent::Shutdown,
        "watch" | "dir" | "cmd" if rest.is_empty() => {
            return Err(format!("`{word}` needs an argument"));
        }
        "watch" => ControlIntent::SetWatchPath(PathBuf::from(rest)),
        "dir" => ControlIntent::SetWorkingDirectory(PathBuf::from(rest)),
        "cmd" => ControlIntent::SetCommand(rest.to_string()),
        other => return Err(format!("unknown command `{other}`; type `help`")),
    };
    Ok(ConsoleCommand::Intent(intent))
}

/// Read commands from `input` until EOF or until the loop goes away.
///
/// Blocks; must not be called from inside the async runtime.
pub fn run_console<R: BufRead>(input: R, tx: mpsc::Sender<ControlIntent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read console input");
                return;
            }
        };

        match parse_command(&line) {
            Ok(ConsoleCommand::Intent(intent)) => {
                if tx.blocking_send(intent).is_err() {
                    return;
                }
            }
            Ok(ConsoleCommand::Help) => eprintln!("{HELP}"),
            Ok(ConsoleCommand::Empty) => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }
    debug!("console input closed");
}

/// Run [`run_console`] on stdin in a background thread.
pub fn spawn_console(tx: mpsc::Sender<ControlIntent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rerun-console".into())
        .spawn(move || run_console(io::stdin().lock(), tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(line: &str) -> ControlIntent {
        match parse_command(line) {
            Ok(ConsoleCommand::Intent(i)) => i,
            other => panic!("expected an intent for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn simple_commands() {
        assert_eq!(intent("start"), ControlIntent::SetRunning(true));
        assert_eq!(intent("  stop "), ControlIntent::SetRunning(false));
        assert_eq!(intent("toggle"), ControlIntent::ToggleRunning);
        assert_eq!(intent("restart"), ControlIntent::Restart);
        assert_eq!(intent("status"), ControlIntent::Status);
        assert_eq!(intent("exit"), ControlIntent::Shutdown);
    }

    #[test]
    fn commands_with_arguments_keep_inner_spaces() {
        assert_eq!(
            intent("cmd cargo run  --release"),
            ControlIntent::SetCommand("cargo run  --release".into())
        );
        assert_eq!(intent("watch ./src"), ControlIntent::SetWatchPath("./src".into()));
        assert_eq!(intent("dir /tmp"), ControlIntent::SetWorkingDirectory("/tmp".into()));
    }

    #[test]
    fn helpful_errors() {
        assert!(parse_command("watch").unwrap_err().contains("needs an argument"));
        assert!(parse_command("explode").unwrap_err().contains("unknown command"));
        assert_eq!(parse_command("help"), Ok(ConsoleCommand::Help));
        assert_eq!(parse_command("   "), Ok(ConsoleCommand::Empty));
    }

    #[test]
    fn forwards_intents_until_eof() {
        let input: &[u8] = b"start\nbogus\n\nstatus\n";
        let (tx, mut rx) = mpsc::channel(8);
        run_console(input, tx);

        assert_eq!(rx.try_recv(), Ok(ControlIntent::SetRunning(true)));
        assert_eq!(rx.try_recv(), Ok(ControlIntent::Status));
        assert!(rx.try_recv().is_err());
    }
}
