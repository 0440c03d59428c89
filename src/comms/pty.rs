//! PTY (console) channel: reads lines from stdin, runs them through one
//! conversation session, prints the reply.
//!
//! Console commands: `/reset`, `/status`, `/actions`. Runs until the
//! shutdown token is cancelled (Ctrl-C) or stdin closes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};

use super::state::CommsState;

const ACTIONS_LIMIT: usize = 8;

pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

/// What a console line asks for.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput<'a> {
    Message(&'a str),
    Reset,
    Status,
    Actions,
    Unknown(&'a str),
}

fn classify(line: &str) -> Option<ConsoleInput<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line {
        "/reset" => ConsoleInput::Reset,
        "/status" => ConsoleInput::Status,
        "/actions" => ConsoleInput::Actions,
        cmd if cmd.starts_with('/') => ConsoleInput::Unknown(cmd),
        text => ConsoleInput::Message(text),
    })
}

async fn run_pty(channel_id: String, state: Arc<CommsState>, shutdown: CancellationToken) -> Result<(), AppError> {
    // Minted by the registry on the first message.
    let mut session_id: Option<Uuid> = None;
    info!(%channel_id, "pty channel started");
    println!("─────────────────────────────────────────────");
    println!(" Assistant console  (/reset /status /actions, Ctrl-C to quit)");
    println!("─────────────────────────────────────────────");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!(%channel_id, "pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => input,
                };
                let Some(cmd) = classify(&input) else { continue };
                debug!(?cmd, "pty input");

                match cmd {
                    ConsoleInput::Message(text) => {
                        let reply = state.send_message(session_id, text).await;
                        session_id = Some(reply.session_id);
                        println!("{}\n", reply.reply);
                        println!("{}", reply.status);
                    }
                    ConsoleInput::Reset => {
                        if let Some(id) = session_id {
                            state.reset_session(id).await;
                        }
                        println!("{}", state.idle_status());
                    }
                    ConsoleInput::Status => {
                        let snap = match session_id {
                            Some(id) => state.session_snapshot(id).await,
                            None => None,
                        };
                        match snap {
                            Some(snap) => println!("{}", snap.status),
                            None => println!("{}", state.idle_status()),
                        }
                    }
                    ConsoleInput::Actions => match state.recent_actions(ACTIONS_LIMIT) {
                        Ok(view) => println!("{}", view.panel),
                        Err(e) => println!("could not read outbox: {e}"),
                    },
                    ConsoleInput::Unknown(cmd) => {
                        println!("unknown command {cmd}; try /reset, /status or /actions");
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_console_lines() {
        assert_eq!(classify("   "), None);
        assert_eq!(classify("/reset"), Some(ConsoleInput::Reset));
        assert_eq!(classify(" /status "), Some(ConsoleInput::Status));
        assert_eq!(classify("/actions"), Some(ConsoleInput::Actions));
        assert_eq!(classify("/help"), Some(ConsoleInput::Unknown("/help")));
        assert_eq!(classify(" book a meeting "), Some(ConsoleInput::Message("book a meeting")));
    }
}
