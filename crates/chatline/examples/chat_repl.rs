//! # Chat REPL – the whole stack on stdin/stdout
//!
//! Loads the config file, opens the history store and chats with the
//! configured endpoint. Replies stream in place; `Ctrl-C` aborts the reply
//! that is currently streaming.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-…      # unless set in config.toml
//! RUST_LOG=chatline=debug cargo run -p chatline --example chat_repl
//! ```
//!
//! Type `/help` for the list of commands.

use std::io::Write as _;

use chatline::{
    SessionState, TurnOutcome,
    command::{Command, HELP},
    config::ChatlineConfig,
    openai::StreamingClient,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ChatlineConfig::load_default()?;
    let mut session = config.build_session()?;
    if !session.settings().has_api_key() {
        eprintln!("No API key: set OPENAI_API_KEY or api_key in the config file.");
    }

    let abort = session.abort_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !abort.abort() {
                std::process::exit(130);
            }
        }
    });

    println!("chatline · {} · /help for commands", session.settings().model);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Some(Ok(command)) => run_command(&mut session, &config, command).await?,
            Some(Err(err)) => println!("{err}"),
            None if line.trim().is_empty() => {}
            None => {
                let outcome = session.send(&line, vec![], render_delta()).await?;
                report(outcome);
            }
        }
    }

    Ok(())
}

async fn run_command(
    session: &mut SessionState<StreamingClient>,
    config: &ChatlineConfig,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Clear => {
            session.reset();
            println!("Chat cleared.");
        }
        Command::New => {
            session.reset();
            println!("New chat started.");
        }
        Command::Retry => match session.retry_last(render_delta()).await? {
            Some(outcome) => report(outcome),
            None => println!("Nothing to retry."),
        },
        Command::History => match session.history(config.history.list_limit).await {
            Ok(chats) if chats.is_empty() => println!("No saved chats."),
            Ok(chats) => {
                for chat in chats {
                    println!(
                        "{:>5}  {}  {:<14}  {}",
                        chat.id.0,
                        chat.timestamp.format("%Y-%m-%d %H:%M"),
                        chat.model.id(),
                        chat.preview
                    );
                }
            }
            Err(err) => println!("{err}"),
        },
        Command::Load(id) => match session.load_from_store(id).await {
            Ok(()) => {
                for message in session.transcript().iter() {
                    println!("[{}] {}", message.role, message.content.first_text().unwrap_or("[image]"));
                }
            }
            Err(err) => println!("{err}"),
        },
        Command::Export => println!("{}", session.export_markdown()),
        Command::Download => match session.download_json(".") {
            Ok(path) => println!("Saved {}", path.display()),
            Err(err) => println!("{err}"),
        },
        Command::Help => println!("{HELP}"),
    }
    Ok(())
}

/// Redraw the reply line with the latest cumulative text.
fn render_delta() -> impl FnMut(&str) {
    let mut shown = 0;
    move |text: &str| {
        print!("{}", text.get(shown..).unwrap_or(text));
        shown = text.len();
        let _ = std::io::stdout().flush();
    }
}

fn report(outcome: TurnOutcome) {
    match outcome {
        TurnOutcome::Completed { saved, .. } => {
            println!();
            if let Err(err) = saved {
                eprintln!("(not saved: {err})");
            }
        }
        TurnOutcome::Failed(failure) if failure.is_aborted() => println!("\n[aborted]"),
        TurnOutcome::Failed(failure) => println!("\n[{failure}]"),
    }
}
