//! care-chat - terminal patient chat
//!
//! Runs one patient's conversation session over stdin/stdout with the
//! canned assistant. Logs go to stderr as JSON.

use care_portal::fixtures;
use care_portal::reply::{CannedReplyGenerator, LoggingGenerator};
use care_portal::roster::{self, Patient};
use care_portal::runtime::{SessionEvent, SessionHandle, SessionManager};
use care_portal::{Message, Phase, Sender, SessionConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str =
    "Commands: /flag <n> (assistant replies only), /flagged, /cancel, /patients [term], /quit";

/// One line of user input
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Send(&'a str),
    Flag(usize),
    Flagged,
    Cancel,
    Patients(&'a str),
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Send(line);
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));

    match name {
        "flag" => arg.parse().map_or(Input::Unknown(line), Input::Flag),
        "flagged" => Input::Flagged,
        "cancel" => Input::Cancel,
        "patients" => Input::Patients(arg),
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line),
    }
}

/// Pick the message a `/flag <n>` refers to.
///
/// The patient can ask for an assistant reply to be reviewed. Their own
/// messages are only flagged by the assistant or a clinician.
fn flag_target(messages: &[Message], index: usize) -> Result<&Message, String> {
    let message = index
        .checked_sub(1)
        .and_then(|i| messages.get(i))
        .ok_or_else(|| format!("No message {index}"))?;
    if message.sender() == Sender::Patient {
        return Err(format!(
            "Message {index} is yours; only assistant replies can be flagged here"
        ));
    }
    Ok(message)
}

fn render(index: usize, message: &Message) -> String {
    let marker = if message.is_flagged() { " [flagged]" } else { "" };
    format!(
        "[{index}] {} {}: {}{marker}",
        message.timestamp().format("%H:%M"),
        message.sender(),
        message.content()
    )
}

fn render_patient(patient: &Patient) -> String {
    format!(
        "{:>3}  {:<18} {:<9} {} ({})",
        patient.id,
        patient.name,
        patient.status,
        patient.concerns.join(", "),
        patient.last_contact
    )
}

/// Print assistant output as it arrives
async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Message { message }) => {
                if message.sender() == Sender::Assistant {
                    println!("{}: {}", message.sender(), message.content());
                }
            }
            Ok(SessionEvent::PhaseChange {
                phase: Phase::AwaitingReply,
            }) => println!("(assistant is typing...)"),
            Ok(SessionEvent::Error { message }) => println!("! {message}"),
            Ok(SessionEvent::Flagged { message_id }) => {
                println!("Message {message_id} flagged for clinician attention");
            }
            Ok(SessionEvent::PhaseChange { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn handle_line(
    handle: &SessionHandle,
    patients: &[Patient],
    line: &str,
) -> Result<bool, care_portal::SessionError> {
    match parse_input(line) {
        Input::Send("") => {}
        // Rejections are already printed from the error event
        Input::Send(text) => {
            let _ = handle.send_message(text).await;
        }
        Input::Flag(index) => {
            let snapshot = handle.snapshot().await?;
            match flag_target(&snapshot.messages, index) {
                Ok(message) => {
                    if !handle.flag(message.id().clone()).await? {
                        println!("Message {index} is already flagged");
                    }
                }
                Err(refusal) => println!("{refusal}"),
            }
        }
        Input::Flagged => {
            let snapshot = handle.snapshot().await?;
            let mut any = false;
            for (i, message) in snapshot.messages.iter().enumerate() {
                if message.is_flagged() {
                    println!("{}", render(i + 1, message));
                    any = true;
                }
            }
            if !any {
                println!("No flagged messages");
            }
        }
        Input::Cancel => {
            if !handle.cancel().await? {
                println!("Nothing to cancel");
            }
        }
        Input::Patients(term) => {
            for patient in roster::search(patients, term) {
                println!("{}", render_patient(patient));
            }
        }
        Input::Quit => return Ok(false),
        Input::Unknown(line) => {
            println!("Unknown command: {line}");
            println!("{HELP}");
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "care_portal=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = SessionConfig::from_env();
    let patients = fixtures::patients();
    let patient = roster::find(&patients, &config.patient_id)
        .ok_or_else(|| format!("Unknown patient id {}", config.patient_id))?;

    let generator = LoggingGenerator::new(CannedReplyGenerator::from_config(&config));
    let manager = SessionManager::new(config, generator);
    tracing::info!(
        patient_id = %patient.id,
        reply_timeout_secs = manager.config().reply_timeout.as_secs(),
        "Starting care chat"
    );
    let handle = manager
        .open(&patient.id, vec![fixtures::patient_greeting()])
        .await?;

    println!("Chatting as {} ({})", patient.name, patient.status);
    for (i, message) in handle.snapshot().await?.messages.iter().enumerate() {
        println!("{}", render(i + 1, message));
    }

    let printer = tokio::spawn(print_events(handle.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&handle, &patients, &line).await? {
            break;
        }
    }

    manager.close(&patient.id).await;
    printer.abort();
    Ok(())
}
