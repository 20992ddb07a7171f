use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings},
    ControllerSnapshot, HttpParticipantRepository, ParticipantController, Toast,
};
use shared::domain::ParticipantId;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "participants", about = "Manage the participants of a room")]
struct Cli {
    /// Backend base url; relative values are resolved against --origin.
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    room_id: Option<String>,
    #[arg(long)]
    admin_code: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the room's participants.
    List,
    /// Remove a member after confirmation.
    Remove {
        user_id: String,
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = &self.api_base {
            settings.api_base = v.clone();
        }
        if let Some(v) = &self.origin {
            settings.origin = v.clone();
        }
        if self.room_id.is_some() {
            settings.room_id = self.room_id.clone();
        }
        if self.admin_code.is_some() {
            settings.admin_code = self.admin_code.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.apply(load_settings()?);
    let resolved = settings.resolve()?;

    let repository = HttpParticipantRepository::new(resolved.api_base.clone());
    let controller =
        ParticipantController::new(Arc::new(repository), resolved.room_id, resolved.admin_code)?;

    controller.reload().await?;
    let snapshot = controller.snapshot().await;
    if let Some(toast) = &snapshot.toast {
        print_toast(toast);
        return Ok(ExitCode::FAILURE);
    }

    match cli.command {
        Command::List => {
            print_participants(&snapshot);
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { user_id, yes } => {
            let user_id = ParticipantId::from(user_id);
            controller.request_delete(&user_id).await?;

            let prompt = controller
                .snapshot()
                .await
                .confirmation_prompt()
                .unwrap_or_default();
            if !yes && !confirm(&prompt)? {
                controller.cancel_delete().await;
                println!("cancelled");
                return Ok(ExitCode::SUCCESS);
            }

            let toast = controller.confirm_delete().await?;
            print_toast(&toast);
            print_participants(&controller.snapshot().await);
            Ok(if toast.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn print_participants(snapshot: &ControllerSnapshot) {
    if snapshot.participants.is_empty() {
        println!("Немає учасників");
        return;
    }
    for participant in &snapshot.participants {
        let marker = if snapshot.can_remove(&participant.id) {
            "[remove]"
        } else {
            ""
        };
        println!(
            "{:<12} {:<20} {:<7} room {} {marker}",
            participant.id, participant.name, participant.role, participant.room_id
        );
    }
}

fn print_toast(toast: &Toast) {
    if toast.is_error() {
        eprintln!("error: {}", toast.message);
    } else {
        println!("{}", toast.message);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
