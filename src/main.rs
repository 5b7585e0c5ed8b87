use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use neverlight_mail_grab::config::Config;
use neverlight_mail_grab::download::{self, Request};
use neverlight_mail_grab::imap::ImapConnection;
use neverlight_mail_grab::models::SearchWindow;
use neverlight_mail_grab::prompt;

/// Save the image attachments of the newest recent message whose subject matches.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subject text to look for (asked interactively when omitted)
    subject: Option<String>,

    /// Email address offered as the prompt default (overrides config and NEVERLIGHT_GRAB_USER)
    #[arg(long)]
    address: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// The address the prompt offers when left empty.
    fn default_address<'a>(&'a self, config: &'a Config) -> Option<&'a str> {
        self.address
            .as_deref()
            .or(config.default_address.as_deref())
            .filter(|a| !a.trim().is_empty())
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref());

    println!("Mail Image Attachment Downloader");
    println!("{}", "-".repeat(40));

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let address = match prompt::ask_with_default(
        &mut input,
        &mut output,
        "Enter your email address",
        cli.default_address(&config),
    ) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Could not read email address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let subject = match cli.subject.clone() {
        Some(s) => s,
        None => match prompt::ask_with_default(
            &mut input,
            &mut output,
            "Enter email subject",
            Some(config.default_subject.as_str()),
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Could not read subject: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let password = match prompt::ask_secret("Enter your App Password") {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Could not read password: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output_dir = match config.output_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(window) =
        SearchWindow::ending_at(Local::now().naive_local(), config.window_minutes)
    else {
        eprintln!(
            "Window of {} minutes is out of range",
            config.window_minutes
        );
        return ExitCode::FAILURE;
    };
    let request = Request {
        mailbox: &config.mailbox,
        subject: &subject,
        window,
        window_minutes: config.window_minutes,
        date_mode: config.date_mode,
        output_dir: &output_dir,
    };

    println!("\nConnecting to {}...", config.imap_server);
    let connection = match ImapConnection::connect(&config) {
        Ok(c) => c,
        Err(e) => {
            println!("Connection failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = download::login_and_run(connection, &address, &password, &request);
    drop(password);
    match &result {
        Ok(outcome) => {
            log::info!("Run finished: {} file(s) saved", outcome.saved_count());
            println!("\nDone!");
        }
        Err(e) => log::debug!("{e}"),
    }
    ExitCode::from(download::exit_status(&result))
}
