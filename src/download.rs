//! The single search → pick → save pass over one mailbox.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::mime;
use crate::models::{Candidate, DateMode, SearchWindow};
use crate::save;
use crate::search;

/// The server operations a run needs.
pub trait MailSource {
    fn select(&mut self, mailbox: &str) -> Result<(), String>;
    /// Message ids on or after `day`, in server order.
    fn search_since(&mut self, day: NaiveDate) -> Result<Vec<u32>, String>;
    /// Full raw bytes of one message.
    fn fetch_message(&mut self, id: u32) -> Result<Vec<u8>, String>;
    /// End the session. Failures are logged, not returned.
    fn finish(&mut self);
}

impl<T: MailSource + ?Sized> MailSource for &mut T {
    fn select(&mut self, mailbox: &str) -> Result<(), String> {
        (**self).select(mailbox)
    }

    fn search_since(&mut self, day: NaiveDate) -> Result<Vec<u32>, String> {
        (**self).search_since(day)
    }

    fn fetch_message(&mut self, id: u32) -> Result<Vec<u8>, String> {
        (**self).fetch_message(id)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

/// A connected but unauthenticated server.
pub trait Connector {
    type Session: MailSource;

    /// Authenticate. The error is the server's reason, suitable for display.
    fn login(self, username: &str, password: &str) -> Result<Self::Session, String>;
}

pub const APP_PASSWORD_HINT: &str =
    "Make sure you're using an App Password, not your regular account password.";

/// What to look for and where to put it.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub mailbox: &'a str,
    pub subject: &'a str,
    pub window: SearchWindow,
    pub window_minutes: i64,
    pub date_mode: DateMode,
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The mailbox could not be selected or searched.
    NoEmails,
    /// Nothing passed the date and subject filters.
    NoMatches,
    /// The newest match was processed; `saved` may be empty.
    Downloaded {
        matches: usize,
        subject: String,
        date: String,
        saved: Vec<PathBuf>,
    },
}

impl Outcome {
    pub fn saved_count(&self) -> usize {
        match self {
            Outcome::Downloaded { saved, .. } => saved.len(),
            _ => 0,
        }
    }
}

/// Log in, run one pass and end the session.
///
/// A rejected login prints the reason with [`APP_PASSWORD_HINT`] and returns
/// `Err` before anything is searched or fetched.
pub fn login_and_run<C: Connector>(
    connector: C,
    username: &str,
    password: &str,
    request: &Request<'_>,
) -> Result<Outcome, String> {
    let mut session = match connector.login(username, password) {
        Ok(s) => s,
        Err(e) => {
            println!("Login failed: {e}");
            println!("{APP_PASSWORD_HINT}");
            return Err(format!("Login failed: {e}"));
        }
    };
    println!("Connected successfully!");

    println!(
        "\nSearching for emails with subject containing: '{}'",
        request.subject
    );
    println!(
        "Looking for emails from the last {} minutes...",
        request.window_minutes
    );
    let outcome = run(&mut session, request);
    session.finish();
    Ok(outcome)
}

/// Process exit status for a finished run: 0 unless the login failed.
pub fn exit_status(result: &Result<Outcome, String>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Run one pass: select, search, filter, pick the newest match and save its
/// image attachments. Progress is printed as it happens.
pub fn run(source: &mut impl MailSource, request: &Request<'_>) -> Outcome {
    if let Err(e) = source.select(request.mailbox) {
        log::warn!("{}", e);
        println!("No emails found.");
        return Outcome::NoEmails;
    }

    let ids = match source.search_since(request.window.since_day()) {
        Ok(ids) => ids,
        Err(e) => {
            log::warn!("{}", e);
            println!("No emails found.");
            return Outcome::NoEmails;
        }
    };

    if ids.is_empty() {
        println!("{}", no_matches_line(request));
        return Outcome::NoMatches;
    }

    let matches = collect_matches(source, &ids, request);
    let match_count = matches.len();
    let Some(chosen) = search::most_recent(matches) else {
        println!("\n{}", no_matches_line(request));
        return Outcome::NoMatches;
    };

    println!("\nFound {} matching email(s).", match_count);
    println!("Processing most recent email: '{}'", chosen.subject);
    println!("Date: {}", chosen.date);

    let saved = save_images(&chosen, request.output_dir);
    if saved.is_empty() {
        println!("\nNo image attachments found in the most recent email.");
    } else {
        println!("\nTotal image attachments downloaded: {}", saved.len());
    }

    Outcome::Downloaded {
        matches: match_count,
        subject: chosen.subject,
        date: chosen.date,
        saved,
    }
}

fn no_matches_line(request: &Request<'_>) -> String {
    format!(
        "No emails found with subject '{}' in the last {} minutes.",
        request.subject, request.window_minutes
    )
}

/// Fetch and parse every id, keeping the ones inside the window whose subject
/// matches. Fetch and date failures skip that message only.
fn collect_matches(
    source: &mut impl MailSource,
    ids: &[u32],
    request: &Request<'_>,
) -> Vec<Candidate> {
    let mut matches = Vec::new();
    for &id in ids {
        let raw = match source.fetch_message(id) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Skipping message {id}: {e}");
                continue;
            }
        };
        let candidate = match mime::parse_candidate(id, raw, request.date_mode) {
            Ok(c) => c,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if !search::is_match(&candidate, &request.window, request.subject) {
            log::debug!(
                "Message {id} ({}, {:?}) does not match",
                candidate.timestamp,
                candidate.subject
            );
            continue;
        }
        matches.push(candidate);
    }
    matches
}

/// Write every image attachment of `candidate` into `dir`.
fn save_images(candidate: &Candidate, dir: &Path) -> Vec<PathBuf> {
    let attachments = match mime::image_attachments(&candidate.raw) {
        Ok(a) => a,
        Err(e) => {
            log::warn!("Message {}: {}", candidate.id, e);
            return Vec::new();
        }
    };

    let mut saved = Vec::new();
    for attachment in attachments {
        let Some(name) = save::safe_file_name(&attachment.filename) else {
            log::debug!("Skipping attachment with unusable name {:?}", attachment.filename);
            continue;
        };
        match save::save_new(dir, &name, &attachment.data) {
            Ok(path) => {
                println!("Downloaded: {}", path.display());
                saved.push(path);
            }
            Err(e) => log::error!("Could not save {name}: {e}"),
        }
    }
    saved
}
