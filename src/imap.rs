use std::net::TcpStream;

use chrono::NaiveDate;
use native_tls::{TlsConnector, TlsStream};

use crate::config::Config;
use crate::download::{Connector, MailSource};

type TlsClient = ::imap::Client<TlsStream<TcpStream>>;

/// A TLS connection to the server that has not authenticated yet.
pub struct ImapConnection {
    client: TlsClient,
    server: String,
}

impl std::fmt::Debug for ImapConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConnection")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl ImapConnection {
    /// Open a TLS session to the configured server.
    pub fn connect(config: &Config) -> Result<Self, String> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| format!("Failed to set up TLS: {}", e))?;

        log::debug!("Connecting to {}:{}", config.imap_server, config.imap_port);
        let client = ::imap::connect(
            (config.imap_server.as_str(), config.imap_port),
            &config.imap_server,
            &tls,
        )
        .map_err(|e| format!("IMAP connection failed: {}", e))?;

        Ok(ImapConnection {
            client,
            server: config.imap_server.clone(),
        })
    }
}

impl Connector for ImapConnection {
    type Session = ImapSession;

    fn login(self, username: &str, password: &str) -> Result<ImapSession, String> {
        log::debug!("LOGIN {username:?} on {}", self.server);
        let session = self
            .client
            .login(username, password)
            .map_err(|(e, _client)| e.to_string())?;
        log::info!("Authenticated as {username} on {}", self.server);
        Ok(ImapSession { session })
    }
}

/// An authenticated IMAP session.
pub struct ImapSession {
    session: ::imap::Session<TlsStream<TcpStream>>,
}

impl std::fmt::Debug for ImapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapSession").finish_non_exhaustive()
    }
}

/// `SINCE` search criterion for a calendar day, e.g. `SINCE 05-Mar-2024`.
pub fn since_query(day: NaiveDate) -> String {
    format!("SINCE {}", day.format("%d-%b-%Y"))
}

impl MailSource for ImapSession {
    fn select(&mut self, mailbox: &str) -> Result<(), String> {
        let selected = self
            .session
            .select(mailbox)
            .map_err(|e| format!("Failed to select {mailbox}: {}", e))?;
        log::debug!("Selected {mailbox}: {} messages", selected.exists);
        Ok(())
    }

    fn search_since(&mut self, day: NaiveDate) -> Result<Vec<u32>, String> {
        let query = since_query(day);
        let found = self
            .session
            .search(&query)
            .map_err(|e| format!("SEARCH {query} failed: {}", e))?;
        let mut ids: Vec<u32> = found.into_iter().collect();
        ids.sort_unstable();
        log::debug!("SEARCH {query}: {} hits", ids.len());
        Ok(ids)
    }

    fn fetch_message(&mut self, id: u32) -> Result<Vec<u8>, String> {
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| format!("Failed to fetch message {id}: {}", e))?;
        let body = fetches
            .iter()
            .find_map(|f| f.body())
            .map(<[u8]>::to_vec);
        body.ok_or_else(|| format!("Message {id} came back without a body"))
    }

    fn finish(&mut self) {
        if let Err(e) = self.session.close() {
            log::debug!("IMAP CLOSE failed: {}", e);
        }
        if let Err(e) = self.session.logout() {
            log::warn!("IMAP LOGOUT failed: {}", e);
        }
    }
}
