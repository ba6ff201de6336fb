#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_yaml;
extern crate openssl;
extern crate imap;
extern crate chrono;
#[cfg(test)]
extern crate tempfile;

use openssl::ssl::{SslMethod, SslConnector};
use std::net::TcpStream;
use imap::{Client, Session};

pub mod errors {
    error_chain! {
        errors {
            ConfigUnreadable(path: String) {
                description("configuration file is unreadable")
                display("Cannot read configuration file")
            }
            ConfigSyntaxError {
                description("configuration file is not valid YAML")
                display("Syntax error in configuration file")
            }
            ConfigIncomplete(key: String) {
                description("required configuration key is missing")
                display("Incomplete configuration - receiving of mails not configured")
            }
            ConnectionError {
                description("cannot connect to the mail server")
                display("Invalid hostname, port or TLS settings")
            }
            AuthenticationError {
                description("login rejected")
                display("Invalid username or password")
            }
            FolderError(folder: String) {
                description("folder cannot be selected")
                display("Invalid folder")
            }
            SearchError {
                description("search failed")
                display("Failed to receive messages")
            }
            DeletionError(uid: u32) {
                description("flagging a message as deleted failed")
                display("Failed to flag message {} as deleted", uid)
            }
            ExpungeError(flagged: usize) {
                description("expunge failed")
                display("Failed to expunge, {} messages remain flagged as deleted", flagged)
            }
            AgeOutOfRange(days: u32) {
                description("age threshold out of range")
                display("Age of {} days is out of range", days)
            }
            ServerResponse(command: String, text: String) {
                description("server rejected a command")
                display("{} failed: {}", command, text)
            }
            ConnectionClosed {
                description("connection closed by server")
                display("Connection closed by server")
            }
            UnexpectedResponse(line: String) {
                description("unexpected server response")
                display("Unexpected server response: {}", line)
            }
            InvalidState(reason: String) {
                description("operation not allowed in the current state")
                display("Invalid state: {}", reason)
            }
        }

        foreign_links {
            Io(::std::io::Error);
            Imap(::imap::error::Error);
            SslStack(::openssl::error::ErrorStack);
            SslHandshake(::openssl::ssl::HandshakeError<::std::net::TcpStream>);
        }
    }
}
use errors::*;

mod tcpstream;
pub mod config;
pub mod cleaner;
pub mod utils;
pub use tcpstream::TCPStreamType;
use config::AccountConfig;

pub type IMAPSession = Session<TCPStreamType>;

/// How the connection is secured, derived from `tls` and `starttls`.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Transport {
    Plain,
    Tls,
    StartTls,
}

impl Transport {
    pub fn for_account(account: &AccountConfig) -> Result<Transport> {
        match (account.tls, account.starttls) {
            (false, false) => Ok(Transport::Plain),
            (true, false) => Ok(Transport::Tls),
            (false, true) => Ok(Transport::StartTls),
            (true, true) => bail!(ErrorKind::InvalidState("STARTTLS requested on a TLS connection".to_string())),
        }
    }
}

/// A greeted, not yet authenticated connection to the account's server.
pub struct IMAPConnection {
    account: AccountConfig,
    client: Client<TCPStreamType>,
    encrypted: bool,
}

impl IMAPConnection {
    pub fn new(account: AccountConfig) -> Result<IMAPConnection> {
        trace!("Initiate IMAP Connection");
        let transport = Transport::for_account(&account)?;
        let tcp_stream = TcpStream::connect((&account.host[..], account.port))?;
        let (client, encrypted) = match transport {
            Transport::Plain => {
                debug!("Creating a Plain TCP Connection");
                let mut client = Client::new(TCPStreamType::connect_plain(tcp_stream));
                read_greeting(&mut client)?;
                (client, false)
            }
            Transport::Tls => {
                debug!("Creating a SSL Connection");
                let connector = SslConnector::builder(SslMethod::tls())?.build();
                let stream = TCPStreamType::connect_ssl(&connector, &account.host, tcp_stream)?;
                let mut client = Client::new(stream);
                read_greeting(&mut client)?;
                (client, true)
            }
            Transport::StartTls => {
                debug!("Creating a Plain TCP Connection, upgrading with STARTTLS");
                let mut stream = TCPStreamType::connect_plain(tcp_stream);
                starttls(&mut stream)?;
                let connector = SslConnector::builder(SslMethod::tls())?.build();
                let stream = stream.upgrade(&connector, &account.host)?;
                debug!("Upgraded to TLS");
                // No second greeting follows a STARTTLS upgrade
                (Client::new(stream), true)
            }
        };
        trace!("Connection Established");

        Ok(IMAPConnection {
            account: account,
            client: client,
            encrypted: encrypted,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn login(self) -> Result<IMAPSession> {
        trace!("Attempting to Login as {}", self.account.user);
        let session = self.client
            .login(&self.account.user, &self.account.password)
            .map_err(|(e, _)| Error::from(e))?;
        debug!("Authenticated");
        Ok(session)
    }
}

fn read_greeting(client: &mut Client<TCPStreamType>) -> Result<()> {
    trace!("Reading Greeting from Server");
    let greeting = client.read_greeting()?;
    check_greeting(&String::from_utf8_lossy(&greeting))
}

fn check_greeting(greeting: &str) -> Result<()> {
    let greeting = greeting.trim_end();
    info!("S: {}", greeting);
    if !greeting.to_ascii_uppercase().starts_with("* OK") {
        bail!(ErrorKind::UnexpectedResponse(greeting.to_string()));
    }
    Ok(())
}

/// Negotiates STARTTLS on a fresh plain stream. The IMAP client only takes
/// the stream over once it is encrypted.
fn starttls(stream: &mut TCPStreamType) -> Result<()> {
    const LF: u8 = 0x0a;
    const TAG: &str = "a0";
    let mut buff = Vec::new();

    trace!("Reading Greeting from Server");
    if stream.read_until(LF, &mut buff)? == 0 {
        bail!(ErrorKind::ConnectionClosed);
    }
    check_greeting(&String::from_utf8_lossy(&buff))?;

    info!("C: {} STARTTLS", TAG);
    stream.write_string(&format!("{} STARTTLS", TAG))?;
    loop {
        buff.clear();
        if stream.read_until(LF, &mut buff)? == 0 {
            bail!(ErrorKind::ConnectionClosed);
        }
        let line = String::from_utf8_lossy(&buff).trim_end().to_string();
        info!("S: {}", line);
        if line.starts_with("* ") {
            continue;
        }
        let (tag, status) = {
            let mut words = line.split_whitespace();
            (words.next() == Some(TAG), words.next().map(|s| s.to_ascii_uppercase()))
        };
        if !tag {
            bail!(ErrorKind::UnexpectedResponse(line));
        }
        if status.as_ref().map(String::as_str) != Some("OK") {
            bail!(ErrorKind::ServerResponse("STARTTLS".to_string(), line));
        }
        return Ok(());
    }
}
