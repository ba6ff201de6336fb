use openssl::ssl::{SslConnector, SslStream};
use std::net::TcpStream;
use std::io::{Read, BufRead, BufReader, Write, Error};
use errors::*;

/// The transport handed to the IMAP client, plain or wrapped in TLS.
#[derive(Debug)]
pub enum TCPStreamType {
    Plain(BufReader<TcpStream>),
    SSL(BufReader<SslStream<TcpStream>>),
}

impl Write for TCPStreamType {
    fn write(&mut self, buf: &[u8]) -> ::std::result::Result<usize, Error> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.get_mut().write(buf),
            TCPStreamType::SSL(ref mut stream) => stream.get_mut().write(buf),
        }
    }

    fn flush(&mut self) -> ::std::result::Result<(), Error> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.get_mut().flush(),
            TCPStreamType::SSL(ref mut stream) => stream.get_mut().flush(),
        }
    }
}

impl Read for TCPStreamType {
    fn read(&mut self, buf: &mut [u8]) -> ::std::result::Result<usize, Error> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.read(buf),
            TCPStreamType::SSL(ref mut stream) => stream.read(buf),
        }
    }
}

impl TCPStreamType {
    pub fn connect_plain(tcp_stream: TcpStream) -> TCPStreamType {
        TCPStreamType::Plain(BufReader::new(tcp_stream))
    }

    pub fn connect_ssl(connector: &SslConnector, domain: &str, tcp_stream: TcpStream) -> Result<TCPStreamType> {
        let stream = connector.connect(domain, tcp_stream)?;
        Ok(TCPStreamType::SSL(BufReader::new(stream)))
    }

    /// Wraps a plain connection in TLS after a successful STARTTLS.
    /// Anything the server sent ahead of the handshake is dropped.
    pub fn upgrade(self, connector: &SslConnector, domain: &str) -> Result<TCPStreamType> {
        match self {
            TCPStreamType::Plain(reader) => {
                if !reader.buffer().is_empty() {
                    warn!("Discarding {} bytes received before the TLS handshake", reader.buffer().len());
                }
                TCPStreamType::connect_ssl(connector, domain, reader.into_inner())
            }
            TCPStreamType::SSL(_) => Err(ErrorKind::InvalidState("TLS already established".to_string()).into()),
        }
    }

    /// Reads one response line during STARTTLS negotiation, before the IMAP
    /// client owns the stream.
    pub fn read_until(&mut self, byte: u8, buf: &mut Vec<u8>) -> ::std::result::Result<usize, Error> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.read_until(byte, buf),
            TCPStreamType::SSL(ref mut stream) => stream.read_until(byte, buf),
        }
    }

    pub fn write_string(&mut self, buf: &str) -> ::std::result::Result<(), Error> {
        self.write_all(format!("{}\r\n", buf).as_ref())?;
        self.flush()
    }
}
