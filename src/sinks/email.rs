//! Email sink for critical alerts
//!
//! Each accepted record becomes one message: the subject is
//! `<subject_prefix>: <message>` and the body is the formatted record,
//! traceback included. Delivery goes through a [`MailTransport`]; the
//! bundled [`SmtpTransport`] speaks SMTP with `STARTTLS` and `AUTH LOGIN`.

use crate::core::error::{LoggerError, Result};
use crate::core::{LogRecord, OutputFormat, Sink, TimestampFormat};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use chrono::Utc;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Default subject prefix of alert messages.
pub const DEFAULT_SUBJECT_PREFIX: &str = "Critical error";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One outgoing alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Headers and body in wire form, lines terminated by CRLF.
    pub fn to_rfc5322(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to.join(", ")));
        out.push_str(&format!("Subject: {}\r\n", header_safe(&self.subject)));
        out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        out.push_str("Content-Transfer-Encoding: 8bit\r\n");
        out.push_str("\r\n");
        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

fn header_safe(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Delivers alert messages
pub trait MailTransport: Send {
    fn send(&mut self, message: &EmailMessage) -> Result<()>;

    /// Check that the transport can reach its server, without sending mail.
    fn verify(&mut self) -> Result<()> {
        Ok(())
    }

    /// Host name used in diagnostics
    fn host(&self) -> &str;
}

impl<T: MailTransport + ?Sized> MailTransport for Box<T> {
    fn send(&mut self, message: &EmailMessage) -> Result<()> {
        (**self).send(message)
    }

    fn verify(&mut self) -> Result<()> {
        (**self).verify()
    }

    fn host(&self) -> &str {
        (**self).host()
    }
}

/// Transport security of an [`SmtpTransport`] session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Upgrade with `STARTTLS` after the first `EHLO`; fail if the server
    /// refuses (default)
    #[default]
    StartTls,
    /// Stay on plain TCP. Credentials are only sent when plaintext
    /// authentication was allowed explicitly.
    None,
}

/// SMTP client with `STARTTLS` and `AUTH LOGIN`
///
/// One connection per message. Server certificates are checked against the
/// Mozilla root store.
///
/// # Example
///
/// ```no_run
/// use master_logger::sinks::{MailTransport, SmtpTransport};
///
/// let mut transport = SmtpTransport::new("smtp.example.com", 587)
///     .with_credentials("alerts@example.com", "secret");
/// transport.verify().unwrap();
/// ```
#[derive(Clone)]
pub struct SmtpTransport {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    timeout: Duration,
    client_name: String,
    security: SmtpSecurity,
    allow_plaintext_auth: bool,
}

impl SmtpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            client_name: "localhost".to_string(),
            security: SmtpSecurity::default(),
            allow_plaintext_auth: false,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Connect, read and write timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name announced in `EHLO`
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    #[must_use]
    pub fn with_security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    /// Permit `AUTH` on a connection without TLS (off by default).
    #[must_use]
    pub fn allow_plaintext_auth(mut self, allowed: bool) -> Self {
        self.allow_plaintext_auth = allowed;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn security(&self) -> SmtpSecurity {
        self.security
    }

    fn error(&self, message: impl Into<String>) -> LoggerError {
        LoggerError::transport(format!("{}:{}", self.host, self.port), message)
    }

    fn connect(&self) -> Result<SmtpSession<'_>> {
        // Checked before any byte goes out
        if self.credentials.is_some()
            && self.security == SmtpSecurity::None
            && !self.allow_plaintext_auth
        {
            return Err(self.error(
                "refusing to send credentials without TLS; use STARTTLS or allow plaintext auth",
            ));
        }

        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.error(format!("cannot resolve address: {}", e)))?
            .next()
            .ok_or_else(|| self.error("address resolved to nothing"))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| self.error(format!("connect failed: {}", e)))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        let mut session = SmtpSession {
            transport: self,
            stream: BufReader::new(SmtpStream::Plain(stream)),
        };

        session.expect(220, "greeting")?;
        session.command(&format!("EHLO {}", self.client_name), 250)?;
        if self.security == SmtpSecurity::StartTls {
            session.command("STARTTLS", 220)?;
            session = session.upgrade()?;
            session.command(&format!("EHLO {}", self.client_name), 250)?;
        }
        if let Some((username, password)) = &self.credentials {
            session.command("AUTH LOGIN", 334)?;
            session.exchange(&B64.encode(username), "AUTH username", 334)?;
            session.exchange(&B64.encode(password), "AUTH password", 235)?;
        }
        Ok(session)
    }
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.credentials.as_ref().map(|(u, _)| u))
            .field("timeout", &self.timeout)
            .field("security", &self.security)
            .finish()
    }
}

impl MailTransport for SmtpTransport {
    fn send(&mut self, message: &EmailMessage) -> Result<()> {
        let mut session = self.connect()?;

        session.command(&format!("MAIL FROM:<{}>", message.from), 250)?;
        for recipient in &message.to {
            session.command(&format!("RCPT TO:<{}>", recipient), 250)?;
        }
        session.command("DATA", 354)?;
        session.write_data(&message.to_rfc5322())?;
        session.expect(250, "end of data")?;
        session.quit();
        Ok(())
    }

    fn verify(&mut self) -> Result<()> {
        self.connect()?.quit();
        Ok(())
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Client configuration shared by every TLS session.
fn tls_config() -> Result<Arc<ClientConfig>> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    if let Some(config) = CONFIG.get() {
        return Ok(Arc::clone(config));
    }

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| LoggerError::other(format!("TLS configuration failed: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::clone(CONFIG.get_or_init(|| Arc::new(config))))
}

enum SmtpStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for SmtpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SmtpStream::Plain(s) => s.read(buf),
            SmtpStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for SmtpStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            SmtpStream::Plain(s) => s.write(buf),
            SmtpStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            SmtpStream::Plain(s) => s.flush(),
            SmtpStream::Tls(s) => s.flush(),
        }
    }
}

struct SmtpSession<'a> {
    transport: &'a SmtpTransport,
    stream: BufReader<SmtpStream>,
}

impl<'a> SmtpSession<'a> {
    /// Switch the connection to TLS after a `220` reply to `STARTTLS`.
    fn upgrade(self) -> Result<SmtpSession<'a>> {
        let transport = self.transport;
        // Bytes sent before the handshake must not be read as TLS replies
        if !self.stream.buffer().is_empty() {
            return Err(transport.error("unexpected data after STARTTLS"));
        }
        let mut tcp = match self.stream.into_inner() {
            SmtpStream::Plain(tcp) => tcp,
            SmtpStream::Tls(_) => return Err(transport.error("session is already encrypted")),
        };

        let server_name = ServerName::try_from(transport.host.clone())
            .map_err(|e| transport.error(format!("invalid TLS server name: {}", e)))?;
        let mut connection = ClientConnection::new(tls_config()?, server_name)
            .map_err(|e| transport.error(format!("TLS setup failed: {}", e)))?;
        while connection.is_handshaking() {
            connection
                .complete_io(&mut tcp)
                .map_err(|e| transport.error(format!("TLS handshake failed: {}", e)))?;
        }

        Ok(SmtpSession {
            transport,
            stream: BufReader::new(SmtpStream::Tls(Box::new(StreamOwned::new(connection, tcp)))),
        })
    }

    fn command(&mut self, line: &str, expected: u16) -> Result<String> {
        let verb = line.split_whitespace().next().unwrap_or("command");
        self.exchange(line, verb, expected)
    }

    /// Send `line` and check the reply; errors name `step`, never the line.
    fn exchange(&mut self, line: &str, step: &str, expected: u16) -> Result<String> {
        let writer = self.stream.get_mut();
        write!(writer, "{}\r\n", line)
            .and_then(|_| writer.flush())
            .map_err(|e| self.transport.error(format!("write failed during {}: {}", step, e)))?;
        self.expect(expected, step)
    }

    /// Read one (possibly multi-line) reply and check its code.
    fn expect(&mut self, expected: u16, step: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            let read = self
                .stream
                .read_line(&mut line)
                .map_err(|e| self.transport.error(format!("read failed during {}: {}", step, e)))?;
            if read == 0 {
                return Err(self
                    .transport
                    .error(format!("connection closed during {}", step)));
            }

            let line = line.trim_end();
            let code: u16 = line
                .get(..3)
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| self.transport.error(format!("malformed reply '{}'", line)))?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line.get(4..).unwrap_or(""));

            // "250-..." continues, "250 ..." ends the reply
            if line.as_bytes().get(3) != Some(&b'-') {
                if code != expected {
                    return Err(self.transport.error(format!(
                        "{} rejected: {} {}",
                        step, code, text
                    )));
                }
                return Ok(text);
            }
        }
    }

    /// Send a message body with dot-stuffing and the terminating `.` line.
    fn write_data(&mut self, data: &str) -> Result<()> {
        let mut buffer = String::with_capacity(data.len() + 8);
        for line in data.lines() {
            if line.starts_with('.') {
                buffer.push('.');
            }
            buffer.push_str(line);
            buffer.push_str("\r\n");
        }
        buffer.push_str(".\r\n");
        let writer = self.stream.get_mut();
        writer
            .write_all(buffer.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| self.transport.error(format!("write failed during DATA: {}", e)))
    }

    fn quit(mut self) {
        // The message is already accepted; a failed QUIT changes nothing
        let _ = self.command("QUIT", 221);
    }
}

/// Sends every accepted record as an email
///
/// Usually registered with a CRITICAL floor and wrapped in a
/// [`BackgroundSink`](super::BackgroundSink) so that SMTP round trips stay
/// off the logging thread.
pub struct EmailSink {
    transport: Box<dyn MailTransport>,
    sender: String,
    recipients: Vec<String>,
    subject_prefix: String,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
}

impl EmailSink {
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] when the sender or any
    /// recipient is not an address, or there are no recipients.
    pub fn new(
        transport: Box<dyn MailTransport>,
        sender: impl Into<String>,
        recipients: Vec<String>,
    ) -> Result<Self> {
        let sender = sender.into();
        validate_address("sender", &sender)?;
        if recipients.is_empty() {
            return Err(LoggerError::config("email", "at least one recipient is required"));
        }
        for recipient in &recipients {
            validate_address("recipient", recipient)?;
        }

        Ok(Self {
            transport,
            sender,
            recipients,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            output_format: OutputFormat::Text,
            timestamp_format: TimestampFormat::default(),
        })
    }

    #[must_use]
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Check the transport before the sink goes live.
    pub fn verify(&mut self) -> Result<()> {
        self.transport.verify()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// The message a record turns into.
    pub fn compose(&self, record: &LogRecord) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: self.recipients.clone(),
            subject: format!("{}: {}", self.subject_prefix, record.message()),
            body: self.output_format.format(record, &self.timestamp_format),
        }
    }
}

fn validate_address(role: &str, address: &str) -> Result<()> {
    let valid = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !address.contains(|c: char| c.is_whitespace() || c == '<' || c == '>')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(LoggerError::config(
            "email",
            format!("invalid {} address '{}'", role, address),
        ))
    }
}

impl Sink for EmailSink {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let message = self.compose(record);
        self.transport.send(&message)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

impl std::fmt::Debug for EmailSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSink")
            .field("host", &self.transport.host())
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExceptionInfo, RecordFactory, Severity};
    use parking_lot::Mutex;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    #[derive(Clone, Default)]
    struct RecordingTransport(Arc<Mutex<Vec<EmailMessage>>>);

    impl MailTransport for RecordingTransport {
        fn send(&mut self, message: &EmailMessage) -> Result<()> {
            self.0.lock().push(message.clone());
            Ok(())
        }

        fn host(&self) -> &str {
            "memory"
        }
    }

    fn reply(w: &mut TcpStream, text: &str) {
        w.write_all(text.as_bytes()).unwrap();
        w.flush().unwrap();
    }

    /// Minimal SMTP server answering one session; returns every line it read.
    fn scripted_server(reject_rcpt: bool) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut seen = Vec::new();

            reply(&mut writer, "220 test.local ESMTP ready\r\n");
            let mut auth_step = 0;
            let mut in_data = false;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                seen.push(line.clone());

                if in_data {
                    if line == "." {
                        in_data = false;
                        reply(&mut writer, "250 queued\r\n");
                    }
                    continue;
                }
                if auth_step == 1 {
                    auth_step = 2;
                    reply(&mut writer, "334 UGFzc3dvcmQ6\r\n");
                    continue;
                }
                if auth_step == 2 {
                    auth_step = 0;
                    reply(&mut writer, "235 authenticated\r\n");
                    continue;
                }

                let verb = line.split([' ', ':']).next().unwrap_or("").to_uppercase();
                match verb.as_str() {
                    "EHLO" => reply(&mut writer, "250-test.local\r\n250-AUTH LOGIN\r\n250 OK\r\n"),
                    "STARTTLS" => reply(&mut writer, "454 TLS not available\r\n"),
                    "AUTH" => {
                        auth_step = 1;
                        reply(&mut writer, "334 VXNlcm5hbWU6\r\n");
                    }
                    "MAIL" => reply(&mut writer, "250 sender ok\r\n"),
                    "RCPT" if reject_rcpt => reply(&mut writer, "550 no such user\r\n"),
                    "RCPT" => reply(&mut writer, "250 recipient ok\r\n"),
                    "DATA" => {
                        in_data = true;
                        reply(&mut writer, "354 end with .\r\n");
                    }
                    "QUIT" => {
                        reply(&mut writer, "221 bye\r\n");
                        break;
                    }
                    _ => reply(&mut writer, "500 unknown\r\n"),
                }
            }
            seen
        });

        (port, handle)
    }

    fn critical(message: &str) -> LogRecord {
        RecordFactory::build_message("root", Severity::Critical, message)
    }

    #[test]
    fn test_compose_subject_and_body() {
        let transport = RecordingTransport::default();
        let sink = EmailSink::new(
            Box::new(transport),
            "app@example.com",
            vec!["ops@example.com".into(), "dev@example.com".into()],
        )
        .unwrap();

        let message = sink.compose(&critical("db down"));
        assert_eq!(message.subject, "Critical error: db down");
        assert!(message.body.ends_with("[CRITICAL] [root] db down"));

        let wire = message.to_rfc5322();
        assert!(wire.contains("To: ops@example.com, dev@example.com\r\n"));
        assert!(wire.contains("Subject: Critical error: db down\r\n"));
    }

    #[test]
    fn test_emit_uses_transport() {
        let transport = RecordingTransport::default();
        let mut sink = EmailSink::new(
            Box::new(transport.clone()),
            "app@example.com",
            vec!["ops@example.com".into()],
        )
        .unwrap()
        .with_subject_prefix("ALERT");

        let record = critical("payment failed")
            .with_exception(ExceptionInfo::new("Timeout", "gateway did not answer"));
        sink.emit(&record).unwrap();

        let sent = transport.0.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "ALERT: payment failed");
        assert!(sent[0].body.contains("Timeout: gateway did not answer"));
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let transport = || Box::new(RecordingTransport::default()) as Box<dyn MailTransport>;
        assert!(matches!(
            EmailSink::new(transport(), "not-an-address", vec!["ops@example.com".into()]),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
        assert!(EmailSink::new(transport(), "app@example.com", vec![]).is_err());
        assert!(EmailSink::new(transport(), "app@example.com", vec!["a b@example.com".into()]).is_err());
    }

    #[test]
    fn test_smtp_session() {
        let (port, server) = scripted_server(false);
        let mut transport = SmtpTransport::new("127.0.0.1", port)
            .with_credentials("app@example.com", "hunter2")
            .with_security(SmtpSecurity::None)
            .allow_plaintext_auth(true)
            .with_timeout(Duration::from_secs(5));

        let message = EmailMessage {
            from: "app@example.com".into(),
            to: vec!["ops@example.com".into()],
            subject: "Critical error: disk full".into(),
            body: "line one\n.hidden line".into(),
        };
        transport.send(&message).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen[0], "EHLO localhost");
        assert_eq!(seen[1], "AUTH LOGIN");
        assert_eq!(seen[2], B64.encode("app@example.com"));
        assert_eq!(seen[3], B64.encode("hunter2"));
        assert_eq!(seen[4], "MAIL FROM:<app@example.com>");
        assert_eq!(seen[5], "RCPT TO:<ops@example.com>");
        assert_eq!(seen[6], "DATA");
        assert!(seen.contains(&"Subject: Critical error: disk full".to_string()));
        assert!(seen.contains(&"..hidden line".to_string()));
        assert_eq!(seen.last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn test_smtp_rejection_is_reported() {
        let (port, server) = scripted_server(true);
        let mut transport = SmtpTransport::new("127.0.0.1", port).with_security(SmtpSecurity::None);

        let message = EmailMessage {
            from: "app@example.com".into(),
            to: vec!["nobody@example.com".into()],
            subject: "x".into(),
            body: "y".into(),
        };
        let err = transport.send(&message).unwrap_err();
        assert!(matches!(err, LoggerError::Transport { .. }));
        assert!(err.to_string().contains("550"));

        drop(transport);
        // Server sees the connection close without QUIT
        let seen = server.join().unwrap();
        assert!(seen.iter().any(|l| l.starts_with("RCPT TO")));
    }

    #[test]
    fn test_verify_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = SmtpTransport::new("127.0.0.1", port).with_timeout(Duration::from_secs(1));
        assert!(matches!(transport.verify(), Err(LoggerError::Transport { .. })));
    }

    #[test]
    fn test_starttls_refusal_stops_before_auth() {
        let (port, server) = scripted_server(false);
        let mut transport = SmtpTransport::new("127.0.0.1", port)
            .with_credentials("app@example.com", "hunter2")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(transport.security(), SmtpSecurity::StartTls);

        let err = transport.verify().unwrap_err();
        assert!(matches!(err, LoggerError::Transport { .. }));
        assert!(err.to_string().contains("STARTTLS rejected: 454"));
        assert!(!err.to_string().contains("hunter2"));

        drop(transport);
        let seen = server.join().unwrap();
        assert_eq!(seen, vec!["EHLO localhost".to_string(), "STARTTLS".to_string()]);
    }

    #[test]
    fn test_plaintext_auth_refused_by_default() {
        let (port, server) = scripted_server(false);
        let mut transport = SmtpTransport::new("127.0.0.1", port)
            .with_credentials("app@example.com", "hunter2")
            .with_security(SmtpSecurity::None);

        let err = transport.verify().unwrap_err();
        assert!(err.to_string().contains("refusing to send credentials without TLS"));

        // Nothing reached the server; release its accept() with a bare session
        let mut plain = SmtpTransport::new("127.0.0.1", port).with_security(SmtpSecurity::None);
        plain.verify().unwrap();
        let seen = server.join().unwrap();
        assert_eq!(seen, vec!["EHLO localhost".to_string(), "QUIT".to_string()]);
    }
}
