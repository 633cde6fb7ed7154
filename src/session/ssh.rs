// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! SSH transport for Cisco-style CLIs
//!
//! Opens an interactive shell on a PTY, waits for the device prompt, turns
//! paging off and then drives commands by writing a line, waiting for its
//! echo and reading until the prompt returns. Responses have the command
//! echo and the trailing prompt removed.

use super::{Connector, Platform, Transport, TransportError};
use crate::inventory::DeviceProfile;
use regex::Regex;
use ssh2::{Channel, KeyboardInteractivePrompt, Prompt};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

type TransportResult<T> = std::result::Result<T, TransportError>;

static PROMPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-@/:()]{1,80}[>#]$").expect("valid prompt regex"));

static PASSWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password:?$").expect("valid password regex"));

/// PTY width; wide enough that devices do not wrap long lines
const TERMINAL_WIDTH: u32 = 511;
const TERMINAL_HEIGHT: u32 = 24;

/// Connector that speaks SSH with `ssh2`
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    fn connect(
        &self,
        profile: &DeviceProfile,
        timeout: Duration,
    ) -> TransportResult<Box<dyn Transport>> {
        let platform: Platform = profile
            .device_type
            .parse()
            .map_err(TransportError::UnsupportedPlatform)?;

        let addr = (profile.host.as_str(), profile.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address for {}", profile.host),
                )
            })?;
        let tcp = TcpStream::connect_timeout(&addr, timeout)?;

        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout_millis(timeout));
        session.handshake()?;
        authenticate(&session, profile)?;

        let mut channel = session.channel_session()?;
        channel.request_pty("vt100", None, Some((TERMINAL_WIDTH, TERMINAL_HEIGHT, 0, 0)))?;
        channel.shell()?;

        let mut shell = SshShell {
            session,
            cli: CliShell::new(channel, platform, timeout),
        };
        if let Err(e) = shell.cli.prepare() {
            shell.close();
            return Err(e);
        }
        log::info!(
            "Connected to {} ({}), prompt '{}'",
            profile.name,
            platform,
            shell.cli.prompt
        );
        Ok(Box::new(shell))
    }
}

fn timeout_millis(timeout: Duration) -> u32 {
    timeout.as_millis().min(u32::MAX as u128) as u32
}

/// Answers every keyboard-interactive prompt with the password
struct PasswordPrompt<'a>(&'a str);

impl KeyboardInteractivePrompt for PasswordPrompt<'_> {
    fn prompt<'b>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'b>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.0.to_string()).collect()
    }
}

fn authenticate(session: &ssh2::Session, profile: &DeviceProfile) -> TransportResult<()> {
    let user = profile.username.as_str();
    let outcome = if let Some(password) = profile.password.as_deref() {
        // IOS often only offers keyboard-interactive
        session.userauth_password(user, password).or_else(|_| {
            session.userauth_keyboard_interactive(user, &mut PasswordPrompt(password))
        })
    } else if let Some(key_file) = profile.key_file.as_deref() {
        session.userauth_pubkey_file(user, None, key_file, None)
    } else {
        session.userauth_agent(user)
    };

    outcome.map_err(|e| TransportError::Auth(format!("{}: {}", user, e)))?;
    if !session.authenticated() {
        return Err(TransportError::Auth(format!("{} was not accepted", user)));
    }
    Ok(())
}

/// Interactive shell on one device
struct SshShell {
    session: ssh2::Session,
    cli: CliShell<Channel>,
}

impl Transport for SshShell {
    fn execute(&mut self, command: &str) -> TransportResult<String> {
        self.cli.execute(command)
    }

    fn elevate(&mut self, secret: &str) -> TransportResult<()> {
        self.cli.elevate(secret)
    }

    fn close(&mut self) {
        let _ = self.cli.write_line("exit");
        if let Err(e) = self.cli.stream.close() {
            log::debug!("Channel close failed: {}", e);
        }
        if let Err(e) = self.session.disconnect(None, "session closed", None) {
            log::debug!("SSH disconnect failed: {}", e);
        }
    }
}

/// Prompt-driven command exchange over any byte stream
struct CliShell<S> {
    stream: S,
    platform: Platform,
    timeout: Duration,
    prompt: String,
}

impl<S: Read + Write> CliShell<S> {
    fn new(stream: S, platform: Platform, timeout: Duration) -> Self {
        Self {
            stream,
            platform,
            timeout,
            prompt: String::new(),
        }
    }

    /// Find the prompt and disable paging
    ///
    /// Nothing is written before the login prompt arrives, so no extra
    /// prompt is left queued behind it.
    fn prepare(&mut self) -> TransportResult<()> {
        let banner = self.read_until(|text| PROMPT_RE.is_match(last_line(text)))?;
        self.prompt = last_line(&banner).to_string();
        let paging = self.platform.paging_command();
        self.execute(paging)?;
        Ok(())
    }

    fn base_prompt(&self) -> String {
        self.prompt
            .trim_end_matches(&['>', '#'][..])
            .to_string()
    }

    fn write_line(&mut self, line: &str) -> TransportResult<()> {
        self.stream.write_all(format!("{}\n", line).as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read until `done` accepts the whole buffer
    fn read_until(&mut self, done: impl Fn(&str) -> bool) -> TransportResult<String> {
        // None when the timeout is too large to represent: wait without limit
        let deadline = Instant::now().checked_add(self.timeout);
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            {
                let text = String::from_utf8_lossy(&bytes);
                if done(&text) {
                    return Ok(text.into_owned());
                }
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                return Err(TransportError::Timeout(self.timeout));
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => bytes.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Err(TransportError::Timeout(self.timeout))
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Write `line` and read until its echo has been seen and `done`
    /// accepts the last line after it. Output queued before the echo is
    /// discarded. Returns the text from the echo onwards.
    fn send_and_read(&mut self, line: &str, done: impl Fn(&str) -> bool) -> TransportResult<String> {
        let echo = line.trim();
        self.write_line(line)?;
        let raw = self.read_until(|text| {
            text.find(echo)
                .map_or(false, |pos| done(last_line(&text[pos + echo.len()..])))
        })?;
        let start = raw.find(echo).unwrap_or(0);
        Ok(raw[start..].to_string())
    }

    fn execute(&mut self, command: &str) -> TransportResult<String> {
        let base = self.base_prompt();
        let raw = self.send_and_read(command, |line| is_device_prompt(&base, line))?;
        self.prompt = last_line(&raw).to_string();
        Ok(clean_output(&raw, command))
    }

    fn elevate(&mut self, secret: &str) -> TransportResult<()> {
        if !self.platform.has_enable_mode() || self.prompt.ends_with('#') {
            return Ok(());
        }

        let base = self.base_prompt();
        let reply = self.send_and_read("enable", |line| {
            PASSWORD_RE.is_match(line) || is_device_prompt(&base, line)
        })?;
        if PASSWORD_RE.is_match(last_line(&reply)) {
            // The secret is not echoed
            self.write_line(secret)?;
            let raw = self.read_until(|text| {
                let line = last_line(text);
                PASSWORD_RE.is_match(line) || is_device_prompt(&base, line) || line.starts_with('%')
            })?;
            self.prompt = last_line(&raw).to_string();
        } else {
            self.prompt = last_line(&reply).to_string();
        }

        if self.prompt.ends_with('#') {
            Ok(())
        } else {
            Err(TransportError::Elevation(format!(
                "still at '{}' after enable",
                self.prompt
            )))
        }
    }
}

/// Last line of a buffer, trailing whitespace removed
fn last_line(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed
        .rsplit(&['\n', '\r'][..])
        .next()
        .unwrap_or("")
        .trim()
}

/// Whether `line` is this device's prompt in any mode
fn is_device_prompt(base: &str, line: &str) -> bool {
    PROMPT_RE.is_match(line) && line.starts_with(base)
}

/// Strip the command echo and trailing prompt from a raw response
fn clean_output(raw: &str, command: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = normalized.lines().collect();

    if let Some(pos) = lines.iter().position(|l| l.trim_end().ends_with(command.trim())) {
        if pos <= 1 {
            lines.drain(..=pos);
        }
    }
    if lines.last().map_or(false, |l| PROMPT_RE.is_match(l.trim())) {
        lines.pop();
    }

    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::TcpListener;

    const CPU_COMMAND: &str = "show processes cpu | include one minute";
    const CPU_LINE: &str =
        "CPU utilization for five seconds: 7%/3%; one minute: 12%; five minutes: 10%";

    /// Byte stream replaying canned chunks, one per read
    struct ScriptedStream {
        chunks: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        fail_reads: Option<io::ErrorKind>,
    }

    impl ScriptedStream {
        fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                written: Vec::new(),
                fail_reads: None,
            }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.written).into_owned()
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut chunk) = self.chunks.pop_front() else {
                return match self.fail_reads {
                    Some(kind) => Err(io::Error::from(kind)),
                    None => Ok(0),
                };
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn shell(chunks: &[&str]) -> CliShell<ScriptedStream> {
        CliShell::new(ScriptedStream::new(chunks), Platform::CiscoIos, Duration::from_secs(5))
    }

    #[test]
    fn test_prompt_detection() {
        assert!(PROMPT_RE.is_match("Router>"));
        assert!(PROMPT_RE.is_match("Router#"));
        assert!(PROMPT_RE.is_match("core-sw1.lab(config)#"));
        assert!(!PROMPT_RE.is_match("CPU utilization for five seconds: 7%/3%"));
        assert!(!PROMPT_RE.is_match("Router uptime is 4 days"));
    }

    #[test]
    fn test_device_prompt_requires_hostname() {
        assert!(is_device_prompt("Router", "Router#"));
        assert!(is_device_prompt("Router", "Router(config)#"));
        assert!(!is_device_prompt("Router", "Switch#"));
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("line one\r\nRouter# "), "Router#");
        assert_eq!(last_line("only\n\n"), "only");
        assert_eq!(last_line(""), "");
    }

    #[test]
    fn test_password_prompt() {
        assert!(PASSWORD_RE.is_match("Password:"));
        assert!(PASSWORD_RE.is_match("password"));
        assert!(!PASSWORD_RE.is_match("Router>"));
    }

    #[test]
    fn test_clean_output_strips_echo_and_prompt() {
        let raw = "show processes cpu | include one minute\r\n\
                   CPU utilization for five seconds: 7%/3%; one minute: 12%; five minutes: 10%\r\n\
                   Router#";
        assert_eq!(
            clean_output(raw, "show processes cpu | include one minute"),
            "CPU utilization for five seconds: 7%/3%; one minute: 12%; five minutes: 10%"
        );
    }

    #[test]
    fn test_clean_output_with_prompt_prefixed_echo() {
        let raw = "Router#show clock\r\n*12:00:01.123 UTC Mon Oct 19 2026\r\nRouter#";
        assert_eq!(clean_output(raw, "show clock"), "*12:00:01.123 UTC Mon Oct 19 2026");
    }

    #[test]
    fn test_clean_output_empty_response() {
        let raw = "show processes cpu | include one minute\r\nRouter#";
        assert_eq!(clean_output(raw, "show processes cpu | include one minute"), "");
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_secs(2)), 2000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[test]
    fn test_unsupported_device_type_fails_before_network() {
        let profile = DeviceProfile::new("r1", "192.0.2.1", "admin").with_device_type("junos");
        match SshConnector.connect(&profile, Duration::from_millis(50)) {
            Err(TransportError::UnsupportedPlatform(t)) => assert_eq!(t, "junos"),
            Err(e) => panic!("Expected UnsupportedPlatform, got {:?}", e),
            Ok(_) => panic!("Expected UnsupportedPlatform"),
        }
    }

    #[test]
    fn test_refused_connection_is_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut profile = DeviceProfile::new("r1", "127.0.0.1", "admin").with_password("pw");
        profile.port = port;
        assert!(SshConnector.connect(&profile, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_queued_prompts_do_not_shift_responses() {
        let cpu_reply = format!("{}\r\n{}\r\nRouter>", CPU_COMMAND, CPU_LINE);
        let mut cli = shell(&[
            "banner\r\nRouter>",
            "\r\nRouter>",
            "terminal length 0\r\nRouter>",
            cpu_reply.as_str(),
        ]);
        cli.prepare().unwrap();
        assert_eq!(cli.prompt, "Router>");
        assert_eq!(cli.execute(CPU_COMMAND).unwrap(), CPU_LINE);
        assert_eq!(
            cli.stream.written(),
            format!("terminal length 0\n{}\n", CPU_COMMAND)
        );
    }

    #[test]
    fn test_prepare_writes_nothing_before_login_prompt() {
        let mut cli = shell(&["banner\r\n", "Router>", "terminal length 0\r\n", "Router>"]);
        cli.prepare().unwrap();
        assert!(cli.stream.written().starts_with("terminal length 0"));
        assert_eq!(cli.prompt, "Router>");
    }

    #[test]
    fn test_echo_split_across_reads() {
        let mut cli = shell(&["show cl", "ock\r\n*12:00:01 UTC\r\n", "Router#"]);
        cli.prompt = "Router#".to_string();
        assert_eq!(cli.execute("show clock").unwrap(), "*12:00:01 UTC");
    }

    #[test]
    fn test_elevate_with_queued_prompt() {
        let cpu_reply = format!("{}\r\n{}\r\nRouter#", CPU_COMMAND, CPU_LINE);
        let mut cli = shell(&[
            "Router>",
            "\r\nRouter>",
            "terminal length 0\r\nRouter>",
            "enable\r\nPassword: ",
            "\r\nRouter#",
            cpu_reply.as_str(),
        ]);
        cli.prepare().unwrap();
        cli.elevate("s3cret").unwrap();
        assert_eq!(cli.prompt, "Router#");
        assert_eq!(cli.execute(CPU_COMMAND).unwrap(), CPU_LINE);
        assert!(cli.stream.written().contains("enable\ns3cret\n"));
    }

    #[test]
    fn test_elevate_rejected_secret() {
        let mut cli = shell(&["enable\r\nPassword: ", "\r\n% Access denied\r\n"]);
        cli.prompt = "Router>".to_string();
        match cli.elevate("wrong") {
            Err(TransportError::Elevation(msg)) => assert!(msg.contains("% Access denied")),
            other => panic!("Expected Elevation, got {:?}", other),
        }
    }

    #[test]
    fn test_elevate_skipped_when_privileged() {
        let mut cli = shell(&[]);
        cli.prompt = "Router#".to_string();
        cli.elevate("s3cret").unwrap();
        assert_eq!(cli.stream.written(), "");
    }

    #[test]
    fn test_stream_end_is_closed() {
        let mut cli = shell(&["terminal length 0\r\n"]);
        cli.prompt = "Router>".to_string();
        assert!(matches!(cli.execute("terminal length 0"), Err(TransportError::Closed)));
    }

    #[test]
    fn test_read_timeout_is_reported() {
        let mut cli = shell(&[]);
        cli.stream.fail_reads = Some(io::ErrorKind::TimedOut);
        assert!(matches!(cli.prepare(), Err(TransportError::Timeout(_))));
    }

    #[test]
    fn test_unrepresentable_timeout_does_not_panic() {
        let mut cli = CliShell::new(
            ScriptedStream::new(&["Router>", "terminal length 0\r\nRouter>"]),
            Platform::CiscoIos,
            Duration::from_secs(u64::MAX),
        );
        cli.prepare().unwrap();
        assert_eq!(cli.prompt, "Router>");
    }
}
