// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Device sessions
//!
//! A [`Session`] is a single-use command channel bound to one
//! [`DeviceProfile`]. [`SessionProvider::open`] connects and, when the profile
//! carries an enable secret, elevates before handing the session out. Sessions
//! close themselves on drop, so every exit path releases the transport exactly
//! once.
//!
//! The wire is abstracted behind [`Connector`] and [`Transport`]; production
//! code uses [`SshConnector`].

pub mod platform;
pub mod ssh;

pub use platform::Platform;
pub use ssh::SshConnector;

use crate::error::{NetCpuError, Result};
use crate::inventory::DeviceProfile;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default per-session timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure reported by a transport implementation
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unsupported device type: {0}")]
    UnsupportedPlatform(String),

    #[error("Privilege elevation failed: {0}")]
    Elevation(String),

    #[error("Channel closed by remote")]
    Closed,

    #[error("Session already closed")]
    SessionClosed,
}

/// Live connection to one device
pub trait Transport: Send {
    /// Send one command and return its response text
    fn execute(&mut self, command: &str) -> std::result::Result<String, TransportError>;

    /// Enter privileged mode using the enable secret
    fn elevate(&mut self, secret: &str) -> std::result::Result<(), TransportError>;

    /// Release the connection; must not fail
    fn close(&mut self);
}

/// Factory for transports
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        profile: &DeviceProfile,
        timeout: Duration,
    ) -> std::result::Result<Box<dyn Transport>, TransportError>;
}

/// Opens sessions against inventory profiles
#[derive(Clone)]
pub struct SessionProvider {
    connector: Arc<dyn Connector>,
    timeout: Duration,
}

impl SessionProvider {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Provider backed by the SSH transport
    pub fn ssh() -> Self {
        Self::new(Arc::new(SshConnector::default()))
    }

    /// Timeout used for profiles that do not set their own
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_for(&self, profile: &DeviceProfile) -> Duration {
        profile
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.timeout)
    }

    /// Connect to `profile` and elevate if it declares a secret.
    ///
    /// Any failure, including a rejected enable secret, is a
    /// [`NetCpuError::Connection`]; a half-open session is closed first.
    pub fn open(&self, profile: &DeviceProfile) -> Result<Session> {
        let timeout = self.timeout_for(profile);
        log::debug!(
            "Connecting to {} ({}:{}, {}, timeout {:?})",
            profile.name,
            profile.host,
            profile.port,
            profile.device_type,
            timeout
        );

        let transport = self
            .connector
            .connect(profile, timeout)
            .map_err(|source| NetCpuError::Connection {
                device: profile.name.clone(),
                source,
            })?;
        let mut session = Session::new(profile.name.clone(), transport);

        if let Some(secret) = profile.enable_secret() {
            if let Err(source) = session.elevate(secret) {
                log::warn!("Enable mode rejected on {}", profile.name);
                session.close();
                return Err(NetCpuError::Connection {
                    device: profile.name.clone(),
                    source,
                });
            }
        }

        Ok(session)
    }
}

/// Single-use command session
pub struct Session {
    device: String,
    transport: Option<Box<dyn Transport>>,
    elevation_attempted: bool,
}

impl Session {
    fn new(device: String, transport: Box<dyn Transport>) -> Self {
        Self {
            device,
            transport: Some(transport),
            elevation_attempted: false,
        }
    }

    /// Device this session is bound to
    pub fn device(&self) -> &str {
        &self.device
    }

    fn elevate(&mut self, secret: &str) -> std::result::Result<(), TransportError> {
        if self.elevation_attempted {
            return Ok(());
        }
        self.elevation_attempted = true;
        match self.transport.as_mut() {
            Some(transport) => transport.elevate(secret),
            None => Err(TransportError::SessionClosed),
        }
    }

    /// Run one command
    pub fn execute(&mut self, command: &str) -> Result<String> {
        let transport = self.transport.as_mut().ok_or_else(|| NetCpuError::Command {
            device: self.device.clone(),
            command: command.to_string(),
            source: TransportError::SessionClosed,
        })?;
        log::debug!("{}: {}", self.device, command);
        transport.execute(command).map_err(|source| NetCpuError::Command {
            device: self.device.clone(),
            command: command.to_string(),
            source,
        })
    }

    /// Release the transport
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            log::debug!("Session to {} closed", self.device);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport that records every call.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct CallLog {
        connects: AtomicUsize,
        elevates: AtomicUsize,
        closes: AtomicUsize,
        commands: Mutex<Vec<String>>,
    }

    impl CallLog {
        pub fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        pub fn elevates(&self) -> usize {
            self.elevates.load(Ordering::SeqCst)
        }

        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    pub struct MockConnector {
        pub log: Arc<CallLog>,
        responses: Arc<HashMap<String, std::result::Result<String, ()>>>,
        fail_connect: bool,
        fail_elevate: bool,
    }

    impl MockConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(mut self, command: &str, output: &str) -> Self {
            Arc::make_mut(&mut self.responses).insert(command.to_string(), Ok(output.to_string()));
            self
        }

        pub fn fail_command(mut self, command: &str) -> Self {
            Arc::make_mut(&mut self.responses).insert(command.to_string(), Err(()));
            self
        }

        pub fn fail_connect(mut self) -> Self {
            self.fail_connect = true;
            self
        }

        pub fn fail_elevate(mut self) -> Self {
            self.fail_elevate = true;
            self
        }
    }

    impl Connector for MockConnector {
        fn connect(
            &self,
            _profile: &DeviceProfile,
            _timeout: Duration,
        ) -> std::result::Result<Box<dyn Transport>, TransportError> {
            self.log.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                return Err(TransportError::Auth("rejected".into()));
            }
            Ok(Box::new(MockTransport {
                log: Arc::clone(&self.log),
                responses: Arc::clone(&self.responses),
                fail_elevate: self.fail_elevate,
            }))
        }
    }

    struct MockTransport {
        log: Arc<CallLog>,
        responses: Arc<HashMap<String, std::result::Result<String, ()>>>,
        fail_elevate: bool,
    }

    impl Transport for MockTransport {
        fn execute(&mut self, command: &str) -> std::result::Result<String, TransportError> {
            self.log.commands.lock().unwrap().push(command.to_string());
            match self.responses.get(command) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(())) => Err(TransportError::Closed),
                None => Ok(String::new()),
            }
        }

        fn elevate(&mut self, _secret: &str) -> std::result::Result<(), TransportError> {
            self.log.elevates.fetch_add(1, Ordering::SeqCst);
            if self.fail_elevate {
                Err(TransportError::Elevation("bad secret".into()))
            } else {
                Ok(())
            }
        }

        fn close(&mut self) {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
