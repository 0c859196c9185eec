// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SSH connection management and establishment.
//!
//! This module handles the low-level SSH connection establishment,
//! including address resolution, connection attempts, and initial handshake.

use russh::client::{Config, Handle, Handler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, io};

use super::authentication::{AuthMethod, ServerCheckMethod};

/// A ssh connection to a remote device.
///
/// After creating a `Client` by [`connect`]ing to a remote host,
/// use [`execute`] to send commands and receive results through the connection.
///
/// [`connect`]: Client::connect
/// [`execute`]: Client::execute
///
/// # Examples
///
/// ```no_run
/// use rmtool::ssh::tokio_client::{Client, AuthMethod, ServerCheckMethod};
/// #[tokio::main]
/// async fn main() -> Result<(), rmtool::ssh::tokio_client::Error> {
///     let client = Client::connect(
///         "10.11.99.1",
///         22,
///         "root",
///         AuthMethod::with_password("secret"),
///         ServerCheckMethod::NoCheck,
///         None,
///     ).await?;
///
///     let result = client.execute("uname -r").await?;
///     assert!(result.stderr.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) connection_handle: Arc<Handle<ClientHandler>>,
    pub(super) username: String,
    pub(super) address: SocketAddr,
}

impl Client {
    /// Open a ssh connection to a remote host.
    ///
    /// `host` is resolved with the system resolver; every resolved address
    /// is tried in order until one accepts the TCP connection. Authentication
    /// is attempted on the first successful connection only.
    ///
    /// `connect_timeout` bounds resolution plus handshake. `None` waits as
    /// long as the network stack does.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, super::Error> {
        let attempt = Self::connect_with_config(
            host,
            port,
            username,
            auth,
            server_check,
            Config::default(),
        );

        match connect_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| super::Error::ConnectTimeout(format!("{host}:{port}")))?,
            None => attempt.await,
        }
    }

    /// Same as `connect`, but with the option to specify a non default
    /// [`russh::client::Config`].
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
        config: Config,
    ) -> Result<Self, super::Error> {
        let config = Arc::new(config);

        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(super::Error::AddressInvalid)?
            .collect();

        let mut connect_res = Err(super::Error::AddressInvalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )));
        for socket_addr in socket_addrs {
            let handler = ClientHandler::new(host.to_string(), socket_addr, server_check.clone());
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connection to {} failed: {}", socket_addr, e);
                    connect_res = Err(e);
                }
            }
        }
        let (address, mut handle) = connect_res?;

        super::authentication::authenticate(&mut handle, username, auth).await?;

        Ok(Self {
            connection_handle: Arc::new(handle),
            username: username.to_string(),
            address,
        })
    }

    /// The username this client is connected as.
    pub fn get_connection_username(&self) -> &str {
        &self.username
    }

    /// The address this client is connected to.
    pub fn get_connection_address(&self) -> &SocketAddr {
        &self.address
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), super::Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(super::Error::SshError)
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    /// Create a new client handler.
    pub fn new(hostname: String, host: SocketAddr, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            host,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = super::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.server_check {
            ServerCheckMethod::NoCheck => {
                tracing::debug!("Accepting host key of {} without verification", self.hostname);
                Ok(true)
            }
            ServerCheckMethod::AcceptNew(known_hosts_path) => {
                match russh::keys::check_known_hosts_path(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                    known_hosts_path,
                ) {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        russh::keys::known_hosts::learn_known_hosts_path(
                            &self.hostname,
                            self.host.port(),
                            server_public_key,
                            known_hosts_path,
                        )
                        .map_err(|e| {
                            tracing::error!(
                                "Failed to record host key in {:?}: {}",
                                known_hosts_path,
                                e
                            );
                            super::Error::ServerCheckFailed
                        })?;
                        tracing::info!(
                            "Trusted new host key for {} and recorded it in {:?}",
                            self.hostname,
                            known_hosts_path
                        );
                        Ok(true)
                    }
                    Err(russh::keys::Error::KeyChanged { line }) => {
                        tracing::error!(
                            "Host key for {} does not match known_hosts line {}",
                            self.hostname,
                            line
                        );
                        Err(super::Error::HostKeyChanged {
                            host: self.hostname.clone(),
                            line,
                        })
                    }
                    Err(e) => {
                        tracing::error!("Could not read known_hosts {:?}: {}", known_hosts_path, e);
                        Err(super::Error::ServerCheckFailed)
                    }
                }
            }
        }
    }
}
