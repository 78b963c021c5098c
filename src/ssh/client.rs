// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection (optionally via a bastion), authentication and command execution.

use super::error::{Error, Result};
use crate::types::RemoteAddress;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Jump host to tunnel through, if any.
    pub bastion: Option<RemoteAddress>,
    /// Optional path to private key file.
    /// If None, will try SSH agent then default key locations.
    pub key_path: Option<PathBuf>,
    /// Whether to accept unknown hosts (Trust On First Use).
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Timeout for command execution.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            bastion: None,
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(60),
        }
    }

    /// Session config targeting `address`, logging in as its user (or `$USER`).
    pub fn for_address(address: &RemoteAddress) -> Self {
        Self::new(&address.host, address.login_user()).port(address.port)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bastion(mut self, bastion: Option<RemoteAddress>) -> Self {
        self.bastion = bastion;
        self
    }

    pub fn key_path(mut self, path: Option<PathBuf>) -> Self {
        self.key_path = path;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(host: &str, port: u16, config: &SessionConfig) -> Self {
        Self {
            host: host.to_string(),
            port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!("host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Authentication method resolved from config.
enum AuthMethod {
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// An established SSH session, possibly tunnelled through a bastion.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
    jump: Option<Handle<SshHandler>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .field("via_bastion", &self.jump.is_some())
            .finish()
    }
}

fn russh_config() -> Arc<Config> {
    Arc::new(Config {
        inactivity_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    })
}

impl Session {
    /// Connect to the remote host, hopping through the bastion when one is configured.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let (handle, jump) = match &config.bastion {
            None => {
                let handler = SshHandler::new(&config.host, config.port, &config);
                let handle = client::connect(
                    russh_config(),
                    (config.host.as_str(), config.port),
                    handler,
                )
                .await
                .map_err(|e| connection_error(&config.host, config.port, e))?;
                (handle, None)
            }
            Some(bastion) => {
                let (handle, jump) = Self::connect_via_bastion(&config, bastion).await?;
                (handle, Some(jump))
            }
        };

        let mut session = Self {
            config,
            handle,
            jump,
        };

        let auth_method = Self::resolve_auth_method(&session.config).await?;
        let user = session.config.user.clone();
        if !Self::authenticate(&mut session.handle, &user, auth_method).await? {
            return Err(Error::AuthenticationFailed(format!(
                "{}@{}",
                user, session.config.host
            )));
        }

        Ok(session)
    }

    /// Authenticate against the bastion and open a direct-tcpip tunnel to the target.
    async fn connect_via_bastion(
        config: &SessionConfig,
        bastion: &RemoteAddress,
    ) -> Result<(Handle<SshHandler>, Handle<SshHandler>)> {
        let bastion_error = |reason: String| Error::Bastion {
            bastion: bastion.to_string(),
            reason,
        };

        let handler = SshHandler::new(&bastion.host, bastion.port, config);
        let mut jump = client::connect(
            russh_config(),
            (bastion.host.as_str(), bastion.port),
            handler,
        )
        .await
        .map_err(|e| bastion_error(e.to_string()))?;

        let bastion_user = bastion.login_user();
        let auth_method = Self::resolve_auth_method(config).await?;
        if !Self::authenticate(&mut jump, &bastion_user, auth_method).await? {
            return Err(bastion_error(format!(
                "authentication failed for {}",
                bastion_user
            )));
        }

        tracing::debug!(
            bastion = %bastion,
            target = %config.host,
            "opening tunnel through bastion"
        );
        let channel = jump
            .channel_open_direct_tcpip(
                config.host.clone(),
                u32::from(config.port),
                "127.0.0.1",
                0,
            )
            .await
            .map_err(|e| bastion_error(format!("tunnel to {} failed: {}", config.host, e)))?;

        let handler = SshHandler::new(&config.host, config.port, config);
        let handle = client::connect_stream(russh_config(), channel.into_stream(), handler)
            .await
            .map_err(|e| connection_error(&config.host, config.port, e))?;

        Ok((handle, jump))
    }

    /// Resolve which authentication method to use.
    async fn resolve_auth_method(config: &SessionConfig) -> Result<AuthMethod> {
        if let Some(key_path) = &config.key_path {
            let key = load_secret_key(key_path, None).map_err(|e| Error::KeyLoadFailed {
                path: key_path.clone(),
                reason: e.to_string(),
            })?;
            return Ok(AuthMethod::KeyFile(Arc::new(key)));
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(AuthMethod::Agent(agent));
        }

        let home = std::env::var("HOME").map_err(|_| {
            Error::AgentUnavailable("SSH agent not available and HOME not set".to_string())
        })?;

        let default_keys = [
            format!("{}/.ssh/id_ed25519", home),
            format!("{}/.ssh/id_rsa", home),
            format!("{}/.ssh/id_ecdsa", home),
        ];

        for key_path in &default_keys {
            if let Ok(key) = load_secret_key(key_path, None) {
                return Ok(AuthMethod::KeyFile(Arc::new(key)));
            }
        }

        Err(Error::AgentUnavailable(
            "SSH agent not available and no default keys found".to_string(),
        ))
    }

    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        user: &str,
        auth_method: AuthMethod,
    ) -> Result<bool> {
        match auth_method {
            AuthMethod::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
                })?;

                if keys.is_empty() {
                    return Err(Error::AgentUnavailable("no keys in SSH agent".to_string()));
                }

                for key in &keys {
                    match handle
                        .authenticate_publickey_with(user, key.clone(), None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(true),
                        _ => continue,
                    }
                }
                Ok(false)
            }
            AuthMethod::KeyFile(key) => {
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(Error::Protocol)?
                    .flatten();

                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
        }
    }

    /// Check if a file or socket exists on the remote host.
    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        let output = self
            .exec(&format!("test -e {} && echo exists", path))
            .await?;
        Ok(output.success() && output.stdout.trim() == "exists")
    }

    /// Execute a command on the remote host.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Execute a command with a custom timeout.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        }
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => break,
                Some(_) => {}
                None => break,
            }
        }

        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Disconnect the session and the bastion hop, if any.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;

        if let Some(jump) = self.jump {
            jump.disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(Error::Protocol)?;
        }
        Ok(())
    }
}

fn connection_error(host: &str, port: u16, e: russh::Error) -> Error {
    if e.to_string().contains("Connection refused") {
        Error::Connection(format!("connection refused to {}:{}", host, port))
    } else {
        Error::Connection(e.to_string())
    }
}
