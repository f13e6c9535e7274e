// One-shot command execution on network devices over the system `ssh`.
//
// Each call spawns `ssh -o BatchMode=yes ... host command` and collects
// stdout. Authentication is whatever the user's agent / ssh config provides;
// no passwords are ever handled here.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::Error;

/// Connection settings shared by every device command.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Path to the `ssh` binary.
    pub program: PathBuf,
    /// Login user. `None` defers to ssh config.
    pub user: Option<String>,
    /// Alternate ssh config file (`-F`).
    pub config_file: Option<PathBuf>,
    /// TCP connect timeout handed to ssh.
    pub connect_timeout: Duration,
    /// Upper bound for a whole command, including connect.
    pub command_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            user: None,
            config_file: None,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs commands on devices via the system ssh client.
#[derive(Debug, Clone, Default)]
pub struct SshClient {
    config: SshConfig,
}

impl SshClient {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Argument vector passed to the ssh binary (without the program itself).
    pub fn args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_owned(),
            "BatchMode=yes".to_owned(),
            "-o".to_owned(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs().max(1)),
        ];
        if let Some(ref file) = self.config.config_file {
            args.push("-F".to_owned());
            args.push(file.display().to_string());
        }
        if let Some(ref user) = self.config.user {
            args.push("-l".to_owned());
            args.push(user.clone());
        }
        args.push(host.to_owned());
        args.push(command.to_owned());
        args
    }

    /// Run `command` on `host` and return its stdout.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    pub async fn run(&self, host: &str, command: &str) -> Result<String, Error> {
        debug!(host, command, "ssh exec");

        let child = Command::new(&self.config.program)
            .args(self.args(host, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Ssh {
                host: host.to_owned(),
                message: format!("failed to spawn {}: {e}", self.config.program.display()),
            })?;

        let output = tokio::time::timeout(self.config.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::SshTimeout {
                host: host.to_owned(),
                timeout_secs: self.config.command_timeout.as_secs(),
            })?
            .map_err(|e| Error::Ssh {
                host: host.to_owned(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Ssh {
                host: host.to_owned(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn args_include_batch_mode_and_user() {
        let client = SshClient::new(SshConfig {
            user: Some("netops".into()),
            config_file: Some(PathBuf::from("/etc/netsync/ssh_config")),
            ..SshConfig::default()
        });
        let args = client.args("10.0.0.1", "show version");
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-F",
                "/etc/netsync/ssh_config",
                "-l",
                "netops",
                "10.0.0.1",
                "show version",
            ]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_ssh_error() {
        let client = SshClient::new(SshConfig {
            program: PathBuf::from("/nonexistent/netsync-ssh"),
            ..SshConfig::default()
        });
        let err = client.run("10.0.0.1", "show version").await.unwrap_err();
        assert!(matches!(err, Error::Ssh { .. }));
        assert!(err.is_unreachable());
    }
}
