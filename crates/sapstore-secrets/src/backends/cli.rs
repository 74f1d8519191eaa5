//! Platform secret manager CLI backend
//!
//! Shells out to the tool that ships with the OS secret manager:
//! - macOS: `security` (login keychain generic passwords)
//! - Linux: `secret-tool` (libsecret / Secret Service)
//!
//! All command line construction lives in [`CliTool`] so the platform specific
//! strings stay in one place.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{check_address, CredentialBackend};
use crate::error::SecretError;

/// `security` exit status for "The specified item could not be found in the keychain."
const SECURITY_ITEM_NOT_FOUND: i32 = 44;

/// Secret manager command line tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliTool {
    /// macOS `security`
    MacSecurity,
    /// libsecret `secret-tool`
    SecretTool,
}

/// One fully built invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: Vec<String>,
    /// Written to the child's stdin, then stdin is closed
    pub stdin: Option<String>,
}

impl CommandSpec {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: None,
        }
    }

    fn with_stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }
}

impl CliTool {
    /// The tool for the platform this binary was built for
    pub fn for_current_platform() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::MacSecurity)
        } else if cfg!(target_os = "linux") {
            Some(Self::SecretTool)
        } else {
            None
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::MacSecurity => "security",
            Self::SecretTool => "secret-tool",
        }
    }

    pub fn store_command(self, service: &str, account: &str, secret: &str) -> CommandSpec {
        match self {
            Self::MacSecurity => CommandSpec::new(
                "security",
                &[
                    "add-generic-password",
                    "-U",
                    "-s",
                    service,
                    "-a",
                    account,
                    "-w",
                    secret,
                ],
            ),
            Self::SecretTool => {
                let label = format!("--label={}/{}", service, account);
                CommandSpec::new(
                    "secret-tool",
                    &["store", label.as_str(), "service", service, "account", account],
                )
                .with_stdin(secret)
            }
        }
    }

    pub fn lookup_command(self, service: &str, account: &str) -> CommandSpec {
        match self {
            Self::MacSecurity => CommandSpec::new(
                "security",
                &["find-generic-password", "-s", service, "-a", account, "-w"],
            ),
            Self::SecretTool => CommandSpec::new(
                "secret-tool",
                &["lookup", "service", service, "account", account],
            ),
        }
    }

    pub fn delete_command(self, service: &str, account: &str) -> CommandSpec {
        match self {
            Self::MacSecurity => CommandSpec::new(
                "security",
                &["delete-generic-password", "-s", service, "-a", account],
            ),
            Self::SecretTool => CommandSpec::new(
                "secret-tool",
                &["clear", "service", service, "account", account],
            ),
        }
    }

    /// Enumeration command, if the tool has one
    pub fn search_command(self, service: &str) -> Option<CommandSpec> {
        match self {
            Self::MacSecurity => None,
            Self::SecretTool => Some(CommandSpec::new(
                "secret-tool",
                &["search", "--all", "service", service],
            )),
        }
    }
}

/// Parse `secret-tool search --all` output into account names
fn parse_search_accounts(output: &str) -> Vec<String> {
    let mut accounts = Vec::new();
    for line in output.lines() {
        if let Some(account) = line.trim().strip_prefix("attribute.account = ") {
            let account = account.to_string();
            if !accounts.contains(&account) {
                accounts.push(account);
            }
        }
    }
    accounts
}

/// Backend that runs the platform secret manager CLI
#[derive(Debug)]
pub struct CliBackend {
    tool: CliTool,
}

/// Captured result of a finished command
struct Finished {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl Finished {
    fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl CliBackend {
    /// Use the platform tool if it is installed
    pub fn detect() -> Result<Self, SecretError> {
        Self::detect_in(std::env::var_os("PATH"))
    }

    /// Use the platform tool if an executable copy is found in `search_path`
    pub fn detect_in(search_path: Option<OsString>) -> Result<Self, SecretError> {
        let tool = CliTool::for_current_platform()
            .ok_or_else(|| SecretError::unavailable("cli", "no secret manager CLI on this platform"))?;

        let cwd = std::env::current_dir()
            .map_err(|e| SecretError::unavailable("cli", format!("No working directory: {}", e)))?;
        let found = which::which_in(tool.program(), search_path, cwd).map_err(|e| {
            SecretError::unavailable("cli", format!("'{}' not found on PATH: {}", tool.program(), e))
        })?;

        tracing::debug!(path = %found.display(), "Secret manager CLI found");
        Ok(Self { tool })
    }

    async fn run(&self, spec: CommandSpec) -> Result<Finished, SecretError> {
        let mut child = Command::new(spec.program)
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SecretError::unavailable("cli", format!("'{}' not found", spec.program))
                } else {
                    SecretError::backend("cli", format!("Failed to execute '{}': {}", spec.program, e))
                }
            })?;

        if let (Some(input), Some(mut stdin)) = (spec.stdin.as_deref(), child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| SecretError::backend("cli", format!("Failed to write stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SecretError::backend("cli", format!("'{}' failed: {}", spec.program, e)))?;

        Ok(Finished {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn failure(&self, finished: &Finished) -> SecretError {
        let message = if finished.stderr.is_empty() {
            format!("{} exited with {:?}", self.tool.program(), finished.code)
        } else {
            finished.stderr.clone()
        };
        if message.contains("User interaction is not allowed") || message.contains("locked") {
            SecretError::AccessDenied(message)
        } else {
            SecretError::backend("cli", message)
        }
    }

    fn is_not_found(&self, finished: &Finished) -> bool {
        match self.tool {
            CliTool::MacSecurity => finished.code == Some(SECURITY_ITEM_NOT_FOUND),
            CliTool::SecretTool => finished.code == Some(1) && finished.stdout.is_empty(),
        }
    }
}

#[async_trait]
impl CredentialBackend for CliBackend {
    fn name(&self) -> &'static str {
        self.tool.program()
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError> {
        check_address(service, account)?;
        let finished = self.run(self.tool.store_command(service, account, secret)).await?;
        if finished.success() {
            Ok(())
        } else {
            Err(self.failure(&finished))
        }
    }

    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        check_address(service, account)?;
        let finished = self.run(self.tool.lookup_command(service, account)).await?;
        if finished.success() {
            Ok(Some(finished.stdout.trim_end_matches('\n').to_string()))
        } else if self.is_not_found(&finished) {
            Ok(None)
        } else {
            Err(self.failure(&finished))
        }
    }

    async fn remove(&self, service: &str, account: &str) -> Result<bool, SecretError> {
        check_address(service, account)?;

        // `secret-tool clear` succeeds whether or not anything matched
        if self.tool == CliTool::SecretTool && self.get(service, account).await?.is_none() {
            return Ok(false);
        }

        let finished = self.run(self.tool.delete_command(service, account)).await?;
        if finished.success() {
            Ok(true)
        } else if self.is_not_found(&finished) {
            Ok(false)
        } else {
            Err(self.failure(&finished))
        }
    }

    async fn accounts(&self, service: &str) -> Result<Option<Vec<String>>, SecretError> {
        let Some(spec) = self.tool.search_command(service) else {
            return Ok(None);
        };
        let finished = self.run(spec).await?;
        if finished.success() || self.is_not_found(&finished) {
            Ok(Some(parse_search_accounts(&finished.stdout)))
        } else {
            Err(self.failure(&finished))
        }
    }
}
