use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Tool shipped by the package for managing web accounts.
pub const ADMIN_TOOL: &str = "openwebrx-admin";

/// Environment variable the tool reads the password from in
/// non-interactive mode. Keeps the secret off the command line.
pub const PASSWORD_ENV: &str = "OWRX_PASSWORD";

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("failed to run openwebrx-admin: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
    #[error("openwebrx-admin exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },
    #[error("openwebrx-admin was terminated by a signal")]
    Killed,
}

impl AdminError {
    fn from_status(status: ExitStatus, stderr: String) -> Self {
        match status.code() {
            Some(code) => AdminError::Failed { code, stderr },
            None => AdminError::Killed,
        }
    }
}

/// Creates web accounts in the receiver's user store.
pub trait AdminProvisioner {
    fn add_user(&self, username: &str, password: &str) -> Result<(), AdminError>;
}

/// Shells out to the packaged admin tool.
pub struct AdminCli;

impl AdminProvisioner for AdminCli {
    fn add_user(&self, username: &str, password: &str) -> Result<(), AdminError> {
        let output = Command::new(ADMIN_TOOL)
            .arg("--noninteractive")
            .arg("adduser")
            .arg(username)
            .env(PASSWORD_ENV, password)
            .output()
            .map_err(|source| AdminError::Spawn { source })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AdminError::from_status(output.status, stderr));
        }
        Ok(())
    }
}
