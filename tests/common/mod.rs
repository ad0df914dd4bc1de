use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

use crate::utils::CommandOutput;

/// Scratch installation the binary runs against: a staging root for the
/// filesystem work plus a bin directory of stub system commands that gets
/// prepended to PATH.
///
/// The stubs record every invocation in a shared log and keep their state
/// in marker files, so `getent` and `id` report an account only after the
/// stubbed `adduser`/`usermod` ran. The passwd entry they report carries
/// the current uid and gid, which lets the ownership step succeed without
/// root privileges.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;
        for dir in ["bin", "root", "state"] {
            fs::create_dir(temp_dir.path().join(dir))?;
        }
        let env = Self { temp_dir };
        env.install_default_stubs()?;
        Ok(env)
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("root")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("var/lib/openwebrx")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    fn bin_dir(&self) -> PathBuf {
        self.temp_dir.path().join("bin")
    }

    fn state_dir(&self) -> PathBuf {
        self.temp_dir.path().join("state")
    }

    fn log_file(&self) -> PathBuf {
        self.temp_dir.path().join("commands.log")
    }

    fn install_stub(&self, name: &str, body: &str) -> Result<()> {
        let path = self.bin_dir().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    fn install_default_stubs(&self) -> Result<()> {
        let uid = current_id("-u")?;
        let gid = current_id("-g")?;

        self.install_stub(
            "getent",
            &format!(
                r#"echo "getent $*" >> "$STUB_LOG"
if [ "$1" = "passwd" ] && [ -e "$STUB_STATE/user-created" ]; then
    echo "openwebrx:x:{uid}:{gid}:OpenWebRX:/nonexistent:/usr/sbin/nologin"
    exit 0
fi
exit 2
"#
            ),
        )?;

        self.install_stub(
            "adduser",
            r#"echo "adduser $*" >> "$STUB_LOG"
touch "$STUB_STATE/user-created"
"#,
        )?;

        self.install_stub(
            "id",
            r#"echo "id $*" >> "$STUB_LOG"
if [ -e "$STUB_STATE/group-added" ]; then
    echo "openwebrx plugdev"
else
    echo "openwebrx"
fi
"#,
        )?;

        self.install_stub(
            "usermod",
            r#"echo "usermod $*" >> "$STUB_LOG"
touch "$STUB_STATE/group-added"
"#,
        )?;

        self.install_stub(
            "debconf-communicate",
            r#"read -r line
echo "$line" >> "$STUB_LOG"
case "$line" in
    GET*)
        if [ -e "$STUB_STATE/password-reply" ]; then
            cat "$STUB_STATE/password-reply"
        else
            echo "10 openwebrx/admin_user_password doesn't exist"
        fi
        ;;
    UNREGISTER*)
        if [ -e "$STUB_STATE/unregister-reply" ]; then
            cat "$STUB_STATE/unregister-reply"
        else
            echo "0"
        fi
        ;;
    *)
        echo "20 Unsupported command"
        ;;
esac
"#,
        )?;

        self.install_stub(
            "openwebrx-admin",
            r#"echo "openwebrx-admin $*" >> "$STUB_LOG"
echo "$OWRX_PASSWORD" > "$STUB_STATE/seen-password"
if [ -e "$STUB_STATE/admin-fail" ]; then
    echo "admin tool refused" >&2
    exit 1
fi
"#,
        )?;

        Ok(())
    }

    /// Store a debconf answer for the password question.
    pub fn seed_password(&self, password: &str) -> Result<()> {
        self.set_password_reply(&format!("0 {password}"))
    }

    /// Answer `GET` for the password question with a raw protocol reply.
    pub fn set_password_reply(&self, reply: &str) -> Result<()> {
        fs::write(
            self.state_dir().join("password-reply"),
            format!("{reply}\n"),
        )?;
        Ok(())
    }

    /// Answer `UNREGISTER` with a raw protocol reply instead of success.
    pub fn set_unregister_reply(&self, reply: &str) -> Result<()> {
        fs::write(
            self.state_dir().join("unregister-reply"),
            format!("{reply}\n"),
        )?;
        Ok(())
    }

    /// Make the stubbed admin tool exit non-zero.
    pub fn fail_admin_tool(&self) -> Result<()> {
        fs::write(self.state_dir().join("admin-fail"), "")?;
        Ok(())
    }

    pub fn run_postinst(&self, args: &[&str]) -> Result<CommandOutput> {
        let path = format!(
            "{}:{}",
            self.bin_dir().display(),
            std::env::var("PATH").unwrap_or_default()
        );
        let output = Command::new(env!("CARGO_BIN_EXE_openwebrx-postinst"))
            .args(args)
            .env("PATH", path)
            .env("STUB_LOG", self.log_file())
            .env("STUB_STATE", self.state_dir())
            .env("NO_COLOR", "1")
            .output()
            .context("running openwebrx-postinst")?;
        Ok(CommandOutput::from_output(output))
    }

    pub fn run_configure(&self) -> Result<CommandOutput> {
        let root = self.root();
        let root = root.to_str().context("staging root is not utf-8")?;
        self.run_postinst(&["configure", "--root", root])
    }

    /// Everything the stubs were asked to do, in order.
    pub fn logged_commands(&self) -> Vec<String> {
        fs::read_to_string(self.log_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// The password the stubbed admin tool received through its environment.
    pub fn seen_password(&self) -> Option<String> {
        fs::read_to_string(self.state_dir().join("seen-password"))
            .ok()
            .map(|s| s.trim_end().to_string())
    }
}

fn current_id(flag: &str) -> Result<String> {
    let output = Command::new("id").arg(flag).output().context("running id")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
