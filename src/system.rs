use anyhow::{Context, Result, bail};
use nix::unistd::{Gid, Uid, chown};
use std::path::Path;
use std::process::Command;

use crate::ui::prelude::*;

/// Narrow, idempotent operations against the OS account database.
///
/// Everything here maps to one external command plus a query guarding it,
/// so repeating a call never changes an already converged system.
pub trait Accounts {
    /// Create `user` as a system account if it is missing.
    /// Returns true when the account was created by this call.
    fn ensure_service_user(&self, user: &str) -> Result<bool>;

    /// Add `user` to `group` unless it is already a member.
    /// Returns true when the membership was added by this call.
    fn ensure_group_membership(&self, user: &str, group: &str) -> Result<bool>;

    /// Hand `path` over to `user` and its primary group.
    fn set_owner(&self, path: &Path, user: &str) -> Result<()>;
}

/// Passwd fields we care about: third and fourth column of a getent line.
fn parse_passwd_line(line: &str) -> Option<(u32, u32)> {
    let mut fields = line.trim().split(':');
    let _name = fields.next()?;
    let _password = fields.next()?;
    let uid = fields.next()?.parse().ok()?;
    let gid = fields.next()?.parse().ok()?;
    Some((uid, gid))
}

/// Implementation backed by getent, adduser and usermod.
pub struct SystemAccounts;

impl SystemAccounts {
    fn passwd_entry(&self, user: &str) -> Result<Option<(u32, u32)>> {
        let output = Command::new("getent")
            .arg("passwd")
            .arg(user)
            .output()
            .context("running getent passwd")?;
        if !output.status.success() {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&output.stdout);
        Ok(parse_passwd_line(&line))
    }

    fn group_memberships(&self, user: &str) -> Result<Vec<String>> {
        let output = Command::new("id")
            .arg("-nG")
            .arg(user)
            .output()
            .context("running id -nG")?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let groups = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(groups)
    }
}

impl Accounts for SystemAccounts {
    fn ensure_service_user(&self, user: &str) -> Result<bool> {
        if self.passwd_entry(user)?.is_some() {
            return Ok(false);
        }
        emit(
            Level::Debug,
            "postinst.accounts.adduser",
            &format!("creating system account {user}"),
            None,
        );
        let status = Command::new("adduser")
            .args([
                "--system",
                "--group",
                "--no-create-home",
                "--home",
                "/nonexistent",
                "--quiet",
            ])
            .arg(user)
            .status()
            .context("running adduser")?;
        if !status.success() {
            bail!("adduser {} failed with status {:?}", user, status.code());
        }
        Ok(true)
    }

    fn ensure_group_membership(&self, user: &str, group: &str) -> Result<bool> {
        if self.group_memberships(user)?.iter().any(|g| g == group) {
            return Ok(false);
        }
        emit(
            Level::Debug,
            "postinst.accounts.usermod",
            &format!("adding {user} to group {group}"),
            None,
        );
        let status = Command::new("usermod")
            .args(["-a", "-G", group, user])
            .status()
            .context("running usermod")?;
        if !status.success() {
            bail!(
                "usermod -a -G {} {} failed with status {:?}",
                group,
                user,
                status.code()
            );
        }
        Ok(true)
    }

    fn set_owner(&self, path: &Path, user: &str) -> Result<()> {
        let (uid, gid) = self
            .passwd_entry(user)?
            .with_context(|| format!("account {user} not present in the passwd database"))?;
        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .with_context(|| format!("changing ownership of {}", path.display()))?;
        Ok(())
    }
}
