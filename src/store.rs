use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;

use crate::layout::{Layout, SERVICE_USER};
use crate::system::Accounts;

/// Initial content of a user store that has never seen an account.
const EMPTY_USER_STORE: &[u8] = b"[]";

/// The store holds password hashes, so nobody but the service user may
/// read it.
const USER_STORE_MODE: u32 = 0o600;

/// Make sure the data directory exists and belongs to the service user.
/// Returns true when the directory was created by this call.
///
/// A symlink at the directory path is left alone, ownership is applied
/// through it.
pub fn ensure_data_dir(layout: &Layout, accounts: &dyn Accounts) -> Result<bool> {
    let dir = layout.data_dir();
    let created = match fs::symlink_metadata(&dir) {
        Ok(_) => false,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating data directory {}", dir.display()))?;
            true
        }
        Err(err) => {
            return Err(err).with_context(|| format!("inspecting {}", dir.display()));
        }
    };
    accounts.set_owner(&dir, SERVICE_USER)?;
    Ok(created)
}

/// Make sure the user store exists, belongs to the service user and is
/// unreadable for everyone else. Existing content is never touched.
/// Returns true when the file was created by this call.
pub fn ensure_users_file(layout: &Layout, accounts: &dyn Accounts) -> Result<bool> {
    let path = layout.users_file();
    let created = if path.exists() {
        false
    } else {
        fs::write(&path, EMPTY_USER_STORE)
            .with_context(|| format!("creating user store {}", path.display()))?;
        true
    };
    accounts.set_owner(&path, SERVICE_USER)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(USER_STORE_MODE))
        .with_context(|| format!("restricting permissions of {}", path.display()))?;
    Ok(created)
}
