use std::path::PathBuf;

/// Account the receiver runs under. Created on first configure.
pub const SERVICE_USER: &str = "openwebrx";

/// Supplementary group granting access to USB SDR devices.
pub const DEVICE_ACCESS_GROUP: &str = "plugdev";

/// Name of the web account seeded from the debconf answer.
pub const ADMIN_ACCOUNT: &str = "admin";

/// Debconf owner the password question is registered under.
pub const DEBCONF_OWNER: &str = "openwebrx";

/// Debconf question the admin password is stored under until configure
/// consumes it.
pub const PASSWORD_QUESTION: &str = "openwebrx/admin_user_password";

const DATA_DIR: &str = "var/lib/openwebrx";
const USERS_FILE: &str = "users.json";

/// Filesystem layout of the installed package, rooted at a base directory.
///
/// The base is `/` in production. Tests point it at a scratch directory so
/// the whole sequence can run unprivileged.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join(USERS_FILE)
    }
}
