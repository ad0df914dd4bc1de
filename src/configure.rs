use anyhow::{Context, Result};

use crate::admin::AdminProvisioner;
use crate::debconf::ConfigDb;
use crate::layout::{ADMIN_ACCOUNT, DEVICE_ACCESS_GROUP, Layout, PASSWORD_QUESTION, SERVICE_USER};
use crate::store;
use crate::system::Accounts;
use crate::ui::prelude::*;

/// Runs the post-installation sequence: service account, data directory,
/// user store, and optionally the initial admin account.
///
/// Every step converges instead of asserting, so the whole sequence can be
/// replayed on upgrades and reconfigures without changing an already
/// configured system.
pub struct Configurator<'a> {
    layout: &'a Layout,
    accounts: &'a dyn Accounts,
    config_db: &'a dyn ConfigDb,
    admin: &'a dyn AdminProvisioner,
}

impl<'a> Configurator<'a> {
    pub fn new(
        layout: &'a Layout,
        accounts: &'a dyn Accounts,
        config_db: &'a dyn ConfigDb,
        admin: &'a dyn AdminProvisioner,
    ) -> Self {
        Self {
            layout,
            accounts,
            config_db,
            admin,
        }
    }

    pub fn run(&self) -> Result<()> {
        self.ensure_service_account()?;
        self.ensure_storage()?;
        self.seed_admin_account()?;
        emit(Level::Success, "postinst.done", "openwebrx configured", None);
        Ok(())
    }

    fn ensure_service_account(&self) -> Result<()> {
        let created = self
            .accounts
            .ensure_service_user(SERVICE_USER)
            .with_context(|| format!("ensuring the {SERVICE_USER} system account"))?;
        if created {
            emit(
                Level::Info,
                "postinst.account.created",
                &format!("created system account {SERVICE_USER}"),
                None,
            );
        } else {
            emit(
                Level::Debug,
                "postinst.account.present",
                &format!("system account {SERVICE_USER} already present"),
                None,
            );
        }

        let joined = self
            .accounts
            .ensure_group_membership(SERVICE_USER, DEVICE_ACCESS_GROUP)
            .with_context(|| format!("adding {SERVICE_USER} to the {DEVICE_ACCESS_GROUP} group"))?;
        if joined {
            emit(
                Level::Info,
                "postinst.account.device_access",
                &format!("added {SERVICE_USER} to group {DEVICE_ACCESS_GROUP}"),
                None,
            );
        }
        Ok(())
    }

    fn ensure_storage(&self) -> Result<()> {
        let dir = self.layout.data_dir();
        let created = store::ensure_data_dir(self.layout, self.accounts)
            .with_context(|| format!("setting up {}", dir.display()))?;
        if created {
            emit(
                Level::Info,
                "postinst.storage.dir",
                &format!("created data directory {}", dir.display()),
                None,
            );
        }

        let path = self.layout.users_file();
        let initialized = store::ensure_users_file(self.layout, self.accounts)
            .with_context(|| format!("setting up {}", path.display()))?;
        if initialized {
            emit(
                Level::Info,
                "postinst.storage.users",
                &format!("initialized empty user store {}", path.display()),
                None,
            );
        }
        Ok(())
    }

    fn seed_admin_account(&self) -> Result<()> {
        let answer = self
            .config_db
            .get(PASSWORD_QUESTION)
            .context("reading the admin password from debconf")?;
        let provisioned = match answer.as_deref() {
            Some(password) if !password.is_empty() => {
                self.admin.add_user(ADMIN_ACCOUNT, password).map(|()| true)
            }
            _ => Ok(false),
        };
        // The password must not outlive this run, so purge it before
        // looking at the provisioning outcome.
        self.config_db
            .unregister(PASSWORD_QUESTION)
            .context("purging the admin password from debconf")?;
        let provisioned =
            provisioned.with_context(|| format!("provisioning the {ADMIN_ACCOUNT} account"))?;
        if provisioned {
            emit(
                Level::Info,
                "postinst.admin.seeded",
                &format!("created initial {ADMIN_ACCOUNT} account"),
                None,
            );
        } else {
            emit(
                Level::Debug,
                "postinst.admin.skipped",
                "no admin password set, not creating an account",
                None,
            );
        }
        Ok(())
    }
}
