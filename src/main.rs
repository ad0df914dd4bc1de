mod admin;
mod configure;
mod debconf;
mod layout;
mod store;
mod system;
mod ui;

use clap::Parser;
use std::path::PathBuf;
use sudo::RunningAs;

use crate::admin::AdminCli;
use crate::configure::Configurator;
use crate::debconf::DebconfClient;
use crate::layout::{DEBCONF_OWNER, Layout};
use crate::system::SystemAccounts;
use crate::ui::prelude::*;

/// Post-installation configurator for the OpenWebRX Debian package
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maintainer script mode, as passed by dpkg
    mode: String,

    /// Version previously configured, passed by dpkg on upgrades
    previous_version: Option<String>,

    /// Resolve all filesystem paths beneath this directory
    #[arg(long, value_name = "DIR", default_value = "/")]
    root: PathBuf,

    /// Show what is being done behind the scenes
    #[arg(short, long)]
    debug: bool,

    /// Emit line-delimited JSON events instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.json, cli.debug);

    match cli.mode.as_str() {
        "configure" | "reconfigure" => {
            if let Some(version) = &cli.previous_version {
                emit(
                    Level::Debug,
                    "postinst.upgrade",
                    &format!("configuring over previous version {version}"),
                    None,
                );
            }
            if matches!(sudo::check(), RunningAs::User) {
                emit(
                    Level::Warn,
                    "postinst.privileges",
                    "not running as root, system changes will likely fail",
                    None,
                );
            }
            let layout = Layout::new(&cli.root);
            let accounts = SystemAccounts;
            let config_db = DebconfClient::new(DEBCONF_OWNER);
            let admin = AdminCli;
            if let Err(e) = Configurator::new(&layout, &accounts, &config_db, &admin).run() {
                emit(Level::Error, "postinst.failed", &format!("{e:#}"), None);
                std::process::exit(1);
            }
        }
        other => {
            emit(
                Level::Error,
                "postinst.unknown_argument",
                &format!("postinst called with unknown argument '{other}'"),
                None,
            );
            std::process::exit(1);
        }
    }
}
