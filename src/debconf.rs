use anyhow::{Context, Result, bail};
use std::io::Write;
use std::process::{Command, Stdio};

use crate::ui::prelude::*;

/// Access to the debconf database for our own questions.
pub trait ConfigDb {
    /// Read the stored answer. `None` when the question is unset or was
    /// already purged.
    fn get(&self, question: &str) -> Result<Option<String>>;

    /// Drop the question and its answer. Succeeds when it is already gone.
    fn unregister(&self, question: &str) -> Result<()>;
}

/// One reply line of the debconf protocol: a numeric code and optional text.
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    code: u32,
    text: String,
}

/// Success.
const CODE_OK: u32 = 0;
/// The named question does not exist in the database.
const CODE_NO_QUESTION: u32 = 10;

fn parse_reply(line: &str) -> Result<Reply> {
    let (code, text) = match line.split_once(' ') {
        Some((code, text)) => (code, text),
        None => (line, ""),
    };
    let code = code
        .parse::<u32>()
        .with_context(|| format!("unexpected debconf reply {line:?}"))?;
    Ok(Reply {
        code,
        text: text.to_string(),
    })
}

/// Talks to the debconf database through `debconf-communicate`.
///
/// The maintainer-script way would be to source confmodule, but a child
/// process per command keeps this usable from a regular binary and needs
/// no frontend on the other side.
pub struct DebconfClient {
    owner: String,
}

impl DebconfClient {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    fn send(&self, command: &str) -> Result<Reply> {
        let mut child = Command::new("debconf-communicate")
            .arg(&self.owner)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .context("spawning debconf-communicate")?;
        {
            let stdin = child
                .stdin
                .as_mut()
                .context("opening stdin of debconf-communicate")?;
            stdin
                .write_all(format!("{command}\n").as_bytes())
                .context("writing to debconf-communicate")?;
        }
        let output = child
            .wait_with_output()
            .context("waiting for debconf-communicate")?;
        // The numeric reply carries the outcome; the exit status mirrors it
        // and is redundant here.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .next()
            .context("debconf-communicate closed without a reply")?;
        let reply = parse_reply(line)?;
        if debug_enabled() {
            emit(
                Level::Debug,
                "postinst.debconf",
                &format!("debconf: {} -> {}", command, reply.code),
                None,
            );
        }
        Ok(reply)
    }
}

impl ConfigDb for DebconfClient {
    fn get(&self, question: &str) -> Result<Option<String>> {
        let reply = self.send(&format!("GET {question}"))?;
        match reply.code {
            CODE_OK => Ok(Some(reply.text)),
            CODE_NO_QUESTION => Ok(None),
            code => bail!("debconf GET {} failed: {} {}", question, code, reply.text),
        }
    }

    fn unregister(&self, question: &str) -> Result<()> {
        let reply = self.send(&format!("UNREGISTER {question}"))?;
        match reply.code {
            CODE_OK | CODE_NO_QUESTION => Ok(()),
            code => bail!(
                "debconf UNREGISTER {} failed: {} {}",
                question,
                code,
                reply.text
            ),
        }
    }
}
