use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;

/// How events are rendered on the process streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }

    fn wants_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

#[derive(Debug, Clone, Copy)]
struct Renderer {
    format: OutputFormat,
    color: bool,
    debug: bool,
}

static RENDERER: RwLock<Renderer> = RwLock::new(Renderer {
    format: OutputFormat::Text,
    color: true,
    debug: false,
});

/// Configure the process-wide renderer. Call once, before the first `emit`.
pub fn init(format: OutputFormat, color: bool, debug: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
        r.debug = debug;
    }
}

pub fn debug_enabled() -> bool {
    RENDERER.read().map(|r| r.debug).unwrap_or(false)
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, message: &str, enable: bool) -> String {
    if !enable {
        return message.to_string();
    }
    match level {
        Level::Info => message.normal().to_string(),
        Level::Success => message.green().to_string(),
        Level::Warn => message.yellow().bold().to_string(),
        Level::Error => message.red().bold().to_string(),
        Level::Debug => message.cyan().to_string(),
    }
}

/// Remove CSI escape sequences so JSON events stay clean.
fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn write_line(level: Level, line: &str) {
    if level.wants_stderr() {
        let _ = writeln!(io::stderr(), "{line}");
    } else {
        let _ = writeln!(io::stdout(), "{line}");
    }
}

/// Emit one event. Warnings and errors go to stderr, everything else to
/// stdout. Debug events are dropped unless debug output was enabled.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    let r = *RENDERER.read().expect("renderer lock poisoned");
    if level == Level::Debug && !r.debug {
        return;
    }
    match r.format {
        OutputFormat::Text => {
            write_line(level, &colorize(level, message, r.color));
        }
        OutputFormat::Json => {
            let clean = strip_ansi(message);
            let event = Event {
                level: level.as_str(),
                code,
                message: &clean,
                data,
            };
            let line = serde_json::to_string(&event).expect("serialize event");
            write_line(level, &line);
        }
    }
}

pub mod prelude {
    pub use super::{Level, OutputFormat, debug_enabled, emit};
}
