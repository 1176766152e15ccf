//! Evaluation context configuration.
//!
//! Settings are read from a small rc-file made of `/set` lines:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set a setting |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Recognised settings:
//!
//! | Name | Meaning | Default |
//! |------|---------|---------|
//! | `max_timers` | timer slot count; ids are `1..max_timers` | `255` |
//! | `timer_mode` | `latest` or `queued` | `latest` |
//! | `timer_queue_depth` | firings kept in `queued` mode | `16` |
//! | `shell` | shell used for script statements | `/bin/sh` |

use std::path::Path;

use crate::timer::{TimerMode, DEFAULT_MAX_TIMERS};

/// Shell that runs script statements unless configured otherwise.
pub const DEFAULT_SHELL: &str = "/bin/sh";

pub const DEFAULT_QUEUE_DEPTH: usize = 16;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_timers: u16,
    pub timer_mode: TimerMode,
    pub timer_queue_depth: usize,
    pub shell: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_timers: DEFAULT_MAX_TIMERS,
            timer_mode: TimerMode::Latest,
            timer_queue_depth: DEFAULT_QUEUE_DEPTH,
            shell: DEFAULT_SHELL.to_owned(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Unknown commands are skipped.  Returns the config and a list of any
    /// errors on `/set` lines; a bad line leaves its setting at the default.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));

            if cmd == "set" {
                let tokens = split_args(args_str.trim());
                if let Err(msg) = parse_set(&tokens, &mut config) {
                    errors.push(ConfigError { line: lineno, message: msg });
                }
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── /set ─────────────────────────────────────────────────────────────────────

/// Parse `/set <name>=<value>` or `/set <name> <value>` into `config`.
fn parse_set(tokens: &[String], config: &mut Config) -> Result<(), String> {
    if tokens.is_empty() {
        return Err("/set: requires an argument".into());
    }

    let (name, value) = if let Some((name, value)) = tokens[0].split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (tokens[0].clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("/set: missing value for '{}'", tokens[0]));
    };

    match name.as_str() {
        "" => return Err("/set: variable name cannot be empty".into()),
        "max_timers" => {
            let n: u16 = value
                .parse()
                .map_err(|_| format!("max_timers: '{value}' is not a number"))?;
            if n < 2 {
                return Err(format!("max_timers: {n} leaves no usable timer ids"));
            }
            config.max_timers = n;
        }
        "timer_mode" => {
            config.timer_mode = match value.to_ascii_lowercase().as_str() {
                "latest" => TimerMode::Latest,
                "queued" => TimerMode::Queued,
                other => return Err(format!("timer_mode: unknown mode '{other}'")),
            };
        }
        "timer_queue_depth" => {
            let n: usize = value
                .parse()
                .map_err(|_| format!("timer_queue_depth: '{value}' is not a number"))?;
            if n == 0 {
                return Err("timer_queue_depth: must be at least 1".into());
            }
            config.timer_queue_depth = n;
        }
        "shell" => {
            if value.is_empty() {
                return Err("shell: cannot be empty".into());
            }
            config.shell = value;
        }
        other => return Err(format!("/set: unknown setting '{other}'")),
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
