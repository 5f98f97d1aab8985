use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Flags accepted with a single dash, for compatibility with older scripts.
const LEGACY_FLAGS: [&str; 3] = ["folder", "files", "help"];

/// Merge several JW Library backups into one.
///
/// With no arguments, every archive next to the executable is merged.
#[derive(Debug, Parser)]
#[command(name = "jwlmerge", version, about)]
pub struct Cli {
    /// Merge every archive in this folder.
    #[arg(long, value_name = "DIR", conflicts_with = "files")]
    pub folder: Option<PathBuf>,
    /// Merge these archives, in this order.
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub files: Vec<PathBuf>,
    /// Read configuration from this file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Directory to write the merged archive to.
    #[arg(long, short, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// Log more (-v for info, -vv for debug).
    #[arg(long, short, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Where the archives to merge come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The directory holding the executable.
    Executable,
    Folder(PathBuf),
    Files(Vec<PathBuf>),
}

impl Cli {
    /// Parse the process arguments, accepting legacy single-dash flags.
    pub fn parse_legacy() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn try_parse_legacy_from(args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<Self, clap::Error> {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn input(&self) -> Input {
        match (&self.folder, self.files.is_empty()) {
            (Some(folder), _) => Input::Folder(folder.clone()),
            (None, false) => Input::Files(self.files.clone()),
            (None, true) => Input::Executable,
        }
    }
}

/// Rewrite `-folder`, `-files` and `-help` (any case) to their double-dash
/// forms. Everything else is passed through untouched.
pub fn normalize_args(args: impl IntoIterator<Item = impl Into<OsString>>) -> Vec<OsString> {
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let legacy = arg
                .to_str()
                .and_then(|s| s.strip_prefix('-'))
                .filter(|flag| !flag.starts_with('-'))
                .and_then(|flag| LEGACY_FLAGS.iter().find(|known| known.eq_ignore_ascii_case(flag)));
            match legacy {
                Some(flag) => OsString::from(format!("--{flag}")),
                None => arg,
            }
        })
        .collect()
}
