//! Command-line surface of `logix-transfer`.

use clap::{Args, Parser, Subcommand};
use logix_core::{DownloadOptions, InfoOptions, UploadOptions};
use std::ffi::OsString;
use std::path::PathBuf;

/// Verb assumed when the first argument is not one.
pub const DEFAULT_VERB: &str = "download";

const VERBS: &[&str] = &[
    "upload", "up", "u", "download", "down", "d", "info", "i", "help",
];

/// Upload, download and inspect Logix controller projects.
#[derive(Parser, Debug)]
#[command(name = "logix-transfer", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Uploads from the controller to the file.
    #[command(visible_aliases = ["up", "u"])]
    Upload(UploadArgs),

    /// Downloads from the file to the controller.
    #[command(visible_aliases = ["down", "d"])]
    Download(DownloadArgs),

    /// Provides info about a project.
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

/// Options accepted by every verb.
#[derive(Args, Debug, Clone, Default)]
pub struct SharedArgs {
    /// Sets the program to verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Specifies the user for logging into FactoryTalk directory.
    #[arg(long)]
    pub user: Option<String>,

    /// Specifies the password for the user.
    #[arg(long)]
    pub pass: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Specifies the file to use.
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Communication path of the controller to upload from.
    #[arg(short, long)]
    pub path: String,

    /// Uploads the tag values with the project.
    #[arg(short = 't', long = "tags")]
    pub tags: bool,

    #[command(flatten)]
    pub shared: SharedArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Specifies the file to use.
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Overrides the path in the file.
    #[arg(short, long)]
    pub path: Option<String>,

    /// If set, leaves the controller in program mode after download.
    #[arg(long = "prog-mode")]
    pub prog_mode: bool,

    /// If set, enables forces in the controller (default disabled).
    #[arg(long = "forces-on")]
    pub forces_on: bool,

    #[command(flatten)]
    pub shared: SharedArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Specifies the file to use.
    #[arg(short, long)]
    pub filename: Option<PathBuf>,

    #[command(flatten)]
    pub shared: SharedArgs,
}

impl Cli {
    /// Parse a full argument list, program name first.
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

impl Command {
    pub fn shared(&self) -> &SharedArgs {
        match self {
            Command::Upload(args) => &args.shared,
            Command::Download(args) => &args.shared,
            Command::Info(args) => &args.shared,
        }
    }

    pub fn verbose(&self) -> bool {
        self.shared().verbose
    }

    /// Project file that must already exist for this verb to run.
    ///
    /// Upload creates a missing file, so it has none. A missing info
    /// filename reads as an empty path, which never exists.
    pub fn required_file(&self) -> Option<PathBuf> {
        match self {
            Command::Upload(_) => None,
            Command::Download(args) => Some(args.filename.clone()),
            Command::Info(args) => Some(args.filename.clone().unwrap_or_default()),
        }
    }
}

/// Insert [`DEFAULT_VERB`] when the first argument is neither a verb nor a
/// help/version flag.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let needs_verb = match args.get(1).and_then(|first| first.to_str()) {
        Some(first) => {
            !VERBS.contains(&first) && !matches!(first, "-h" | "--help" | "-V" | "--version")
        }
        None => false,
    };
    if needs_verb {
        args.insert(1, OsString::from(DEFAULT_VERB));
    }
    args
}

impl From<&UploadArgs> for UploadOptions {
    fn from(args: &UploadArgs) -> Self {
        Self {
            filename: args.filename.clone(),
            path: args.path.clone(),
            tag_values: args.tags,
        }
    }
}

impl From<&DownloadArgs> for DownloadOptions {
    fn from(args: &DownloadArgs) -> Self {
        Self {
            filename: args.filename.clone(),
            path: args.path.clone(),
            program_mode: args.prog_mode,
            forces_on: args.forces_on,
        }
    }
}

impl From<&InfoArgs> for InfoOptions {
    fn from(args: &InfoArgs) -> Self {
        Self {
            filename: args.filename.clone(),
        }
    }
}
