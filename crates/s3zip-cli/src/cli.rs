//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use s3zip_core::ArchiveConfig;
use s3zip_core::ForbiddenPolicy;
use s3zip_core::S3Settings;
use s3zip_core::config::DEFAULT_ARCHIVE_NAME;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "s3zip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Diagnostic log level (written to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

impl Cli {
    /// Returns the effective log level; `--verbose` raises it to at least info.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            self.log_level.max(LogLevel::Info)
        } else {
            self.log_level
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream a bucket prefix into a ZIP archive
    #[command(after_long_help = "\
If the run fails or is interrupted, the archive is left without a central \
directory. The zip encoder then prints a line ending in \"archive sink is \
sealed\" to stderr; it is expected and is not affected by --quiet or --json.")]
    Create(CreateArgs),
    /// List the entries an archive would contain without downloading objects
    List(ListArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Log verbosity, ordered from quietest to noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Selects the objects to archive.
#[derive(clap::Args)]
pub struct SourceArgs {
    /// Bucket holding the objects
    #[arg(short, long, value_name = "BUCKET")]
    pub bucket: String,

    /// Root prefix to archive (default: whole bucket)
    #[arg(short, long, value_name = "PREFIX", default_value = "")]
    pub prefix: String,

    /// Exclude keys and folders matching a regular expression (can be
    /// repeated, first match wins)
    #[arg(long = "exclude", short = 'x', value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Name entries relative to the root prefix
    #[arg(long)]
    pub strip_root: bool,

    /// Abort when listing a folder is denied instead of skipping it
    #[arg(long)]
    pub fail_on_forbidden: bool,

    #[command(flatten)]
    pub s3: S3Args,
}

impl SourceArgs {
    /// Builds the archive configuration shared by all commands.
    pub fn archive_config(&self) -> ArchiveConfig {
        let policy = if self.fail_on_forbidden {
            ForbiddenPolicy::Fail
        } else {
            ForbiddenPolicy::Skip
        };

        ArchiveConfig::new(self.bucket.clone())
            .with_prefix(self.prefix.clone())
            .with_exclude_patterns(self.exclude.clone())
            .with_forbidden_policy(policy)
            .with_strip_root(self.strip_root)
    }
}

/// Storage connection options.
#[derive(clap::Args)]
pub struct S3Args {
    /// AWS region (default: from the environment or profile)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services (forces path-style
    /// addressing)
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Named AWS profile
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Access key ID (requires --secret-key)
    #[arg(long, value_name = "KEY")]
    pub access_key: Option<String>,

    /// Secret access key (requires --access-key)
    #[arg(long, value_name = "SECRET")]
    pub secret_key: Option<String>,

    /// Timeout for each storage call in seconds
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Maximum keys per listing page
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=1000))]
    pub page_size: Option<i32>,
}

impl S3Args {
    /// Builds the storage settings.
    pub fn settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint: self.endpoint_url.clone(),
            profile: self.profile.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            timeout_secs: self.timeout,
            max_keys: self.page_size,
        }
    }
}

#[derive(clap::Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file, or `-` to stream to stdout (default: the archive name)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Archive name presented to the consumer
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_ARCHIVE_NAME)]
    pub name: String,

    /// Compression level (0 = store, 1-9 = deflate)
    #[arg(short = 'l', long, default_value = "6", value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression_level: u8,

    /// Overwrite output file if exists
    #[arg(short = 'f', long)]
    pub force: bool,
}

impl CreateArgs {
    /// Returns where the archive goes.
    pub fn target(&self) -> OutputTarget {
        match &self.output {
            Some(path) if path.as_os_str() == "-" => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(path.clone()),
            None => OutputTarget::File(PathBuf::from(&self.name)),
        }
    }
}

/// Destination of the archive bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Forward-only stream to stdout.
    Stdout,
    /// Seekable file.
    File(PathBuf),
}

#[derive(clap::Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let cli = parse(&["s3zip", "create", "--bucket", "b"]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.compression_level, 6);
        assert_eq!(args.name, "archive.zip");
        assert_eq!(args.target(), OutputTarget::File(PathBuf::from("archive.zip")));
        assert_eq!(args.source.s3.timeout, 300);

        let config = args.source.archive_config();
        assert_eq!(config.bucket, "b");
        assert_eq!(config.forbidden_policy, ForbiddenPolicy::Skip);
    }

    #[test]
    fn test_stdout_target() {
        let cli = parse(&["s3zip", "create", "-b", "b", "-o", "-"]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.target(), OutputTarget::Stdout);
    }

    #[test]
    fn test_exclude_order_is_kept() {
        let cli = parse(&["s3zip", "list", "-b", "b", "-x", "^z/", "-x", "^a/"]);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.source.exclude, vec!["^z/", "^a/"]);
    }

    #[test]
    fn test_fail_on_forbidden() {
        let cli = parse(&["s3zip", "list", "-b", "b", "--fail-on-forbidden"]);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(
            args.source.archive_config().forbidden_policy,
            ForbiddenPolicy::Fail
        );
    }

    #[test]
    fn test_compression_level_range() {
        assert!(Cli::try_parse_from(["s3zip", "create", "-b", "b", "-l", "0"]).is_ok());
        assert!(Cli::try_parse_from(["s3zip", "create", "-b", "b", "-l", "10"]).is_err());
    }

    #[test]
    fn test_page_size_range() {
        assert!(Cli::try_parse_from(["s3zip", "list", "-b", "b", "--page-size", "1000"]).is_ok());
        assert!(Cli::try_parse_from(["s3zip", "list", "-b", "b", "--page-size", "0"]).is_err());
    }

    #[test]
    fn test_verbose_raises_log_level() {
        let cli = parse(&["s3zip", "-v", "list", "-b", "b"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Info);

        let cli = parse(&["s3zip", "-v", "--log-level", "trace", "list", "-b", "b"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Trace);

        let cli = parse(&["s3zip", "list", "-b", "b"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Warn);
    }
}
