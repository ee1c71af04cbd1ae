use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "dockhook",
    about = "Run local hook scripts when a registry reports a push",
    version,
    after_help = "Environment: WEBHOOK_HOOKS_DIR, WEBHOOK_POLICY_FILE, WEBHOOK_BIND, WEBHOOK_SECRET"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to dockhook.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook listener
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Hooks directory (overrides config)
        #[arg(long)]
        hooks_dir: Option<PathBuf>,
    },

    /// List the hook scripts that would run
    Hooks {
        /// Output format (defaults to text for TTY, json for pipes)
        #[arg(long, short = 'f', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check whether a push would be accepted, without running hooks
    Check {
        /// Repository name
        #[arg(long, short)]
        repository: Option<String>,

        /// Pusher identity
        #[arg(long, short)]
        pusher: Option<String>,

        /// Pushed tag
        #[arg(long, short)]
        tag: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
