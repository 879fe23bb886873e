use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "attrhost",
    bin_name = "attrhost",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Inspect and review extracted document attributes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to attrhost.toml in the user config directory)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Counters and every attribute in tab order
    Summary {
        /// Attribute document (JSON)
        file: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Where navigation goes next
    Next {
        file: PathBuf,

        /// Start after this attribute index instead of the top
        #[arg(long, value_name = "INDEX")]
        after: Option<usize>,

        /// Next attribute that has not been viewed
        #[arg(long, conflicts_with = "invalid")]
        unviewed: bool,

        /// Next attribute that failed validation
        #[arg(long)]
        invalid: bool,

        /// Shift+Tab instead of Tab
        #[arg(long, conflicts_with_all = ["unviewed", "invalid"])]
        backward: bool,
    },

    /// Mark attributes as viewed and save the document
    View {
        file: PathBuf,

        /// Attribute indexes, as printed by `summary`
        #[arg(required_unless_present = "all")]
        indexes: Vec<usize>,

        /// Mark every attribute
        #[arg(long, conflicts_with = "indexes")]
        all: bool,
    },

    /// Whether the document may be saved as it is
    SaveCheck { file: PathBuf },

    /// Print the effective configuration
    Config,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
