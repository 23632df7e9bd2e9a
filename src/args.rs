use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tailwind Catalog CLI - Extracts and catalogs Tailwind components from PHP/HTML projects
#[derive(Parser, Debug)]
#[command(name = "tailwind-catalog-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract Tailwind components from source files into a catalog
    Extract(ExtractArgs),
    /// Read HTML from stdin and write the catalog JSON to stdout
    Pipe(PipeArgs),
}

/// Arguments for the extract command
#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    /// Input file patterns (glob patterns supported)
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATTERN",
        required = true,
        num_args = 1..,
        help = "Input file patterns to scan for Tailwind components"
    )]
    pub input: Vec<String>,

    /// Output report file path
    #[arg(
        short = 'o',
        long = "output-report",
        value_name = "PATH",
        default_value = "tailwind_components.txt",
        help = "Path where the text report will be written"
    )]
    pub output_report: PathBuf,

    /// Output catalog file path (JSON)
    #[arg(
        short = 'm',
        long = "output-catalog",
        value_name = "PATH",
        default_value = "tailwind_catalog.json",
        help = "Path where the JSON catalog will be written"
    )]
    pub output_catalog: PathBuf,

    /// Configuration file path (YAML or JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to configuration file (YAML or JSON format)"
    )]
    pub config: Option<PathBuf>,

    /// Also execute PHP files and scan their rendered output
    #[arg(
        long = "execute-php",
        default_value_t = false,
        help = "Execute PHP files and extract from their rendered HTML (disabled by default)"
    )]
    pub execute_php: bool,

    /// Path to the PHP executable (overrides the config file)
    #[arg(
        long = "php-path",
        value_name = "PATH",
        help = "Path to PHP executable used with --execute-php"
    )]
    pub php_path: Option<String>,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,

    /// Number of parallel threads to use
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    /// Exclude patterns (glob patterns to exclude)
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude from scanning"
    )]
    pub exclude: Vec<String>,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Perform extraction but don't write output files"
    )]
    pub dry_run: bool,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Emit compact JSON instead of pretty-printed
    #[arg(
        long = "compact",
        default_value_t = false,
        help = "Emit compact single-line JSON"
    )]
    pub compact: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to configuration file (YAML or JSON format)"
    )]
    pub config: Option<PathBuf>,
}

impl ExtractArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_empty() {
            return Err("At least one input pattern must be provided".to_string());
        }

        if self.output_report == self.output_catalog {
            return Err("Report and catalog output paths must be different".to_string());
        }

        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        Ok(())
    }
}
