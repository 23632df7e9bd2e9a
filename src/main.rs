use clap::Parser;
use tailwind_catalog::{extract, handle_pipe_command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => match extract(args).await {
            Ok(result) => {
                println!("Extraction successful!");
                println!(
                    "  - Processed {} files",
                    result.catalog.metadata.stats.files_scanned
                );
                println!("  - Unique components: {}", result.catalog.component_count());
                println!("  - Total sightings: {}", result.catalog.location_count());
                if !result.catalog.errors.is_empty() {
                    println!(
                        "  - {} file(s) had errors (see catalog)",
                        result.catalog.errors.len()
                    );
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Pipe(args) => {
            handle_pipe_command(args).await?;
            Ok(())
        }
    }
}
