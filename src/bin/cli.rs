use anyhow::{Context, Result};
use basketball_trends::config::{Config, MappingArgs};
use basketball_trends::utils::data::{
    load_team_names, save_feature_table, save_mapping_table, save_report,
};
use basketball_trends::teams::{mapping_skeleton, NameResolver, Resolution};
use basketball_trends::Source;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ATS trends feature pipeline for pro and college basketball
#[derive(Parser, Debug)]
#[command(name = "cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the feature table and data-quality report for a date range
    Build(Config),

    /// Turn a JSON list of stats-site team names into a mapping table to curate
    Skeleton {
        /// JSON array of team names as the stats site writes them
        #[arg(long)]
        names: PathBuf,

        /// Where to write the skeleton
        #[arg(long, default_value = "team_mapping_skeleton.json")]
        out: PathBuf,
    },

    /// Check how one raw team name resolves against the mapping table
    Resolve {
        #[command(flatten)]
        mapping: MappingArgs,

        /// Site the name came from: stats_site, sportsbook or results_site
        #[arg(long, default_value = "sportsbook")]
        source: Source,

        /// Raw team name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Build(config) => build(config).await,
        Command::Skeleton { names, out } => skeleton(names, out),
        Command::Resolve {
            mapping,
            source,
            name,
        } => resolve(mapping, source, &name),
    }
}

async fn build(config: Config) -> Result<()> {
    println!("Basketball Trends Feature Pipeline\n");
    println!(
        "Building {} features for {} through {}...\n",
        config.mapping.league,
        config.start,
        config.end_date()
    );

    let output = basketball_trends::run(&config).await?;

    let table_path = config.feature_table_path();
    save_feature_table(&output.rows, &table_path)?;
    println!("Saved {} rows to {}", output.rows.len(), table_path.display());

    let report_path = config.report_path();
    save_report(&output.report, &report_path)?;
    println!("Saved data-quality report to {}\n", report_path.display());

    println!("DATA QUALITY\n");
    println!("{}", output.report);

    let unresolved = output.report.unresolved_names();
    if !unresolved.is_empty() {
        println!("\nNames awaiting curation:");
        for (source, name) in unresolved {
            println!("  {:<13} {}", source.to_string(), name);
        }
    }
    Ok(())
}

fn skeleton(names: PathBuf, out: PathBuf) -> Result<()> {
    let team_names = load_team_names(&names)
        .with_context(|| format!("Failed to load team names from {}", names.display()))?;
    let entries = mapping_skeleton(&team_names);
    save_mapping_table(&entries, &out)?;
    println!(
        "Wrote {} skeleton entries to {}. Fill in the sportsbook and results_site names before use.",
        entries.len(),
        out.display()
    );
    Ok(())
}

fn resolve(mapping: MappingArgs, source: Source, name: &str) -> Result<()> {
    mapping.validate()?;
    let registry = mapping.load_registry()?;
    let resolver = NameResolver::new(registry, mapping.policy());

    let canonical_id = match resolver.resolve_or_flag(source, name) {
        Resolution::Exact { canonical_id } => {
            println!("{} '{}' -> {} (exact)", source, name, canonical_id);
            canonical_id
        }
        Resolution::Fuzzy {
            canonical_id,
            score,
        } => {
            println!(
                "{} '{}' -> {} (fuzzy, score {:.3})",
                source, name, canonical_id, score
            );
            canonical_id
        }
        Resolution::Unresolved { raw_name } => {
            println!("{} '{}' is unresolved; add it to the mapping table", source, raw_name);
            return Ok(());
        }
    };

    println!("\nKnown names for {}:", canonical_id);
    for (site, names) in resolver.registry().known_names(&canonical_id) {
        let listed = if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        };
        println!("  {:<13} {}", site.to_string(), listed);
    }
    Ok(())
}
