//! Main entry point for the psfs CLI application.
//!
//! This binary lists and extracts resources stored in PS_FS_V1 archives.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use psfs::cli::Planned;
use psfs::resource::display_size;
use psfs::{Archive, Cli, Resource};

/// Application entry point.
///
/// Opens the archive, then lists it or extracts the selected resources.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let archive = Archive::open(&cli.file)
        .with_context(|| format!("cannot open archive '{}'", cli.file.display()))?;

    // List mode: display archive contents and exit
    if cli.list || cli.verbose {
        return list_resources(&archive, cli.verbose);
    }

    let selected: Vec<Resource> = archive
        .resources()?
        .iter()
        .filter(|r| cli.selects(r.name()))
        .cloned()
        .collect();
    debug!(
        "{} of {} resources selected",
        selected.len(),
        archive.resource_count()
    );

    if selected.is_empty() {
        if !cli.names.is_empty() {
            warn!("no resources matched {:?}", cli.names);
        }
        return Ok(());
    }

    if cli.pipe {
        pipe_resources(Arc::new(archive), selected).await
    } else {
        extract_resources(Arc::new(archive), selected, &cli).await
    }
}

/// Send diagnostics to stderr at the level chosen by `-q`.
fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_level().into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// List resources in the archive.
///
/// - Simple format (`-l`): names, one per line
/// - Verbose format (`-v`): size, offset and display size per resource, plus totals
fn list_resources(archive: &Archive, verbose: bool) -> Result<()> {
    let resources = archive.resources()?;

    if !verbose {
        for resource in resources {
            println!("{}", resource.name());
        }
        return Ok(());
    }

    println!("{:>10}  {:>10}  {:>10}  Name", "Length", "Offset", "Size");
    println!("{}", "-".repeat(60));

    let mut total = 0u64;
    for resource in resources {
        println!(
            "{:>10}  {:>10}  {:>10}  {}",
            resource.size(),
            resource.offset(),
            resource.display_size(),
            resource.name()
        );
        total += resource.size();
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {:>10}  {:>10}  {} resources",
        total,
        "",
        display_size(total),
        resources.len()
    );

    Ok(())
}

/// Write resource contents to stdout, one after another.
///
/// A `--- name ---` marker precedes each resource when more than one is sent.
async fn pipe_resources(archive: Arc<Archive>, resources: Vec<Resource>) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let show_names = resources.len() > 1;
        let mut stdout = std::io::stdout().lock();

        for resource in &resources {
            if show_names {
                writeln!(stdout, "--- {} ---", resource.name())?;
            }
            archive
                .extract_to_writer(resource, &mut stdout)
                .with_context(|| format!("cannot extract '{}'", resource.name()))?;
        }
        Ok(())
    })
    .await?
}

/// Extract resources into the `-d` directory, up to `-j` at a time.
///
/// A failed resource does not stop the others; the failures are reported
/// together at the end.
async fn extract_resources(
    archive: Arc<Archive>,
    resources: Vec<Resource>,
    cli: &Cli,
) -> Result<()> {
    tokio::fs::create_dir_all(&cli.extract_dir)
        .await
        .with_context(|| format!("cannot create '{}'", cli.extract_dir.display()))?;

    let total = resources.len();
    let permits = Arc::new(Semaphore::new(cli.jobs as usize));
    let mut scheduled = HashSet::new();
    let mut tasks = JoinSet::new();
    let mut failed = 0usize;

    for (i, resource) in resources.into_iter().enumerate() {
        match cli.plan(resource.name(), &mut scheduled) {
            Ok(Planned::Extract(_)) => {}
            Ok(Planned::SkipDuplicate) => {
                warn!("Skipping: {} (duplicate name in archive)", resource.name());
                continue;
            }
            Ok(Planned::SkipExisting) => {
                warn!("Skipping: {} (file exists)", resource.name());
                continue;
            }
            Ok(Planned::SkipWithoutOverwrite) => {
                warn!("Skipping: {} (use -o to overwrite)", resource.name());
                continue;
            }
            Err(e) => {
                error!("{}", e);
                failed += 1;
                continue;
            }
        }

        let permit = permits.clone().acquire_owned().await?;
        if !cli.is_quiet() {
            println!("  extracting: {} ({}/{})", resource.name(), i + 1, total);
        }

        let archive = archive.clone();
        let directory = cli.extract_dir.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = archive.extract(&resource, &directory);
            (resource, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (resource, result) = joined?;
        if let Err(e) = result {
            error!("{}: {}", resource.name(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} resources could not be extracted", failed, total);
    }
    debug!("Extracted into {}", cli.extract_dir.display());
    Ok(())
}
