use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use localclust::algorithms::sweep::sorted_ranking;
use localclust::export::{save_gdf, save_report, write_ranking};
use localclust::{measure_io, LocalClustering, PushConfig, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Tab-separated adjacency file: a vertex id, then its out-neighbours.
    #[arg(short = 'i', long)]
    source: Option<PathBuf>,

    /// Seed vertex id.
    #[arg(short, long)]
    seed: Option<String>,

    /// Teleport probability, in (0, 1).
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Push threshold on residual / out-degree, positive.
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Stop after this many pushes even if not converged.
    #[arg(long)]
    max_pushes: Option<u64>,

    /// YAML run configuration; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the whole approximate PageRank vector before the community.
    #[arg(long)]
    print_ranks: bool,

    /// Write the community subgraph in GDF to this file.
    #[arg(long)]
    gdf: Option<PathBuf>,

    /// Write a YAML report of the run to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Show a progress bar during each scan of the source.
    #[arg(short, long)]
    progress: bool,
}

impl Args {
    /// Merges the optional configuration file with the command-line flags.
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_yaml_file(path)
                .with_context(|| format!("Cannot load configuration {}", path.display()))?,
            None => {
                let (Some(source), Some(seed), Some(alpha), Some(epsilon)) =
                    (&self.source, &self.seed, self.alpha, self.epsilon)
                else {
                    bail!("--source, --seed, --alpha and --epsilon are required without --config");
                };
                RunConfig::new(source, seed.as_str(), PushConfig::new(alpha, epsilon))
            }
        };

        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(seed) = &self.seed {
            config.seed = seed.clone();
        }
        if let Some(alpha) = self.alpha {
            config.push.alpha = alpha;
        }
        if let Some(epsilon) = self.epsilon {
            config.push.epsilon = epsilon;
        }
        if self.max_pushes.is_some() {
            config.push.max_pushes = self.max_pushes;
        }
        config.show_progress |= self.progress;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.run_config()?;

    let run = measure_io!("Local clustering", {
        LocalClustering::from_run_config(&config).and_then(|clustering| clustering.run())
    })
    .with_context(|| {
        format!(
            "Local clustering of {:?} in {} failed",
            config.seed,
            config.source.display()
        )
    })?;

    let mut out = BufWriter::new(io::stdout().lock());
    if args.print_ranks {
        write_ranking(&mut out, &sorted_ranking(&run.rank))?;
        writeln!(out, "\n------------------------------------------------------------\n")?;
    }
    write_ranking(&mut out, &run.sweep.members)?;
    writeln!(out, "Total nodes before: {}", run.report.ranked_vertices)?;
    writeln!(out, "Total nodes after: {}", run.sweep.len())?;
    writeln!(out, "Conductance: {}", run.sweep.conductance)?;
    out.flush()?;

    if let Some(path) = &args.gdf {
        save_gdf(path, &run.sweep.member_ids(), &run.cache)?;
    }
    if let Some(path) = &args.report {
        save_report(path, &run.report)?;
    }
    Ok(())
}
