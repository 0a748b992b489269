mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use log::error;
use transport_lib::config::Config;
use transport_lib::io;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(message) = dispatch(cli) {
        error!("{message}");
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Run {
            input,
            output,
            ranks,
            dump_source,
        } => {
            let mut config = Config::load(&input)?;
            if let Some(output) = output {
                config.output = output;
            }
            if let Some(ranks) = ranks {
                config.ranks = ranks;
            }

            let mut sim = config.build()?;
            sim.run()?;

            let path = io::output::save_output(&sim)
                .map_err(|e| format!("cannot write results: {e}"))?;
            println!("results written to {}", path.display());

            if let Some(bank_path) = dump_source {
                io::bank::save_bank(&bank_path, sim.stored_bank())
                    .map_err(|e| format!("cannot dump source bank: {e}"))?;
                println!(
                    "stored bank ({} particles) written to {}",
                    sim.stored_bank().len(),
                    bank_path.display()
                );
            }
            Ok(())
        }
        Commands::Check { input } => {
            let config = Config::load(&input)?;
            let sim = config.build()?;
            println!(
                "input deck ok: {} materials, {} surfaces, {} cells, {} sources, {} tallies, {} histories",
                sim.materials.len(),
                sim.surfaces.len(),
                sim.cells.len(),
                sim.sources.len(),
                sim.tallies.len(),
                sim.n_hist
            );
            Ok(())
        }
    }
}
