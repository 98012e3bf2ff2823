// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use sctrig::config::Kit;
use sctrig::sampler::{probe, slots::NUM_SLOTS, Sampler};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A slot based sampler for the SuperCollider engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists and verifies all samples in the given kit.
    Check {
        /// The path to the kit file.
        kit_path: String,
    },
    /// Loads the kit and triggers one slot on the engine.
    Play {
        /// The path to the kit file.
        kit_path: String,
        /// The slot to trigger.
        slot: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { kit_path } => {
            let kit_path = PathBuf::from(kit_path);
            let kit = Kit::deserialize(&kit_path)?;
            let base_path = kit_path.parent().unwrap_or(Path::new("."));

            println!("Engine: {}", kit.engine_address());

            if kit.samples().is_empty() {
                println!("No samples in kit.");
                return Ok(());
            }

            let mut failures = 0;
            println!("Samples (count: {}):", kit.samples().len());
            for sample in kit.samples() {
                let file = sample.resolve_file(base_path);
                let status = if sample.slot() >= NUM_SLOTS {
                    failures += 1;
                    format!("slot must be between 0 and {}", NUM_SLOTS - 1)
                } else {
                    match probe::num_channels(&file) {
                        Ok(1) => "mono".to_string(),
                        Ok(2) => "stereo".to_string(),
                        Ok(channels) => {
                            failures += 1;
                            format!("unsupported channel count {}", channels)
                        }
                        Err(e) => {
                            failures += 1;
                            e.to_string()
                        }
                    }
                };
                println!("- slot {:3}: {} ({})", sample.slot(), file.display(), status);
            }

            if failures > 0 {
                return Err(format!("{} samples failed to verify", failures).into());
            }
        }
        Commands::Play { kit_path, slot } => {
            if slot >= NUM_SLOTS {
                return Err(
                    format!("slot ({}) must be between 0 and {}", slot, NUM_SLOTS - 1).into(),
                );
            }

            let kit_path = PathBuf::from(kit_path);
            let kit = Kit::deserialize(&kit_path)?;
            let base_path = kit_path.parent().unwrap_or(Path::new(".")).to_path_buf();

            let sampler =
                Sampler::with_handshake_timeout(kit.engine_address(), kit.handshake_timeout()?)
                    .await?;
            sampler.load_kit(&kit, &base_path)?;
            sampler.play(slot, &HashMap::new()).await?;

            println!(
                "Triggered slot {} ({} samples).",
                slot,
                sampler.samples_at(slot).len()
            );
        }
    }

    Ok(())
}
