// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bucketbench validate` command - Validate a benchmark definition.

use std::path::Path;

use bucketbench_core::ConfigLoader;

pub async fn execute(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file.display(), "Validating benchmark definition");

    match ConfigLoader::load_file(file) {
        Ok(def) => {
            println!("✓ Benchmark definition is valid");
            println!();
            println!("Benchmark: {}", def.name);
            println!("  Image:    {}", def.image.as_deref().unwrap_or("-"));
            if let Some(rootfs) = &def.rootfs {
                println!("  Rootfs:   {}", rootfs.display());
            }
            if let Some(command) = &def.command {
                println!("  Command:  {}", command);
            }
            println!("  Detached: {}", def.detached);
            if let Some(timeout) = def.timeout {
                println!("  Timeout:  {}ms", timeout.as_millis());
            }
            let sequence: Vec<_> = def.commands.iter().map(|op| op.name()).collect();
            println!("  Sequence: {}", sequence.join(" → "));
            println!();
            println!("Drivers ({}):", def.drivers.len());
            for driver in &def.drivers {
                println!(
                    "  - {} (threads: {}, iterations: {}{})",
                    driver.engine,
                    driver.threads,
                    driver.iterations,
                    driver
                        .binary
                        .as_deref()
                        .map(|b| format!(", binary: {}", b))
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Benchmark definition validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
