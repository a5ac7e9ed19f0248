// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `sysmark validate` command - Validate configuration file.

use std::path::Path;

use sysmark_bench::builtin_registry;
use sysmark_core::ConfigLoader;

pub fn execute(file: &Path) -> anyhow::Result<()> {
    tracing::info!(file = %file.display(), "Validating configuration");

    let checked = ConfigLoader::load_file(file).and_then(|config| {
        builtin_registry()?.check_config(&config)?;
        Ok(config)
    });

    match checked {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Session Settings:");
            println!("  Repeat Count:         {}", config.repeat_count);
            println!("  Latency Repeat Count: {}", config.latency_repeat_count);
            println!(
                "  Per-Trial Timeout:    {:.1}s",
                config.per_trial_timeout.as_secs_f64()
            );
            println!(
                "  Category Timeout:     {:.1}s",
                config.category_timeout.as_secs_f64()
            );
            println!("  IO Levels:            {:?}", config.io_concurrency_levels);
            println!("  Measurement Floor:    {}ms", config.min_trial.as_millis());
            println!("  Cooldown:             {}ms", config.cooldown.as_millis());
            if let Some(dir) = &config.scratch_dir {
                println!("  Scratch Directory:    {}", dir.display());
            }
            println!();
            println!("Size Overrides ({}):", config.size_overrides.len());
            let mut overrides: Vec<_> = config.size_overrides.iter().collect();
            overrides.sort();
            for (id, size) in overrides {
                println!("  - {} = {}", id, size);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
