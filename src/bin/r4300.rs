// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! VR4300 CPU runner
//!
//! Loads a raw code image into flat memory and runs it with the selected
//! engine. Settings come from `--config`, then `.env`/environment, then
//! the command line.

use clap::Parser;
use log::{error, info};
use r4300::core::config::{parse_address, CpuConfig, EngineKind};
use r4300::core::error::Result;
use r4300::core::system::System;
use std::path::PathBuf;

/// VR4300 (64-bit MIPS) CPU runner
#[derive(Parser)]
#[command(name = "r4300")]
#[command(about = "Run a MIPS III code image on the VR4300 core", long_about = None)]
struct Args {
    /// Raw code image
    image: PathBuf,

    /// Address the image is loaded at
    #[arg(short = 'a', long, default_value = "0x80000000", value_parser = parse_address)]
    load_address: u64,

    /// Program entry point (ends boot mode)
    #[arg(short = 'e', long, value_parser = parse_address)]
    entry: Option<u64>,

    /// Initial PC (defaults to the load address)
    #[arg(long, value_parser = parse_address)]
    pc: Option<u64>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Execution engine (interpreter or recompiler)
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Number of engine steps to run
    #[arg(short = 'n', long, default_value = "1000000")]
    steps: u64,

    /// Flat memory size in bytes
    #[arg(long, default_value = "0x800000", value_parser = parse_address)]
    memory: u64,

    /// Write an execution trace to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Maximum trace lines
    #[arg(long)]
    trace_limit: Option<u64>,

    /// Write a JSON register snapshot here on exit or fatal error
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_config(args: &Args) -> Result<CpuConfig> {
    let mut config = match &args.config {
        Some(path) => CpuConfig::load(path)?,
        None => CpuConfig::default(),
    };
    config.apply_env()?;

    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if args.entry.is_some() {
        config.entry_point = args.entry;
    }
    if args.trace.is_some() {
        config.trace_path = args.trace.clone();
    }
    if args.trace_limit.is_some() {
        config.trace_limit = args.trace_limit;
    }
    config.validate()?;
    Ok(config)
}

fn write_dump(system: &System, path: &PathBuf) {
    match system.snapshot().save_json(path) {
        Ok(()) => info!("Register snapshot written to {}", path.display()),
        Err(e) => error!("Failed to write snapshot: {}", e),
    }
}

fn main() -> Result<()> {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("r4300 v{}", env!("CARGO_PKG_VERSION"));

    let config = build_config(&args)?;
    let mut system = System::new(config, args.memory as usize)?;

    system.load_image(&args.image, args.load_address)?;
    system.set_pc(args.pc.unwrap_or(args.load_address));

    info!("Starting at PC=0x{:016X}", system.pc());
    let result = system.run(args.steps);

    if let Some(path) = &args.dump {
        write_dump(&system, path);
    }

    match result {
        Ok(summary) => {
            info!(
                "Stopped after {} steps ({:?}), {} instructions, final PC=0x{:016X}",
                summary.steps,
                summary.stop,
                summary.instructions,
                system.pc()
            );
            Ok(())
        }
        Err(e) => {
            error!("Execution failed: {}", e);
            Err(e)
        }
    }
}
