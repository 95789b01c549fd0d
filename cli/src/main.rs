//! Command-line driver
//!
//! ```text
//! ran-emulator [CONFIG.json] [TTIS]
//! ```
//!
//! Without a configuration file the built-in defaults are used. Logging is
//! controlled through `RUST_LOG` (default `info`).

use env_logger::{Builder, Env};
use log::{error, info};
use ran_emulator_core::{Direction, Emulator, EmulatorConfig, StatsWindow};
use std::process;

const DEFAULT_TTIS: u64 = 1000;

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EmulatorConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                process::exit(1);
            }
        },
        None => EmulatorConfig::default(),
    };
    let ttis = match args.next().map(|s| s.parse::<u64>()) {
        Some(Ok(n)) => n,
        Some(Err(err)) => {
            error!("invalid TTI count: {err}");
            process::exit(1);
        }
        None => DEFAULT_TTIS,
    };

    let mut emulator = match Emulator::from_config(config) {
        Ok(emulator) => emulator,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    };

    for direction in Direction::ALL {
        let layout = emulator.grid_layout(direction);
        info!(
            "{direction}: {} RBs in {} groups, {} row(s) of {} symbols",
            layout.resource_blocks, layout.freq_groups, layout.time_rows, layout.symbols_per_row
        );
    }

    let results = emulator.run(ttis);
    let granted: [usize; 2] = [
        results.iter().map(|r| r.downlink.grid.grants).sum(),
        results.iter().map(|r| r.uplink.grid.grants).sum(),
    ];
    info!("ran {ttis} TTIs ({:.3} s)", emulator.now());

    println!("user dir  generated  throughput  errors   latency(ms)  rtx(Mbit)");
    for user in 0..emulator.user_count() {
        for direction in Direction::ALL {
            let stats = match emulator.link_stats(user, direction, StatsWindow::Cumulative) {
                Ok(stats) => stats,
                Err(err) => {
                    error!("{err}");
                    process::exit(1);
                }
            };
            println!(
                "{user:>4} {:>3} {:>10.2} {:>11.2} {:>7.2} {:>12.3} {:>10.3}",
                direction.label(),
                stats.generated_mbps,
                stats.throughput_mbps,
                stats.error_mbps,
                stats.latency_s * 1e3,
                stats.retransmitted_mbit
            );
        }
    }
    println!("grants: DL {} UL {}", granted[0], granted[1]);
}
