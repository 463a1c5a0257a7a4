//! # Quality Monitor CLI
//!
//! Drives the performance monitor with a synthetic renderer workload and
//! prints the final report. The workload reacts to the quality config the
//! monitor produces, so the adaptive loop can be observed end to end.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use quality_monitor::{
    EventKind, MonitorEvent, MonitorSettings, OptimizationConfig, PerformanceMonitor,
    QualityLevel, RecoveryPolicy,
};

/// Synthetic renderer workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// ~60 FPS with light jitter
    Steady,
    /// Frame cost and draw calls climb over the run
    Degrading,
    /// Mostly smooth with periodic long frames
    Spiky,
}

#[derive(Parser, Debug)]
#[command(name = "quality-monitor")]
#[command(about = "Real-time render performance monitor with adaptive quality control")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/quality-monitor/monitor.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Workload to simulate
    #[arg(short, long, value_enum, default_value_t = Scenario::Steady)]
    scenario: Scenario,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 300)]
    ticks: u32,

    /// Seed for frame jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Let quality climb back after sustained good performance
    #[arg(long)]
    recovery: bool,
}

/// Layers command line switches over the loaded settings
fn apply_cli_overrides(settings: MonitorSettings, cli: &Cli) -> MonitorSettings {
    if !cli.recovery {
        return settings;
    }

    let overrides = MonitorSettings {
        recovery: RecoveryPolicy {
            enabled: true,
            sustained_ticks: settings.recovery.sustained_ticks,
        },
        ..Default::default()
    };
    settings.merge_partial(overrides)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting quality monitor");
    info!("📄 Version: {}", quality_monitor::VERSION);
    info!(
        "🏗️ Built {} ({})",
        option_env!("BUILD_DATE").unwrap_or("unknown"),
        option_env!("GIT_COMMIT").unwrap_or("no git metadata")
    );

    // Load configuration
    let settings = match MonitorSettings::load(&cli.config) {
        Ok(settings) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            settings
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            MonitorSettings::default()
        }
    };
    let settings = apply_cli_overrides(settings, &cli);
    if settings.recovery.enabled {
        info!(
            "🔁 Quality recovery after {} good ticks",
            settings.recovery.sustained_ticks
        );
    }

    let monitor = PerformanceMonitor::new(&settings);
    monitor.on_fn(EventKind::OptimizationApplied, |event| {
        if let MonitorEvent::OptimizationApplied(applied) = event {
            if applied.success {
                info!(
                    "⚡ {} applied (quality now {})",
                    applied.action, applied.config.quality_level
                );
            }
        }
        Ok(())
    });

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!("🎬 Simulating {} frames ({:?})", cli.ticks, cli.scenario);
    simulate(&monitor, cli.scenario, cli.ticks, &mut rng);

    let report = monitor.generate_report();
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report);
    }

    monitor.cleanup();
    info!("👋 Quality monitor finished");
    Ok(())
}

/// Feeds `ticks` synthetic frames through the monitor on a simulated clock
fn simulate(monitor: &PerformanceMonitor, scenario: Scenario, ticks: u32, rng: &mut StdRng) {
    monitor.reset_stats();
    let mut now = Instant::now();

    for frame in 0..ticks {
        let progress = f64::from(frame) / f64::from(ticks.max(1));
        let config = monitor.get_config();
        let workload = Workload::sample(scenario, progress, frame, rng).scaled(&config);

        let frame_time = Duration::from_secs_f64(workload.frame_ms / 1000.0);
        monitor.record_update_time(now, now + frame_time.mul_f64(0.2));
        monitor.record_render_time(now, now + frame_time.mul_f64(0.7));
        monitor.update_model_stats(
            workload.models,
            u64::from(workload.models) * 4 * 1024 * 1024,
            workload.draw_calls,
            workload.triangles,
        );

        now += frame_time;
        monitor.tick_at(now);
    }
}

/// Cost of one synthetic frame
#[derive(Debug, Clone, Copy, PartialEq)]
struct Workload {
    frame_ms: f64,
    models: u32,
    draw_calls: u32,
    triangles: u64,
}

impl Workload {
    fn sample(scenario: Scenario, progress: f64, frame: u32, rng: &mut StdRng) -> Self {
        let jitter = rng.gen_range(-1.5..1.5);
        match scenario {
            Scenario::Steady => Self {
                frame_ms: 16.0 + jitter,
                models: 4,
                draw_calls: 40,
                triangles: 60_000,
            },
            Scenario::Degrading => Self {
                frame_ms: 16.0 + 54.0 * progress + jitter,
                models: 4 + (8.0 * progress) as u32,
                draw_calls: 40 + (100.0 * progress) as u32,
                triangles: 60_000 + (90_000.0 * progress) as u64,
            },
            Scenario::Spiky => Self {
                frame_ms: if frame % 12 == 11 {
                    rng.gen_range(90.0..140.0)
                } else {
                    16.0 + jitter
                },
                models: 6,
                draw_calls: 60,
                triangles: 80_000,
            },
        }
    }

    /// Applies the renderer's reaction to the current quality settings
    fn scaled(mut self, config: &OptimizationConfig) -> Self {
        let quality = match config.quality_level {
            QualityLevel::Ultra => 1.0,
            QualityLevel::High => 0.8,
            QualityLevel::Medium => 0.65,
            QualityLevel::Low => 0.5,
        };
        self.frame_ms *= quality;
        self.triangles = (self.triangles as f64 * quality) as u64;

        if config.frame_skipping_enabled {
            self.frame_ms *= 0.9;
        }
        if config.culling_enabled {
            self.draw_calls = self.draw_calls * 3 / 5;
        }
        self.frame_ms = self.frame_ms.max(1.0);
        self
    }
}
