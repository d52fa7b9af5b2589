use clap::Parser;
use loss_landscape_core::{
    LandscapeConfig, LossLandscape, PlanarGroundPicker, QualityPreset, Vec3, WaveState,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Headless loss landscape run with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "loss-landscape-demo")]
#[command(about = "Gradient-descent particle waves over a procedural loss surface", long_about = None)]
struct Args {
    /// Terrain seed (random when omitted)
    #[arg(short, long)]
    seed: Option<u32>,

    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Grid quality (low, medium, high)
    #[arg(short, long, default_value = "medium")]
    quality: String,

    /// Terrain size in world units (square)
    #[arg(long, default_value_t = 2000.0)]
    map_size: f32,

    /// Particles queued per wave
    #[arg(long)]
    particles_per_wave: Option<u32>,

    /// Click the terrain center every N seconds (0 = never)
    #[arg(long, default_value_t = 0.0)]
    click_interval: f64,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 5.0)]
    report_interval: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let quality = match args.quality.to_lowercase().as_str() {
        "low" => QualityPreset::Low,
        "high" => QualityPreset::High,
        "medium" => QualityPreset::Medium,
        other => {
            warn!("Unknown quality '{}', using medium", other);
            QualityPreset::Medium
        }
    };

    let mut config = LandscapeConfig::with_quality(quality);
    config.terrain.seed = args.seed;
    config.terrain.width = args.map_size;
    config.terrain.depth = args.map_size;
    if let Some(count) = args.particles_per_wave {
        config.wave.particles_per_wave = count;
    }

    let mut landscape = match LossLandscape::new(config) {
        Ok(landscape) => landscape,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let picker = PlanarGroundPicker::covering(landscape.height_field());

    let mesh = landscape.terrain_mesh();
    info!(
        "Terrain mesh: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.indices.len() / 3
    );

    println!("\nTime(s) | State    | Live | Queue | Swell | Spawned | Despawned");
    println!("--------|----------|------|-------|-------|---------|----------");

    let dt = 1.0 / args.fps.max(1.0);
    let mut now = 0.0;
    let mut next_report = 0.0;
    let mut next_click = args.click_interval;
    let mut released = 0usize;

    while now < args.duration {
        let report = landscape.tick(now, dt, &picker);
        released += landscape.drain_despawned().len();

        if args.click_interval > 0.0 && now >= next_click {
            let placed = landscape.spawn_at(Vec3::zeros());
            info!("Click at terrain center placed {} particles", placed.len());
            next_click += args.click_interval;
        }

        if report.transition.is_some_and(|t| t.to == WaveState::Waiting && t.forced) {
            warn!("Wave timed out with particles still moving");
        }

        if now >= next_report {
            let stats = landscape.stats();
            println!(
                "{:7.1} | {:8} | {:4} | {:5} | {:5.2} | {:7} | {:9}",
                now,
                report.state,
                report.live,
                report.spawn_queue,
                landscape.scheduler().swell_opacity(),
                stats.total_spawned,
                stats.total_despawned
            );
            next_report += args.report_interval;
        }

        now += dt;
    }

    released += landscape.teardown().len();
    let stats = landscape.stats();

    println!("\n=== Run Complete ===");
    println!("Seed: {}", landscape.seed());
    println!("Ticks: {}", stats.ticks);
    println!(
        "Waves started: {}, completed: {}, timed out: {}",
        stats.waves_started, stats.waves_completed, stats.forced_settles
    );
    println!("Particles spawned: {}", stats.total_spawned);
    println!("Render resources released: {}", released);
}
