use clap::Parser;
use region_monitor::config::MonitorConfig;
use region_monitor::controller::GeofenceController;
use region_monitor::geofence::Coordinate;
use region_monitor::monitor::{AuthorizationStatus, LogSink, NotificationSink, RecordingSink, SimulatedMonitor};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Region Monitor: geofence entry/exit notifications
///
/// Registers the configured geofences with a simulated location monitor,
/// walks a device track through them, and prints every notification fired.
///
/// Examples:
///   region-monitor
///   region-monitor --json
///   region-monitor --track "37.3349,-122.0110;37.36,-122.03;37.422,-122.084"
///   region-monitor --authorization when-in-use --max-radius 500
///   region-monitor --serve --port 8080
#[derive(Parser)]
#[command(name = "region-monitor", version, about, long_about = None)]
struct Cli {
    /// Config file (JSON). Defaults to ~/.region-monitor/config.json.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Device track as "lat,lon;lat,lon;...". Defaults to Apple Park -> Googleplex.
    #[arg(long, allow_hyphen_values = true)]
    track: Option<String>,

    /// Number of legs for the built-in track.
    #[arg(long, default_value_t = 40)]
    steps: usize,

    /// Maximum monitorable radius in meters (overrides config).
    #[arg(long)]
    max_radius: Option<f64>,

    /// Location authorization: always, when-in-use, not-determined, restricted, denied.
    #[arg(long)]
    authorization: Option<AuthorizationStatus>,

    /// Simulate a device without region monitoring.
    #[arg(long)]
    unavailable: bool,

    /// Print the registered geofences and exit.
    #[arg(long)]
    list: bool,

    /// Print notifications as JSON lines.
    #[arg(long)]
    json: bool,

    /// Start the HTTP server instead of walking a track.
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn parse_track(s: &str) -> Result<Vec<Coordinate>, String> {
    let mut points = Vec::new();
    for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (lat, lon) = part
            .split_once(',')
            .ok_or_else(|| format!("Invalid point '{}'. Use lat,lon.", part))?;
        let lat: f64 = lat.trim().parse().map_err(|_| format!("Invalid latitude in '{}'", part))?;
        let lon: f64 = lon.trim().parse().map_err(|_| format!("Invalid longitude in '{}'", part))?;
        let point = Coordinate::new(lat, lon);
        if !point.is_valid() {
            return Err(format!("Invalid coordinates '{}'. Lat: -90..90, Lon: -180..180", part));
        }
        points.push(point);
    }
    if points.is_empty() {
        return Err("Track is empty".into());
    }
    Ok(points)
}

/// Straight line from Apple Park to the Googleplex.
fn builtin_track(steps: usize) -> Vec<Coordinate> {
    let from = Coordinate::new(37.3349285, -122.011033);
    let to = Coordinate::new(37.422, -122.084058);
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let f = i as f64 / steps as f64;
            Coordinate::new(from.lat + (to.lat - from.lat) * f, from.lon + (to.lon - from.lon) * f)
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // ── Load config ─────────────────────────────────────────────

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load_from(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => MonitorConfig::load(),
    };
    if let Some(r) = cli.max_radius {
        config.max_monitoring_radius = r;
    }
    if let Some(status) = cli.authorization {
        config.authorization = status;
    }
    if cli.unavailable {
        config.monitoring_available = false;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // ── Serve ───────────────────────────────────────────────────

    if cli.serve {
        let controller = start_controller(&config, RecordingSink::new());
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Cannot start runtime: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = runtime.block_on(region_monitor::server::start(&cli.host, cli.port, controller)) {
            eprintln!("Error: Server on {}:{} failed: {}", cli.host, cli.port, e);
            std::process::exit(1);
        }
        return;
    }

    // ── Register geofences ──────────────────────────────────────

    let mut controller = start_controller(&config, LogSink);

    eprintln!("  {}", controller.registry().title());
    for g in controller.registry().iter() {
        eprintln!("    \u{1F4CD} {} \u{2014} {} ({})", g.title(), g.center, g.summary());
    }
    if cli.list {
        return;
    }

    // ── Walk the track ──────────────────────────────────────────

    let track = match &cli.track {
        Some(t) => parse_track(t).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => builtin_track(cli.steps),
    };
    let mut fired = 0;
    for point in track {
        for event in controller.step(point) {
            fired += 1;
            if cli.json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("cannot encode notification: {}", e),
                }
            } else {
                println!("{}  {} ({} at {})", event.at.format("%H:%M:%S"), event.message(), event.kind, point);
            }
        }
    }
    if fired == 0 {
        eprintln!("  No notifications fired.");
    }
}

fn start_controller<S: NotificationSink>(
    config: &MonitorConfig,
    sink: S,
) -> GeofenceController<SimulatedMonitor, S> {
    let mut controller = GeofenceController::new(config.build_monitor(), sink);
    for result in controller.startup(&config.geofences) {
        match result {
            Ok(added) => {
                if let Some(w) = added.warning {
                    eprintln!("  \u{26A0}\u{FE0F}  {}", w);
                }
            }
            Err(e) => eprintln!("  Error: {}", e),
        }
    }
    controller
}
