//! Camera Session CLI
//!
//! Runs a camera session against the simulated platform, either through the
//! default lifecycle walk-through or a scripted command sequence, and
//! prints the notification stream and a metrics summary.

use camera_session::{
    buffers::FrameBuffer,
    config::FileConfig,
    device::{MockDriver, MockHal, Surface, SurfaceRef},
    geometry::Rotation,
    metrics::{MetricsRegistry, MetricsSnapshot},
    session::{Command, Notification, Permission, SessionError, SessionEvent, SessionManager},
};
use clap::Parser;
use crossbeam::channel::Receiver;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "camera-session")]
#[command(about = "Serialized camera session manager on a simulated platform")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to TOML configuration file"
    )]
    config: Option<PathBuf>,

    /// Comma-separated command script, e.g. "open:0,preview-size:1080x1920,bind,start,close"
    #[arg(
        short,
        long,
        help = "Run a command script instead of the lifecycle walk-through"
    )]
    script: Option<String>,

    /// Preview frames to deliver while previewing
    #[arg(short, long, help = "Override the number of preview frames to pump")]
    frames: Option<u32>,

    /// Simulate a user who refused the camera permission
    #[arg(long, help = "Start with camera permission denied")]
    deny_permission: bool,

    /// Display rotation in degrees
    #[arg(
        short,
        long,
        allow_negative_numbers = true,
        help = "Initial display rotation (snapped to 0/90/180/270)"
    )]
    rotation: Option<i32>,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Keep serving /metrics after the session ends, until Ctrl-C
    #[cfg(feature = "metrics")]
    #[arg(long, help = "Serve Prometheus metrics over HTTP")]
    serve: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if args.print_config {
        return match toml::to_string_pretty(&FileConfig::default()) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render default configuration: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!("Camera Session Manager v{}", camera_session::VERSION);
    info!("This is a demonstration using the simulated camera platform");

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => {
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            Err(e) => {
                eprintln!("Failed to load configuration: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => FileConfig::default(),
    };
    if let Some(frames) = args.frames {
        config.output.frame_count = frames;
    }
    if let Some(degrees) = args.rotation {
        config.session.display_rotation = Rotation::from_degrees(degrees).degrees();
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Interrupt received, shutting down");
            running.store(false, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let hal = MockHal::new(config.mock.cameras.clone());
    let driver = hal.driver();
    let inspected = Arc::new(AtomicU64::new(0));
    let observer = {
        let inspected = Arc::clone(&inspected);
        Arc::new(move |_: &FrameBuffer| {
            inspected.fetch_add(1, Ordering::Relaxed);
        })
    };

    let manager = match SessionManager::builder(Box::new(hal))
        .config(config.session.clone())
        .permission(Permission::new(!args.deny_permission))
        .observer(observer)
        .build()
    {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Failed to start camera session: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for camera in manager.registry().descriptors() {
        info!(
            camera_id = camera.id(),
            facing = %camera.facing(),
            sensor_orientation = camera.sensor_orientation(),
            "Camera available"
        );
    }
    let printer = spawn_printer(manager.subscribe());

    #[cfg(feature = "metrics")]
    let server = if args.serve {
        start_metrics_server(config.output.metrics_port, manager.snapshot_handle())
    } else {
        None
    };

    let surface = Arc::new(Surface::new(1, 1080, 1920));
    let surface_ref = SurfaceRef::new(&surface);
    let frames = config.output.frame_count;

    let outcome = match &args.script {
        Some(script) => run_script(&manager, &driver, script, &surface_ref, frames, &running),
        None => {
            run_lifecycle(&manager, &driver, &surface_ref, frames, &running);
            Ok(())
        }
    };

    print_summary(&manager, &driver, inspected.load(Ordering::Relaxed));

    #[cfg(feature = "metrics")]
    {
        if let Some(server) = server {
            info!("Serving metrics until Ctrl-C");
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(100));
            }
            server.stop();
        }
    }

    manager.shutdown();
    drop(surface);
    if printer.join().is_err() {
        warn!("Notification printer panicked");
    }

    match outcome {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}

/// Walks through the lifecycle a host application would drive.
fn run_lifecycle(
    manager: &SessionManager,
    driver: &MockDriver,
    surface: &SurfaceRef,
    frames: u32,
    running: &Arc<AtomicBool>,
) {
    let controller = manager.controller();

    if let Err(e) = controller.resume() {
        warn!("Camera not opened: {}", e);
        return;
    }
    if let Err(e) = controller.surface_changed(surface.clone(), 1080, 1920) {
        warn!("Failed to queue preview setup: {}", e);
        return;
    }
    wait(manager);
    pump_preview(driver, frames, running);

    if controller.capture().is_ok() {
        wait(manager);
    }

    if running.load(Ordering::SeqCst) {
        match controller.switch_camera() {
            Ok(_) => {
                wait(manager);
                pump_preview(driver, frames / 2, running);
            }
            Err(e) => warn!("Camera switch skipped: {}", e),
        }
    }

    if let Err(e) = controller.pause() {
        warn!("Failed to queue close: {}", e);
    }
    wait(manager);
}

/// Runs a textual script. An unknown step aborts before anything is queued.
fn run_script(
    manager: &SessionManager,
    driver: &MockDriver,
    script: &str,
    surface: &SurfaceRef,
    frames: u32,
    running: &Arc<AtomicBool>,
) -> Result<(), SessionError> {
    let commands = Command::parse_script(script, surface)?;
    info!(commands = commands.len(), "Running command script");

    for command in commands {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let starts_preview = matches!(command, Command::StartPreview);
        manager.submit(command)?;
        wait(manager);
        if starts_preview {
            pump_preview(driver, frames, running);
        }
    }
    Ok(())
}

fn wait(manager: &SessionManager) {
    if !manager.wait_idle(IDLE_TIMEOUT) {
        warn!("Camera worker still busy after {:?}", IDLE_TIMEOUT);
    }
}

/// Delivers preview frames from a separate thread, as a driver would.
fn pump_preview(driver: &MockDriver, frames: u32, running: &Arc<AtomicBool>) -> usize {
    let driver = driver.clone();
    let running = Arc::clone(running);
    let handle = thread::Builder::new()
        .name("camera-driver".into())
        .spawn(move || {
            let mut delivered = 0;
            for _ in 0..frames {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                delivered += driver.pump_frames(1);
                thread::sleep(Duration::from_millis(5));
            }
            delivered
        });

    match handle {
        Ok(handle) => {
            let delivered = handle.join().unwrap_or(0);
            info!(delivered, requested = frames, "Preview frames pumped");
            delivered
        }
        Err(e) => {
            warn!("Failed to start driver thread: {}", e);
            0
        }
    }
}

fn spawn_printer(events: Receiver<Notification>) -> JoinHandle<()> {
    thread::spawn(move || {
        for notification in events.iter() {
            println!(
                "[{}] {}",
                notification.at.format("%H:%M:%S%.3f"),
                describe(&notification.event)
            );
        }
    })
}

fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::RawAvailable(bytes) => format!("RawAvailable({} bytes)", bytes.len()),
        SessionEvent::PostviewAvailable(bytes) => {
            format!("PostviewAvailable({} bytes)", bytes.len())
        }
        SessionEvent::ImageAvailable(bytes) => format!("ImageAvailable({} bytes)", bytes.len()),
        SessionEvent::Error { kind, error } => format!("Error in {}: {}", kind, error),
        other => format!("{:?}", other),
    }
}

fn print_summary(manager: &SessionManager, driver: &MockDriver, inspected: u64) {
    let snapshot = manager.snapshot();
    info!(
        state = %snapshot.state(),
        commands = snapshot.commands_executed(),
        errors = snapshot.command_errors(),
        captures = snapshot.captures(),
        "Session summary"
    );
    info!(
        opens = driver.opens(),
        releases = driver.releases(),
        starved = driver.starved_frames(),
        inspected,
        "Driver summary"
    );

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics unavailable: {}", e);
            return;
        }
    };
    registry.update(&MetricsSnapshot::from_components(snapshot));
    match registry.encode() {
        Ok(text) => println!("{}", text),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
}

#[cfg(feature = "metrics")]
struct ServerHandle {
    runtime: tokio::runtime::Runtime,
    shutdown: tokio::sync::oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "metrics")]
impl ServerHandle {
    fn stop(self) {
        let _ = self.shutdown.send(());
        if self.runtime.block_on(self.task).is_err() {
            warn!("Metrics server task failed");
        }
    }
}

#[cfg(feature = "metrics")]
fn start_metrics_server(
    port: u16,
    session: Arc<camera_session::session::SessionSnapshot>,
) -> Option<ServerHandle> {
    use camera_session::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics unavailable: {}", e);
            return None;
        }
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Failed to start metrics runtime: {}", e);
            return None;
        }
    };

    let (shutdown, signal) = tokio::sync::oneshot::channel::<()>();
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry, session);
    let task = runtime.spawn(async move {
        let stop = async {
            let _ = signal.await;
        };
        if let Err(e) = server.run(stop).await {
            error!("Metrics server error: {}", e);
        }
    });

    Some(ServerHandle {
        runtime,
        shutdown,
        task,
    })
}
