//! `synthsim` – headless simulation driver.
//!
//! 1. Loads `~/.synthsim/config.toml` (writing the defaults on first run).
//! 2. Builds a demo robot in a stub physics world and registers it.
//! 3. Attaches an [`InputBrain`] fed by a scripted gamepad, or a
//!    [`BridgeBrain`] when `[bridge] enabled = true`.
//! 4. Ticks until the configured tick count is reached or Ctrl-C, then
//!    prints the final sensor readings.

mod config;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use synthsim_hal::sim::{SimMechanismBuilder, SimWorld};
use synthsim_hal::{Mechanism, Stimulus};
use synthsim_middleware::{HalBridge, PortKey};
use synthsim_runtime::{
    Brain, BridgeBrain, DrivetrainBehavior, EncoderBinding, InputBrain, InputState, PortGroup,
    SimulationSystem,
};
use synthsim_types::{StimulusId, StimulusKind};

const ROBOT: &str = "robot";

fn main() {
    let _telemetry = synthsim_runtime::init_tracing("synthsim");

    print_banner();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "  Ctrl-C received, stopping after this tick".yellow().bold());
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let cfg = load_config();

    if let Err(e) = run(&cfg, &stop) {
        println!("{}: {}", "Simulation error".red(), e);
        std::process::exit(1);
    }
}

fn load_config() -> config::Config {
    let path = config::config_path();
    match config::load_from(&path) {
        Ok(Some(_)) => println!("  Config loaded from {}", path.display().to_string().bold()),
        Ok(None) => match config::save(&config::Config::default()) {
            Ok(()) => println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        },
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            return cfg;
        }
    }
    config::load().unwrap_or_else(|e| {
        println!("{}: {}", "Config error".red(), e);
        config::Config::default()
    })
}

fn run(cfg: &config::Config, stop: &AtomicBool) -> Result<(), String> {
    let dt = cfg.dt();
    let mut world = SimWorld::new();
    let (robot, handler) = SimMechanismBuilder::new(ROBOT)
        .with_hinge("arm")
        .with_slider("elevator")
        .with_wheel(-0.3)
        .with_wheel(-0.3)
        .with_wheel(0.3)
        .with_wheel(0.3)
        .with_chassis()
        .with_assembly()
        .build_with_handler(&mut world);
    let arm_sensor = arm_sensor_key(&robot);

    let mut system = SimulationSystem::new(cfg.to_context());
    system.register_mechanism(robot);

    // The runtime must outlive the bridge task, so it lives for the whole run.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;

    let brain = if cfg.bridge.enabled {
        println!("  Robot program bridge at {}", cfg.bridge.url.bold());
        bridge_brain(cfg, &system, &runtime, arm_sensor.clone())?
    } else {
        let scheme = cfg
            .schemes
            .first()
            .map(|s| s.name.clone())
            .ok_or_else(|| "no input schemes configured".to_string())?;
        println!("  Scripted input through scheme {}", scheme.bold());
        Box::new(InputBrain::new(scheme)) as Box<dyn Brain>
    };
    system.set_brain(ROBOT, brain).map_err(|e| e.to_string())?;

    println!(
        "  Running {} ticks at {} Hz\n",
        cfg.ticks.to_string().bold(),
        cfg.tick_hz.to_string().bold()
    );

    let started = Instant::now();
    let mut ran = 0u64;
    for tick in 0..cfg.ticks {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let input = if cfg.bridge.enabled {
            InputState::new()
        } else {
            scripted_input(tick, cfg.ticks)
        };
        system.update(dt, &input);
        world.step(dt);
        ran += 1;

        if cfg.bridge.enabled {
            // Pace to wall-clock so the robot program sees real time.
            std::thread::sleep(Duration::from_secs_f32(dt));
        }
    }
    info!(ticks = ran, elapsed_ms = started.elapsed().as_millis() as u64, "run finished");

    print_telemetry(&system, &arm_sensor);
    if let Some(handler) = handler {
        let handler = handler.borrow();
        println!(
            "  Gamepiece: intake {}, {} ejection(s)",
            if handler.intake_active() { "on".green() } else { "off".dimmed() },
            handler.ejections()
        );
    }

    system.shutdown();
    drop(runtime);
    println!("\n  {} Finished at {}", "✓".green().bold(), chrono::Utc::now().to_rfc3339());
    Ok(())
}

fn bridge_brain(
    cfg: &config::Config,
    system: &SimulationSystem,
    runtime: &tokio::runtime::Runtime,
    arm_sensor: String,
) -> Result<Box<dyn Brain>, String> {
    let layer = system
        .layer(ROBOT)
        .ok_or_else(|| format!("{} is not registered", ROBOT))?;

    let mut bridge = HalBridge::new(cfg.bridge.clone());
    bridge.start(runtime.handle()).map_err(|e| e.to_string())?;

    let mut brain = BridgeBrain::new(bridge).with_encoder(EncoderBinding {
        stimulus: arm_sensor,
        device: 0,
    });
    if let Some(drive) = DrivetrainBehavior::from_mechanism(layer.mechanism(), layer.drivers()) {
        brain = brain
            .with_group(PortGroup {
                ports: vec![PortKey::pwm(0)],
                drivers: drive.left().to_vec(),
            })
            .with_group(PortGroup {
                ports: vec![PortKey::pwm(1)],
                drivers: drive.right().to_vec(),
            });
    }
    Ok(Box::new(brain))
}

/// Drive forward, then turn while raising the arm, then run the intake and
/// fire the ejector once.
fn scripted_input(tick: u64, total: u64) -> InputState {
    let third = (total / 3).max(1);
    let mut input = InputState::new();
    match tick / third {
        0 => input.set_axis(0, "left_y", 1.0),
        1 => {
            input.set_axis(0, "right_x", 0.5);
            input.set_axis(0, "dpad_y", 1.0);
        }
        _ => {
            input.set_axis(0, "right_trigger", 1.0);
            input.set_button(0, "a", tick == total.saturating_sub(2));
        }
    }
    input
}

fn arm_sensor_key(robot: &Mechanism) -> String {
    let arm = &robot.joints[0].joint;
    StimulusId::new(StimulusKind::Hinge, arm.name.clone(), arm.guid.clone()).key()
}

fn print_telemetry(system: &SimulationSystem, arm_sensor: &str) {
    let Some(layer) = system.layer(ROBOT) else {
        return;
    };
    println!("\n  {}", "Sensor telemetry".bold().cyan());
    for (_, stimulus) in layer.stimuli().iter() {
        let value = serde_json::to_string(&stimulus.supplier_value())
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "    {:<48} {:<8} {}",
            stimulus.id().display_name(),
            stimulus.supplier_type().to_string().dimmed(),
            value
        );
    }
    if let Some(value) = system.sensor_value(ROBOT, arm_sensor) {
        println!("  Arm reading: {:?}", value);
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____             __  __    _____ _         "#.bold().cyan());
    println!("{}", r#"  / __/_ _____  ___/ /_/ /_  / __(_)_ _       "#.bold().cyan());
    println!("{}", r#" _\ \/ // / _ \/ __/ __/ _ \_\ \/ /  ' \      "#.bold().cyan());
    println!("{}", r#"/___/\_, /_//_/\__/\__/_//_/___/_/_/_/_/      "#.bold().cyan());
    println!("{}", r#"    /___/                                      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "SynthSim".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Headless robot simulation");
    println!();
}
