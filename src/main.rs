// src/main.rs

pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod life;
pub mod view;

use crate::{
    config::{Config, DriverKind, CONFIG},
    diagnostics::Monitor,
    driver::{midi, ConsoleDriver, DebugDriver, DriverHandle, GridDriver, MidiDriver, RawMidiPort},
    life::controller::Life,
    view::PAUSE_BUTTON,
};

use anyhow::{anyhow, Context};
use log::{error, info, warn};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What this invocation does, picked from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Life,
    List,
    Monitor,
    Checker,
}

/// Set from the signal handler; polled once per loop iteration.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() -> anyhow::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(request_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {:?} handler", signal))?;
    }
    Ok(())
}

fn list_midi_devices() -> anyhow::Result<()> {
    let devices = midi::list_devices().context("Failed to enumerate MIDI devices")?;
    if devices.is_empty() {
        println!("No MIDI devices found.");
    }
    for device in devices {
        println!("{}\t{}", device.path.display(), device.name);
    }
    Ok(())
}

fn open_midi_port(config: &Config) -> anyhow::Result<RawMidiPort> {
    let settings = &config.midi;
    match (&settings.input, &settings.output) {
        (Some(input), Some(output)) => return RawMidiPort::open_split(input, output),
        (None, None) => {}
        _ => return Err(anyhow!("midi.input and midi.output must be set together")),
    }
    if let Some(device) = &settings.device {
        return RawMidiPort::open(device);
    }
    let devices = midi::list_devices().context("Failed to enumerate MIDI devices")?;
    let found = match &settings.device_name {
        Some(name) => midi::find_device(&devices, name)
            .ok_or_else(|| anyhow!("No MIDI device matching '{}'", name))?,
        None => devices
            .first()
            .ok_or_else(|| anyhow!("No MIDI devices found"))?,
    };
    info!("Using MIDI device '{}'", found.name);
    RawMidiPort::open(&found.path)
}

fn open_driver(config: &Config) -> anyhow::Result<DriverHandle> {
    let driver: Box<dyn GridDriver> = match config.display.driver {
        DriverKind::Midi => {
            let port = open_midi_port(config)?;
            let delay = Duration::from_millis(config.midi.startup_delay_ms);
            if !delay.is_zero() {
                info!("Waiting {:?} for the controller to settle", delay);
                std::thread::sleep(delay);
            }
            Box::new(MidiDriver::new(port))
        }
        DriverKind::Console => {
            let cols = config.grid.width.max(PAUSE_BUTTON.0 + 1);
            Box::new(ConsoleDriver::new(std::io::stdout(), cols, config.grid.height))
        }
    };
    info!("Driver: {:?} (debug: {})", config.display.driver, config.display.debug);
    let handle: DriverHandle = if config.display.debug {
        Rc::new(RefCell::new(DebugDriver::new(driver)))
    } else {
        Rc::new(RefCell::new(driver))
    };
    Ok(handle)
}

fn new_rng(config: &Config) -> StdRng {
    match config.grid.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn run_life(config: &Config, driver: DriverHandle) -> anyhow::Result<()> {
    let settings = config.to_settings().context("Invalid grid configuration")?;
    let mut life = Life::new(driver, &settings, &mut new_rng(config))?;
    life.run(&SHUTDOWN)
}

fn run_checker(config: &Config, driver: &DriverHandle) -> anyhow::Result<()> {
    let display = &config.display;
    diagnostics::run_checker(
        &mut *driver.borrow_mut(),
        Duration::from_millis(config.timing.tick_interval_ms),
        display.on_velocity,
        display.off_velocity,
        &mut new_rng(config),
        &SHUTDOWN,
    )?;
    Ok(())
}

fn run_monitor(config: &Config) -> anyhow::Result<()> {
    let mut monitor = Monitor::new(open_midi_port(config)?);
    monitor.run(Duration::from_millis(config.timing.poll_interval_ms), &SHUTDOWN)
}

fn close_driver(driver: &DriverHandle) -> anyhow::Result<()> {
    let mut driver = driver.borrow_mut();
    driver.clear(None)?;
    driver.commit()?;
    driver.close().context("Failed to close driver")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut mode = Mode::Life;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--list" => mode = Mode::List,
            "--monitor" => mode = Mode::Monitor,
            "--checker" => mode = Mode::Checker,
            other => warn!("Ignoring unknown argument '{}'", other),
        }
    }
    if mode == Mode::List {
        return list_midi_devices();
    }

    info!("Starting midi-life ({:?})...", mode);
    let config = CONFIG
        .get_or_try_init(Config::from_env)
        .context("Failed to load configuration")?;
    install_signal_handlers()?;

    if mode == Mode::Monitor {
        return run_monitor(config);
    }

    let driver = open_driver(config)?;
    let result = match mode {
        Mode::Checker => run_checker(config, &driver),
        _ => run_life(config, Rc::clone(&driver)),
    };
    if let Err(e) = &result {
        error!("{:?} stopped with an error: {:#}", mode, e);
    }
    // The board is cleared even when the loop failed.
    let cleanup = close_driver(&driver);
    if let Err(e) = &cleanup {
        error!("Cleanup failed: {:#}", e);
    }
    result.and(cleanup)?;

    info!("midi-life exited successfully.");
    Ok(())
}
