#[cfg(windows)]
mod signal;

use anyhow::Result;
use crossbeam_channel::Receiver;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tori::config::AppConfig;
use tori::engine::{EngineEvent, HotkeyMap};

fn main() -> Result<()> {
    // Load config or create default if not exists
    let config = AppConfig::load_or_create("Config.toml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let bindings = config.hotkey_map()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        hotkeys = bindings.len(),
        execute_hotkeys = config.execute_hotkeys,
        "tori starting"
    );

    run(&config, bindings)
}

#[cfg(windows)]
fn run(config: &AppConfig, bindings: HotkeyMap<String>) -> Result<()> {
    use tori::engine::HotkeyEngine;
    use tori::rawinput::win32;

    signal::set_control_ctrl_handler()?;

    // Sound requests leave the input thread through a channel so playback
    // never stalls raw input processing.
    let (tx, rx) = crossbeam_channel::unbounded::<EngineEvent<String>>();
    let player = std::thread::Builder::new()
        .name("sound_player".to_string())
        .spawn(move || play_requests(rx))?;

    let mut engine = HotkeyEngine::new(bindings);
    engine.set_hotkeys_enabled(config.execute_hotkeys);
    engine.subscribe(Box::new(tx));

    // The loop owns the engine; dropping it at exit closes the channel.
    win32::run_message_loop(Box::new(engine))?;

    let _ = player.join();
    info!("tori stopped");
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: &AppConfig, _bindings: HotkeyMap<String>) -> Result<()> {
    anyhow::bail!("raw input capture is only available on Windows")
}

/// Hands triggered sounds to the audio backend.
#[cfg_attr(not(windows), allow(dead_code))]
fn play_requests(rx: Receiver<EngineEvent<String>>) {
    for event in rx {
        match event {
            EngineEvent::HotkeyTriggered(sound) => info!(%sound, "play sound"),
            EngineEvent::ChordChanged(change) => debug!(%change, "held keys changed"),
        }
    }
}
