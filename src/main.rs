use emberglow::settings::{self, AppSettings};
use emberglow::{CpalSink, EngineStatus, EngineThread};
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "commands: start | stop | restart | volume <0..1> | soundscape <id> | devices | quit";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("emberglow=info")),
        )
        .init();

    let mut app_settings = settings::load_settings();
    let sink_config = app_settings.sink_config();
    let engine_thread =
        EngineThread::spawn(move || CpalSink::new(sink_config), app_settings.engine_options())?;
    let engine = engine_thread.controller();

    // A failed start only means silence; the user can retry with `start`.
    if let Err(e) = engine.start() {
        warn!("fire is silent: {}", e);
    }

    println!("{}", HELP);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("start"), _) => {
                if let Err(e) = engine.start() {
                    error!("{}", e);
                }
            }
            (Some("stop"), _) => match engine.stop() {
                Ok(status) => report_session(&status),
                Err(e) => error!("{}", e),
            },
            (Some("restart"), _) => {
                if let Err(e) = engine.restart() {
                    error!("{}", e);
                }
            }
            (Some("volume"), Some(level)) => match level.parse::<f32>() {
                Ok(level) => {
                    app_settings.master_volume = engine.set_master_volume(level);
                    info!("master volume {:.2}", app_settings.master_volume);
                }
                Err(e) => warn!("bad volume '{}': {}", level, e),
            },
            (Some("soundscape"), Some(id)) => match engine.set_soundscape(id) {
                Ok(status) => app_settings.soundscape = status.soundscape.id().to_string(),
                Err(e) => error!("{}", e),
            },
            (Some("devices"), _) => print_devices(&app_settings),
            (Some("quit"), _) | (Some("exit"), _) => break,
            (None, _) => {}
            _ => println!("{}", HELP),
        }
        io::stdout().flush()?;
    }

    match engine.stop() {
        Ok(status) => report_session(&status),
        Err(e) => error!("{}", e),
    }
    engine_thread.shutdown();
    settings::save_settings(&app_settings);
    Ok(())
}

fn report_session(status: &EngineStatus) {
    info!(
        "session ended after {} crackle(s), {} stream error(s)",
        status.crackle_triggers_sent, status.xrun_count
    );
    if status.xrun_count > 0 {
        warn!("output stream reported {} xrun(s); try a larger buffer_size", status.xrun_count);
    }
}

fn print_devices(app_settings: &AppSettings) {
    let names = emberglow::audio_device::get_host(app_settings.host_name.as_deref())
        .and_then(|host| emberglow::audio_device::output_device_names(&host));
    match names {
        Ok(names) => names.iter().for_each(|name| println!("  {}", name)),
        Err(e) => error!("{}", e),
    }
}
