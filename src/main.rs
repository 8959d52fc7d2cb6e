use clockphrase::controls::VirtualControls;
use clockphrase::midi::{LogSink, NoteSink, open_clock_input, open_note_output};
use clockphrase::watch::{load_and_report, watch_sequence_file};
use clockphrase::{Config, Control, EngineHandle, HostError, StatusSnapshot, spawn_engine};
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use std::io::{Write, stdout};
use std::path::Path;
use std::time::{Duration, Instant};
use std::{env, process};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const TRANSPORT_QUEUE: usize = 1024;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load_or_create(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => Config::default(),
    };

    if let Err(e) = run(config) {
        error!(error = %e, "fatal");
        eprintln!("{e}");
        process::exit(1);
    }
}

fn run(config: Config) -> Result<(), HostError> {
    let epoch = Instant::now();
    let (input, transport) = open_clock_input(config.midi_in_port.as_deref(), TRANSPORT_QUEUE)?;

    let controls = VirtualControls::with_hold(config.key_hold_ms());
    let out_filter = config.midi_out_port.clone();
    let engine = spawn_engine(
        &config,
        move || -> Box<dyn NoteSink> {
            match open_note_output(out_filter.as_deref()) {
                Ok(output) => Box::new(output),
                Err(e) => {
                    warn!(error = %e, "no MIDI output, notes will only be logged");
                    Box::new(LogSink)
                }
            }
        },
        controls.clone(),
        transport,
        epoch,
    );

    let watcher = match &config.sequence_file {
        Some(path) => {
            load_and_report(&engine.requests(), path);
            match watch_sequence_file(engine.requests(), path.clone()) {
                Ok(w) => Some(w),
                Err(e) => {
                    engine.shutdown();
                    return Err(e);
                }
            }
        }
        None => None,
    };

    println!("clockphrase: following clock on {}", input.port_name);
    println!("  space  arm / disarm");
    println!("  t      retrigger (when enabled)");
    println!("  s      print status");
    println!("  q      quit");

    let result = keyboard_loop(&engine, &controls, epoch);
    drop(watcher);
    engine.shutdown();
    info!("bye");
    result
}

fn keyboard_loop(engine: &EngineHandle, controls: &VirtualControls, epoch: Instant) -> Result<(), HostError> {
    terminal::enable_raw_mode()?;
    let result = read_keys(engine, controls, epoch);
    terminal::disable_raw_mode()?;
    println!();
    result
}

fn read_keys(engine: &EngineHandle, controls: &VirtualControls, epoch: Instant) -> Result<(), HostError> {
    let mut shown: Option<StatusSnapshot> = None;

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let TermEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let now_ms = epoch.elapsed().as_millis() as u64;
                match key.code {
                    KeyCode::Char(' ') => controls.press(Control::Primary, now_ms),
                    KeyCode::Char('t') => controls.press(Control::Trigger, now_ms),
                    KeyCode::Char('s') => print_status(engine)?,
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                    _ => {}
                }
            }
        }

        let status = engine.latest_status();
        if shown != Some(status) {
            execute!(
                stdout(),
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(status_line(&status))
            )?;
            shown = Some(status);
        }
    }
}

fn print_status(engine: &EngineHandle) -> Result<(), HostError> {
    let text = match engine.query_status() {
        Ok(status) => serde_json::to_string(&status).unwrap_or_else(|e| e.to_string()),
        Err(e) => e.to_string(),
    };
    let mut out = stdout();
    write!(out, "\r\n{text}\r\n")?;
    out.flush()?;
    Ok(())
}

fn status_line(status: &StatusSnapshot) -> String {
    let state = if status.playing {
        "PLAYING"
    } else if status.pending {
        "ARMED"
    } else {
        "idle"
    };
    let clock = if status.transport_running { "running" } else { "stopped" };
    if status.sequence_loaded {
        format!(
            "[{state}] clock {clock} | {} events on ch {} ({} ppqn source)",
            status.event_count, status.channel, status.timing.source_resolution
        )
    } else {
        format!("[{state}] clock {clock} | no sequence loaded")
    }
}
