mod bridge;
mod catalog;
mod config;
mod dashboard;
mod data;
mod error;
mod estimator;
mod expr;
mod ingest;
mod logging;
mod map_draw;
mod predicate;
mod selection;
mod state;
mod stats;
mod surface;
mod ui;
mod view;

use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::PathBuf, thread, time::{Duration, Instant}};
use tracing::{error, info};

use config::AtlasConfig;
use data::{DataCache, LoadedData};
use error::AtlasError;
use state::AppState;

const FRAME: Duration = Duration::from_millis(100);

/// Dane ładowane w tle; interfejs rusza od razu z ekranem ładowania.
fn spawn_loader(dir: PathBuf, config: AtlasConfig) -> Receiver<error::Result<LoadedData>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let result = DataCache::new(&dir, config).load_all();
        // odbiorca mógł już zniknąć (wyjście przed końcem ładowania)
        let _ = tx.send(result);
    });
    rx
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = AtlasConfig::data_dir();
    let config = AtlasConfig::load(&data_dir)?;
    let _log_guard = logging::init(&config.log_dir)?;
    info!(data_dir = %data_dir.display(), "starting");

    let mut state = AppState::new(&config);
    let mut loader = Some(spawn_loader(data_dir, config));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        if let Some(rx) = &loader {
            match rx.try_recv() {
                Ok(result) => {
                    state.on_loaded(result);
                    loader = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    error!("loader thread exited without a result");
                    state.on_loaded(Err(AtlasError::LoaderGone));
                    loader = None;
                }
            }
        }

        state.tick();
        terminal.draw(|f| ui::draw(f, &mut state))?;

        // licznik po debounce nie może czekać na pełną klatkę
        let timeout = state
            .dashboard
            .count_deadline()
            .map_or(FRAME, |d| d.saturating_duration_since(Instant::now()).min(FRAME));
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_input(code) {
                        break;
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!("bye");
    Ok(())
}
