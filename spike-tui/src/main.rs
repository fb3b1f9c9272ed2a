//! TUI entrypoint: replays a spike artifact as a 2D raster (time on X, input features on Y)
//! Controls: [s] Step, [r] Run/Pause, [n]/[p] Next/Previous sample, [q] Quit

mod backend;
mod app;
mod ui;

use anyhow::{Context, Result};
use backend::TensorSource;
use app::App;
use ui::draw;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use spike_bridge::{codec, SliceAxis};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Axis {
    Time,
    Sample,
}

impl From<Axis> for SliceAxis {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Time => SliceAxis::Time,
            Axis::Sample => SliceAxis::Sample,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "spike-tui", version, about = "Spike raster viewer for encoded input artifacts")]
struct Args {
    /// Spike artifact written by spike-bridge.
    #[arg(default_value = "inputSpikes.txt")]
    path: PathBuf,

    /// Slice layout the artifact was written with.
    #[arg(long, value_enum, default_value_t = Axis::Time)]
    axis: Axis,

    /// Sample of the batch to show first (0-based).
    #[arg(long, default_value_t = 0)]
    sample: usize,

    /// Raster width in columns.
    #[arg(long, default_value_t = 80)]
    width: usize,

    /// Milliseconds per tick while running.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    // Leave alternate screen and show cursor
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load before touching the terminal so errors print normally
    let tensor = codec::load_spikes(&args.path, args.axis.into())
        .with_context(|| format!("loading {}", args.path.display()))?;
    let title = format!("{} {:?}", args.path.display(), tensor.shape());

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Ensure terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    // App state
    let source = TensorSource::new(tensor, args.sample);
    let mut app = App::new(source, args.width.max(1));
    let tick_rate = Duration::from_millis(args.tick_ms);
    let mut last_tick = Instant::now();

    // Event loop
    loop {
        draw(&mut terminal, &app, &title)?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_millis(0));

        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char('s') => app.step(),
                    KeyCode::Char('r') => app.toggle_running(),
                    KeyCode::Char('n') => app.next_sample(),
                    KeyCode::Char('p') => app.prev_sample(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if app.running {
                app.step();
            }
            last_tick = Instant::now();
        }
    }

    // Cleanup
    restore_terminal()?;
    Ok(())
}
