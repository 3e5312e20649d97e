//! Terminal job monitor.
//!
//! A ratatui view over the caller's email jobs: table with live
//! progress, pause/resume keys, fixed-interval refresh while the view is
//! open. The refresh loop lives inside [`run_app`]; leaving the view
//! exits the loop — and with it all polling — before the terminal is
//! restored, so no timer outlives the monitor.

pub mod app;
pub mod event;
pub mod ui;

pub use app::MonitorApp;
pub use event::{AppAction, EventHandler};

use crate::api::{ApiClient, JobTracker};
use crate::config::Config;
use crate::session::SessionContext;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the monitor until the user closes it.
pub async fn run(config: Config, session: SessionContext) -> anyhow::Result<()> {
    info!("Starting job monitor");

    let mut terminal = init_terminal()?;

    let tracker = JobTracker::new(ApiClient::from_config(&config.backend));
    let mut app = MonitorApp::new(tracker, session, config.poll.interval_secs);
    let mut events = EventHandler::new(Duration::from_millis(200));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    info!("Job monitor closed");
    result
}

/// Main monitor loop: draw, then wait for whichever comes first — the
/// refresh tick or a key action. Refreshes run inline, so a new poll
/// cycle never starts while the previous one is still in flight.
async fn run_app(
    terminal: &mut Tui,
    app: &mut MonitorApp,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(app.refresh_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            _ = ticker.tick() => {
                app.refresh().await;
            }
            action = events.next() => {
                match action {
                    Some(AppAction::Quit) | None => break,
                    Some(AppAction::Refresh) => app.refresh().await,
                    Some(action) => app.handle_action(action).await,
                }
            }
        }
    }

    Ok(())
}
