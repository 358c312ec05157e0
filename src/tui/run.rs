//! Dashboard entry point and terminal setup.

use std::{io, sync::Arc};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tokio::runtime::Handle;
use tracing::info;

use crate::client::CollectionApi;
use crate::entity::{Objective, Project, Task};
use crate::tui::app::Dashboard;

/// Take over the terminal and run the dashboard until the user quits.
/// Store calls are spawned on `runtime`, which must outlive this call.
pub fn run_dashboard(
    runtime: Handle,
    tasks: Arc<dyn CollectionApi<Task>>,
    projects: Arc<dyn CollectionApi<Project>>,
    objectives: Arc<dyn CollectionApi<Objective>>,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut dashboard = Dashboard::new(runtime, tasks, projects, objectives);
    dashboard.refresh_all();
    info!("dashboard started");
    let result = dashboard.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("dashboard closed");
    result
}
