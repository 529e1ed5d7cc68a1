mod logging;
mod transport;

use castle_agent_core::{
    Agent, AgentConfig, AgentError, Outcome, PlayerKind, Session, SessionReport, SimulatedCastle,
    Transport,
    observation::LossRecord,
    session::{Progress, SessionError},
};
use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::error;

use crate::transport::ProcessTransport;

/// Log file used while the terminal UI owns the screen.
const DEFAULT_LOG_FILE: &str = "castle-agent.log";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Castle description to play in-process
    #[arg(short, long, value_name = "CASTLE_FILE", conflicts_with = "game")]
    castle: Option<PathBuf>,

    /// Game program to spawn instead of a simulated castle
    #[arg(short, long, value_name = "PROGRAM")]
    game: Option<PathBuf>,

    /// Arguments for the game program
    #[arg(last = true, value_name = "GAME_ARGS")]
    game_args: Vec<String>,

    /// Player preset
    #[arg(short, long, default_value_t = PlayerKind::default())]
    player: PlayerKind,

    /// TOML agent configuration; overrides the preset
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for the simulated castle's random entry
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Turns before the simulated castle gives up on the agent
    #[arg(long)]
    max_turns: Option<u64>,

    /// Seconds to wait for each response from the game program
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    response_timeout: u64,

    /// Play without the terminal UI and print the report as JSON
    #[arg(long)]
    headless: bool,

    /// Write logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log decisions and bookkeeping
    #[arg(long, conflicts_with = "info")]
    debug: bool,

    /// Log decisions
    #[arg(long)]
    info: bool,
}

struct App {
    /// The game being played.
    session: Session<Box<dyn Transport>>,
    /// Actions sent so far, oldest first.
    transcript: Vec<String>,
    /// Final status line once the game is over.
    status: Option<String>,
    /// Set when the session failed.
    failure: Option<String>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(session: Session<Box<dyn Transport>>) -> Self {
        App {
            session,
            transcript: Vec::new(),
            status: None,
            failure: None,
            should_quit: false,
        }
    }

    /// Plays one turn.
    fn tick(&mut self) {
        if self.status.is_some() {
            return;
        }
        match self.session.step() {
            Ok(Progress::Played(turn)) => {
                self.transcript.push(format!("{:>5}  {}", turn.turn, turn.action));
            }
            Ok(Progress::Finished(report)) => {
                self.status = Some(describe(&report));
            }
            Err(err) => {
                let failure = explain_failure(&err);
                error!(%err, "session failed");
                self.status = Some(format!("Failed: {failure}"));
                self.failure = Some(failure);
            }
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let level = if args.debug {
        Some("debug")
    } else if args.info {
        Some("info")
    } else {
        None
    };
    let log_file = match (&args.log_file, args.headless) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => None,
        (None, false) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
    };
    logging::init(level, log_file.as_deref())?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => args.player.config(),
    };
    let session = Session::new(Agent::new(&config), open_transport(&args)?);

    if args.headless {
        return run_headless(session);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(session);

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;
    result?;

    if let Some(failure) = app.failure {
        anyhow::bail!(failure);
    }
    if let Some(status) = app.status {
        println!("{status}");
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<AgentConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

/// Picks the game: a spawned program, or a simulated castle by default.
fn open_transport(args: &Args) -> Result<Box<dyn Transport>> {
    if let Some(program) = &args.game {
        let timeout = Duration::from_secs(args.response_timeout);
        let game = ProcessTransport::spawn(program, &args.game_args, timeout)
            .with_context(|| format!("cannot start game {}", program.display()))?;
        return Ok(Box::new(game));
    }

    // If no castle file is provided, use the default castle
    let castle_file = args
        .castle
        .clone()
        .unwrap_or_else(|| PathBuf::from("castles/castle01.txt"));
    // Ensure the castle file exists
    if !castle_file.exists() {
        return Err(anyhow::anyhow!(
            "Castle file does not exist: {}",
            castle_file.display()
        ));
    }
    let text = std::fs::read_to_string(&castle_file)
        .with_context(|| format!("cannot read castle file {}", castle_file.display()))?;
    let mut castle = SimulatedCastle::parse(&text, args.seed)
        .with_context(|| format!("invalid castle file {}", castle_file.display()))?;
    if let Some(max_turns) = args.max_turns {
        castle = castle.with_max_turns(max_turns);
    }
    Ok(Box::new(castle))
}

fn run_headless(mut session: Session<Box<dyn Transport>>) -> Result<()> {
    let report = session.run().map_err(|err| anyhow::anyhow!(explain_failure(&err)))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Tells a game that broke the protocol apart from an agent that gave up.
fn explain_failure(err: &SessionError) -> String {
    match err {
        SessionError::Agent(agent) if agent.is_protocol_error() => {
            format!("the game sent a record the agent cannot read: {agent}")
        }
        SessionError::Agent(AgentError::ExhaustedWithNoExit { .. }) => {
            format!("the agent gave up: {err}")
        }
        SessionError::Agent(agent) => format!("the agent failed: {agent}"),
        SessionError::Transport(transport) => format!("lost contact with the game: {transport}"),
    }
}

fn describe(report: &SessionReport) -> String {
    let outcome = match &report.outcome {
        Outcome::Won(win) => format!("Won! Score: {}", win.score),
        Outcome::Lost(LossRecord::Error(error)) => format!("Lost: {error}"),
        Outcome::Lost(LossRecord::Won(win)) => format!("Lost with score {}", win.score),
        Outcome::Stopped => "Stopped without a verdict".to_string(),
    };
    format!("{outcome} after {} turns", report.turns)
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250); // One turn per tick
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Transcript and navigator
            Constraint::Percentage(20), // Inventory
            Constraint::Percentage(10), // Status/help
        ])
        .split(frame.area());
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_layout[0]);

    render_transcript(frame, top[0], &app.transcript);
    render_navigator(frame, top[1], app.session.agent());
    render_inventory(frame, main_layout[1], app.session.agent());

    let help = match &app.status {
        Some(status) => format!("{status}. Press 'q' or 'Esc' to quit."),
        None => "Press 'q' or 'Esc' to quit.".to_string(),
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the most recent actions, newest at the bottom.
fn render_transcript(frame: &mut Frame, area: Rect, transcript: &[String]) {
    let visible = usize::from(area.height.saturating_sub(2));
    let skip = transcript.len().saturating_sub(visible);
    let items: Vec<ListItem> = transcript[skip..]
        .iter()
        .map(|line| ListItem::new(line.as_str()))
        .collect();

    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Actions"));
    frame.render_widget(widget, area);
}

/// Renders what the navigator knows about the castle.
fn render_navigator(frame: &mut Frame, area: Rect, agent: &Agent) {
    let navigator = agent.navigator();
    let origin = navigator
        .origin()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let goal = if navigator.goal_acquired() {
        Span::styled("acquired", Style::default().fg(Color::Green).bold())
    } else {
        Span::styled("searching", Style::default().fg(Color::Yellow))
    };

    let lines = vec![
        Line::from(format!("Mode: {:?}", navigator.mode())),
        Line::from(format!("Turns: {}", agent.turns())),
        Line::from(format!("Rooms known: {}", navigator.rooms_known())),
        Line::from(format!("Exits found: {}", navigator.discovered_exits().len())),
        Line::from(format!("Trail depth: {}", navigator.reverse_path().len())),
        Line::from(format!("Queued route: {}", navigator.override_path().count())),
        Line::from(format!("Origin: {origin}")),
        Line::from(vec![Span::raw("Frog: "), goal]),
        Line::from(format!(
            "Tactics: {}",
            agent.tactic_names().collect::<Vec<_>>().join(", ")
        )),
    ];

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Navigator"));
    frame.render_widget(widget, area);
}

/// Renders what the agent carries and how it feels.
fn render_inventory(frame: &mut Frame, area: Rect, agent: &Agent) {
    let inventory = agent.inventory();
    let vitals = agent.vitals();
    let level = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |value| value.to_string());

    let weapons: Vec<String> = inventory
        .weapons()
        .iter()
        .map(|weapon| format!("{} ({})", weapon.name, weapon.lethality))
        .collect();
    let treasures: Vec<String> = inventory
        .treasures()
        .iter()
        .map(|treasure| format!("{} ({})", treasure.name, treasure.value))
        .collect();
    let artifacts: Vec<&str> = inventory
        .artifacts()
        .iter()
        .map(|artifact| artifact.name.as_str())
        .collect();

    let items = vec![
        ListItem::from(Line::from(vec![
            Span::raw("Frog: "),
            if inventory.goal_carried() {
                Span::styled("carried", Style::default().fg(Color::Green))
            } else {
                Span::raw("no")
            },
            Span::raw(format!(
                "   Ill: {}  Tired: {}  Injured: {}",
                level(vitals.ill),
                level(vitals.tired),
                level(vitals.injured)
            )),
        ])),
        ListItem::from(format!("Weapons: {}", weapons.join(", "))),
        ListItem::from(Line::from(vec![
            Span::raw(format!("Treasure: {} ", treasures.join(", "))),
            Span::styled(
                format!("[total {}]", inventory.treasure_value()),
                Style::default().fg(Color::Yellow),
            ),
        ])),
        ListItem::from(format!("Artifacts: {}", artifacts.join(", "))),
    ];

    let inventory_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Inventory"));
    frame.render_widget(inventory_widget, area);
}

#[cfg(test)]
mod tests {
    use castle_agent_core::session::TransportError;

    use super::*;

    #[test]
    fn protocol_errors_and_giving_up_read_differently() {
        let protocol = explain_failure(&SessionError::Agent(AgentError::UnknownDirection(
            "sideways".to_string(),
        )));
        assert!(protocol.starts_with("the game sent a record the agent cannot read"));

        let malformed = explain_failure(&AgentError::MalformedObservation("no location".into()).into());
        assert!(malformed.starts_with("the game sent a record the agent cannot read"));

        let exhausted = explain_failure(&AgentError::ExhaustedWithNoExit { rooms: 3 }.into());
        assert!(exhausted.starts_with("the agent gave up"), "{exhausted}");
        assert!(exhausted.contains("3 rooms"));

        let closed = explain_failure(&TransportError::Closed.into());
        assert!(closed.starts_with("lost contact with the game"));
    }
}
