//! # Mochi 2048 CLI
//!
//! Play the sleepy-companion puzzle in the terminal, or run headless
//! simulations with a simple policy.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use mochi_2048_core::{
    CompanionState, Direction, Game, GameEvent, JsonFileStore, SaveStore, View, CATALOG,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mochi-2048")]
#[command(author, version, about = "Merge tiles until Mochi falls asleep")]
struct Args {
    /// Number of episodes to run in headless mode
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Random seed for tile spawns
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Maximum moves per episode in headless mode (0 = unlimited)
    #[arg(short, long, default_value = "20000")]
    max_steps: u32,

    /// Policy for headless mode
    #[arg(short, long, value_enum, default_value = "random")]
    policy: Policy,

    /// Show the board after each move in headless mode
    #[arg(long)]
    verbose: bool,

    /// Save file (defaults to the platform data directory)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Directory for the log file (defaults to the platform data directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Random moves among those that change the board
    Random,
    /// Cycle through Left, Down, Right, Up
    Cycle,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let dirs = ProjectDirs::from("com", "mochi2048", "Mochi2048");
    let data_dir = dirs.map(|d| d.data_local_dir().to_path_buf());

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| data_dir.as_ref().map(|d| d.join("logs")))
        .context("could not resolve a log directory; pass --log-dir")?;
    let _guard = setup_logging(&log_dir)?;

    if let Some(episodes) = args.episodes {
        run_headless(&args, episodes);
        return Ok(());
    }

    let save_path = args
        .save
        .clone()
        .or_else(|| data_dir.as_ref().map(|d| d.join("save.json")))
        .context("could not resolve a save location; pass --save")?;
    run_interactive(&args, JsonFileStore::new(save_path))
}

/// Log to a file so the board stays readable. Level comes from `MOCHI_LOG`,
/// defaulting to `info`.
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "mochi-2048.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env("MOCHI_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

// =============================================================================
// Interactive mode
// =============================================================================

const CONTROLS: &str = "Move: WASD/arrows | U undo | C claim reward | B shop | Q quit";

/// How long to wait for a key before ticking the idle clock and redrawing.
const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

fn run_interactive<S: SaveStore>(args: &Args, store: S) -> Result<()> {
    let raw = RawMode::enable().context("switching terminal to raw mode")?;

    let mut game = Game::new(args.seed, store);
    let mut input = Input::stdin();
    let mut buffer = [0u8; 3];
    let mut shop_open = false;
    let mut status = String::from("Good morning, Mochi!");
    let mut last_tick = Instant::now();

    redraw(&game, shop_open, &status)?;

    loop {
        let ready = input.wait(REDRAW_INTERVAL).context("waiting for input")?;

        let now = Instant::now();
        game.tick(now.saturating_duration_since(last_tick));
        last_tick = now;

        if !ready {
            redraw(&game, shop_open, &status)?;
            continue;
        }

        let bytes_read = match ReadOutcome::from(input.read(&mut buffer)) {
            ReadOutcome::Bytes(n) => n,
            ReadOutcome::Retry => continue,
            ReadOutcome::Closed => break,
        };

        match parse_input(&buffer[..bytes_read], shop_open) {
            Command::Move(dir) => {
                if game.submit_move(dir).is_none() {
                    status = String::from("Mochi can't play right now. Press C for the reward.");
                } else {
                    status.clear();
                }
            }
            Command::Undo => {
                status.clear();
                game.undo();
            }
            Command::Claim => {
                if game.claim_reward().is_none() {
                    status = String::from("No reward yet. Keep playing!");
                } else {
                    status.clear();
                }
            }
            Command::ToggleShop => {
                shop_open = !shop_open;
                status.clear();
            }
            Command::Buy(index) => {
                let item = &CATALOG[index];
                status = match game.purchase(item.id) {
                    Ok(()) => String::new(),
                    Err(err) => format!("Can't buy {}: {}", item.name, err),
                };
            }
            Command::Quit => break,
            Command::None => continue,
        }

        for event in game.take_events() {
            if let Some(line) = describe(&event) {
                if !status.is_empty() {
                    status.push_str("  ");
                }
                status.push_str(&line);
            }
        }
        redraw(&game, shop_open, &status)?;
    }

    drop(raw);
    println!("\nGoodbye! Mochi will be waiting.");
    Ok(())
}

fn describe(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::Merged { value } if *value >= 128 => Some(format!("Made a {value}!")),
        GameEvent::Merged { .. } => None,
        GameEvent::FellAsleep => Some(String::from(
            "Mochi fell asleep! Press C to claim the sleepy reward and start over.",
        )),
        GameEvent::Stuck => Some(String::from(
            "No more moves! Press C to claim the reward and start over.",
        )),
        GameEvent::RewardGranted(grant) => Some(format!(
            "Reward: {} + {} idle = {} points!",
            grant.base, grant.idle_bonus, grant.total
        )),
        GameEvent::Undone => Some(String::from("Undone.")),
        GameEvent::NothingToUndo => Some(String::from("Nothing left to undo.")),
        GameEvent::Purchased { id } => Some(format!("Bought {id}!")),
        GameEvent::Placed { .. } => None,
    }
}

fn redraw<S: SaveStore>(game: &Game<S>, shop_open: bool, status: &str) -> io::Result<()> {
    let view = game.view();
    let mut out = io::stdout().lock();
    // Raw mode leaves output post-processing on, so plain newlines are fine.
    write!(out, "\x1b[2J\x1b[H")?;
    writeln!(out, "=== Mochi 2048 ===")?;
    writeln!(out, "{CONTROLS}\n")?;
    write!(out, "{}", game.grid())?;
    writeln!(out)?;
    writeln!(out, "  Mochi:  {} ({})", face(view.companion), view.companion)?;
    writeln!(out, "  Gauge:  {} / 5000", view.gauge)?;
    writeln!(out, "  Points: {}", view.currency)?;
    writeln!(out, "  Idle:   {}", idle_label(&view))?;

    let room: Vec<&str> = game.room().placed().iter().map(|p| p.id.as_str()).collect();
    if !room.is_empty() {
        writeln!(out, "  Room:   {}", room.join(", "))?;
    }

    if shop_open {
        writeln!(out, "\n  --- Shop (letter to buy, Esc to close) ---")?;
        for (i, item) in CATALOG.iter().enumerate() {
            let key = (b'a' + i as u8) as char;
            let owned = if game.room().owns(item.id) { " (owned)" } else { "" };
            writeln!(out, "  [{key}] {:<18}{:>5}{owned}", item.name, item.price)?;
        }
    }

    if !status.is_empty() {
        writeln!(out, "\n  {status}")?;
    }
    out.flush()
}

fn face(state: CompanionState) -> &'static str {
    match state {
        CompanionState::Awake => "(^_^)",
        CompanionState::Sleepy => "(-_-)",
        CompanionState::Asleep => "(u_u) zZ",
        CompanionState::Stuck => "(o_o;)",
    }
}

fn idle_label(view: &View) -> String {
    format!(
        "{:02}:{:02} (+{}P)",
        view.idle_seconds / 60,
        view.idle_seconds % 60,
        view.idle_bonus
    )
}

enum Command {
    Move(Direction),
    Undo,
    Claim,
    ToggleShop,
    Buy(usize),
    Quit,
    None,
}

fn parse_input(bytes: &[u8], shop_open: bool) -> Command {
    if shop_open {
        if let [key @ b'a'..=b'z'] = bytes {
            let index = usize::from(key - b'a');
            if index < CATALOG.len() {
                return Command::Buy(index);
            }
        }
        if let [27] = bytes {
            return Command::ToggleShop;
        }
    }

    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => Command::Move(Direction::Up),
        [27, 91, 66] => Command::Move(Direction::Down),
        [27, 91, 67] => Command::Move(Direction::Right),
        [27, 91, 68] => Command::Move(Direction::Left),

        [b'w'] | [b'W'] => Command::Move(Direction::Up),
        [b's'] | [b'S'] => Command::Move(Direction::Down),
        [b'a'] | [b'A'] => Command::Move(Direction::Left),
        [b'd'] | [b'D'] => Command::Move(Direction::Right),

        [b'u'] | [b'U'] => Command::Undo,
        [b'c'] | [b'C'] => Command::Claim,
        [b'b'] | [b'B'] => Command::ToggleShop,
        [b'q'] | [b'Q'] | [3] | [27] => Command::Quit,

        _ => Command::None,
    }
}

/// Restores the terminal settings it replaced when dropped.
#[cfg(unix)]
struct RawMode {
    fd: libc::c_int,
    original: libc::termios,
}

#[cfg(unix)]
impl RawMode {
    fn enable() -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;
        let fd = io::stdin().as_raw_fd();
        // SAFETY: `termios` is plain data and `fd` is the process's stdin.
        unsafe {
            let mut original: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut original) != 0 {
                return Err(io::Error::last_os_error());
            }
            let mut raw = original;
            raw.c_lflag &= !(libc::ICANON | libc::ECHO);
            raw.c_cc[libc::VMIN] = 1;
            raw.c_cc[libc::VTIME] = 0;
            if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { fd, original })
        }
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        // SAFETY: restores the settings read in `enable` on the same fd.
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSANOW, &self.original);
        }
    }
}

// Without termios each key needs Enter.
#[cfg(not(unix))]
struct RawMode;

#[cfg(not(unix))]
impl RawMode {
    fn enable() -> io::Result<Self> {
        Ok(RawMode)
    }
}

/// What one read from the terminal means for the input loop.
#[derive(Debug, PartialEq, Eq)]
enum ReadOutcome {
    Bytes(usize),
    Retry,
    /// End of input or an unrecoverable error.
    Closed,
}

impl From<io::Result<usize>> for ReadOutcome {
    fn from(result: io::Result<usize>) -> Self {
        match result {
            Ok(0) => ReadOutcome::Closed,
            Ok(n) => ReadOutcome::Bytes(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => ReadOutcome::Retry,
            Err(err) => {
                tracing::warn!(%err, "reading input failed");
                ReadOutcome::Closed
            }
        }
    }
}

/// Unbuffered terminal input that can wait for a key with a timeout.
#[cfg(unix)]
struct Input {
    fd: libc::c_int,
}

#[cfg(unix)]
impl Input {
    fn stdin() -> Self {
        use std::os::unix::io::AsRawFd;
        Self::from_fd(io::stdin().as_raw_fd())
    }

    fn from_fd(fd: libc::c_int) -> Self {
        Self { fd }
    }

    /// True once a read would not block: bytes are pending or the input
    /// has closed. False when `timeout` passes first.
    fn wait(&self, timeout: Duration) -> io::Result<bool> {
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `pfd` is a single valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(rc > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

// Without poll the loop blocks on each key, so the idle display only
// refreshes on input.
#[cfg(not(unix))]
struct Input;

#[cfg(not(unix))]
impl Input {
    fn stdin() -> Self {
        Input
    }

    fn wait(&self, _timeout: Duration) -> io::Result<bool> {
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut io::stdin(), buf)
    }
}

// =============================================================================
// Headless mode
// =============================================================================

#[derive(Debug, Default)]
struct Summary {
    moves: u64,
    currency: u64,
    asleep: u32,
    stuck: u32,
    unfinished: u32,
    max_tile: u32,
}

/// Play `episodes` games to their first halt, claiming the reward each time.
fn run_headless(args: &Args, episodes: u32) {
    let mut summary = Summary::default();
    let mut policy_rng = SmallRng::seed_from_u64(args.seed.wrapping_add(1000));

    for episode in 0..episodes {
        let mut game = Game::in_memory(args.seed.wrapping_add(u64::from(episode)));
        let mut steps = 0;
        let mut cycle = 0;

        while game.view().controls_enabled && (args.max_steps == 0 || steps < args.max_steps) {
            let action = match args.policy {
                Policy::Random => select_random_direction(&game, &mut policy_rng),
                Policy::Cycle => select_cycle_direction(&game, &mut cycle),
            };
            let Some(dir) = action else { break };
            game.submit_move(dir);
            steps += 1;

            if args.verbose {
                println!("Episode {} Step {}: {:?}", episode + 1, steps, dir);
                println!("{game}");
            }
        }

        summary.max_tile = summary.max_tile.max(game.grid().max_tile());
        match game.view().companion {
            CompanionState::Asleep => summary.asleep += 1,
            CompanionState::Stuck => summary.stuck += 1,
            _ => summary.unfinished += 1,
        }
        game.claim_reward_with_idle(0);
        summary.moves += u64::from(steps);
        summary.currency += game.view().currency;

        if args.verbose {
            println!(
                "Episode {}: currency={}, companion={}, steps={}",
                episode + 1,
                game.view().currency,
                game.view().companion,
                steps
            );
        }
    }

    println!("=== Simulation Results ===");
    println!("episodes={}", episodes);
    println!("policy={:?}", args.policy);
    println!("seed={}", args.seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_moves={:.2}", summary.moves as f64 / f64::from(episodes.max(1)));
    println!("total_currency={}", summary.currency);
    println!("asleep={}", summary.asleep);
    println!("stuck={}", summary.stuck);
    println!("unfinished={}", summary.unfinished);
    println!("max_tile_overall={}", summary.max_tile);
}

/// A random direction that changes the board.
fn select_random_direction<S: SaveStore>(game: &Game<S>, rng: &mut SmallRng) -> Option<Direction> {
    let legal: Vec<Direction> = Direction::all()
        .into_iter()
        .filter(|&d| game.grid().can_move(d))
        .collect();
    legal.choose(rng).copied()
}

/// The next direction in Left, Down, Right, Up order that changes the board.
fn select_cycle_direction<S: SaveStore>(game: &Game<S>, cycle: &mut usize) -> Option<Direction> {
    let order = [Direction::Left, Direction::Down, Direction::Right, Direction::Up];
    for _ in 0..order.len() {
        let dir = order[*cycle % order.len()];
        *cycle += 1;
        if game.grid().can_move(dir) {
            return Some(dir);
        }
    }
    None
}
