//! SC/MP Emulator - CLI Entry Point
//!
//! Commands:
//! - `scmp-emu run` - Run the board headless for a number of frames
//! - `scmp-emu panel` - Interactive terminal front panel
//! - `scmp-emu pcm <widths>` - Convert recorded F1 pulses to audio
//! - `scmp-emu config` - Print the default machine profile

use clap::{Parser, Subcommand};
use scmp::{Machine, MachineConfig, RomImage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scmp-emu")]
#[command(version)]
#[command(about = "An emulator of the Elektor SC/MP trainer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by the commands that build a machine.
#[derive(clap::Args)]
struct BoardArgs {
    /// Machine profile (JSON); defaults to the Elbug monitor layout
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Extra ROM image, as PATH@ADDR[:LEN] in hex (e.g. CLOCK.ROM@f00:c0)
    #[arg(short, long = "rom")]
    roms: Vec<String>,
    /// Do not load the profile's ROMs, only those given with --rom
    #[arg(long)]
    no_default_roms: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the board without a display and print the result
    Run {
        #[command(flatten)]
        board: BoardArgs,
        /// Number of display frames to run
        #[arg(short, long, default_value = "250")]
        frames: u64,
        /// Hex key or command key (C0-C7) to hold during the run
        #[arg(short, long)]
        key: Option<String>,
        /// Write F1 pulse widths here, one per line ("-" for stdout)
        #[arg(short, long)]
        pulses: Option<PathBuf>,
    },
    /// Interactive terminal front panel
    Panel {
        #[command(flatten)]
        board: BoardArgs,
    },
    /// Convert F1 pulse widths to 44.1 kHz signed 8-bit audio
    Pcm {
        /// Pulse width file written by `run --pulses`
        input: PathBuf,
        /// Output file; a .wav extension writes a WAV file, anything else raw PCM
        #[arg(short, long, default_value = "audio.pcm")]
        output: PathBuf,
    },
    /// Print the default machine profile as JSON
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scmp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { board, frames, key, pulses }) => {
            run_headless(&board, frames, key.as_deref(), pulses);
        }
        Some(Commands::Panel { board }) => {
            run_panel(&board);
        }
        Some(Commands::Pcm { input, output }) => {
            convert_pulses(&input, &output);
        }
        Some(Commands::Config) => {
            println!("{}", MachineConfig::default().to_json());
        }
        None => {
            println!("SC/MP Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("An emulator of the Elektor SC/MP trainer");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

fn build_machine(board: &BoardArgs) -> Machine {
    let mut config = match &board.config {
        Some(path) => MachineConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => MachineConfig::default(),
    };

    if board.no_default_roms {
        config.roms.clear();
    }
    for spec in &board.roms {
        config.roms.push(RomImage::parse(spec).unwrap_or_else(|e| fail(e)));
    }

    Machine::with_roms(config).unwrap_or_else(|e| fail(e))
}

fn parse_key(text: &str) -> Option<scmp::keypad::Key> {
    use scmp::keypad::{CommandKey, Key};

    let upper = text.to_ascii_uppercase();
    match upper.strip_prefix('C') {
        Some(n) if upper.len() == 2 => {
            let index: usize = n.parse().ok()?;
            CommandKey::ALL.get(index).map(|&cmd| Key::Command(cmd))
        }
        _ if text.chars().count() == 1 => text.chars().next().and_then(Key::from_char),
        _ => None,
    }
}

fn run_headless(board: &BoardArgs, frames: u64, key: Option<&str>, pulses: Option<PathBuf>) {
    let mut machine = build_machine(board);

    if let Some(text) = key {
        let key = parse_key(text).unwrap_or_else(|| fail(format!("unknown key '{}'", text)));
        machine.press_key(key);
    }

    let executed = machine.run_frames(frames);

    println!("━━━ Display ━━━");
    for row in scmp::display::render(machine.display()) {
        println!("{}", row);
    }
    println!();
    println!("━━━ Result ━━━");
    let cpu = &machine.cpu;
    println!("Frames:       {}", machine.frames());
    println!("Instructions: {}", executed);
    println!("Microcycles:  {}", cpu.cycles);
    println!("State:        {:?}", cpu.state);
    println!("Display:      [{}]", scmp::display::to_text(machine.display()));
    println!("PC {:04X}  P1 {:04X}  P2 {:04X}  P3 {:04X}", cpu.regs.pc, cpu.regs.p1, cpu.regs.p2, cpu.regs.p3);
    println!("AC {:02X}    E {:02X}    SR {}", cpu.regs.ac, cpu.regs.e, cpu.regs.status);

    if let Some(path) = pulses {
        let widths = machine.take_pulses();
        let result = if path.as_os_str() == "-" {
            scmp::audio::write_widths(std::io::stdout().lock(), &widths)
        } else {
            std::fs::File::create(&path)
                .map(std::io::BufWriter::new)
                .and_then(|file| scmp::audio::write_widths(file, &widths))
        };
        if let Err(e) = result {
            fail(format!("failed to write pulses: {}", e));
        }
        tracing::info!(count = widths.len(), "wrote F1 pulse widths");
    }
}

#[cfg(feature = "tui")]
fn run_panel(board: &BoardArgs) {
    let machine = build_machine(board);
    if let Err(e) = scmp::run_panel(machine) {
        fail(format!("front panel error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn run_panel(_board: &BoardArgs) {
    fail("built without the `tui` feature");
}

fn convert_pulses(input: &PathBuf, output: &PathBuf) {
    use scmp::audio;

    println!("🔊 Converting: {} → {}", input.display(), output.display());

    let file = std::fs::File::open(input).unwrap_or_else(|e| fail(e));
    let samples = audio::widths_to_pcm(std::io::BufReader::new(file)).unwrap_or_else(|e| fail(e));

    let is_wav = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    let result = if is_wav {
        audio::write_wav(output, &samples)
    } else {
        audio::write_raw(output, &samples)
    };
    if let Err(e) = result {
        fail(e);
    }

    println!("✓ {} samples ({:.2} s)", samples.len(), samples.len() as f64 / f64::from(audio::SAMPLE_RATE));
}
