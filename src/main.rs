//! CLI driver for the NSF interpreter.
//!
//! Loads an NSF file, prints its header, and steps the interpreter to an
//! instruction budget with optional pacing, per-instruction register
//! tracing, and a post-run memory dump. Wall-clock pacing and the stop
//! condition live here; the library underneath just executes instructions.

use clap::Parser;
use rustnsf::player::Player;
use std::fs;
use std::process;
use std::thread;
use std::time::Duration;

/// Bytes shown per row of a memory dump.
const DUMP_ROW: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "rustnsf")]
#[command(version)]
#[command(about = "NSF (NES Sound Format) 6502 interpreter driver", long_about = None)]
struct Args {
    /// NSF file to load
    file: String,

    /// 1-based song number (the header's starting song when omitted)
    #[arg(short, long)]
    song: Option<u8>,

    /// Stop after this many executed instructions
    #[arg(long, default_value_t = 1_000_000)]
    steps: u64,

    /// Pace execution at roughly N instructions per second
    #[arg(long, value_name = "HZ")]
    rate: Option<u64>,

    /// Print a register line after every instruction
    #[arg(long)]
    trace: bool,

    /// Hex-dump a memory window after the run, e.g. --dump 0200:0240
    #[arg(long, value_name = "START:END")]
    dump: Option<String>,
}

fn main() {
    let args = Args::parse();

    let dump_range = match args.dump.as_deref().map(parse_range).transpose() {
        Ok(range) => range,
        Err(e) => {
            eprintln!("Bad --dump argument: {}", e);
            process::exit(1);
        }
    };

    let bytes = match fs::read(&args.file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", args.file, e);
            process::exit(1);
        }
    };

    let mut player = Player::new();
    let result = match args.song {
        Some(song) => player.load_song(&bytes, song),
        None => player.load(&bytes),
    };
    if let Err(e) = result {
        eprintln!("Error loading {}: {}", args.file, e);
        process::exit(1);
    }

    print_header(&player, &args.file);

    if args.trace {
        player.subscribe(|regs| println!("{}", regs));
    }

    let pace = args
        .rate
        .filter(|&hz| hz > 0)
        .map(|hz| Duration::from_secs_f64(1.0 / hz as f64));

    for _ in 0..args.steps {
        if let Err(e) = player.step() {
            eprintln!(
                "CPU fault after {} instructions: {}",
                player.instruction_count(),
                e
            );
            process::exit(1);
        }
        if let Some(interval) = pace {
            thread::sleep(interval);
        }
    }

    println!();
    println!("Stopped after {} instructions", player.instruction_count());
    println!("Play routine entered {} times", player.play_calls());
    println!("Final state: {}", player.registers());

    if let Some((start, end)) = dump_range {
        println!();
        dump_memory(&player, start, end);
    }
}

fn print_header(player: &Player, path: &str) {
    // load() succeeded, so the metadata is present.
    let Some(nsf) = player.nsf() else { return };

    println!("Successfully loaded NSF: {}", path);
    println!("Title:     {}", nsf.title);
    println!("Artist:    {}", nsf.artist);
    println!("Copyright: {}", nsf.copyright);
    println!(
        "Songs: {} (starting at {})",
        nsf.total_songs, nsf.starting_song
    );
    println!(
        "Load ${:04X}  Init ${:04X}  Play ${:04X}",
        nsf.load_addr, nsf.init_addr, nsf.play_addr
    );
    println!(
        "Tick: {} us ({})",
        nsf.play_speed_us(),
        if nsf.is_dual_region() {
            "dual region, driving NTSC"
        } else if nsf.is_pal() {
            "PAL"
        } else {
            "NTSC"
        }
    );
    let chips = nsf.expansion_chips();
    if !chips.is_empty() {
        println!("Expansion chips: {} (not simulated)", chips.join(", "));
    }
    if nsf.uses_bankswitching() {
        println!("Warning: tune uses bankswitching, which is not supported");
    }
}

/// Parse "START:END" with hex bounds (an optional 0x or $ prefix is
/// accepted).
fn parse_range(arg: &str) -> Result<(u16, u16), String> {
    let (start, end) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {:?}", arg))?;
    Ok((parse_addr(start)?, parse_addr(end)?))
}

fn parse_addr(text: &str) -> Result<u16, String> {
    let digits = text.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("bad address {:?}: {}", text, e))
}

fn dump_memory(player: &Player, start: u16, end: u16) {
    let window = player.memory_window(start, end);
    for (i, row) in window.chunks(DUMP_ROW).enumerate() {
        let addr = start as usize + i * DUMP_ROW;
        let hex: Vec<String> = row.iter().map(|b| format!("{:02X}", b)).collect();
        println!("{:04X}: {}", addr, hex.join(" "));
    }
}
