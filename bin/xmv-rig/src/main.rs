use clap::Parser;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xmv_seq::{ExternalRef, FailSafe, MemorySequencer, RefKind};
use xmv_sim::{HostIndicator, HostPlatform, SimFlash};

const STRING_OFFSET: u32 = 0x9000;
const FUNCTION_OFFSET: u32 = 0x9100;

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{}: {}", s, e))
}

#[derive(Parser)]
#[command(about = "External memory validation rig: erase/write/verify a simulated \
NOR device, enter mapped mode, and exercise symbols placed in the mapped window.")]
struct Cli {
    /// Mapped base address of the device.
    #[arg(long, value_parser = parse_u32, default_value = "0x18000000")]
    base: u32,

    /// Device size in bytes.
    #[arg(long, value_parser = parse_u32, default_value = "0x100000")]
    size: u32,

    /// Erase unit in bytes.
    #[arg(long, value_parser = parse_u32, default_value = "0x1000")]
    erase_unit: u32,

    /// Alive indicator toggle period.
    #[arg(long, default_value_t = 1000)]
    alive_period_ms: u32,

    /// Make the erase call fail with this status code.
    #[arg(long, value_parser = parse_u32)]
    fail_erase: Option<u32>,

    /// Make the mapped-mode transition fail with this status code.
    #[arg(long, value_parser = parse_u32)]
    fail_mapped: Option<u32>,

    /// Pin this byte of the verify window to 0x00.
    #[arg(long)]
    stuck_byte: Option<usize>,

    /// Pin a random byte of the verify window to 0x00.
    #[arg(long)]
    random_stuck_byte: bool,

    /// Point the string reference below the mapped window.
    #[arg(long)]
    misplace_string: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    info!(">>> XMV RIG: external flash access in mapped mode <<<");

    let mut flash = SimFlash::new(cli.base, cli.size, cli.erase_unit)?;

    let string_addr = flash.place_data(STRING_OFFSET, b"Hello from the external string!\0")?;
    let function_addr = flash.place_code(FUNCTION_OFFSET, || {
        info!("Hello from the external function!");
    })?;

    if let Some(code) = cli.fail_erase {
        flash.inject_erase_failure(code);
    }
    if let Some(code) = cli.fail_mapped {
        flash.inject_mode_failure(code);
    }
    if cli.stuck_byte.is_some() || cli.random_stuck_byte {
        flash.inject_stuck_byte(cli.stuck_byte);
    }

    let string_addr = if cli.misplace_string {
        // Deliberately broken placement, as a mislinked image would produce.
        cli.base.wrapping_sub(4)
    } else {
        string_addr
    };

    let refs = [
        ExternalRef { label: "external string", addr: string_addr, kind: RefKind::Data },
        ExternalRef { label: "external function", addr: function_addr, kind: RefKind::Code },
    ];

    let failsafe = FailSafe::new(Box::new(HostIndicator::new()), Box::new(HostPlatform));
    let mut seq = MemorySequencer::new(Box::new(flash), failsafe)
        .with_alive_period(cli.alive_period_ms);

    seq.run(&refs);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received. Stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    // Steady state: nothing left to validate, just prove liveness.
    while running.load(Ordering::SeqCst) {
        seq.alive_tick();
    }
    Ok(())
}
