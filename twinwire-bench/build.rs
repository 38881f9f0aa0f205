//! Build script for twinwire-bench
//!
//! - Validates bench.toml at compile time
//! - Emits the validated values as constants into OUT_DIR

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fewest timebase ticks per bus period the master accepts
const MIN_PERIOD: i64 = 8;

struct BenchConfig {
    timebase_mhz: i64,
    scl_khz: i64,
    reset_active_low: bool,
    address: i64,
    identity: i64,
    retries: i64,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=bench.toml");

    let config = load_config();
    emit_constants(&config);

    println!("cargo:warning=bench.toml validated successfully");
}

/// Read, parse and validate bench.toml
fn load_config() -> BenchConfig {
    let config_path = Path::new("bench.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bench.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The bench requires a bench.toml configuration file.             ║\n\
            ║  Please create one in the twinwire-bench directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read bench.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in bench.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    let timebase_mhz = integer(&config, "bus", "timebase_mhz", 1..=1000, &mut errors);
    let scl_khz = integer(&config, "bus", "scl_khz", 1..=1000, &mut errors);
    let reset_active_low = match config.get("bus").and_then(|b| b.get("reset_active_low")) {
        None => false,
        Some(toml::Value::Boolean(b)) => *b,
        Some(_) => {
            errors.push("[bus] reset_active_low must be true or false".to_string());
            false
        }
    };
    let address = integer(&config, "device", "address", 0..=0x7F, &mut errors);
    let identity = integer(&config, "device", "identity", 0..=0xFF, &mut errors);
    let retries = match config.get("sequence").and_then(|s| s.get("retries")) {
        None => 0,
        Some(_) => integer(&config, "sequence", "retries", 0..=0xFF, &mut errors),
    };

    // Bus clock must leave the master at least MIN_PERIOD ticks per period
    if errors.is_empty() {
        let period = 1000 * timebase_mhz / scl_khz;
        if period < MIN_PERIOD {
            errors.push(format!(
                "[bus] scl_khz {} too fast for a {} MHz timebase (period {} < {})",
                scl_khz, timebase_mhz, period, MIN_PERIOD
            ));
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid bench.toml                                       ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    BenchConfig {
        timebase_mhz,
        scl_khz,
        reset_active_low,
        address,
        identity,
        retries,
    }
}

/// Look up `[section] key` as an integer in `range`
fn integer(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    let value = match config.get(section) {
        Some(toml::Value::Table(t)) => t.get(key),
        Some(_) => {
            errors.push(format!("[{}] must be a table", section));
            return 0;
        }
        None => {
            errors.push(format!("Missing [{}] section", section));
            return 0;
        }
    };

    match value {
        Some(toml::Value::Integer(v)) if range.contains(v) => *v,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            0
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the validated values to OUT_DIR/bench_config.rs
fn emit_constants(config: &BenchConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let source = format!(
        "// Generated from bench.toml\n\
         pub const TIMEBASE_MHZ: u32 = {};\n\
         pub const SCL_KHZ: u32 = {};\n\
         pub const RESET_ACTIVE_LOW: bool = {};\n\
         pub const DEVICE_ADDRESS: u8 = {:#04x};\n\
         pub const DEVICE_IDENTITY: u8 = {:#04x};\n\
         pub const RETRIES: u8 = {};\n",
        config.timebase_mhz,
        config.scl_khz,
        config.reset_active_low,
        config.address,
        config.identity,
        config.retries,
    );
    fs::write(out_dir.join("bench_config.rs"), source).unwrap();
}
