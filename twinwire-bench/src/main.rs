//! Twinwire bench
//!
//! Brings up the simulated accelerometer/gyroscope over the simulated bus
//! and reports what happened. Bus and device parameters come from
//! bench.toml, validated at build time.

use std::process::ExitCode;

use embedded_hal::i2c::I2c;
use twinwire_core::sequencer::registers::reg;
use twinwire_core::sequencer::{
    SequenceStatus, Sequencer, SequencerConfig, StepStatus, DEFAULT_STEPS,
};
use twinwire_core::{BusTiming, MasterConfig};
use twinwire_sim::{SimPeripheral, Testbench};

mod bench_config {
    include!(concat!(env!("OUT_DIR"), "/bench_config.rs"));
}

use bench_config::*;

fn main() -> ExitCode {
    let timing = match BusTiming::new(TIMEBASE_MHZ, SCL_KHZ) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("invalid bus timing: {:?}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut config = MasterConfig::new(timing);
    if RESET_ACTIVE_LOW {
        config = config.active_low_reset();
    }

    let sequence = match SequencerConfig::new(DEVICE_ADDRESS, &DEFAULT_STEPS) {
        Ok(c) => c.with_retries(RETRIES),
        Err(e) => {
            eprintln!("invalid sequence: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "bus: {} MHz timebase, {} Hz clock, period {} ticks (duty {}, start/stop {}, data {})",
        TIMEBASE_MHZ,
        timing.scl_hz(TIMEBASE_MHZ),
        timing.period(),
        timing.duty(),
        timing.start_stop(),
        timing.data_point()
    );

    let device = SimPeripheral::accelerometer(DEVICE_ADDRESS, DEVICE_IDENTITY);
    let mut bench = Testbench::new(config, device);
    let mut sequencer = Sequencer::new(sequence);

    let ticks = match bench.run_sequencer(&mut sequencer) {
        Ok(ticks) => ticks,
        Err(e) => {
            eprintln!("sequence stalled: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for (i, (step, status)) in sequencer
        .config()
        .steps()
        .iter()
        .zip(sequencer.statuses())
        .enumerate()
    {
        let mark = match status {
            StepStatus::Passed => "ok",
            StepStatus::Failed => "FAIL",
            StepStatus::Active => "..",
            StepStatus::Pending => "--",
        };
        println!("step {}: {:<4} {:?}", i, mark, step);
    }
    println!("indicators: {:05b}", sequencer.indicators());
    println!(
        "elapsed: {} ticks ({} us), {} bus violations",
        ticks,
        ticks / u64::from(TIMEBASE_MHZ),
        bench.monitor().violations()
    );

    match sequencer.status() {
        SequenceStatus::Complete => {}
        SequenceStatus::Running => {
            eprintln!("sequence did not finish");
            return ExitCode::FAILURE;
        }
        SequenceStatus::Failed { step, error } => {
            eprintln!("step {} failed: {:?}", step, error);
            return ExitCode::FAILURE;
        }
    }

    // readings: identity, accelerometer burst, gyroscope burst
    let readings = sequencer.readings();
    println!("identity: {:#04x}", readings[0]);
    print_axes("accel", &readings[1..7]);
    print_axes("gyro", &readings[7..13]);

    // Same device through the embedded-hal interface
    let mut who_am_i = [0u8; 1];
    match bench.write_read(DEVICE_ADDRESS, &[reg::WHO_AM_I], &mut who_am_i) {
        Ok(()) => println!("who_am_i via embedded-hal: {:#04x}", who_am_i[0]),
        Err(e) => {
            eprintln!("who_am_i via embedded-hal failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

/// Print a three-axis sample (big-endian pairs)
fn print_axes(label: &str, bytes: &[u8]) {
    let axes: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    println!("{}: {:?}", label, axes);
}
