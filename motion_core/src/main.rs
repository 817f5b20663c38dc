//! # Motion Core Simulation Harness
//!
//! Drives a [`motion_core::MotionCore`] against fake SPI rounds and a
//! software step driver/encoder pair, the way the teacher's control unit
//! binary drives its control loop against shared-memory segments instead of
//! real hardware. Only built with `--features sim`; the library target
//! builds unconditionally without pulling in `clap` or `tracing-subscriber`.

#[cfg(feature = "sim")]
fn main() {
    sim::run();
}

#[cfg(not(feature = "sim"))]
fn main() {
    eprintln!(
        "motion_core was built without the `sim` feature; there is nothing to run.\n\
         Rebuild with `--features sim` to run the simulation harness."
    );
    std::process::exit(1);
}

#[cfg(feature = "sim")]
mod sim {
    use std::thread;
    use std::time::Duration;

    use clap::Parser;
    use tracing::{info, warn};

    use motion_common::consts::*;
    use motion_core::config::{load_config, LoadedConfig};
    use motion_core::core::MotionCore;
    use motion_core::frame::*;
    use motion_core::hal::{SimEncoderSource, SimStepDriver, TelemetrySink};

    /// Forwards [`TelemetrySink`] calls onto `tracing`, in place of the
    /// out-of-scope CSV/binary telemetry emitter (§1, §7).
    struct TracingTelemetrySink;

    impl TelemetrySink for TracingTelemetrySink {
        fn log_event(&mut self, message: &str) {
            info!(target: "motion_core::telemetry", "{message}");
        }

        fn log_error(&mut self, tag: &'static str, message: &str) {
            warn!(target: "motion_core::telemetry", tag, "{message}");
        }
    }

    #[derive(Parser, Debug)]
    #[command(
        name = "motion_core",
        about = "Runs the motion core's step/control tick loop against a simulated SPI host"
    )]
    struct Cli {
        /// Optional TOML config file; unset fields fall back to firmware defaults.
        #[arg(long)]
        config: Option<std::path::PathBuf>,

        /// Number of control ticks (1 kHz by default) to simulate.
        #[arg(long, default_value_t = 4_000)]
        ticks: u64,

        /// Per-axis step count for the single demo move this harness enqueues.
        #[arg(long, default_value_t = 4_000)]
        steps: u32,

        /// Control tick at which to assert E-STOP; omit to run without one.
        #[arg(long)]
        estop_at: Option<u64>,

        /// Real-time pacing between control ticks; 0 runs as fast as possible.
        #[arg(long, default_value_t = false)]
        no_sleep: bool,
    }

    /// Lays `frame` into a poll-filled RX window, matching what the host's
    /// DMA buffer looks like mid-transaction (§4.8).
    fn rx_window(frame: &[u8]) -> [u8; MAX_FRAME_LEN] {
        let mut rx = [POLL_BYTE_PRIMARY; MAX_FRAME_LEN];
        rx[..frame.len()].copy_from_slice(frame);
        rx
    }

    fn poll_window() -> [u8; MAX_FRAME_LEN] {
        [POLL_BYTE_PRIMARY; MAX_FRAME_LEN]
    }

    pub fn run() {
        tracing_subscriber::fmt::init();
        let cli = Cli::parse();

        let config = match &cli.config {
            Some(path) => load_config(path).unwrap_or_else(|e| {
                warn!("failed to load {}: {e}; using defaults", path.display());
                LoadedConfig::default()
            }),
            None => LoadedConfig::default(),
        };

        info!(
            step_tick_hz = config.step_tick_hz,
            control_tick_hz = config.control_tick_hz,
            max_sps = config.max_sps(),
            "motion core simulation starting"
        );

        let mut core = MotionCore::new(
            config.clone(),
            Box::new(SimStepDriver::new()),
            Box::new(SimEncoderSource::default()),
            Box::new(TracingTelemetrySink),
        );

        let add_req = MoveQueueAddReq {
            frame_id: 0x01,
            dir_mask: 0b111,
            v: [u16::MAX, u16::MAX, u16::MAX],
            steps: [cli.steps; NUM_AXES],
            kp: [256, 256, 256],
            ki: [0, 0, 0],
            kd: [0, 0, 0],
        };
        let mut add_buf = [0u8; MoveQueueAddReq::WIRE_LEN];
        add_req.encode(&mut add_buf).expect("demo request encodes");
        let mut tx = [0u8; MAX_FRAME_LEN];
        core.spi_round(&rx_window(&add_buf), &mut tx);
        info!("enqueued demo move: {} steps/axis", cli.steps);

        let start_req = [REQ_HEADER, OP_START_MOVE, 0x01, REQ_TAIL];
        core.spi_round(&rx_window(&start_req), &mut tx);
        info!(state = ?core.motion_state(), "move started");

        let step_ticks_per_control_tick = (config.step_tick_hz / config.control_tick_hz).max(1);
        let period = Duration::from_nanos(1_000_000_000 / config.control_tick_hz as u64);

        for tick in 0..cli.ticks {
            if Some(tick) == cli.estop_at {
                core.assert_estop();
                warn!(tick, "E-STOP asserted by harness schedule");
            }

            core.control_tick();
            for _ in 0..step_ticks_per_control_tick {
                core.step_tick();
            }
            core.spi_round(&poll_window(), &mut tx);

            if tick % 500 == 0 {
                info!(
                    tick,
                    state = ?core.motion_state(),
                    safety = ?core.safety_state(),
                    queue_len = core.queue_len(),
                    "tick report"
                );
            }

            if core.motion_state() == motion_common::state::MotionState::Done {
                info!(tick, "move reached natural completion");
                break;
            }

            if !cli.no_sleep {
                thread::sleep(period);
            }
        }

        info!("motion core simulation finished");
    }
}
