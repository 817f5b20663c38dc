//! Control-tick micro-benchmark.
//!
//! Measures [`RampPlanner::control_tick`] — master selection, error
//! throttle, position loop, and trapezoidal ramp for all three axes in one
//! call — against the 1 kHz control-tick budget (§5).

use criterion::{criterion_group, criterion_main, Criterion};

use motion_common::types::MoveSegment;
use motion_core::encoder::EncoderTracker;
use motion_core::executor::SegmentExecutor;
use motion_core::hal::SimEncoderSource;
use motion_core::position_loop::PositionLoop;
use motion_core::ramp::{RampConfig, RampPlanner};

fn ramp_config() -> RampConfig {
    RampConfig {
        max_sps: 25_000,
        step_tick_hz: 50_000,
        base_steps_per_rev: 400,
        enc_counts_per_rev: [4000, 4000, 4000],
        pi_deadband_steps: 10,
        pi_i_clamp: 200_000,
        pi_shift: 8,
        pi_deriv_alpha: 8,
        err_throttle_threshold: 200,
        err_throttle_min_permille: 250,
    }
}

fn bench_control_tick(c: &mut Criterion) {
    let planner = RampPlanner::new(ramp_config());
    let mut executor = SegmentExecutor::new();
    let mut position_loop = PositionLoop::new();
    let mut encoders = EncoderTracker::new();
    let encoder_source = SimEncoderSource::default();
    encoders.seed(&encoder_source);

    let seg = MoveSegment {
        frame_id: 1,
        dir_mask: 0b111,
        v_k_sps: [25, 25, 25],
        steps: [1_000_000, 1_000_000, 1_000_000],
        kp: [256, 256, 256],
        ki: [16, 16, 16],
        kd: [0, 0, 0],
    };
    executor.begin_segment(seg, 25_000, 200_000, 2, 2, false, &mut position_loop);

    let queue_rem = [0u32, 0, 0];

    c.bench_function("control_tick_three_axes", |b| {
        b.iter(|| {
            planner.control_tick(&mut executor, &queue_rem, &encoders, &mut position_loop, true);
        });
    });
}

criterion_group!(benches, bench_control_tick);
criterion_main!(benches);
