//! MotionCore: the orchestrator tying every module to the protocol and
//! motion state machines (§4.3, §4.9, §4.10). Owns all per-instance state;
//! the boundary collaborators (GPIO/timer, encoder counters, telemetry) are
//! injected as trait objects at construction, the way the teacher's control
//! unit takes its driver registry and telemetry sink at startup rather than
//! reaching for globals.

use motion_common::consts::*;
use motion_common::state::{MotionState, SafetyState};
use motion_common::types::{decode_microsteps, MoveSegment};

use crate::config::LoadedConfig;
use crate::dda::{DdaStepEngine, DdaTiming};
use crate::encoder::EncoderTracker;
use crate::executor::SegmentExecutor;
use crate::fifo::{PopOutcome, PushOutcome, ResponseFifo, SpiRxQueue};
use crate::frame::*;
use crate::hal::{EncoderSource, StepDriver, TelemetrySink};
use crate::position_loop::PositionLoop;
use crate::queue::{MoveQueue, QueuePushOutcome};
use crate::ramp::{RampConfig, RampPlanner};
use crate::router::Router;
use crate::safety::SafetyGate;
use crate::transport::{OverflowReason, SpiTransport};

fn saturate_i8(v: i32) -> i8 {
    v.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// All motion/protocol state for one device instance. Generic over nothing —
/// the out-of-scope collaborators are boxed trait objects, owned once at
/// construction and never reallocated afterwards (§5: allocation happens at
/// init, not in the step/control tick hot paths).
pub struct MotionCore {
    config: LoadedConfig,
    motion_state: MotionState,
    safety: SafetyGate,
    queue: MoveQueue,
    executor: SegmentExecutor,
    position_loop: PositionLoop,
    ramp: RampPlanner,
    dda: DdaStepEngine,
    encoders: EncoderTracker,
    resp_fifo: ResponseFifo,
    rx_queue: SpiRxQueue,
    transport: SpiTransport,
    step_driver: Box<dyn StepDriver>,
    encoder_source: Box<dyn EncoderSource>,
    telemetry: Box<dyn TelemetrySink>,
}

impl MotionCore {
    pub fn new(
        config: LoadedConfig,
        step_driver: Box<dyn StepDriver>,
        encoder_source: Box<dyn EncoderSource>,
        telemetry: Box<dyn TelemetrySink>,
    ) -> Self {
        let ramp_config = RampConfig {
            max_sps: config.max_sps(),
            step_tick_hz: config.step_tick_hz,
            base_steps_per_rev: config.base_steps_per_rev,
            enc_counts_per_rev: config.enc_counts_per_rev,
            pi_deadband_steps: config.pi_deadband_steps,
            pi_i_clamp: config.pi_i_clamp,
            pi_shift: config.pi_shift,
            pi_deriv_alpha: PI_DERIV_FILTER_ALPHA,
            err_throttle_threshold: config.err_throttle_threshold,
            err_throttle_min_permille: config.err_throttle_min_permille,
        };
        let dda_timing = DdaTiming {
            step_high_ticks_min: config.step_high_ticks,
            step_low_ticks_min: config.step_low_ticks,
        };
        let mut encoders = EncoderTracker::new();
        encoders.seed(encoder_source.as_ref());

        MotionCore {
            transport: SpiTransport::new(config.tx_layout_policy),
            ramp: RampPlanner::new(ramp_config),
            dda: DdaStepEngine::new(dda_timing),
            config,
            motion_state: MotionState::Idle,
            safety: SafetyGate::new(),
            queue: MoveQueue::new(),
            executor: SegmentExecutor::new(),
            position_loop: PositionLoop::new(),
            encoders,
            resp_fifo: ResponseFifo::new(),
            rx_queue: SpiRxQueue::new(),
            step_driver,
            encoder_source,
            telemetry,
        }
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion_state
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn queue_rem(&self) -> [u32; NUM_AXES] {
        [
            self.queue.queue_rem_steps(0),
            self.queue.queue_rem_steps(1),
            self.queue.queue_rem_steps(2),
        ]
    }

    fn push_response(&mut self, buf: &[u8], len: usize) {
        if self.resp_fifo.push(buf, len) != PushOutcome::Ok {
            self.telemetry
                .log_error("overflow", "response fifo full, response dropped");
        }
    }

    fn arm_drivers(&mut self) {
        for axis in 0..NUM_AXES {
            let a = self.executor.axis(axis);
            self.step_driver.set_dir(axis, a.dir_forward);
            self.step_driver.set_enable(axis, a.total_steps > 0);
        }
    }

    /// §4.3: `QUEUED|IDLE|DONE -> RUNNING`, loading the next queued segment
    /// if none is already active.
    fn try_start_move(&mut self) -> (StartMoveStatus, u8) {
        if self.safety.admit().is_err() {
            self.telemetry
                .log_error("range_error", "start_move: blocked by safety interlock");
            return (StartMoveStatus::Ignored, self.queue.len() as u8);
        }
        if !matches!(
            self.motion_state,
            MotionState::Queued | MotionState::Idle | MotionState::Done
        ) {
            return (StartMoveStatus::Ignored, self.queue.len() as u8);
        }
        if !self.executor.has_active_segment() {
            let Some(seg) = self.queue.pop_front() else {
                return (StartMoveStatus::Ignored, 0);
            };
            self.executor.begin_segment(
                seg,
                self.config.max_sps(),
                self.config.default_accel_sps2,
                self.config.dir_setup_ticks,
                self.config.enable_settle_ticks,
                false,
                &mut self.position_loop,
            );
            self.arm_drivers();
        }
        self.motion_state = MotionState::Running;
        (StartMoveStatus::Started, self.queue.len() as u8)
    }

    /// §4.3: host-initiated cancellation of the active move. Drops the
    /// active segment and disables drivers but does not purge `MoveQueue` —
    /// that is reserved for [`Self::assert_estop`].
    fn host_stop(&mut self) {
        self.executor.clear();
        for axis in 0..NUM_AXES {
            self.step_driver.set_enable(axis, false);
        }
        self.motion_state = MotionState::Idle;
    }

    /// §4.3: natural completion of the active segment — chain to the next
    /// queued one, or settle to DONE and emit an unsolicited `MOVE_END`.
    fn complete_segment_naturally(&mut self) {
        let frame_id = self.executor.active_frame_id();
        if let Some(next) = self.queue.pop_front() {
            let was_running = self.motion_state.is_running();
            self.executor.begin_segment(
                next,
                self.config.max_sps(),
                self.config.default_accel_sps2,
                self.config.dir_setup_ticks,
                self.config.enable_settle_ticks,
                was_running,
                &mut self.position_loop,
            );
            self.arm_drivers();
        } else {
            self.executor.clear();
            self.motion_state = MotionState::Done;
            if let Some(fid) = frame_id {
                let resp = MoveEndResp {
                    frame_id: fid,
                    status: MoveEndStatus::Natural,
                };
                let mut out = [0u8; MoveEndResp::WIRE_LEN];
                if resp.encode(&mut out).is_ok() {
                    self.push_response(&out, MoveEndResp::WIRE_LEN);
                }
            }
        }
    }

    /// §4.10: `NORMAL -> ESTOP`. Disables all drivers, drops the active
    /// segment and purges the queue, collapses motion state to IDLE, and
    /// emits `MOVE_END(emergency)` if a frame was active.
    pub fn assert_estop(&mut self) {
        self.safety.assert_estop();
        let frame_id = self.executor.active_frame_id();
        self.executor.clear();
        self.queue.clear();
        for axis in 0..NUM_AXES {
            self.step_driver.set_enable(axis, false);
        }
        self.motion_state = MotionState::Idle;
        if let Some(fid) = frame_id {
            let resp = MoveEndResp {
                frame_id: fid,
                status: MoveEndStatus::Emergency,
            };
            let mut out = [0u8; MoveEndResp::WIRE_LEN];
            if resp.encode(&mut out).is_ok() {
                self.push_response(&out, MoveEndResp::WIRE_LEN);
            }
        }
        self.telemetry.log_event("estop_asserted");
    }

    /// §4.10: `ESTOP -> RECOVERY_WAIT`.
    pub fn release_estop(&mut self) {
        self.safety.release_estop();
        self.telemetry.log_event("estop_released");
    }

    /// Step-tick entry point (§4.5, §5): advance the DDA/pulse state machine
    /// for every axis, then check for natural completion. Both halves run
    /// inside the same critical section on real hardware; here they are
    /// simply sequential, as there is no preemption to guard against.
    pub fn step_tick(&mut self) {
        for axis_idx in 0..NUM_AXES {
            self.dda.tick(
                self.executor.axis_mut(axis_idx),
                &mut *self.step_driver,
                axis_idx,
                true,
            );
        }
        if self.executor.has_active_segment() {
            let queue_rem = self.queue_rem();
            if self.executor.natural_done(true, &queue_rem) {
                self.complete_segment_naturally();
            }
        }
    }

    /// Control-tick entry point (§4.4, §4.7, §5): refresh encoder position,
    /// then run the ramp/PID/master-selection update across all axes.
    pub fn control_tick(&mut self) {
        self.encoders.update(self.encoder_source.as_ref());
        let queue_rem = self.queue_rem();
        self.ramp.control_tick(
            &mut self.executor,
            &queue_rem,
            &self.encoders,
            &mut self.position_loop,
            true,
        );
    }

    /// §4.8: one full-duplex SPI round. Scans `rx`, feeds any valid request
    /// through the router, and primes `tx` with the next pending response
    /// (if any) and the handshake status byte.
    pub fn spi_round(&mut self, rx: &[u8; MAX_FRAME_LEN], tx: &mut [u8; MAX_FRAME_LEN]) {
        let status = self.transport.process_round(rx, &mut self.rx_queue);
        if let Some(reason) = self.transport.take_rx_overflow_reason() {
            let msg = match reason {
                OverflowReason::QueueFull => "spi_round: rx queue full, frame dropped",
                OverflowReason::InvalidFrame => "spi_round: invalid frame in rx window",
            };
            self.telemetry.log_error("overflow", msg);
        }
        Router::drain_rx_queue(self);

        let mut resp_buf = [0u8; MAX_FRAME_LEN];
        let pending = match self.resp_fifo.pop(&mut resp_buf) {
            PopOutcome::Some(len) => Some(&resp_buf[..len]),
            _ => None,
        };
        self.transport.prime_tx(tx, pending, status);
    }

    pub fn log_error(&mut self, tag: &'static str, message: &str) {
        self.telemetry.log_error(tag, message);
    }

    pub fn pop_rx_frame(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.rx_queue.pop(buf) {
            PopOutcome::Some(len) => Some(len),
            _ => None,
        }
    }

    pub fn handle_move_queue_add(&mut self, buf: &[u8], len: usize) {
        let req = match MoveQueueAddReq::decode(buf, len) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry
                    .log_error(e.tag(), "move_queue_add: decode failed");
                return;
            }
        };
        let status = if self.safety.admit().is_err() {
            self.telemetry
                .log_error("range_error", "move_queue_add: blocked by safety interlock");
            MoveQueueAddStatus::Invalid
        } else {
            let seg = MoveSegment {
                frame_id: req.frame_id,
                dir_mask: req.dir_mask,
                v_k_sps: req.v,
                steps: req.steps,
                kp: req.kp,
                ki: req.ki,
                kd: req.kd,
            };
            match self.queue.push(seg) {
                QueuePushOutcome::Ok => {
                    if matches!(self.motion_state, MotionState::Idle | MotionState::Done) {
                        self.motion_state = MotionState::Queued;
                    }
                    MoveQueueAddStatus::Ok
                }
                QueuePushOutcome::Full => {
                    self.telemetry.log_error("overflow", "move_queue_add: queue full");
                    MoveQueueAddStatus::QueueFull
                }
            }
        };
        let ack = MoveQueueAddAck {
            frame_id: req.frame_id,
            status,
        };
        let mut out = [0u8; MoveQueueAddAck::WIRE_LEN];
        if ack.encode(&mut out).is_ok() {
            self.push_response(&out, MoveQueueAddAck::WIRE_LEN);
        }
    }

    pub fn handle_move_queue_status(&mut self, buf: &[u8], len: usize) {
        let req = match QueryReq::decode(buf, len, OP_MOVE_QUEUE_STATUS) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry
                    .log_error(e.tag(), "move_queue_status: decode failed");
                return;
            }
        };
        let mut pid_err = [0i8; NUM_AXES];
        let mut pct = [0u8; NUM_AXES];
        for axis in 0..NUM_AXES {
            pid_err[axis] = saturate_i8(self.position_loop.last_err(axis));
            let a = self.executor.axis(axis);
            pct[axis] = if a.total_steps > 0 {
                ((a.emitted_steps as u64 * 100) / a.total_steps as u64) as u8
            } else {
                0
            };
        }
        let resp = MoveQueueStatusResp {
            frame_id: req.frame_id,
            state: self.motion_state as u8,
            pid_err,
            pct,
        };
        let mut out = [0u8; MoveQueueStatusResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, MoveQueueStatusResp::WIRE_LEN);
        }
    }

    pub fn handle_start_move(&mut self, buf: &[u8], len: usize) {
        let req = match QueryReq::decode(buf, len, OP_START_MOVE) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry.log_error(e.tag(), "start_move: decode failed");
                return;
            }
        };
        let (status, depth) = self.try_start_move();
        let resp = StartMoveResp {
            frame_id: req.frame_id,
            status,
            depth,
        };
        let mut out = [0u8; StartMoveResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, StartMoveResp::WIRE_LEN);
        }
    }

    pub fn handle_move_end(&mut self, buf: &[u8], len: usize) {
        let req = match QueryReq::decode(buf, len, OP_MOVE_END) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry.log_error(e.tag(), "move_end: decode failed");
                return;
            }
        };
        self.host_stop();
        let resp = MoveEndResp {
            frame_id: req.frame_id,
            status: MoveEndStatus::Host,
        };
        let mut out = [0u8; MoveEndResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, MoveEndResp::WIRE_LEN);
        }
    }

    pub fn handle_led_ctrl(&mut self, buf: &[u8], len: usize) {
        let req = match LedCtrlReq::decode(buf, len) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry.log_error(e.tag(), "led_ctrl: decode failed");
                return;
            }
        };
        let resp = LedCtrlResp {
            frame_id: req.frame_id,
            led_mask: req.led_mask,
            mode: req.mode,
        };
        let mut out = [0u8; LedCtrlResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, LedCtrlResp::WIRE_LEN);
        }
    }

    pub fn handle_set_origin(&mut self, buf: &[u8], len: usize) {
        let req = match SetOriginReq::decode(buf, len) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry.log_error(e.tag(), "set_origin: decode failed");
                return;
            }
        };
        self.encoders.set_origin(req.mask, req.mode);
        let origin = [
            self.encoders.absolute(0),
            self.encoders.absolute(1),
            self.encoders.absolute(2),
        ];
        let resp = SetOriginResp {
            frame_id: req.frame_id,
            origin,
        };
        let mut out = [0u8; SetOriginResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, SetOriginResp::WIRE_LEN);
        }
    }

    pub fn handle_encoder_status(&mut self, buf: &[u8], len: usize) {
        let req = match QueryReq::decode(buf, len, OP_ENCODER_STATUS) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry
                    .log_error(e.tag(), "encoder_status: decode failed");
                return;
            }
        };
        let mut pid_err = [0i8; NUM_AXES];
        let mut abs = [0i32; NUM_AXES];
        for axis in 0..NUM_AXES {
            pid_err[axis] = saturate_i8(self.position_loop.last_err(axis));
            abs[axis] = self.encoders.absolute(axis);
        }
        // `delta` is reserved: no per-report tick-delta source is wired up
        // in this implementation (out-of-scope telemetry aggregation, §1).
        let resp = EncoderStatusResp {
            frame_id: req.frame_id,
            pid_err,
            delta: 0,
            abs,
        };
        let mut out = [0u8; EncoderStatusResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, EncoderStatusResp::WIRE_LEN);
        }
    }

    pub fn handle_set_microsteps(&mut self, buf: &[u8], len: usize) {
        let req = match SetMicrostepsReq::decode(buf, len) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry
                    .log_error(e.tag(), "set_microsteps: decode failed");
                return;
            }
        };
        let factor = decode_microsteps(req.microsteps);
        self.executor.axis_mut(req.axis as usize).microstep_factor = factor;
        let resp = SetMicrostepsResp {
            frame_id: req.frame_id,
            applied_microsteps: req.microsteps,
        };
        let mut out = [0u8; SetMicrostepsResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, SetMicrostepsResp::WIRE_LEN);
        }
    }

    pub fn handle_set_microsteps_axes(&mut self, buf: &[u8], len: usize) {
        let req = match SetMicrostepsAxesReq::decode(buf, len) {
            Ok(r) => r,
            Err(e) => {
                self.telemetry
                    .log_error(e.tag(), "set_microsteps_axes: decode failed");
                return;
            }
        };
        for axis in 0..NUM_AXES {
            let factor = decode_microsteps(req.microsteps[axis]);
            self.executor.axis_mut(axis).microstep_factor = factor;
        }
        let resp = SetMicrostepsAxesResp {
            frame_id: req.frame_id,
            applied: req.microsteps,
        };
        let mut out = [0u8; SetMicrostepsAxesResp::WIRE_LEN];
        if resp.encode(&mut out).is_ok() {
            self.push_response(&out, SetMicrostepsAxesResp::WIRE_LEN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{SimEncoderSource, SimStepDriver, SimTelemetrySink};

    fn core() -> MotionCore {
        MotionCore::new(
            LoadedConfig::default(),
            Box::new(SimStepDriver::new()),
            Box::new(SimEncoderSource::default()),
            Box::new(SimTelemetrySink::default()),
        )
    }

    fn move_queue_add_frame(frame_id: u8, steps: u32) -> ([u8; MoveQueueAddReq::WIRE_LEN], usize) {
        let req = MoveQueueAddReq {
            frame_id,
            dir_mask: 0b111,
            v: [5, 5, 5],
            steps: [steps, steps, steps],
            kp: [0, 0, 0],
            ki: [0, 0, 0],
            kd: [0, 0, 0],
        };
        let mut buf = [0u8; MoveQueueAddReq::WIRE_LEN];
        req.encode(&mut buf).unwrap();
        (buf, MoveQueueAddReq::WIRE_LEN)
    }

    /// §8 scenario 3-ish: queue admission transitions IDLE -> QUEUED, and
    /// the ACK reports OK.
    #[test]
    fn move_queue_add_transitions_to_queued_and_acks_ok() {
        let mut c = core();
        let (buf, len) = move_queue_add_frame(0x42, 1000);
        c.handle_move_queue_add(&buf, len);
        assert_eq!(c.motion_state(), MotionState::Queued);
        assert_eq!(c.queue_len(), 1);

        let mut out = [0u8; MAX_FRAME_LEN];
        assert_eq!(c.pop_rx_frame(&mut out), None); // rx_queue untouched by direct handler calls
        let mut resp = [0u8; MAX_FRAME_LEN];
        let n = c.resp_fifo.pop(&mut resp);
        match n {
            PopOutcome::Some(len) => {
                let ack = MoveQueueAddAck::decode(&resp, len).unwrap();
                assert_eq!(ack.status, MoveQueueAddStatus::Ok);
                assert_eq!(ack.frame_id, 0x42);
            }
            other => panic!("expected a queued ack, got {other:?}"),
        }
    }

    /// §8 scenario 4: a full queue ACKs `QueueFull` and does not drop the
    /// earlier entries.
    #[test]
    fn move_queue_add_rejects_when_full() {
        let mut c = core();
        for i in 0..MOVE_QUEUE_CAPACITY {
            let (buf, len) = move_queue_add_frame(i as u8, 10);
            c.handle_move_queue_add(&buf, len);
            let mut resp = [0u8; MAX_FRAME_LEN];
            c.resp_fifo.pop(&mut resp); // drain so the fifo itself never fills
        }
        assert_eq!(c.queue_len(), MOVE_QUEUE_CAPACITY);

        let (buf, len) = move_queue_add_frame(0xFF, 10);
        c.handle_move_queue_add(&buf, len);
        let mut resp = [0u8; MAX_FRAME_LEN];
        match c.resp_fifo.pop(&mut resp) {
            PopOutcome::Some(rlen) => {
                let ack = MoveQueueAddAck::decode(&resp, rlen).unwrap();
                assert_eq!(ack.status, MoveQueueAddStatus::QueueFull);
            }
            other => panic!("expected a queue-full ack, got {other:?}"),
        }
        assert_eq!(c.queue_len(), MOVE_QUEUE_CAPACITY);
    }

    fn query_frame(opcode: u8, frame_id: u8) -> [u8; QueryReq::WIRE_LEN] {
        [REQ_HEADER, opcode, frame_id, REQ_TAIL]
    }

    /// A queued short segment runs to natural completion purely by driving
    /// `step_tick`/`control_tick`, ending in DONE with an unsolicited
    /// `MOVE_END(natural)` in the response fifo.
    #[test]
    fn queued_segment_runs_to_natural_completion() {
        let mut c = core();
        let (buf, len) = move_queue_add_frame(0x01, 4);
        c.handle_move_queue_add(&buf, len);
        let mut resp = [0u8; MAX_FRAME_LEN];
        c.resp_fifo.pop(&mut resp); // drain the ADD ack

        let start = query_frame(OP_START_MOVE, 0x01);
        c.handle_start_move(&start, QueryReq::WIRE_LEN);
        c.resp_fifo.pop(&mut resp); // drain the START ack
        assert_eq!(c.motion_state(), MotionState::Running);

        for _ in 0..20_000 {
            c.control_tick();
            c.step_tick();
            if c.motion_state() == MotionState::Done {
                break;
            }
        }
        assert_eq!(c.motion_state(), MotionState::Done);

        match c.resp_fifo.pop(&mut resp) {
            PopOutcome::Some(rlen) => {
                let end = MoveEndResp::decode(&resp, rlen).unwrap();
                assert_eq!(end.status, MoveEndStatus::Natural);
                assert_eq!(end.frame_id, 0x01);
            }
            other => panic!("expected an unsolicited MOVE_END, got {other:?}"),
        }
    }

    /// §8 scenario 5: asserting E-STOP mid-move drops to IDLE deterministically
    /// and reports `MOVE_END(emergency)` for the frame that was active.
    #[test]
    fn estop_during_motion_stops_deterministically() {
        let mut c = core();
        let (buf, len) = move_queue_add_frame(0x07, 10_000);
        c.handle_move_queue_add(&buf, len);
        let mut resp = [0u8; MAX_FRAME_LEN];
        c.resp_fifo.pop(&mut resp);

        let start = query_frame(OP_START_MOVE, 0x07);
        c.handle_start_move(&start, QueryReq::WIRE_LEN);
        c.resp_fifo.pop(&mut resp);
        assert_eq!(c.motion_state(), MotionState::Running);

        c.control_tick();
        c.step_tick();

        c.assert_estop();
        assert_eq!(c.motion_state(), MotionState::Idle);
        assert_eq!(c.safety_state(), SafetyState::Estop);
        assert_eq!(c.queue_len(), 0);

        match c.resp_fifo.pop(&mut resp) {
            PopOutcome::Some(rlen) => {
                let end = MoveEndResp::decode(&resp, rlen).unwrap();
                assert_eq!(end.status, MoveEndStatus::Emergency);
                assert_eq!(end.frame_id, 0x07);
            }
            other => panic!("expected an emergency MOVE_END, got {other:?}"),
        }

        // Admission is blocked until release + one successful admission.
        let (buf2, len2) = move_queue_add_frame(0x08, 10);
        c.handle_move_queue_add(&buf2, len2);
        c.resp_fifo.pop(&mut resp);
        let ack = MoveQueueAddAck::decode(&resp, MoveQueueAddAck::WIRE_LEN).unwrap();
        assert_eq!(ack.status, MoveQueueAddStatus::Invalid);

        c.release_estop();
        assert_eq!(c.safety_state(), SafetyState::RecoveryWait);
        c.handle_move_queue_add(&buf2, len2);
        c.resp_fifo.pop(&mut resp);
        let ack = MoveQueueAddAck::decode(&resp, MoveQueueAddAck::WIRE_LEN).unwrap();
        assert_eq!(ack.status, MoveQueueAddStatus::Ok);
        assert_eq!(c.safety_state(), SafetyState::Normal);
    }

    /// A `MOVE_QUEUE_STATUS` query placed in the RX window is decoded,
    /// dispatched, and answered within the same round: `spi_round` drains
    /// the rx queue through the router before priming `tx`.
    #[test]
    fn spi_round_answers_a_status_query_in_the_same_round() {
        let mut c = core();
        let mut tx = [0u8; MAX_FRAME_LEN];
        let mut rx = [POLL_BYTE_PRIMARY; MAX_FRAME_LEN];
        rx[0] = REQ_HEADER;
        rx[1] = OP_MOVE_QUEUE_STATUS;
        rx[2] = 0x01;
        rx[3] = REQ_TAIL;
        c.spi_round(&rx, &mut tx);
        assert_eq!(tx[0], RESP_HEADER);
        assert_eq!(tx[1], OP_MOVE_QUEUE_STATUS);
        assert_eq!(tx[2], 0x01);
    }

    /// An unknown opcode is logged and dropped by the router without
    /// affecting the handshake byte for the round it arrived in (§4.9, §7).
    /// The full-queue back-pressure case (§8 scenario 6) is exercised at
    /// the `SpiTransport`/`SpiRxQueue` level directly, since `spi_round`
    /// always drains the frame it just queued before returning.
    #[test]
    fn spi_round_drops_unknown_opcode_without_affecting_handshake() {
        let mut c = core();
        let mut tx = [0u8; MAX_FRAME_LEN];
        let mut rx = [POLL_BYTE_PRIMARY; MAX_FRAME_LEN];
        rx[0] = REQ_HEADER;
        rx[1] = 0xEE; // unknown opcode
        rx[2] = 0x01;
        rx[3] = REQ_TAIL;
        c.spi_round(&rx, &mut tx);
        assert_eq!(tx[0], HANDSHAKE_READY);
    }

    #[test]
    fn set_microsteps_updates_axis_state() {
        let mut c = core();
        let req = [REQ_HEADER, OP_SET_MICROSTEPS, 0x01, 0x00, 0x00, 0x10, REQ_TAIL];
        c.handle_set_microsteps(&req, req.len());
        assert_eq!(c.executor.axis(0).microstep_factor, 16);
        let mut resp = [0u8; MAX_FRAME_LEN];
        match c.resp_fifo.pop(&mut resp) {
            PopOutcome::Some(rlen) => assert_eq!(rlen, SetMicrostepsResp::WIRE_LEN),
            other => panic!("expected a set_microsteps ack, got {other:?}"),
        }
    }

    #[test]
    fn led_ctrl_echoes_request() {
        let mut c = core();
        let req = LedCtrlReq {
            frame_id: 9,
            led_mask: 0x01,
            mode: LedMode::Blink,
            frequency_centi_hz: 200,
        };
        let mut buf = [0u8; LedCtrlReq::WIRE_LEN];
        req.encode(&mut buf).unwrap();
        c.handle_led_ctrl(&buf, LedCtrlReq::WIRE_LEN);
        let mut resp = [0u8; MAX_FRAME_LEN];
        match c.resp_fifo.pop(&mut resp) {
            PopOutcome::Some(rlen) => assert_eq!(rlen, LedCtrlResp::WIRE_LEN),
            other => panic!("expected a led_ctrl ack, got {other:?}"),
        }
    }
}
