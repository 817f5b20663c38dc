//! FrameCodec: encode/decode/validate fixed-layout binary frames with
//! parity (§4.1, §6, §8 scenarios 1-2).
//!
//! Two parity schemes are used across frame types, chosen per type and
//! documented at each `encode`/`decode` pair rather than carried as runtime
//! state, matching §4.1 ("a codec uses exactly one scheme per frame type").

use motion_common::consts::*;
use motion_common::error::CoreError;

/// Byte-XOR reduction of `buf[1..end]`, matching §4.1's "byte-XOR" scheme.
fn byte_xor(buf: &[u8], end: usize) -> u8 {
    buf[1..end].iter().fold(0u8, |acc, b| acc ^ b)
}

/// Bit-XOR reduction of `buf[1..end]`: the byte-XOR further folded down to a
/// single 0/1 parity bit (§4.1's "bit-XOR" scheme).
fn bit_xor(buf: &[u8], end: usize) -> u8 {
    byte_xor(buf, end).count_ones() as u8 & 1
}

/// Validates header, type and tail bytes and overall length for a frame
/// that is expected to be exactly `expected_len` bytes (§4.1 decode order:
/// header at offset 0, TYPE at offset 1, TAIL at `len-1`, then length).
fn validate_frame(
    buf: &[u8],
    len: usize,
    header: u8,
    tail: u8,
    expected_len: usize,
) -> Result<(), CoreError> {
    if buf.len() < expected_len {
        return Err(CoreError::ArgError("buffer too small"));
    }
    if len != expected_len {
        return Err(CoreError::FrameError("unexpected length"));
    }
    if buf[0] != header {
        return Err(CoreError::FrameError("bad header"));
    }
    if buf[len - 1] != tail {
        return Err(CoreError::FrameError("bad tail"));
    }
    Ok(())
}

fn be16(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// `MOVE_QUEUE_ADD` request payload (§3 "MoveSegment", §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveQueueAddReq {
    pub frame_id: u8,
    pub dir_mask: u8,
    pub v: [u16; NUM_AXES],
    pub steps: [u32; NUM_AXES],
    pub kp: [u16; NUM_AXES],
    pub ki: [u16; NUM_AXES],
    pub kd: [u16; NUM_AXES],
}

impl MoveQueueAddReq {
    /// `HEADER, TYPE, frameId, dirMask, v[3]:BE16, steps[3]:BE32,
    /// kp[3]:BE16, ki[3]:BE16, kd[3]:BE16, TAIL` = 41 bytes.
    pub const WIRE_LEN: usize = 41;

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_MOVE_QUEUE_ADD {
            return Err(CoreError::FrameError("unexpected type"));
        }
        let frame_id = buf[2];
        let dir_mask = buf[3];
        let mut v = [0u16; NUM_AXES];
        for (i, slot) in v.iter_mut().enumerate() {
            *slot = be16(buf[4 + i * 2], buf[5 + i * 2]);
        }
        let mut steps = [0u32; NUM_AXES];
        for (i, slot) in steps.iter_mut().enumerate() {
            *slot = be32(&buf[10 + i * 4..14 + i * 4]);
        }
        let mut kp = [0u16; NUM_AXES];
        let mut ki = [0u16; NUM_AXES];
        let mut kd = [0u16; NUM_AXES];
        let gains_start = 22;
        for (i, slot) in kp.iter_mut().enumerate() {
            *slot = be16(buf[gains_start + i * 2], buf[gains_start + 1 + i * 2]);
        }
        let ki_start = gains_start + 6;
        for (i, slot) in ki.iter_mut().enumerate() {
            *slot = be16(buf[ki_start + i * 2], buf[ki_start + 1 + i * 2]);
        }
        let kd_start = ki_start + 6;
        for (i, slot) in kd.iter_mut().enumerate() {
            *slot = be16(buf[kd_start + i * 2], buf[kd_start + 1 + i * 2]);
        }
        Ok(MoveQueueAddReq {
            frame_id,
            dir_mask,
            v,
            steps,
            kp,
            ki,
            kd,
        })
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = REQ_HEADER;
        buf[1] = OP_MOVE_QUEUE_ADD;
        buf[2] = self.frame_id;
        buf[3] = self.dir_mask;
        for (i, v) in self.v.iter().enumerate() {
            buf[4 + i * 2..6 + i * 2].copy_from_slice(&v.to_be_bytes());
        }
        for (i, s) in self.steps.iter().enumerate() {
            buf[10 + i * 4..14 + i * 4].copy_from_slice(&s.to_be_bytes());
        }
        let gains_start = 22;
        for (i, g) in self.kp.iter().enumerate() {
            buf[gains_start + i * 2..gains_start + 2 + i * 2].copy_from_slice(&g.to_be_bytes());
        }
        let ki_start = gains_start + 6;
        for (i, g) in self.ki.iter().enumerate() {
            buf[ki_start + i * 2..ki_start + 2 + i * 2].copy_from_slice(&g.to_be_bytes());
        }
        let kd_start = ki_start + 6;
        for (i, g) in self.kd.iter().enumerate() {
            buf[kd_start + i * 2..kd_start + 2 + i * 2].copy_from_slice(&g.to_be_bytes());
        }
        buf[Self::WIRE_LEN - 1] = REQ_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `MOVE_QUEUE_ADD` ACK status (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveQueueAddStatus {
    Ok = 0,
    Invalid = 1,
    QueueFull = 2,
}

/// `MOVE_QUEUE_ADD` ACK response: bit-parity, 6 bytes (§8 scenario 1).
///
/// The wire TYPE byte for this response is `0x01`, distinct from the
/// request opcode `0x00` — the one exception to "response shares the
/// request's opcode", fixed by the literal scenario 1 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveQueueAddAck {
    pub frame_id: u8,
    pub status: MoveQueueAddStatus,
}

impl MoveQueueAddAck {
    pub const WIRE_TYPE: u8 = 0x01;
    pub const WIRE_LEN: usize = 6;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = Self::WIRE_TYPE;
        buf[2] = self.frame_id;
        buf[3] = self.status as u8;
        buf[4] = bit_xor(buf, 4);
        buf[5] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, RESP_HEADER, RESP_TAIL, Self::WIRE_LEN)?;
        if buf[1] != Self::WIRE_TYPE {
            return Err(CoreError::FrameError("unexpected type"));
        }
        let status = match buf[3] {
            0 => MoveQueueAddStatus::Ok,
            1 => MoveQueueAddStatus::Invalid,
            2 => MoveQueueAddStatus::QueueFull,
            _ => return Err(CoreError::RangeError("status out of range")),
        };
        Ok(MoveQueueAddAck {
            frame_id: buf[2],
            status,
        })
    }

    pub fn check_parity(buf: &[u8], len: usize) -> bool {
        if len != Self::WIRE_LEN {
            return false;
        }
        buf[4] == bit_xor(buf, 4)
    }
}

/// LED control mode (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedMode {
    Off = 0,
    On = 1,
    Blink = 2,
}

/// `LED_CTRL` request: byte-parity, 9 bytes (§8 scenario 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCtrlReq {
    pub frame_id: u8,
    pub led_mask: u8,
    pub mode: LedMode,
    pub frequency_centi_hz: u16,
}

impl LedCtrlReq {
    pub const WIRE_LEN: usize = 9;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = REQ_HEADER;
        buf[1] = OP_LED_CTRL;
        buf[2] = self.frame_id;
        buf[3] = self.led_mask;
        buf[4] = self.mode as u8;
        buf[5..7].copy_from_slice(&self.frequency_centi_hz.to_be_bytes());
        buf[7] = byte_xor(buf, 7);
        buf[8] = REQ_TAIL;
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_LED_CTRL {
            return Err(CoreError::FrameError("unexpected type"));
        }
        let mode = match buf[4] {
            0 => LedMode::Off,
            1 => LedMode::On,
            2 => LedMode::Blink,
            _ => return Err(CoreError::RangeError("mode out of range")),
        };
        Ok(LedCtrlReq {
            frame_id: buf[2],
            led_mask: buf[3],
            mode,
            frequency_centi_hz: be16(buf[5], buf[6]),
        })
    }

    pub fn check_parity(buf: &[u8], len: usize) -> bool {
        if len != Self::WIRE_LEN {
            return false;
        }
        buf[7] == byte_xor(buf, 7)
    }

    pub fn set_parity(buf: &mut [u8], len: usize) -> Result<(), CoreError> {
        if len != Self::WIRE_LEN {
            return Err(CoreError::ArgError("unexpected length"));
        }
        buf[7] = byte_xor(buf, 7);
        Ok(())
    }
}

/// `LED_CTRL` response: byte-parity, 7 bytes, echoes the applied mask/mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCtrlResp {
    pub frame_id: u8,
    pub led_mask: u8,
    pub mode: LedMode,
}

impl LedCtrlResp {
    pub const WIRE_LEN: usize = 7;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_LED_CTRL;
        buf[2] = self.frame_id;
        buf[3] = self.led_mask;
        buf[4] = self.mode as u8;
        buf[5] = byte_xor(buf, 5);
        buf[6] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `MOVE_QUEUE_STATUS` response: bit-parity, 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveQueueStatusResp {
    pub frame_id: u8,
    pub state: u8,
    pub pid_err: [i8; NUM_AXES],
    pub pct: [u8; NUM_AXES],
}

impl MoveQueueStatusResp {
    pub const WIRE_LEN: usize = 12;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_MOVE_QUEUE_STATUS;
        buf[2] = self.frame_id;
        buf[3] = self.state;
        for (i, e) in self.pid_err.iter().enumerate() {
            buf[4 + i] = *e as u8;
        }
        for (i, p) in self.pct.iter().enumerate() {
            buf[7 + i] = *p;
        }
        buf[10] = bit_xor(buf, 10);
        buf[11] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `START_MOVE` ACK status (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StartMoveStatus {
    Started = 0,
    Ignored = 1,
}

/// `START_MOVE` response: 6 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartMoveResp {
    pub frame_id: u8,
    pub status: StartMoveStatus,
    pub depth: u8,
}

impl StartMoveResp {
    pub const WIRE_LEN: usize = 6;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_START_MOVE;
        buf[2] = self.frame_id;
        buf[3] = self.status as u8;
        buf[4] = self.depth;
        buf[5] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `MOVE_END` status (§6, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveEndStatus {
    Natural = 0,
    Host = 1,
    Emergency = 2,
}

/// `MOVE_END` response: 5 bytes, no parity. Sent both unsolicited (natural
/// completion, emergency stop) and in reply to a host `move_end` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEndResp {
    pub frame_id: u8,
    pub status: MoveEndStatus,
}

impl MoveEndResp {
    pub const WIRE_LEN: usize = 5;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_MOVE_END;
        buf[2] = self.frame_id;
        buf[3] = self.status as u8;
        buf[4] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, RESP_HEADER, RESP_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_MOVE_END {
            return Err(CoreError::FrameError("unexpected type"));
        }
        let status = match buf[3] {
            0 => MoveEndStatus::Natural,
            1 => MoveEndStatus::Host,
            2 => MoveEndStatus::Emergency,
            _ => return Err(CoreError::RangeError("status out of range")),
        };
        Ok(MoveEndResp {
            frame_id: buf[2],
            status,
        })
    }
}

/// `SET_ORIGIN` request: 6 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOriginReq {
    pub frame_id: u8,
    /// Bit `i` set = axis `i` selected (only the low 3 bits are meaningful).
    pub mask: u8,
    pub mode: u8,
}

impl SetOriginReq {
    pub const WIRE_LEN: usize = 6;

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_SET_ORIGIN {
            return Err(CoreError::FrameError("unexpected type"));
        }
        if buf[3] & !0b111 != 0 {
            return Err(CoreError::RangeError("mask has bits outside axis range"));
        }
        Ok(SetOriginReq {
            frame_id: buf[2],
            mask: buf[3],
            mode: buf[4],
        })
    }
}

/// `SET_ORIGIN` response: 16 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOriginResp {
    pub frame_id: u8,
    pub origin: [i32; NUM_AXES],
}

impl SetOriginResp {
    pub const WIRE_LEN: usize = 16;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_SET_ORIGIN;
        buf[2] = self.frame_id;
        for (i, o) in self.origin.iter().enumerate() {
            buf[3 + i * 4..7 + i * 4].copy_from_slice(&o.to_be_bytes());
        }
        buf[Self::WIRE_LEN - 1] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `ENCODER_STATUS` response: 20 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStatusResp {
    pub frame_id: u8,
    pub pid_err: [i8; NUM_AXES],
    pub delta: u8,
    pub abs: [i32; NUM_AXES],
}

impl EncoderStatusResp {
    pub const WIRE_LEN: usize = 20;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_ENCODER_STATUS;
        buf[2] = self.frame_id;
        for (i, e) in self.pid_err.iter().enumerate() {
            buf[3 + i] = *e as u8;
        }
        buf[6] = self.delta;
        for (i, a) in self.abs.iter().enumerate() {
            buf[7 + i * 4..11 + i * 4].copy_from_slice(&a.to_be_bytes());
        }
        buf[Self::WIRE_LEN - 1] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `SET_MICROSTEPS` request: 7 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMicrostepsReq {
    pub frame_id: u8,
    pub axis: u8,
    pub microsteps: u16,
}

impl SetMicrostepsReq {
    pub const WIRE_LEN: usize = 7;

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_SET_MICROSTEPS {
            return Err(CoreError::FrameError("unexpected type"));
        }
        if buf[3] as usize >= NUM_AXES {
            return Err(CoreError::RangeError("axis index out of range"));
        }
        Ok(SetMicrostepsReq {
            frame_id: buf[2],
            axis: buf[3],
            microsteps: be16(buf[4], buf[5]),
        })
    }
}

/// `SET_MICROSTEPS` response: the detailed-echo layout chosen in
/// DESIGN.md's Open Question 2 — 10 bytes, `{ms:BE16}` plus 4 reserved
/// padding bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMicrostepsResp {
    pub frame_id: u8,
    pub applied_microsteps: u16,
}

impl SetMicrostepsResp {
    pub const WIRE_LEN: usize = 10;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_SET_MICROSTEPS;
        buf[2] = self.frame_id;
        buf[3..5].copy_from_slice(&self.applied_microsteps.to_be_bytes());
        buf[5..9].fill(0);
        buf[9] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// `SET_MICROSTEPS_AXES` request: 10 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMicrostepsAxesReq {
    pub frame_id: u8,
    pub microsteps: [u16; NUM_AXES],
}

impl SetMicrostepsAxesReq {
    pub const WIRE_LEN: usize = 10;

    pub fn decode(buf: &[u8], len: usize) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != OP_SET_MICROSTEPS_AXES {
            return Err(CoreError::FrameError("unexpected type"));
        }
        let mut microsteps = [0u16; NUM_AXES];
        for (i, slot) in microsteps.iter_mut().enumerate() {
            *slot = be16(buf[3 + i * 2], buf[4 + i * 2]);
        }
        Ok(SetMicrostepsAxesReq {
            frame_id: buf[2],
            microsteps,
        })
    }
}

/// `SET_MICROSTEPS_AXES` response: 10 bytes, no parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMicrostepsAxesResp {
    pub frame_id: u8,
    pub applied: [u16; NUM_AXES],
}

impl SetMicrostepsAxesResp {
    pub const WIRE_LEN: usize = 10;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        if buf.len() < Self::WIRE_LEN {
            return Err(CoreError::ArgError("buffer too small"));
        }
        buf[0] = RESP_HEADER;
        buf[1] = OP_SET_MICROSTEPS_AXES;
        buf[2] = self.frame_id;
        for (i, v) in self.applied.iter().enumerate() {
            buf[3 + i * 2..5 + i * 2].copy_from_slice(&v.to_be_bytes());
        }
        buf[Self::WIRE_LEN - 1] = RESP_TAIL;
        Ok(Self::WIRE_LEN)
    }
}

/// Simple 4-byte query request shape shared by `MOVE_QUEUE_STATUS`,
/// `START_MOVE`, `MOVE_END` and `ENCODER_STATUS` requests: `HEADER, TYPE,
/// frameId, TAIL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryReq {
    pub frame_id: u8,
}

impl QueryReq {
    pub const WIRE_LEN: usize = 4;

    pub fn decode(buf: &[u8], len: usize, expected_type: u8) -> Result<Self, CoreError> {
        validate_frame(buf, len, REQ_HEADER, REQ_TAIL, Self::WIRE_LEN)?;
        if buf[1] != expected_type {
            return Err(CoreError::FrameError("unexpected type"));
        }
        Ok(QueryReq { frame_id: buf[2] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// §8 scenario 1.
    #[test]
    fn move_queue_add_ack_scenario() {
        let ack = MoveQueueAddAck {
            frame_id: 0x42,
            status: MoveQueueAddStatus::Ok,
        };
        let mut buf = [0u8; MoveQueueAddAck::WIRE_LEN];
        let n = ack.encode(&mut buf).unwrap();
        assert_eq!(n, 6);
        assert_eq!(buf[0], 0xAB);
        assert_eq!(buf[1], 0x01);
        assert_eq!(buf[2], 0x42);
        assert_eq!(buf[3], 0x00);
        assert_eq!(buf[5], 0x54);
        assert!(MoveQueueAddAck::check_parity(&buf, 6));

        let decoded = MoveQueueAddAck::decode(&buf, 6).unwrap();
        assert_eq!(decoded, ack);
    }

    /// §8 scenario 2.
    #[test]
    fn led_ctrl_byte_parity_scenario() {
        let req = LedCtrlReq {
            frame_id: 0x10,
            led_mask: 0x01,
            mode: LedMode::Blink,
            frequency_centi_hz: 200,
        };
        let mut buf = [0u8; LedCtrlReq::WIRE_LEN];
        req.encode(&mut buf).unwrap();
        assert_eq!(
            buf,
            [0xAA, 0x07, 0x10, 0x01, 0x02, 0x00, 0xC8, 0xDC, 0x55]
        );
        assert!(LedCtrlReq::check_parity(&buf, 9));

        let decoded = LedCtrlReq::decode(&buf, 9).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn led_ctrl_set_parity_is_idempotent() {
        let req = LedCtrlReq {
            frame_id: 0x10,
            led_mask: 0x01,
            mode: LedMode::On,
            frequency_centi_hz: 50,
        };
        let mut buf = [0u8; LedCtrlReq::WIRE_LEN];
        req.encode(&mut buf).unwrap();
        let first = buf;
        LedCtrlReq::set_parity(&mut buf, 9).unwrap();
        assert_eq!(buf, first);
    }

    #[test]
    fn move_queue_add_round_trip() {
        let req = MoveQueueAddReq {
            frame_id: 1,
            dir_mask: 0x07,
            v: [10, 10, 10],
            steps: [1000, 1000, 1000],
            kp: [256, 256, 256],
            ki: [10, 10, 10],
            kd: [5, 5, 5],
        };
        let mut buf = [0u8; MoveQueueAddReq::WIRE_LEN];
        let n = req.encode(&mut buf).unwrap();
        assert_eq!(n, MoveQueueAddReq::WIRE_LEN);
        let decoded = MoveQueueAddReq::decode(&buf, n).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn decode_rejects_bad_header() {
        let mut buf = [0u8; MoveQueueAddAck::WIRE_LEN];
        buf[0] = 0x00;
        assert!(matches!(
            MoveQueueAddAck::decode(&buf, 6),
            Err(CoreError::FrameError(_))
        ));
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = [0u8; 2];
        assert!(matches!(
            MoveQueueAddAck::decode(&buf, 2),
            Err(CoreError::FrameError(_) | CoreError::ArgError(_))
        ));
    }

    #[test]
    fn set_origin_round_trip() {
        let req_buf = [0xAAu8, OP_SET_ORIGIN, 0x05, 0b011, 1, REQ_TAIL];
        let decoded = SetOriginReq::decode(&req_buf, 6).unwrap();
        assert_eq!(decoded.mask, 0b011);
        assert_eq!(decoded.mode, 1);

        let resp = SetOriginResp {
            frame_id: 5,
            origin: [100, -200, 0],
        };
        let mut buf = [0u8; SetOriginResp::WIRE_LEN];
        resp.encode(&mut buf).unwrap();
        assert_eq!(buf[0], RESP_HEADER);
        assert_eq!(&buf[3..7], &100i32.to_be_bytes());
        assert_eq!(&buf[7..11], &(-200i32).to_be_bytes());
    }
}
