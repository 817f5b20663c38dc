//! SpiTransport: 42-byte full-duplex DMA round, handshake byte, frame
//! extraction (§4.8).
//!
//! The DMA completion handler itself is out of scope (board bring-up, §1);
//! this models the per-round logic the handler would call: scan the RX
//! window, push a valid request, choose the handshake status byte, and
//! prime the TX buffer for the next round. Grounded on the lock-free
//! version/retry protocol in `evo_shared_memory`'s reader/segment pair,
//! generalized from an mmap version counter to a DMA-round handshake byte.

use motion_common::consts::*;

use crate::config::TxLayoutPolicy;
use crate::fifo::{PushOutcome, SpiRxQueue};

/// Reason the RX side of a round was rejected (§4.8 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowReason {
    QueueFull,
    InvalidFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowScan {
    /// Host is only polling; the whole buffer is the poll-byte filler.
    PollOnly,
    Valid { start: usize, len: usize },
    HeaderWithoutTail,
    NoHeader,
}

fn scan_window(rx: &[u8; MAX_FRAME_LEN]) -> WindowScan {
    if rx.iter().all(|&b| b == POLL_BYTE_PRIMARY) || rx.iter().all(|&b| b == POLL_BYTE_ALTERNATE) {
        return WindowScan::PollOnly;
    }
    let Some(start) = rx.iter().position(|&b| b == REQ_HEADER) else {
        return WindowScan::NoHeader;
    };
    match rx[start..].iter().position(|&b| b == REQ_TAIL) {
        Some(tail_rel) => {
            let len = tail_rel + 1;
            if len <= MAX_FRAME_LEN {
                WindowScan::Valid { start, len }
            } else {
                WindowScan::HeaderWithoutTail
            }
        }
        None => WindowScan::HeaderWithoutTail,
    }
}

pub struct SpiTransport {
    policy: TxLayoutPolicy,
    need_restart: bool,
    rx_overflow_reason: Option<OverflowReason>,
}

impl SpiTransport {
    pub const fn new(policy: TxLayoutPolicy) -> Self {
        SpiTransport {
            policy,
            need_restart: false,
            rx_overflow_reason: None,
        }
    }

    pub fn rx_overflow_reason(&self) -> Option<OverflowReason> {
        self.rx_overflow_reason
    }

    /// Drains and clears the pending overflow reason, for the main poll's
    /// error logging (§7 "ISRs never fail visibly").
    pub fn take_rx_overflow_reason(&mut self) -> Option<OverflowReason> {
        self.rx_overflow_reason.take()
    }

    pub fn need_restart(&self) -> bool {
        self.need_restart
    }

    pub fn set_need_restart(&mut self, value: bool) {
        self.need_restart = value;
    }

    /// §4.8 steps 2-4: inspect the completed RX buffer, push a valid
    /// request into `rx_queue`, and return the handshake status byte to
    /// prime into the next round's TX buffer.
    pub fn process_round(&mut self, rx: &[u8; MAX_FRAME_LEN], rx_queue: &mut SpiRxQueue) -> u8 {
        let mut overflow_this_round = false;
        match scan_window(rx) {
            WindowScan::Valid { start, len } => {
                match rx_queue.push(&rx[start..start + len], len) {
                    PushOutcome::Ok => {}
                    PushOutcome::Full => {
                        self.rx_overflow_reason = Some(OverflowReason::QueueFull);
                        overflow_this_round = true;
                    }
                    PushOutcome::TooLarge => {
                        // Can't happen: `len <= MAX_FRAME_LEN` was just checked,
                        // but treat defensively as an invalid frame.
                        self.rx_overflow_reason = Some(OverflowReason::InvalidFrame);
                        overflow_this_round = true;
                    }
                }
            }
            WindowScan::HeaderWithoutTail => {
                self.rx_overflow_reason = Some(OverflowReason::InvalidFrame);
                overflow_this_round = true;
            }
            WindowScan::NoHeader | WindowScan::PollOnly => {}
        }

        if overflow_this_round || rx_queue.is_full() {
            HANDSHAKE_BUSY
        } else {
            HANDSHAKE_READY
        }
    }

    /// §4.8 step 5: prime the TX buffer for the next round, with a pending
    /// response (if any) laid out per the configured policy.
    pub fn prime_tx(&self, tx: &mut [u8; MAX_FRAME_LEN], pending: Option<&[u8]>, status_byte: u8) {
        tx.fill(status_byte);
        let Some(resp) = pending else {
            return;
        };
        match self.policy {
            TxLayoutPolicy::LeftFill => {
                tx[..resp.len()].copy_from_slice(resp);
            }
            TxLayoutPolicy::RightAlignedZeroPad => {
                // Documented alternative (§4.8 step 5 policy B), not wired
                // into this implementation (DESIGN.md Open Question 1).
                unimplemented!("RightAlignedZeroPad is a documented, unimplemented policy")
            }
        }
    }
}
