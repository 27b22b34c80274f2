//! Chunked transfer finite-state machine.
//!
//! ```text
//!  Sending(0) ──sent──▶ AwaitingAck(0) ──ack──▶ Sending(1) ── … ──▶ AwaitingAck(N-1)
//!                             │                                          │
//!                     timeout │ error                                ack │
//!                             ▼                                          ▼
//!                          Failed ◀──────── timeout / error ──────── Completing ──ack──▶ Done
//! ```
//!
//! Transfers without a completion step go straight from the last ack to
//! `Done`. An empty payload starts at `Completing` (or `Done`).

use std::fmt;

/// Position of a transfer in its send/ack cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// About to publish chunk `i`.
    Sending(usize),
    /// Chunk `i` is on the wire; waiting for its ack.
    AwaitingAck(usize),
    /// All chunks acked; publishing the completion marker and awaiting its ack.
    Completing,
    /// Terminal: every ack arrived.
    Done,
    /// Terminal: a wait timed out or the transport failed.
    Failed,
}

impl TransferState {
    /// Initial state for `total` chunks.
    pub fn start(total: usize, completes: bool) -> Self {
        match (total, completes) {
            (0, true) => Self::Completing,
            (0, false) => Self::Done,
            _ => Self::Sending(0),
        }
    }

    /// Transition after chunk `i` has been written.
    pub fn on_sent(self) -> Self {
        match self {
            Self::Sending(i) => Self::AwaitingAck(i),
            other => other,
        }
    }

    /// Transition after the awaited ack matched.
    pub fn on_ack(self, total: usize, completes: bool) -> Self {
        match self {
            Self::AwaitingAck(i) if i + 1 < total => Self::Sending(i + 1),
            Self::AwaitingAck(_) if completes => Self::Completing,
            Self::AwaitingAck(_) | Self::Completing => Self::Done,
            other => other,
        }
    }

    /// Transition on timeout or transport error. No retry.
    pub fn on_failure(self) -> Self {
        Self::Failed
    }

    /// Whether no further transitions can happen.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sending(i) => write!(f, "SENDING({i})"),
            Self::AwaitingAck(i) => write!(f, "AWAITING_ACK({i})"),
            Self::Completing => f.write_str("COMPLETING"),
            Self::Done => f.write_str("DONE"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_walk_with_completion() {
        let total = 3;
        let mut state = TransferState::start(total, true);
        let mut trace = vec![state];

        while !state.is_terminal() {
            state = match state {
                TransferState::Sending(_) => state.on_sent(),
                _ => state.on_ack(total, true),
            };
            trace.push(state);
        }

        assert_eq!(
            trace,
            vec![
                TransferState::Sending(0),
                TransferState::AwaitingAck(0),
                TransferState::Sending(1),
                TransferState::AwaitingAck(1),
                TransferState::Sending(2),
                TransferState::AwaitingAck(2),
                TransferState::Completing,
                TransferState::Done,
            ]
        );
    }

    #[test]
    fn test_single_shot_skips_completion() {
        let state = TransferState::start(1, false).on_sent();
        assert_eq!(state, TransferState::AwaitingAck(0));
        assert_eq!(state.on_ack(1, false), TransferState::Done);
    }

    #[test]
    fn test_empty_payload_start() {
        assert_eq!(TransferState::start(0, true), TransferState::Completing);
        assert_eq!(TransferState::start(0, false), TransferState::Done);
    }

    #[test]
    fn test_failure_is_terminal() {
        let state = TransferState::AwaitingAck(1).on_failure();
        assert_eq!(state, TransferState::Failed);
        assert!(state.is_terminal());
        assert_eq!(state.on_ack(3, true), TransferState::Failed);
        assert_eq!(state.on_sent(), TransferState::Failed);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Sending(4).to_string(), "SENDING(4)");
        assert_eq!(TransferState::AwaitingAck(0).to_string(), "AWAITING_ACK(0)");
        assert_eq!(TransferState::Done.to_string(), "DONE");
    }
}
