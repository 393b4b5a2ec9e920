//! The ordered list of frame intervals.

use super::events::Frame;
use super::spinlock::{Spinlock, SpinlockGuard};

pub(crate) struct LedgerState {
    pub(crate) frames: Vec<Frame>,
    /// Number the next appended frame gets. Only advances when a frame is
    /// actually appended, which keeps snapshot frame numbers contiguous
    /// even across recording toggles.
    next_number: u64,
}

/// Frames owned by the profiler until extraction transfers them to a
/// snapshot. Numbering begins at 0 when recording first begins.
pub(crate) struct FrameLedger {
    state: Spinlock<LedgerState>,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self {
            state: Spinlock::new(LedgerState {
                frames: Vec::new(),
                next_number: 0,
            }),
        }
    }

    /// Close the currently open frame (if any) at `now` and, when
    /// recording, open the next one starting at `now`.
    pub fn advance(&self, recording: bool, now: i64) {
        let mut state = self.state.lock();
        if let Some(last) = state.frames.last_mut()
            && !last.span.is_complete()
        {
            last.span.end_ns = now;
        }
        if recording {
            let number = state.next_number;
            state.next_number += 1;
            state.frames.push(Frame::open(number, now));
        }
    }

    /// Transfer all frames out, leaving the ledger empty. Numbering
    /// continues where it left off for any later recording.
    pub fn take(&self) -> Vec<Frame> {
        std::mem::take(&mut self.lock().frames)
    }

    /// Raw access for result extraction, which swaps frames out while
    /// also holding the scope-table lock.
    pub(crate) fn lock(&self) -> SpinlockGuard<'_, LedgerState> {
        self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_recorded_frame_is_numbered_zero() {
        let ledger = FrameLedger::new();
        ledger.advance(true, 100);
        let frames = ledger.take();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].number, 0);
        assert_eq!(frames[0].span.start_ns, 100);
        assert!(!frames[0].span.is_complete());
    }

    #[test]
    fn advance_closes_the_open_tail() {
        let ledger = FrameLedger::new();
        ledger.advance(true, 100);
        ledger.advance(true, 250);
        ledger.advance(true, 400);
        let frames = ledger.take();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].span, crate::profiler::TimeSpan::new(100, 250));
        assert_eq!(frames[1].span, crate::profiler::TimeSpan::new(250, 400));
        assert_eq!(frames[2].number, 2);
        assert!(!frames[2].span.is_complete());
    }

    #[test]
    fn numbers_stay_contiguous_across_a_recording_gap() {
        let ledger = FrameLedger::new();
        ledger.advance(true, 100); // frame 0 opens
        ledger.advance(false, 200); // frame 0 closes, nothing opens
        ledger.advance(false, 300); // no open tail, nothing happens
        ledger.advance(true, 400); // frame 1 opens
        let frames = ledger.take();
        assert_eq!(frames.iter().map(|f| f.number).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(frames[0].span.end_ns, 200);
    }

    #[test]
    fn advance_without_recording_on_empty_ledger_is_a_no_op() {
        let ledger = FrameLedger::new();
        ledger.advance(false, 100);
        assert!(ledger.take().is_empty());
    }

    #[test]
    fn numbering_continues_after_take() {
        let ledger = FrameLedger::new();
        ledger.advance(true, 100);
        let _ = ledger.take();
        ledger.advance(true, 200);
        let frames = ledger.take();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].number, 1);
    }
}
