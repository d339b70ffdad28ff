//! Single-slot signal that ends the wait on the active item.
//!
//! The playback loop arms the signal with the play it is about to start, then
//! waits. Node events and skip requests offer an outcome; the first accepted
//! offer wins and every later one is rejected until the loop arms the signal
//! again. Taking the outcome disarms the slot, so nothing offered for one play
//! can leak into the wait for the next.
//!
//! Offers are matched by play id when they carry one. Nodes that only report
//! the stream reference cannot tell two plays of the same stream apart, so
//! for those the trailing `LoadFailed` end that follows an exception is
//! absorbed instead of faulting the next play of that stream.

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::events::FaultKind;

/// How the wait on the active item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// The node finished the track.
    Finished,
    /// A skip request ended the track.
    Skipped,
    /// The node reported a failure for the track.
    Fault(FaultKind),
}

/// Which play an offered outcome is about. Unset fields match anything.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Target<'a> {
    pub(crate) play_id: Option<u64>,
    pub(crate) track: Option<&'a str>,
}

impl Target<'_> {
    pub(crate) fn play(play_id: u64) -> Self {
        Self {
            play_id: Some(play_id),
            track: None,
        }
    }
}

struct Armed {
    play_id: u64,
    track: String,
}

#[derive(Default)]
struct Slot {
    /// Play the wait is armed for; `None` means disarmed.
    armed: Option<Armed>,
    outcome: Option<WaitOutcome>,
    /// Stream whose last play ended in an exception reported without a play id.
    excepted: Option<String>,
}

#[derive(Default)]
pub(crate) struct PlaybackSignal {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl PlaybackSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts accepting outcomes for play `play_id` of `track`, discarding
    /// anything left over.
    pub(crate) fn arm(&self, play_id: u64, track: &str) {
        let mut slot = self.slot.lock();
        slot.armed = Some(Armed {
            play_id,
            track: track.to_string(),
        });
        slot.outcome = None;
    }

    /// Stops accepting outcomes.
    pub(crate) fn disarm(&self) {
        let mut slot = self.slot.lock();
        slot.armed = None;
        slot.outcome = None;
        slot.excepted = None;
    }

    /// Play id of the wait that is armed and still open.
    pub(crate) fn pending_play(&self) -> Option<u64> {
        let slot = self.slot.lock();
        match (&slot.armed, slot.outcome) {
            (Some(armed), None) => Some(armed.play_id),
            _ => None,
        }
    }

    /// Offers an outcome for the armed wait.
    ///
    /// Returns `false` when the signal is disarmed, `target` names another
    /// play, another outcome already won, or the offer is the trailing end of
    /// an earlier failed play of the same stream.
    pub(crate) fn offer(&self, target: Target<'_>, outcome: WaitOutcome) -> bool {
        let mut slot = self.slot.lock();
        let by_track = target.play_id.is_none() && target.track.is_some();
        if by_track
            && outcome == WaitOutcome::Fault(FaultKind::LoadFailed)
            && slot.excepted.as_deref() == target.track
        {
            slot.excepted = None;
            return false;
        }

        let Some(armed) = slot.armed.as_ref() else {
            return false;
        };
        if target.play_id.is_some_and(|id| id != armed.play_id)
            || target.track.is_some_and(|t| t != armed.track)
            || slot.outcome.is_some()
        {
            return false;
        }

        slot.excepted = match outcome {
            WaitOutcome::Fault(FaultKind::Exception) if by_track => target.track.map(str::to_string),
            _ => None,
        };
        slot.outcome = Some(outcome);
        drop(slot);
        self.notify.notify_one();
        true
    }

    /// Waits for the winning outcome and disarms the slot.
    pub(crate) async fn wait(&self) -> WaitOutcome {
        loop {
            let notified = self.notify.notified();
            {
                let mut slot = self.slot.lock();
                if let Some(outcome) = slot.outcome.take() {
                    slot.armed = None;
                    return outcome;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn track(stream_ref: &str) -> Target<'_> {
        Target {
            play_id: None,
            track: Some(stream_ref),
        }
    }

    #[tokio::test]
    async fn first_offer_wins() {
        let signal = PlaybackSignal::new();
        signal.arm(1, "a");

        assert!(signal.offer(Target::play(1), WaitOutcome::Skipped));
        assert!(!signal.offer(track("a"), WaitOutcome::Finished));
        assert_eq!(signal.wait().await, WaitOutcome::Skipped);
    }

    #[tokio::test]
    async fn offer_for_other_track_is_rejected() {
        let signal = PlaybackSignal::new();
        signal.arm(1, "b");

        assert!(!signal.offer(track("a"), WaitOutcome::Finished));
        assert!(signal.pending_play().is_some());
    }

    #[test]
    fn offer_while_disarmed_is_rejected() {
        let signal = PlaybackSignal::new();
        assert!(!signal.offer(Target::default(), WaitOutcome::Skipped));

        signal.arm(1, "a");
        signal.disarm();
        assert!(!signal.offer(Target::default(), WaitOutcome::Skipped));
        assert!(signal.pending_play().is_none());
    }

    #[tokio::test]
    async fn stale_outcome_does_not_reach_next_wait() {
        let signal = PlaybackSignal::new();
        signal.arm(1, "a");
        assert!(signal.offer(Target::play(1), WaitOutcome::Skipped));
        assert_eq!(signal.wait().await, WaitOutcome::Skipped);

        // Late echo for the finished item after the wait returned.
        assert!(!signal.offer(track("a"), WaitOutcome::Finished));

        signal.arm(2, "b");
        assert_eq!(signal.pending_play(), Some(2));
        assert!(signal.offer(track("b"), WaitOutcome::Finished));
        assert_eq!(signal.wait().await, WaitOutcome::Finished);
    }

    #[tokio::test]
    async fn play_id_separates_plays_of_the_same_stream() {
        let signal = PlaybackSignal::new();
        signal.arm(1, "a");
        assert!(signal.offer(Target::play(1), WaitOutcome::Finished));
        assert_eq!(signal.wait().await, WaitOutcome::Finished);

        signal.arm(2, "a");
        let late = Target {
            play_id: Some(1),
            track: Some("a"),
        };
        assert!(!signal.offer(late, WaitOutcome::Fault(FaultKind::Stuck)));
        assert!(!signal.offer(Target::play(1), WaitOutcome::Skipped));
        assert_eq!(signal.pending_play(), Some(2));
    }

    #[tokio::test]
    async fn trailing_load_failed_after_exception_is_absorbed() {
        let signal = PlaybackSignal::new();
        signal.arm(1, "a");
        assert!(signal.offer(track("a"), WaitOutcome::Fault(FaultKind::Exception)));
        assert_eq!(signal.wait().await, WaitOutcome::Fault(FaultKind::Exception));

        signal.arm(2, "a");
        assert!(!signal.offer(track("a"), WaitOutcome::Fault(FaultKind::LoadFailed)));
        assert!(signal.pending_play().is_some());

        // Only the one trailing end is absorbed.
        assert!(signal.offer(track("a"), WaitOutcome::Fault(FaultKind::LoadFailed)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_later_offer() {
        let signal = Arc::new(PlaybackSignal::new());
        signal.arm(1, "a");

        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(signal.offer(Target::default(), WaitOutcome::Fault(FaultKind::Stuck)));

        assert_eq!(waiter.await.unwrap(), WaitOutcome::Fault(FaultKind::Stuck));
    }
}
