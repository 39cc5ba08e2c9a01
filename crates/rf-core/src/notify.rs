//! `Notifier` — the render core's one-way pipe to the outside world (§6).
//! Deliberately generic over payload rather than hard-coding a host-bridge
//! call, per §9's design note: "a portable implementation routes *all*
//! notifications through the notifier interface; host integration is a
//! subscriber, not an override."

use serde::{Deserialize, Serialize};

/// Notification kinds the render core emits (§6). The payload, where
/// present, is carried on the variant itself rather than as a separate
/// `Option<i64>` — friendlier to match on, same information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// The driver failed to open (`DriverAdapter::create` returned an
    /// error). The engine does not enter its render loop.
    ErrorHardwareUnavailable,
    /// A transport marker position was reached during this render call.
    MarkerPositionReached,
    /// The sequencer position advanced; payload is the in-buffer frame
    /// offset at which the update should be considered to have occurred.
    SequencerPositionUpdated { frame_offset: u32 },
    /// A queued tempo/time-signature change was committed.
    SequencerTempoUpdated,
    /// A disk-recording snippet filled and was queued/flushed.
    RecordedSnippetReady { snippet_index: u32 },
    /// A bounce-to-file render completed.
    BounceComplete,
}

/// Broadcasts engine notifications to whatever is listening. Implementors
/// decide fan-out (UI bridge, logging, metrics); the render core only ever
/// calls `notify`.
pub trait Notifier: Send {
    fn notify(&self, notification: Notification);
}

/// A `Notifier` that drops everything — the default for headless/bounce
/// runs that have no subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}
