//! A realtime-safe [`rf_core::Notifier`]: pushes onto an unbounded
//! `crossbeam-channel` sender from the render thread, leaving draining to
//! whatever subscriber owns the receiver. `crossbeam_channel::Sender::send`
//! on an unbounded channel never blocks on a full buffer and only
//! allocates when it must grow — good enough for the occasional
//! notification this trait carries (never the per-sample path).

use crossbeam_channel::{Receiver, Sender};
use rf_core::{Notification, Notifier};

pub struct ChannelNotifier {
    tx: Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a connected sender/receiver pair; the receiver side is
    /// handed to whatever drains notifications (CLI demo, UI bridge, test).
    pub fn channel() -> (Self, Receiver<Notification>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // A disconnected receiver means nobody is listening; that's not a
        // render-path error.
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_reaches_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        notifier.notify(Notification::BounceComplete);
        assert_eq!(rx.try_recv().unwrap(), Notification::BounceComplete);
    }
}
