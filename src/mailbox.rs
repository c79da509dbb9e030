use std::sync::Arc;
use std::time::{Duration, Instant};

use core::fmt;
use parking_lot::{Condvar, Mutex};

struct Slot<T> {
    pending: Option<T>,
    spare: Option<T>,
    senders: usize,
    sent: u64,
    dropped: u64,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Error returned by [`Receiver::recv_timeout`] and [`Receiver::wait_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    Timeout,
    Disconnected,
}

impl fmt::Display for RecvTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out waiting on mailbox"),
            Self::Disconnected => f.write_str("mailbox is empty and every sender is gone"),
        }
    }
}

impl core::error::Error for RecvTimeoutError {}

/// Create a connected sender/receiver pair.
///
/// The mailbox holds at most one value. A send overwrites whatever the
/// receiver has not taken yet (counted as dropped), so a slow reader skips
/// values instead of falling behind. [`Receiver::try_recv_into`] and
/// [`Sender::send_with`] recycle values between the two sides, which makes a
/// double buffer that stops allocating once sizes settle.
pub fn mailbox<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            pending: None,
            spare: None,
            senders: 1,
            sent: 0,
            dropped: 0,
        }),
        ready: Condvar::new(),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

/// Writing half of a mailbox.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Publish `value`, returning the unread value it replaced, if any.
    pub fn send(&self, value: T) -> Option<T> {
        let displaced = {
            let mut slot = self.shared.slot.lock();
            slot.sent += 1;
            let displaced = slot.pending.replace(value);
            if displaced.is_some() {
                slot.dropped += 1;
            }
            displaced
        };
        self.shared.ready.notify_one();
        displaced
    }

    /// Build the next value from a recycled one and publish it.
    ///
    /// `fill` receives the spare left by the receiver, if any, and runs
    /// without the lock held. Until it returns, the previously published
    /// value stays pending and can still be taken. A pending value replaced
    /// on publish counts as dropped and becomes the next spare.
    pub fn send_with<F>(&self, fill: F)
    where
        F: FnOnce(Option<T>) -> T,
    {
        let reuse = self.shared.slot.lock().spare.take();
        let value = fill(reuse);

        {
            let mut slot = self.shared.slot.lock();
            slot.sent += 1;
            if let Some(displaced) = slot.pending.replace(value) {
                slot.dropped += 1;
                if slot.spare.is_none() {
                    slot.spare = Some(displaced);
                }
            }
        }
        self.shared.ready.notify_one();
    }

    /// Number of values published so far.
    pub fn sent(&self) -> u64 {
        self.shared.slot.lock().sent
    }

    /// Number of values overwritten before the receiver took them.
    pub fn dropped(&self) -> u64 {
        self.shared.slot.lock().dropped
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.slot.lock().senders += 1;
        Sender {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.shared.slot.lock().senders -= 1;
        self.shared.ready.notify_all();
    }
}

/// Reading half of a mailbox.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Take the pending value, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.shared.slot.lock().pending.take()
    }

    /// Swap the pending value into `dst`.
    ///
    /// The previous content of `dst` is kept as the spare for the next
    /// [`Sender::send_with`]. Returns `false` and leaves `dst` alone when
    /// nothing is pending.
    pub fn try_recv_into(&self, dst: &mut T) -> bool {
        let mut slot = self.shared.slot.lock();
        match slot.pending.take() {
            Some(mut fresh) => {
                std::mem::swap(dst, &mut fresh);
                slot.spare = Some(fresh);
                true
            }
            None => false,
        }
    }

    /// Block until a value is pending and take it.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.pending.take() {
                return Ok(value);
            }
            if slot.senders == 0 {
                return Err(RecvTimeoutError::Disconnected);
            }
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                return slot.pending.take().ok_or(RecvTimeoutError::Timeout);
            }
        }
    }

    /// Block until a value is pending without taking it.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if slot.pending.is_some() {
                return Ok(());
            }
            if slot.senders == 0 {
                return Err(RecvTimeoutError::Disconnected);
            }
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                return if slot.pending.is_some() {
                    Ok(())
                } else {
                    Err(RecvTimeoutError::Timeout)
                };
            }
        }
    }

    /// A new sender feeding this receiver.
    pub fn sender(&self) -> Sender<T> {
        self.shared.slot.lock().senders += 1;
        Sender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of values overwritten before they were taken.
    pub fn dropped(&self) -> u64 {
        self.shared.slot.lock().dropped
    }
}
