//! Wireless command ingress: the single-slot handoff between the radio
//! callback context and the main loop.
//!
//! The radio driver calls [`SpellMailbox::on_receive`] from its own context.
//! That path copies one packet's worth of data and flips flags; it performs
//! no allocation, no locking, and no I/O, because stalling the driver drops
//! subsequent packets. Everything heavier (logging, effect dispatch) happens
//! when the main loop drains the mailbox on its next tick.
//!
//! There is deliberately no queue: a packet arriving before the previous one
//! was drained overwrites it. Last-write-wins is the wire contract, not a
//! bug to fix, since the protocol has no ordering or delivery guarantees to
//! preserve.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::protocol::decode_spell_id;

/// Shared handle to the mailbox, cloned into the radio receive path.
pub type IngressHandle = Arc<SpellMailbox>;

/// Single-producer/single-consumer snapshot of the latest spell packet.
#[derive(Debug, Default)]
pub struct SpellMailbox {
    spell_id: AtomicU32,
    pending: AtomicBool,
    flash: AtomicBool,
}

impl SpellMailbox {
    pub fn new() -> IngressHandle {
        Arc::new(Self::default())
    }

    /// Radio-context entry point. Undersized payloads are silently dropped
    /// with no state change and no logging.
    pub fn on_receive(&self, payload: &[u8]) {
        let Some(id) = decode_spell_id(payload) else {
            return;
        };
        self.spell_id.store(id, Ordering::Release);
        self.pending.store(true, Ordering::Release);
        // Visual reception pulse, regardless of what the spell maps to
        self.flash.store(true, Ordering::Relaxed);
    }

    /// Drain the pending spell, at most once per published packet.
    pub fn take(&self) -> Option<u32> {
        if self.pending.swap(false, Ordering::Acquire) {
            Some(self.spell_id.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Drain the reception-flash request.
    pub fn take_flash(&self) -> bool {
        self.flash.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SpellPack;

    fn packet(id: u32) -> [u8; 4] {
        SpellPack { spell_id: id }.pack_spell().unwrap()
    }

    #[test]
    fn take_drains_once() {
        let mailbox = SpellMailbox::new();
        mailbox.on_receive(&packet(3));
        assert_eq!(mailbox.take(), Some(3));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn last_write_wins() {
        let mailbox = SpellMailbox::new();
        mailbox.on_receive(&packet(1));
        mailbox.on_receive(&packet(2));
        mailbox.on_receive(&packet(7));
        // The burst collapses to the newest packet
        assert_eq!(mailbox.take(), Some(7));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn undersized_payload_is_ignored() {
        let mailbox = SpellMailbox::new();
        mailbox.on_receive(&[1, 2]);
        assert_eq!(mailbox.take(), None);
        assert!(!mailbox.take_flash());
    }

    #[test]
    fn reception_raises_flash() {
        let mailbox = SpellMailbox::new();
        mailbox.on_receive(&packet(0));
        assert!(mailbox.take_flash());
        assert!(!mailbox.take_flash());
    }
}
