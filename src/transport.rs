//! Broadcast spell transport.
//!
//! The radio is an external collaborator: something that can blast a small
//! payload at everyone and hand received payloads to the ingress callback.
//! The host implementation rides UDP broadcast, which shares the important
//! properties of the costume radio link: fire-and-forget, no addressing, no
//! acknowledgment, and your own broadcasts are not observed locally.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::thread;

use crate::ingress::IngressHandle;

/// Well-known spell port for the UDP transport.
pub const SPELL_PORT: u16 = 8089;

pub trait SpellTransport {
    /// Fire-and-forget broadcast of one wire packet.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Re-pin the link to its operating channel after the admission window.
    /// Failure must leave the transport usable on its current channel.
    fn rebind(&mut self, channel: u8) -> Result<()>;
}

/// Transport stub for nodes whose radio failed to initialize. Sends vanish,
/// which is exactly what the air does with them anyway.
pub struct NullSpellTransport;

impl SpellTransport for NullSpellTransport {
    fn send(&mut self, _payload: &[u8]) -> Result<()> {
        debug!("no transport, spell dropped");
        Ok(())
    }

    fn rebind(&mut self, _channel: u8) -> Result<()> {
        Ok(())
    }
}

/// UDP broadcast transport with a background receive thread feeding the
/// ingress mailbox.
pub struct UdpSpellTransport {
    tx: UdpSocket,
    target: SocketAddr,
    recv_port: u16,
}

impl UdpSpellTransport {
    /// Bind the receive socket on the spell port and spawn the receive
    /// thread. Packets we sent ourselves are filtered out by source port so
    /// local loopback is not observed.
    pub fn bind(mailbox: IngressHandle) -> Result<Self> {
        Self::bind_on(SPELL_PORT, mailbox)
    }

    pub fn bind_on(port: u16, mailbox: IngressHandle) -> Result<Self> {
        let rx = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .context("binding spell receive socket")?;
        let recv_port = rx.local_addr()?.port();

        let tx = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("binding spell send socket")?;
        tx.set_broadcast(true)?;
        let tx_port = tx.local_addr()?.port();

        thread::spawn(move || {
            let mut buf = [0u8; 64];
            loop {
                match rx.recv_from(&mut buf) {
                    Ok((len, src)) => {
                        if src.port() == tx_port {
                            continue; // our own broadcast
                        }
                        mailbox.on_receive(&buf[..len]);
                    }
                    Err(e) => {
                        warn!("spell receive failed: {e}");
                        break;
                    }
                }
            }
        });

        info!("spell transport listening on UDP port {recv_port}");
        Ok(Self {
            tx,
            // Broadcasts always go to the well-known port, regardless of
            // where this end happens to listen.
            target: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, SPELL_PORT)),
            recv_port,
        })
    }

    pub fn recv_port(&self) -> u16 {
        self.recv_port
    }

    /// Point sends somewhere other than the broadcast address (tests).
    pub fn set_target(&mut self, target: SocketAddr) {
        self.target = target;
    }
}

impl SpellTransport for UdpSpellTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.tx
            .send_to(payload, self.target)
            .context("broadcasting spell packet")?;
        Ok(())
    }

    fn rebind(&mut self, channel: u8) -> Result<()> {
        // Channel pinning is a radio concern; the UDP link has nothing to
        // re-establish.
        debug!("transport rebind to channel {channel} (no-op on UDP)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingress::SpellMailbox;
    use crate::protocol::SpellPack;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    #[test]
    fn foreign_packets_arrive_and_own_sends_are_not_observed() {
        let mailbox = SpellMailbox::new();
        let mut transport =
            UdpSpellTransport::bind_on(0, mailbox.clone()).expect("bind transport");
        let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), transport.recv_port());
        transport.set_target(target);

        // Our own broadcast must not loop back into the mailbox
        let packet = SpellPack { spell_id: 6 }.pack_spell().unwrap();
        transport.send(&packet).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(mailbox.take(), None);

        // A foreign caster's packet lands
        let caster = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        let packet = SpellPack { spell_id: 9 }.pack_spell().unwrap();
        caster.send_to(&packet, target).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(id) = mailbox.take() {
                assert_eq!(id, 9);
                break;
            }
            assert!(Instant::now() < deadline, "spell never arrived");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
