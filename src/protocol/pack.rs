use packed_struct::prelude::*;

// Spell Packet (4-byte Packet):
// Byte #   | Definition
// 0 -> 3   | Spell id, unsigned 32-bit, little-endian
//
// This is the entire wire protocol: one broadcast record, no address
// filtering, no sequence numbers, no acknowledgment.
#[derive(PackedStruct, Default, Debug, PartialEq, Clone)]
#[packed_struct(endian = "lsb")]
pub struct SpellPack {
    pub spell_id: u32,
}

/// Wire size of a spell packet.
pub const SPELL_PACKET_LEN: usize = 4;

impl SpellPack {
    pub fn pack_spell(&self) -> Result<[u8; SPELL_PACKET_LEN], PackingError> {
        self.pack()
    }
}

/// Decode the spell id out of a raw payload.
///
/// Payloads shorter than a packet are discarded (returns `None`); trailing
/// bytes beyond the packet are ignored, matching the receiver contract
/// `len >= packet size`.
pub fn decode_spell_id(payload: &[u8]) -> Option<u32> {
    if payload.len() < SPELL_PACKET_LEN {
        return None;
    }
    let bytes: [u8; SPELL_PACKET_LEN] = payload[..SPELL_PACKET_LEN].try_into().ok()?;
    SpellPack::unpack(&bytes).ok().map(|p| p.spell_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spell_pack() -> Result<(), PackingError> {
        // Small ids occupy the first byte only
        let pack = SpellPack { spell_id: 7 };
        assert_eq!([0x07, 0x00, 0x00, 0x00], pack.pack_spell()?);

        // Multi-byte ids are little-endian on the wire
        let pack = SpellPack { spell_id: 0x0102 };
        assert_eq!([0x02, 0x01, 0x00, 0x00], pack.pack_spell()?);

        Ok(())
    }

    #[test]
    fn test_decode_roundtrip() {
        let bytes = SpellPack { spell_id: 12 }.pack_spell().unwrap();
        assert_eq!(decode_spell_id(&bytes), Some(12));
    }

    #[test]
    fn test_undersized_payload_dropped() {
        assert_eq!(decode_spell_id(&[]), None);
        assert_eq!(decode_spell_id(&[1, 0, 0]), None);
    }

    #[test]
    fn test_oversized_payload_uses_prefix() {
        let mut bytes = vec![9, 0, 0, 0];
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode_spell_id(&bytes), Some(9));
    }
}
