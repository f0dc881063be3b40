//! Spell protocol: the wire packet and the typed commands decoded from it.
//!
//! Raw spell ids are decoded exactly once, at this boundary, into a [`Spell`]
//! value. Everything past the decode consumes typed commands; nothing else in
//! the engine ever matches on a magic integer. The id-to-spell mapping is
//! role-dependent, so each node carries its own [`SpellMap`].

pub mod pack;

pub use self::pack::{decode_spell_id, SpellPack, SPELL_PACKET_LEN};

use serde::{Deserialize, Serialize};

/// Continuous background animations. Mutually exclusive, no natural end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    Off,
    Rainbow,
    Breathing,
    Strobe,
}

/// Bounded animations that run to completion and then yield back to the
/// background effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneShotKind {
    Pulse,
    Sawtooth,
    DoubleBlink,
    Chase,
}

/// Direction of a tempo or brightness step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
}

/// A decoded spell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spell {
    Background(Background),
    TempoDelta(Direction),
    BrightnessDelta(Direction),
    OneShot(OneShotKind),
}

/// Role-specific mapping between wire spell ids and typed spells.
///
/// Ids missing from the map are out of range for the node: they decode to
/// `Background(Off)` so an unknown spell always lands on a safe dark state
/// instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellMap {
    entries: Vec<(u32, Spell)>,
}

impl SpellMap {
    pub fn new(entries: Vec<(u32, Spell)>) -> Self {
        Self { entries }
    }

    /// The wearable mapping (staff, cape, hat). Spell 3 is strobe only on
    /// nodes that support it; the rest render it as off.
    pub fn wearable(strobe_supported: bool) -> Self {
        let spell_3 = if strobe_supported {
            Spell::Background(Background::Strobe)
        } else {
            Spell::Background(Background::Off)
        };
        Self::new(vec![
            (0, Spell::Background(Background::Off)),
            (1, Spell::Background(Background::Rainbow)),
            (2, Spell::Background(Background::Breathing)),
            (3, spell_3),
            (4, Spell::Background(Background::Off)),
            (5, Spell::TempoDelta(Direction::Down)),
            (6, Spell::TempoDelta(Direction::Up)),
            (7, Spell::BrightnessDelta(Direction::Down)),
            (8, Spell::BrightnessDelta(Direction::Up)),
            (9, Spell::OneShot(OneShotKind::Pulse)),
            (10, Spell::OneShot(OneShotKind::Sawtooth)),
            (11, Spell::OneShot(OneShotKind::DoubleBlink)),
            (12, Spell::OneShot(OneShotKind::Chase)),
        ])
    }

    /// The single-lamp beacon keeps its historical compact mapping.
    pub fn beacon() -> Self {
        Self::new(vec![
            (0, Spell::Background(Background::Off)),
            (1, Spell::Background(Background::Breathing)),
            (2, Spell::Background(Background::Strobe)),
            (3, Spell::OneShot(OneShotKind::Pulse)),
            (4, Spell::OneShot(OneShotKind::Sawtooth)),
            (5, Spell::OneShot(OneShotKind::DoubleBlink)),
        ])
    }

    /// Decode a wire id. Unknown ids fall back to background off.
    pub fn decode(&self, id: u32) -> Spell {
        self.entries
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, spell)| *spell)
            .unwrap_or(Spell::Background(Background::Off))
    }

    /// Reverse lookup for the dispatcher: first id that maps to `spell`.
    pub fn encode(&self, spell: Spell) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, s)| *s == spell)
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_decode_to_off() {
        let map = SpellMap::wearable(true);
        assert_eq!(map.decode(13), Spell::Background(Background::Off));
        assert_eq!(map.decode(99), Spell::Background(Background::Off));
        assert_eq!(map.decode(u32::MAX), Spell::Background(Background::Off));
    }

    #[test]
    fn wearable_table() {
        let map = SpellMap::wearable(true);
        assert_eq!(map.decode(1), Spell::Background(Background::Rainbow));
        assert_eq!(map.decode(2), Spell::Background(Background::Breathing));
        assert_eq!(map.decode(3), Spell::Background(Background::Strobe));
        assert_eq!(map.decode(4), Spell::Background(Background::Off));
        assert_eq!(map.decode(5), Spell::TempoDelta(Direction::Down));
        assert_eq!(map.decode(8), Spell::BrightnessDelta(Direction::Up));
        assert_eq!(map.decode(12), Spell::OneShot(OneShotKind::Chase));
    }

    #[test]
    fn strobe_unsupported_renders_off() {
        let map = SpellMap::wearable(false);
        assert_eq!(map.decode(3), Spell::Background(Background::Off));
    }

    #[test]
    fn beacon_keeps_compact_mapping() {
        let map = SpellMap::beacon();
        assert_eq!(map.decode(1), Spell::Background(Background::Breathing));
        assert_eq!(map.decode(5), Spell::OneShot(OneShotKind::DoubleBlink));
        // No tempo or brightness spells on the beacon
        assert_eq!(map.decode(6), Spell::Background(Background::Off));
    }

    #[test]
    fn encode_inverts_decode_for_castable_spells() {
        let map = SpellMap::wearable(false);
        for spell in [
            Spell::Background(Background::Rainbow),
            Spell::TempoDelta(Direction::Up),
            Spell::BrightnessDelta(Direction::Down),
            Spell::OneShot(OneShotKind::Chase),
        ] {
            let id = map.encode(spell).unwrap();
            assert_eq!(map.decode(id), spell);
        }
    }
}
