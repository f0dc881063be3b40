//! Engine for a set of wearable spell-light nodes.
//!
//! A node renders continuously-animated light patterns, reacts to short
//! broadcast "spell" commands and local touch gestures, and exposes a short
//! firmware-update admission window after boot. Everything runs from a
//! single cooperative main loop against a monotonic millisecond clock; the
//! radio and update transports are external collaborators behind traits.

pub mod config;
pub mod diag;
pub mod effects;
pub mod ingress;
pub mod modulators;
pub mod node;
pub mod protocol;
pub mod render;
pub mod time;
pub mod touch;
pub mod transport;
pub mod update;

pub mod prelude {
    pub use crate::config::{NodeDescriptor, TouchParams, WindowParams};
    pub use crate::effects::EffectEngine;
    pub use crate::ingress::{IngressHandle, SpellMailbox};
    pub use crate::modulators::Modulators;
    pub use crate::node::Node;
    pub use crate::protocol::{
        Background, Direction, OneShotKind, Spell, SpellMap, SpellPack,
    };
    pub use crate::render::{FrameBuffer, RenderSink};
    pub use crate::time::{Clock, Millis};
    pub use crate::touch::{GestureEvent, GestureRecognizer, TouchProbe};
    pub use crate::transport::{SpellTransport, UdpSpellTransport};
    pub use crate::update::{AdmissionWindow, UpdateEvent, UpdateService};
}
