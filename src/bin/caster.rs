use anyhow::Error;
use log::info;
use std::io::BufRead;

use spellwear::prelude::*;

/// Console-only caster: reads digits from stdin and broadcasts them as
/// spell packets, nothing else. Handy for driving a room full of nodes from
/// a laptop.
fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // The caster does not receive, so it binds an ephemeral port and keeps
    // the well-known spell port free for a node on the same machine.
    let mailbox = SpellMailbox::new();
    let mut transport = UdpSpellTransport::bind_on(0, mailbox)?;

    info!("caster ready; type digits 0-9 to cast spells");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        for c in line.chars() {
            if let Some(d) = c.to_digit(10) {
                let packet = SpellPack { spell_id: d }
                    .pack_spell()
                    .map_err(|e| anyhow::anyhow!("spell packet failed to pack: {e}"))?;
                transport.send(&packet)?;
                info!("cast spell {d}");
            }
        }
    }

    Ok(())
}
