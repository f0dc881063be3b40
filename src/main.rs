use anyhow::Error;
use log::{info, warn};
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use spellwear::prelude::*;
use spellwear::transport::NullSpellTransport;
use spellwear::update::NullUpdateService;

/// Node binary: runs one spell-light node on the host, with UDP broadcast
/// standing in for the costume radio. Console digits 0-9 cast spells
/// directly, mirroring the serial fallback on the real devices.
fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Pick a role preset or a descriptor file
    let arg = std::env::args().nth(1).unwrap_or_else(|| "staff".to_string());
    let descriptor = match NodeDescriptor::preset(&arg) {
        Some(descriptor) => descriptor,
        None => NodeDescriptor::load(&arg)?,
    };
    info!(
        "node '{}': {} strands, {} pixels",
        descriptor.name,
        descriptor.strands.len(),
        descriptor.total_pixels()
    );

    let mailbox = SpellMailbox::new();

    // Wireless transport failure is fatal to the radio only; the node keeps
    // rendering and accepting console input without it.
    let mut transport: Box<dyn SpellTransport> = match UdpSpellTransport::bind(mailbox.clone()) {
        Ok(transport) => Box::new(transport),
        Err(e) => {
            warn!("wireless transport unavailable ({e}); continuing without radio");
            Box::new(NullSpellTransport)
        }
    };

    // The host build has no real firmware transport; the admission window
    // still runs so the boot sequence matches the devices.
    let mut update = NullUpdateService;

    let mut sink = FrameBuffer::new(&descriptor.strands, 128);
    let mut node = Node::new(descriptor, mailbox);

    let clock = Clock::new();
    node.open_admission_window(clock.now());

    // Console digit reader
    let (digit_tx, digit_rx) = mpsc::channel::<u8>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for c in line.chars() {
                if let Some(d) = c.to_digit(10) {
                    if digit_tx.send(d as u8).is_err() {
                        return;
                    }
                }
            }
        }
    });

    loop {
        let now = clock.now();
        for digit in digit_rx.try_iter() {
            node.handle_digit(digit, now, transport.as_mut());
        }
        node.run_tick(now, &mut sink, transport.as_mut(), &mut update, None)?;
        thread::sleep(Duration::from_millis(1));
    }
}
