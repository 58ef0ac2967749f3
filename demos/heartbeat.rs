//! Intcode Heartbeat
//!
//! Runs the self-check programs end to end: arithmetic, quine, large
//! values, the feedback amplifier search and a small packet network.
//! If this runs, your stack works.
//!
//! Usage: RUST_LOG=intcode=debug cargo run --example heartbeat

use intcode::amplifier::{max_feedback_signal, AmplifierConfig};
use intcode::network::{Network, NetworkConfig};
use intcode::{Machine, Program, QueueHost};
use tracing_subscriber::EnvFilter;

// Node 1 boots by sending (7, 42) to node 2, node 2 forwards to 255,
// node 0 relays wake-ups to 255 while decrementing Y down to 40.
const NIC: &str = "3,84,1005,84,36,3,85,1008,85,-1,87,1005,87,5,3,86,1007,86,41,87,1005,87,27,\
1001,86,-1,86,104,255,4,85,4,86,1105,1,5,1008,84,1,87,1006,87,52,104,2,104,7,104,42,1105,1,79,\
1008,84,2,87,1006,87,79,3,85,1008,85,-1,87,1005,87,59,3,86,104,255,4,85,4,86,1105,1,59,3,85,\
1105,1,79,0,0,0,0";

fn main() -> intcode::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Intcode Heartbeat ===\n");

    // 1. Arithmetic self-check
    let program: Program = "1,9,10,3,2,3,11,0,99,30,40,50".parse()?;
    let mut vm = Machine::new(&program);
    vm.run(&mut QueueHost::new())?;
    println!("  [0] after run: {}  ({} instructions)", vm.peek(0), vm.steps());

    // 2. Relative-mode quine
    let quine: Program = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99".parse()?;
    let mut host = QueueHost::new();
    Machine::new(&quine).run(&mut host)?;
    println!("  Quine reproduces itself: {}", host.outputs() == quine.as_slice());

    // 3. Large values
    let mut host = QueueHost::new();
    Machine::new(&"1102,34915192,34915192,7,4,7,99,0".parse::<Program>()?).run(&mut host)?;
    println!("  Large multiply: {:?}", host.outputs());

    // 4. Feedback amplifiers
    let amps: Program = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,\
1005,28,6,99,0,0,5"
        .parse()?;
    let best = max_feedback_signal(&amps, &[5, 6, 7, 8, 9], &AmplifierConfig::default())?;
    println!("  Best feedback signal: {} with phases {:?}", best.signal, best.phases);

    // 5. Packet network
    let nic: Program = NIC.parse()?;
    let mut network = Network::new(&nic, NetworkConfig::default());
    let y = network.run_until_repeated_wakeup()?;
    println!(
        "  Network settled on Y={} after {} rounds ({} wake-ups, first packet {})",
        y,
        network.rounds(),
        network.wakeups(),
        network.first_collected().map_or_else(|| "-".to_string(), |p| p.to_string()),
    );

    println!("\n=== Heartbeat OK ===");
    Ok(())
}
