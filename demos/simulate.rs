//! Simulated combat feed.
//!
//! Demonstrates:
//! - Building a bridge over a stub host, or over a WebSocket endpoint
//! - Subscribing to `CombatData` with enrichment enabled
//! - Replaying a sample encounter with `set_simulation`
//! - Ending the session through the host
//!
//! Usage:
//!   cargo run --example simulate
//!   cargo run --example simulate -- --debug
//!   cargo run --example simulate -- --ws ws://127.0.0.1:10501/ws

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use overlay_bridge::fake::sample_combat_data;
use overlay_bridge::{
    Bridge, BroadcastEvent, CombatantRecord, EventPort, HostEnvironment, Options, Responder,
    Result, listener,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    ws: Option<String>,
    ticks: u32,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            ws: value_of("--ws"),
            ticks: value_of("--ticks").and_then(|t| t.parse().ok()).unwrap_or(3),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "overlay_bridge=debug"
    } else {
        "overlay_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Stub Host
// ============================================================================

/// Host that is ready at once and answers every call with an echo.
struct StubHost;

#[async_trait]
impl HostEnvironment for StubHost {
    fn is_ready(&self) -> bool {
        true
    }

    fn install_event_port(&self, _port: EventPort) {}

    fn call_handler(&self, message: String, responder: Responder) {
        responder.respond_value(json!({ "echo": message }));
    }

    async fn end_encounter(&self) -> Result<Value> {
        Ok(json!({ "ended": true }))
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Simulated Combat Feed ===\n");

    let options = Options::new()
        .with_enrich_payloads()
        .with_simulation_interval(Duration::from_millis(500));

    let builder = Bridge::builder().options(options);
    let bridge = match &args.ws {
        Some(ws) => builder
            .page_url(format!("http://localhost/overlay.html?OVERLAY_WS={ws}"))
            .build()?,
        None => builder.host(Arc::new(StubHost)).build()?,
    };
    println!("[1] Bridge built in {} mode\n", bridge.mode());

    bridge.subscribe(
        "CombatData",
        listener(|event: &BroadcastEvent| {
            let Some(view) = event.payload.as_combat_data() else {
                return;
            };
            println!(
                "    {} ({}) {:.0} dps",
                view.encounter.title, view.encounter.duration, view.encounter.dps
            );
            for (name, record) in &view.combatants {
                match record {
                    CombatantRecord::Player(player) => println!(
                        "      {name:<12} {:<4} {:<6} {:>8.0} dps  max hit {} ({})",
                        player.job,
                        player.role.as_str(),
                        player.dps,
                        player.max_hit,
                        player.max_hit_damage
                    ),
                    CombatantRecord::LimitBreak(lb) => {
                        println!("      {name:<12} {:>20.0} dmg", lb.damage);
                    }
                }
            }
        }),
    );
    bridge.start_events();

    println!("[2] Replaying sample every 500ms ({} ticks)", args.ticks);
    bridge.set_simulation(Some(sample_combat_data()))?;
    tokio::time::sleep(Duration::from_millis(500) * args.ticks + Duration::from_millis(100)).await;
    bridge.set_simulation(None)?;
    println!("    ✓ Simulation stopped\n");

    if args.ws.is_none() {
        println!("[3] Ending session");
        let reply = bridge.end_session().await?;
        println!("    ✓ Host replied {reply}\n");
    }

    bridge.shutdown();
    println!("=== Done ===");
    Ok(())
}
