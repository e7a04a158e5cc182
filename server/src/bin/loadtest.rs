//! Load test for the hoops server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server and join one of several lobbies
//! - Send randomized input messages at a fixed rate
//! - Receive and count world_state snapshots
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --lobbies M      Number of lobbies to spread them over (default: 10)
//!   --duration S     Test duration in seconds (default: 30)
//!   --input-rate R   Input messages per second per client (default: 20)
//!   --seed N         RNG seed for input generation (default: 42)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use futures_util::{SinkExt, StreamExt};
use hoops_shared::protocol::{ClientMsg, InputFlags, InputMsg, ServerMsg};
use hoops_shared::quat::Quat;
use hoops_shared::vec3::vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    world_states_received: AtomicU64,
    scores_received: AtomicU64,
    inputs_sent: AtomicU64,
    errors: AtomicU64,
    players_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            world_states_received: AtomicU64::new(0),
            scores_received: AtomicU64::new(0),
            inputs_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            players_seen: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

struct ClientPlan {
    client_id: u32,
    url: String,
    lobby_id: String,
    input_rate: f64,
    duration: Duration,
    seed: u64,
}

/// Random walk over the six input flags plus a slowly turning yaw.
fn random_input(rng: &mut ChaCha8Rng, yaw: &mut f64) -> InputMsg {
    *yaw += rng.gen_range(-0.3..0.3);
    InputMsg {
        inputs: InputFlags {
            forward: Some(rng.gen_bool(0.6)),
            backward: Some(rng.gen_bool(0.1)),
            left: Some(rng.gen_bool(0.2)),
            right: Some(rng.gen_bool(0.2)),
            jump: Some(rng.gen_bool(0.05)),
            sprint: Some(rng.gen_bool(0.3)),
        },
        orientation: Some(Quat::from_axis_angle(vec3(0.0, 1.0, 0.0), *yaw)),
    }
}

// === Client task ===

async fn run_client(plan: ClientPlan, metrics: Arc<Metrics>) {
    let client_id = plan.client_id;
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&plan.url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let join = ClientMsg::Join {
        lobby_id: plan.lobby_id.clone(),
    };
    let Ok(json) = serde_json::to_string(&join) else {
        return;
    };
    if ws.send(Message::Text(json.into())).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // Wait for init before doing anything else
    let init = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::Init(init)) = serde_json::from_str::<ServerMsg>(&text) {
                        return Some(init.self_id);
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => {}
            }
        }
        None
    })
    .await;

    let self_id = match init {
        Ok(Some(id)) => id,
        Ok(None) | Err(_) => {
            if client_id < 3 {
                eprintln!("Client {} never got init", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    if client_id < 3 {
        eprintln!(
            "Client {} is session {} in lobby {}",
            client_id, self_id, plan.lobby_id
        );
    }

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let input_interval = if plan.input_rate > 0.0 {
        Duration::from_secs_f64(1.0 / plan.input_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut input_timer = tokio::time::interval(input_interval);
    input_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::seed_from_u64(plan.seed ^ u64::from(client_id));
    let mut yaw = 0.0;
    let test_end = Instant::now() + plan.duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = input_timer.tick() => {
                let msg = ClientMsg::Input(random_input(&mut rng, &mut yaw));
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::WorldState(state)) => {
                                metrics.world_states_received.fetch_add(1, Ordering::Relaxed);
                                metrics.players_seen.fetch_add(state.players.len() as u64, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Scored(_)) => {
                                metrics.scores_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(_) => {}
                            Err(e) => {
                                if client_id < 3 {
                                    eprintln!("Client {} could not parse message: {}", client_id, e);
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut num_lobbies: u32 = 10;
    let mut duration_secs: u64 = 30;
    let mut input_rate: f64 = 20.0;
    let mut seed: u64 = 42;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--lobbies" => {
                i += 1;
                num_lobbies = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10)
                    .max(1);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--input-rate" => {
                i += 1;
                input_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20.0);
            }
            "--seed" => {
                i += 1;
                seed = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(42);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Hoops Server Load Test ===");
    println!("Clients: {} across {} lobbies", num_clients, num_lobbies);
    println!("Duration: {}s", duration_secs);
    println!("Input rate: {}/s per client", input_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let plan = ClientPlan {
            client_id,
            url: url.clone(),
            lobby_id: format!("load-{}", client_id % num_lobbies),
            input_rate,
            duration,
            seed,
        };
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(run_client(plan, metrics)));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, world_states={}, scores={}, inputs={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.world_states_received.load(Ordering::Relaxed),
                metrics_clone.scores_received.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let world_states = metrics.world_states_received.load(Ordering::Relaxed);
    let scores = metrics.scores_received.load(Ordering::Relaxed);
    let inputs = metrics.inputs_sent.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let players = metrics.players_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total world_state messages: {}", world_states);
    println!("Total scored messages: {}", scores);
    println!("Total inputs sent: {}", inputs);
    println!("Total errors: {}", errors);
    if world_states > 0 {
        println!(
            "Average players per snapshot: {:.1}",
            players as f64 / world_states as f64
        );
    }
    if latency_count > 0 {
        println!("Average join latency: {}ms", latency_sum / latency_count);
    }

    let msgs_per_sec = msgs as f64 / duration_secs.max(1) as f64;
    let per_client = world_states as f64 / num_clients.max(1) as f64;
    let expected = duration_secs as f64 * 60.0; // 60 Hz snapshots

    println!();
    println!("Messages/sec (total): {:.0}", msgs_per_sec);
    println!("World states per client: {:.1}", per_client);
    println!("Expected world states per client: {:.1}", expected);
    if expected > 0.0 {
        println!("Delivery rate: {:.1}%", per_client / expected * 100.0);
    }
}
