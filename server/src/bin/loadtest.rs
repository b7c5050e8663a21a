//! Load test for the relay server.
//!
//! Spawns game/controller pairs that:
//! - Create a room and join it with the returned code
//! - Stream gyro data every 50ms and shoot once per second
//! - Count the gyro updates and shots that reach the game side
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --pairs N        Number of game/controller pairs (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use futures_util::{SinkExt, StreamExt};
use iceage_shared::config::GYRO_INTERVAL_MS;
use iceage_shared::protocol::{ClientMsg, GyroData, ServerMsg};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    paired: AtomicU64,
    gyro_sent: AtomicU64,
    gyro_received: AtomicU64,
    shots_sent: AtomicU64,
    shots_received: AtomicU64,
    errors: AtomicU64,
    pair_latency_sum_ms: AtomicU64,
}

// === Helpers ===

async fn send(ws: &mut Ws, msg: &ClientMsg) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => ws.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

/// Wait for the first message accepted by `pick`.
async fn wait_for<T>(ws: &mut Ws, pick: impl Fn(ServerMsg) -> Option<T>) -> Option<T> {
    let fut = async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(server_msg) = serde_json::from_str::<ServerMsg>(&text) {
                        if let Some(found) = pick(server_msg) {
                            return Some(found);
                        }
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => {}
            }
        }
        None
    };
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .ok()
        .flatten()
}

// === Pair task ===

async fn run_pair(pair_id: u32, url: String, duration: Duration, metrics: Arc<Metrics>) {
    let pair_start = Instant::now();

    let (mut game, mut ctrl) = match (connect_async(&url).await, connect_async(&url).await) {
        (Ok((game, _)), Ok((ctrl, _))) => (game, ctrl),
        (Err(e), _) | (_, Err(e)) => {
            if pair_id < 5 {
                eprintln!("Pair {} failed to connect: {}", pair_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    // Game creates the room
    if !send(&mut game, &ClientMsg::CreateRoom).await {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }
    let code = wait_for(&mut game, |msg| match msg {
        ServerMsg::CreateRoomResult(ack) => Some(ack.room_code),
        _ => None,
    })
    .await
    .flatten();
    let Some(code) = code else {
        if pair_id < 5 {
            eprintln!("Pair {} could not create a room", pair_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    };

    // Controller joins it
    if !send(&mut ctrl, &ClientMsg::JoinRoom { room_code: code.clone() }).await {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }
    let joined = wait_for(&mut ctrl, |msg| match msg {
        ServerMsg::JoinRoomResult(ack) => Some(ack),
        _ => None,
    })
    .await;
    match joined {
        Some(ack) if ack.success => {}
        Some(ack) => {
            if pair_id < 5 {
                eprintln!("Pair {} join {} refused: {:?}", pair_id, code, ack.error);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
        None => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    metrics
        .pair_latency_sum_ms
        .fetch_add(pair_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.paired.fetch_add(1, Ordering::Relaxed);
    if pair_id < 3 {
        eprintln!("Pair {} paired on room {}", pair_id, code);
    }

    let mut gyro_timer = tokio::time::interval(Duration::from_millis(GYRO_INTERVAL_MS));
    gyro_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut shoot_timer = tokio::time::interval(Duration::from_secs(1));
    shoot_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut step: f64 = pair_id as f64;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = gyro_timer.tick() => {
                step += 0.1;
                let data = GyroData {
                    beta: 45.0 * step.sin(),
                    gamma: 30.0 * step.cos(),
                };
                if send(&mut ctrl, &ClientMsg::GyroData(data)).await {
                    metrics.gyro_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            _ = shoot_timer.tick() => {
                if send(&mut ctrl, &ClientMsg::Shoot).await {
                    metrics.shots_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = game.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::GyroUpdate(_)) => {
                                metrics.gyro_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::PlayerShoot) => {
                                metrics.shots_received.fetch_add(1, Ordering::Relaxed);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if pair_id < 3 {
                            eprintln!("Pair {} game error: {}", pair_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    _ => {}
                }
            }

            // Drain anything sent to the controller
            msg = ctrl.next() => {
                if !matches!(msg, Some(Ok(_))) {
                    break;
                }
            }
        }
    }

    let _ = ctrl.close(None).await;
    let _ = game.close(None).await;
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_pairs: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pairs" => {
                i += 1;
                num_pairs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Relay Server Load Test ===");
    println!("Pairs: {}", num_pairs);
    println!("Duration: {}s", duration_secs);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_pairs as usize);
    let spawn_start = Instant::now();

    for pair_id in 0..num_pairs {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            run_pair(pair_id, url, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if pair_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All pairs spawned in {:?}", spawn_start.elapsed());

    for handle in handles {
        let _ = handle.await;
    }

    let paired = metrics.paired.load(Ordering::Relaxed);
    let gyro_sent = metrics.gyro_sent.load(Ordering::Relaxed);
    let gyro_received = metrics.gyro_received.load(Ordering::Relaxed);
    let shots_sent = metrics.shots_sent.load(Ordering::Relaxed);
    let shots_received = metrics.shots_received.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let latency_sum = metrics.pair_latency_sum_ms.load(Ordering::Relaxed);

    println!();
    println!("=== Final Results ===");
    println!("Pairs established: {}/{}", paired, num_pairs);
    println!("Gyro sent/received: {}/{}", gyro_sent, gyro_received);
    println!("Shots sent/received: {}/{}", shots_sent, shots_received);
    println!("Errors: {}", errors);
    if paired > 0 {
        println!("Average pairing latency: {}ms", latency_sum / paired);
    }
    if gyro_sent > 0 {
        println!(
            "Gyro delivery ratio: {:.1}%",
            gyro_received as f64 * 100.0 / gyro_sent as f64
        );
    }
}
