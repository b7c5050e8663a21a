use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::registry::ConnectionId;
use crate::relay::ClientLink;
use crate::state::{HubState, HubStats};
use iceage_shared::protocol::GyroData;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

/// Commands from client connections to the hub
pub enum HubCommand {
    Connect {
        link: ClientLink,
        response: oneshot::Sender<ConnectionId>,
    },
    CreateRoom {
        conn: ConnectionId,
        response: oneshot::Sender<Result<String, SessionError>>,
    },
    JoinRoom {
        conn: ConnectionId,
        code: String,
        response: oneshot::Sender<Result<(), SessionError>>,
    },
    Gyro {
        conn: ConnectionId,
        data: GyroData,
    },
    Shoot {
        conn: ConnectionId,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Stats {
        response: oneshot::Sender<HubStats>,
    },
}

/// Run the hub. Owns all room and connection state; each command and each
/// sweep tick runs to completion before the next one starts.
pub async fn run_hub(mut cmd_rx: mpsc::Receiver<HubCommand>, config: ServerConfig) {
    let mut state = HubState::new(&config);

    let mut sweep_interval =
        tokio::time::interval_at(Instant::now() + config.sweep_interval, config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let expired = state.sweep(Instant::now().into_std());
                if !expired.is_empty() {
                    tracing::info!("Sweep removed {} expired room(s)", expired.len());
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    HubCommand::Connect { link, response } => {
                        let id = state.connect(link);
                        if response.send(id).is_err() {
                            // Socket went away before registering
                            state.disconnect(id);
                        }
                    }
                    HubCommand::CreateRoom { conn, response } => {
                        let _ = response.send(state.create_room(conn, Instant::now().into_std()));
                    }
                    HubCommand::JoinRoom { conn, code, response } => {
                        let _ = response.send(state.join_room(conn, &code));
                    }
                    HubCommand::Gyro { conn, data } => {
                        state.gyro(conn, data);
                    }
                    HubCommand::Shoot { conn } => {
                        state.shoot(conn);
                    }
                    HubCommand::Disconnect { conn } => {
                        state.disconnect(conn);
                    }
                    HubCommand::Stats { response } => {
                        let _ = response.send(state.stats());
                    }
                }
            }

            else => break,
        }
    }

    tracing::info!("Hub ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use iceage_shared::protocol::ServerMsg;
    use std::time::Duration;

    fn spawn_hub(config: ServerConfig) -> mpsc::Sender<HubCommand> {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run_hub(rx, config));
        tx
    }

    async fn connect(
        hub: &mpsc::Sender<HubCommand>,
    ) -> (ConnectionId, crate::relay::LinkReceivers) {
        let (link, rx) = ClientLink::channel(16);
        let (resp_tx, resp_rx) = oneshot::channel();
        hub.send(HubCommand::Connect {
            link,
            response: resp_tx,
        })
        .await
        .unwrap();
        (resp_rx.await.unwrap(), rx)
    }

    async fn create(
        hub: &mpsc::Sender<HubCommand>,
        conn: ConnectionId,
    ) -> Result<String, SessionError> {
        let (tx, rx) = oneshot::channel();
        hub.send(HubCommand::CreateRoom { conn, response: tx })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn join(
        hub: &mpsc::Sender<HubCommand>,
        conn: ConnectionId,
        code: &str,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        hub.send(HubCommand::JoinRoom {
            conn,
            code: code.to_string(),
            response: tx,
        })
        .await
        .unwrap();
        rx.await.unwrap()
    }

    async fn stats(hub: &mpsc::Sender<HubCommand>) -> HubStats {
        let (tx, rx) = oneshot::channel();
        hub.send(HubCommand::Stats { response: tx }).await.unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn concurrent_joins_have_one_winner() {
        let hub = spawn_hub(ServerConfig {
            rng_seed: Some(3),
            ..Default::default()
        });
        let (game, _game_rx) = connect(&hub).await;
        let code = create(&hub, game).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let hub = hub.clone();
            let code = code.clone();
            tasks.push(tokio::spawn(async move {
                let (conn, rx) = connect(&hub).await;
                (join(&hub, conn, &code).await, rx)
            }));
        }

        let mut ok = 0;
        let mut full = 0;
        for task in tasks {
            match task.await.unwrap().0 {
                Ok(()) => ok += 1,
                Err(SessionError::RoomFull) => full += 1,
                Err(other) => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(full, 7);
    }

    #[tokio::test]
    async fn shots_arrive_in_order_through_hub() {
        let hub = spawn_hub(ServerConfig {
            rng_seed: Some(4),
            ..Default::default()
        });
        let (game, mut game_rx) = connect(&hub).await;
        let (ctrl, _ctrl_rx) = connect(&hub).await;
        let code = create(&hub, game).await.unwrap();
        join(&hub, ctrl, &code).await.unwrap();
        assert_eq!(
            game_rx.notices.recv().await,
            Some(ServerMsg::ControllerConnected)
        );

        for _ in 0..10 {
            hub.send(HubCommand::Shoot { conn: ctrl }).await.unwrap();
        }
        for _ in 0..10 {
            assert_eq!(game_rx.shots.recv().await, Some(ServerMsg::PlayerShoot));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sweep_expires_rooms() {
        let hub = spawn_hub(ServerConfig {
            rng_seed: Some(5),
            max_room_age: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
            ..Default::default()
        });
        let start = Instant::now();
        let (game, mut game_rx) = connect(&hub).await;
        let (ctrl, mut ctrl_rx) = connect(&hub).await;
        let code = create(&hub, game).await.unwrap();
        join(&hub, ctrl, &code).await.unwrap();

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(stats(&hub).await.rooms, 1);

        // Paused clock auto-advances to the sweep that finds the room too old.
        assert_eq!(
            ctrl_rx.notices.recv().await,
            Some(ServerMsg::GameDisconnected)
        );
        assert!(start.elapsed() > Duration::from_secs(30));
        assert_eq!(
            game_rx.notices.recv().await,
            Some(ServerMsg::ControllerConnected)
        );
        assert_eq!(game_rx.notices.recv().await, Some(ServerMsg::RoomExpired));
        assert_eq!(stats(&hub).await.rooms, 0);
    }

    #[tokio::test]
    async fn disconnect_of_unknown_connection_is_harmless() {
        let hub = spawn_hub(ServerConfig::default());
        hub.send(HubCommand::Disconnect { conn: 999 }).await.unwrap();
        assert_eq!(
            stats(&hub).await,
            HubStats {
                rooms: 0,
                connections: 0
            }
        );
    }
}
