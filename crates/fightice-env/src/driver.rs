//! Match driver: the background thread pumping one match
//!
//! The thread blocks inside `run_game` for the whole match. A failure there
//! is reported through the `on_crash` hook and the thread exits; nothing
//! ever propagates to the caller thread, which observes the crash on its
//! next `step`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fightice_bridge::{GatewayClient, MatchDescriptor};
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Spawn the driver thread for one created match.
pub fn spawn_match_driver(
    runtime: Handle,
    gateway: Arc<GatewayClient>,
    descriptor: MatchDescriptor,
    on_crash: impl FnOnce(String) + Send + 'static,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("match-driver".into())
        .spawn(move || match runtime.block_on(gateway.run_game(&descriptor)) {
            Ok(()) => info!(game_id = descriptor.game_id(), "match loop completed"),
            Err(e) => {
                warn!(game_id = descriptor.game_id(), "match loop failed: {}", e);
                on_crash(e.to_string());
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fightice_bridge::protocol::serialize;
    use fightice_bridge::{AsyncReader, AsyncWriter};
    use fightice_bridge::{GatewayResponse, TcpReadWrapper, TcpWriteWrapper};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Fake gateway: acknowledges the redirect, creates a match, then
    /// answers RunGame with the scripted response or a dropped connection.
    async fn fake_gateway(listener: TcpListener, finish: Option<GatewayResponse>) {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = TcpReadWrapper(read_half);
        let mut writer = TcpWriteWrapper(write_half);

        let _redirect = reader.read_message().await.unwrap();
        writer
            .write_message(&serialize(&GatewayResponse::Ok).unwrap())
            .await
            .unwrap();

        let _create = reader.read_message().await.unwrap();
        writer
            .write_message(&serialize(&GatewayResponse::GameCreated { game_id: 1 }).unwrap())
            .await
            .unwrap();

        let _run = reader.read_message().await.unwrap();
        if let Some(response) = finish {
            writer
                .write_message(&serialize(&response).unwrap())
                .await
                .unwrap();
        }
        // Dropping the stream here breaks the bridge
    }

    fn driver_fixture(
        finish: Option<GatewayResponse>,
    ) -> (tokio::runtime::Runtime, Arc<GatewayClient>, MatchDescriptor) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let (gateway, descriptor) = runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            tokio::spawn(fake_gateway(listener, finish));
            let gateway = GatewayClient::connect(port, Duration::from_secs(1))
                .await
                .unwrap();
            let descriptor = gateway
                .create_game("ZEN", "ZEN", "EnvObserver", "MctsAi", 3)
                .await
                .unwrap();
            (gateway, descriptor)
        });

        (runtime, Arc::new(gateway), descriptor)
    }

    fn run_driver(finish: Option<GatewayResponse>) -> bool {
        let (runtime, gateway, descriptor) = driver_fixture(finish);
        let crashed = Arc::new(AtomicBool::new(false));

        let handle = {
            let crashed = crashed.clone();
            spawn_match_driver(
                runtime.handle().clone(),
                gateway,
                descriptor,
                move |_note| crashed.store(true, Ordering::SeqCst),
            )
            .unwrap()
        };

        handle.join().unwrap();
        crashed.load(Ordering::SeqCst)
    }

    #[test]
    fn crash_invokes_hook_and_exits_thread() {
        assert!(run_driver(None));
    }

    #[test]
    fn normal_finish_leaves_hook_untouched() {
        assert!(!run_driver(Some(GatewayResponse::GameFinished)));
    }
}
