use std::time::Duration;

use tollgate_runner::Runner;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    Runner::new()
        .with_named_process("heartbeat", |ctx| async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!("heartbeat stopping");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        tracing::info!("heartbeat");
                    }
                }
            }
            Ok(())
        })
        .with_closer(|| async move {
            tracing::info!("cleaning up");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(5))
        .run()
        .await;
}
