use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tryouts_core::commands::Outbound;

/// Drains the outbound queue to the transport in FIFO order, enforcing
/// the minimum interval between sends (Bancho silences chatty clients).
/// Every send is logged. No business logic lives here.
///
/// The task ends when the queue side is closed and drained, so shutdown
/// can flush pending closes by dropping the queue sender and awaiting
/// the handle.
pub fn spawn_emitter(
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    wire: mpsc::Sender<Outbound>,
    min_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = queue.recv().await {
            tracing::info!(target = %msg.target, text = %msg.text, "Sending");
            if wire.send(msg).await.is_err() {
                tracing::info!("Transport gone, stopping the emitter");
                break;
            }
            tokio::time::sleep(min_interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn preserves_fifo_order() {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (wire_tx, mut wire_rx) = mpsc::channel(16);
        spawn_emitter(queue_rx, wire_tx, Duration::from_millis(1));

        for i in 0..3 {
            queue_tx
                .send(Outbound::new("#mp_1", format!("msg {i}")))
                .unwrap();
        }
        for i in 0..3 {
            let msg = wire_rx.recv().await.unwrap();
            assert_eq!(msg.text, format!("msg {i}"));
        }
    }

    #[tokio::test]
    async fn enforces_the_minimum_interval() {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (wire_tx, mut wire_rx) = mpsc::channel(16);
        spawn_emitter(queue_rx, wire_tx, Duration::from_millis(50));

        let started = Instant::now();
        for i in 0..3 {
            queue_tx
                .send(Outbound::new("#mp_1", format!("msg {i}")))
                .unwrap();
        }
        for _ in 0..3 {
            wire_rx.recv().await.unwrap();
        }
        // Third delivery cannot arrive before two full intervals passed.
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn drains_and_exits_when_the_queue_closes() {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (wire_tx, mut wire_rx) = mpsc::channel(16);
        let handle = spawn_emitter(queue_rx, wire_tx, Duration::from_millis(1));

        queue_tx.send(Outbound::new("#mp_1", "!mp close")).unwrap();
        drop(queue_tx);

        let msg = wire_rx.recv().await.unwrap();
        assert_eq!(msg.text, "!mp close");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("emitter should exit after the queue closes")
            .unwrap();
    }

    #[tokio::test]
    async fn stops_when_the_transport_goes_away() {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (wire_tx, wire_rx) = mpsc::channel(16);
        let handle = spawn_emitter(queue_rx, wire_tx, Duration::from_millis(1));

        drop(wire_rx);
        queue_tx.send(Outbound::new("#mp_1", "hello")).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("emitter should exit when the transport drops")
            .unwrap();
    }
}
