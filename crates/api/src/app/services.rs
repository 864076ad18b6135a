//! Infrastructure wiring: the ledger, its journal and bus, the sensor store, and the
//! realtime channel feeding `/ledger/stream`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{debug, info};

use agrichain_events::{Event, InMemoryEventBus, Subscription};
use agrichain_infra::event_store::InMemoryEventStore;
use agrichain_infra::{Clock, InMemorySensorStore, Ledger, NotificationEnvelope, SystemClock};

use crate::config::AppConfig;

pub type AppLedger = Ledger<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<NotificationEnvelope>>>;

/// Shared state handed to every handler through an `Extension`.
#[derive(Debug)]
pub struct AppServices {
    ledger: AppLedger,
    sensors: InMemorySensorStore,
    realtime_tx: broadcast::Sender<NotificationEnvelope>,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(InMemoryEventBus::<NotificationEnvelope>::new());

    let ledger = Ledger::open(store, bus, clock.clone()).context("failed to open ledger")?;
    for (address, amount) in &config.genesis {
        let balance = ledger
            .fund_account(*address, *amount)
            .with_context(|| format!("failed to credit genesis balance of {address}"))?;
        info!(%address, %balance, "genesis balance credited");
    }

    // Realtime channel (SSE): lossy broadcast, fed from a bus subscription.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<NotificationEnvelope>(256);
    spawn_realtime_bridge(ledger.subscribe(), realtime_tx.clone())?;

    let sensors = InMemorySensorStore::new(config.sensors, clock);

    Ok(AppServices {
        ledger,
        sensors,
        realtime_tx,
    })
}

/// Forward bus notifications into the async broadcast channel.
///
/// The bus subscription is blocking, so it gets its own thread. The thread ends once
/// the bus (and with it the ledger) is gone.
fn spawn_realtime_bridge(
    subscription: Subscription<NotificationEnvelope>,
    realtime_tx: broadcast::Sender<NotificationEnvelope>,
) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("ledger-realtime".to_string())
        .spawn(move || {
            while let Ok(envelope) = subscription.recv() {
                // No SSE clients connected is not an error.
                let _ = realtime_tx.send(envelope);
            }
            debug!("realtime bridge stopped");
        })
        .context("failed to spawn realtime bridge thread")?;
    Ok(())
}

impl AppServices {
    pub fn ledger(&self) -> &AppLedger {
        &self.ledger
    }

    pub fn sensors(&self) -> &InMemorySensorStore {
        &self.sensors
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<NotificationEnvelope> {
        &self.realtime_tx
    }
}

/// Build the SSE stream of ledger notifications (used by `/ledger/stream`).
pub fn ledger_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(envelope) => {
            let data = serde_json::to_string(&serde_json::json!({
                "position": envelope.position(),
                "notification": envelope.payload(),
            }))
            .unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default()
                .event(envelope.payload().event_type())
                .id(envelope.position().to_string())
                .data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
