use evented_core::{
    BroadcastTransport, BroadcastTransportConfig, EventDeclarations, EventOptions, Evented,
    EventsResult,
};
use evented_manager::EventManager;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 收银台：声明本地事件 `Opened` 与经由传输到达的 `OrderPlaced`
fn till_declarations() -> EventsResult<Arc<EventDeclarations>> {
    let declarations = Arc::new(EventDeclarations::new("Till"));
    declarations.declare("Opened", EventOptions::local())?;
    declarations.declare("OrderPlaced", EventOptions::external("orders.placed"))?;
    Ok(declarations)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BroadcastTransportConfig::builder().capacity(64).build();
    let transport = Arc::new(BroadcastTransport::new(config)?);

    let kitchen = EventManager::with_host("kitchen", till_declarations()?, transport.clone());
    let waiter = EventManager::with_host(
        "waiter",
        Arc::new(EventDeclarations::new("Waiter")),
        transport.clone(),
    );

    kitchen.on("Opened", |_: &[Value]| {
        info!("kitchen is open");
        Ok(())
    })?;
    kitchen.emit("Opened", &[])?;

    let cooked = Arc::new(AtomicUsize::new(0));
    let counter = cooked.clone();
    kitchen.subscribe_as("OrderPlaced", "chef", move |args: &[Value]| {
        let [routing, order] = args else {
            anyhow::bail!("unexpected delivery arguments: {args:?}");
        };
        info!(%routing, %order, "cooking");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    waiter.external("OrderPlaced", "orders.placed")?;
    for dish in ["ramen", "gyoza", "mochi"] {
        waiter.emit_external("OrderPlaced", json!({ "dish": dish }))?;
    }

    tokio::time::timeout(Duration::from_secs(2), async {
        while cooked.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    kitchen.unsubscribe("OrderPlaced", "chef")?;
    info!(
        cooked = cooked.load(Ordering::SeqCst),
        subscribed = transport.is_subscribed("orders.placed"),
        "done"
    );
    Ok(())
}
