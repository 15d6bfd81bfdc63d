use std::sync::Arc;

use anyhow::Result;
use tablecall_channel::{BroadcastChannel, ServerEventsChannel};
use tablecall_core::TableNumber;
use tablecall_service::{IngestService, ResolutionService};
use tablecall_view::{BoardChange, DinerTracker, StaffView, ViewSources};
use tokio::sync::watch;

pub(crate) async fn run(table: Option<String>) -> Result<()> {
    let transports = super::connect().await?;
    // This process only sees its own broadcasts unless it follows a server.
    let channel: Arc<dyn BroadcastChannel> = match &transports.config.server_url {
        Some(url) => {
            tracing::info!(server = %url, "following server event stream");
            Arc::new(ServerEventsChannel::connect(url, transports.channel)?)
        },
        None => transports.channel,
    };
    let sources = ViewSources {
        store: transports.store.clone(),
        channel: Arc::clone(&channel),
        poll_interval: transports.config.poll_interval,
    };

    match table {
        Some(raw) => {
            let table = TableNumber::parse(&raw)?;
            let ingest = IngestService::new(transports.store, channel)
                .with_await_durable_write(transports.config.await_durable_write);
            let tracker = DinerTracker::mount(sources, table, Arc::new(ingest)).await;
            print_diner(&tracker);
            follow(tracker.subscribe(), |_| print_diner(&tracker)).await;
            tracker.unmount().await;
        },
        None => {
            let resolution = ResolutionService::new(transports.store, channel);
            let staff = StaffView::mount(sources, Arc::new(resolution)).await;
            print_staff(&staff.current());
            follow(staff.subscribe(), print_staff).await;
            staff.unmount().await;
        },
    }
    Ok(())
}

/// Print every change until Ctrl-C or the view stops.
async fn follow(mut rx: watch::Receiver<BoardChange>, mut print: impl FnMut(&BoardChange)) {
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let change = rx.borrow_and_update().clone();
                print(&change);
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

fn print_staff(change: &BoardChange) {
    for call in &change.arrived {
        tracing::info!(table = %call.table_number, call_type = %call.call_type, "new call");
    }
    let line = serde_json::json!({"revision": change.revision, "tables": change.board.tables()});
    println!("{line}");
}

fn print_diner(tracker: &DinerTracker) {
    let line = serde_json::json!({
        "table": tracker.table_number(),
        "state": tracker.state().as_str(),
    });
    println!("{line}");
}
