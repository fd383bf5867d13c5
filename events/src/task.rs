//! The relay task consuming one organization's upstream subscription.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{OrgRelay, UpstreamEvent};

/// Spawn the task that applies upstream events to `relay` until the upstream
/// queue closes or `shutdown` resolves.
///
/// Client attach/detach never affects this task; the upstream subscription
/// lives as long as the process.
pub fn spawn_relay(
    relay: Arc<OrgRelay>,
    mut upstream: mpsc::Receiver<UpstreamEvent>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> JoinHandle<()> {
    let span = info_span!("relay", org = %relay.organization());
    tokio::spawn(
        async move {
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    () = &mut shutdown => {
                        debug!("shutdown signalled, stopping relay");
                        break;
                    }
                    event = upstream.recv() => match event {
                        Some(UpstreamEvent::Status(status)) => {
                            let delivered = relay.set_status(status);
                            info!(%status, delivered, "upstream status changed");
                        }
                        Some(UpstreamEvent::Block(block)) => {
                            let delivered = relay.publish_block(block);
                            debug!(delivered, "relayed block");
                        }
                        None => {
                            warn!("upstream event source closed");
                            break;
                        }
                    },
                }
            }
        }
        .instrument(span),
    )
}
