//! The bus consumer loop.
//!
//! One task owns the [`EventRouter`]. It takes events off the bus one at a
//! time, runs the staleness sweep on a timer between events, and publishes a
//! fresh status view after each step.

use std::future::Future;
use std::time::Duration;

use sentient_infrastructure::BusSubscription;
use sentient_orchestrator::EventRouter;
use sentient_orchestrator::application::query_handlers::OrchestratorStatusView;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Creates the status channel, seeded with the router's current view.
#[must_use]
pub fn status_channel(
    router: &EventRouter,
) -> (
    watch::Sender<OrchestratorStatusView>,
    watch::Receiver<OrchestratorStatusView>,
) {
    watch::channel(router.status_view())
}

/// Drives the router from the bus until shutdown.
#[derive(Debug)]
pub struct OrchestratorRuntime {
    router: EventRouter,
    subscription: BusSubscription,
    status: watch::Sender<OrchestratorStatusView>,
    controller_timeout: chrono::Duration,
    check_interval: Duration,
}

impl OrchestratorRuntime {
    #[must_use]
    pub fn new(
        router: EventRouter,
        subscription: BusSubscription,
        status: watch::Sender<OrchestratorStatusView>,
        controller_timeout: chrono::Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            router,
            subscription,
            status,
            controller_timeout,
            check_interval,
        }
    }

    /// Runs until `shutdown` resolves or the bus closes. Returns the router
    /// so callers can inspect final state.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> EventRouter {
        let mut sweep = tokio::time::interval(self.check_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        sweep.tick().await;
        tokio::pin!(shutdown);

        info!(
            service = self.router.orchestrator().origin(),
            check_interval_ms = self.check_interval.as_millis(),
            controller_timeout_ms = self.controller_timeout.num_milliseconds(),
            "orchestrator consumer started"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("orchestrator consumer stopping");
                    break;
                }
                event = self.subscription.next_event() => {
                    let Some(event) = event else {
                        warn!("domain event bus closed");
                        break;
                    };
                    self.router.dispatch(&event).await;
                    self.publish_status();
                }
                _ = sweep.tick() => {
                    self.router.sweep_stale_controllers(self.controller_timeout);
                    self.router.flush_pending().await;
                    self.publish_status();
                }
            }
        }

        self.router
    }

    fn publish_status(&self) {
        self.status.send_replace(self.router.status_view());
    }
}
