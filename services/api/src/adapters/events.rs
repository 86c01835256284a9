//! services/api/src/adapters/events.rs
//!
//! The in-process event bus that implements the core's `EventPublisher` port,
//! and the listener that hands domain events to the notification side.
//! Mail delivery itself lives outside this service; the listener records
//! what would be sent.

use course_progress_core::events::{DomainEvent, EventPublisher};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fans domain events out to every subscriber over a `tokio` broadcast channel.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    /// Creates a publisher that buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        // `send` only fails when nobody is subscribed.
        if self.sender.send(event).is_err() {
            debug!(event = name, "No subscribers for domain event");
        }
    }
}

/// Consumes domain events until the channel closes or `shutdown` fires.
/// Returns how many events were handled.
pub async fn run_notification_listener(
    mut receiver: broadcast::Receiver<DomainEvent>,
    shutdown: CancellationToken,
) -> usize {
    let mut handled = 0;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(handled, "Notification listener shutting down");
                break;
            }
            received = receiver.recv() => {
                match received {
                    Ok(event) => {
                        handled += 1;
                        notify(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification listener fell behind; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
    handled
}

fn notify(event: &DomainEvent) {
    match event {
        DomainEvent::EnrollmentCreated { user_id, course_id, .. } => {
            info!(%user_id, %course_id, "Notification queued: enrollment confirmation");
        }
        DomainEvent::ChapterAccepted { user_id, chapter_id, submission_id, .. } => {
            info!(%user_id, %chapter_id, %submission_id, "Notification queued: chapter accepted");
        }
        DomainEvent::SubmissionReviewed { user_id, status, .. } => {
            info!(%user_id, status = %status, "Notification queued: submission reviewed");
        }
        other => debug!(event = other.name(), "Domain event has no notification"),
    }
}
