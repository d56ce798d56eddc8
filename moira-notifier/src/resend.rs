//! The resend path (§4.5): what happens to a package once delivery fails,
//! times out, or has nowhere to go.

use std::time::Duration;

use moira_common::{Clock, NotificationPackage, ScheduledNotification};
use moira_store::Store;
use tracing::{error, info};

/// Resend one failed package, unless it carries `do_not_resend` (set on
/// self-state admin alerts to avoid feedback loops).
///
/// Each event in the package is re-enqueued as its own fresh
/// `ScheduledNotification`, targeted one minute out, with the package's
/// shared fail-count incremented by one. Once `fail_count * 1 minute`
/// exceeds `resending_timeout`, the package is dropped and logged as a
/// permanent failure instead.
pub async fn resend(
    store: &dyn Store,
    clock: &dyn Clock,
    package: NotificationPackage,
    resending_timeout: Duration,
) {
    if package.do_not_resend {
        info!(%package, "package is marked do-not-resend, dropping after failed delivery");
        return;
    }

    let fail_count = package.fail_count + 1;
    if Duration::from_secs(u64::from(fail_count) * 60) > resending_timeout {
        error!(%package, fail_count, "resend budget exhausted, dropping package permanently");
        return;
    }

    let now = clock.now();
    for event in &package.events {
        let notification = ScheduledNotification {
            event: event.clone(),
            trigger: package.trigger.clone(),
            contact: package.contact.clone(),
            throttled: package.throttled,
            send_fail: fail_count,
            timestamp: now + 60,
        };

        if let Err(error) = store.add_notification(notification).await {
            error!(%error, "failed to re-enqueue notification during resend");
        }
    }
}
