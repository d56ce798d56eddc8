//! The throttling engine (§4.2): decides when a notification for a given
//! event may actually fire, suppressing alert storms by delaying delivery
//! once a trigger crosses one of two windowed event-count thresholds.

use moira_common::{Clock, Event, Subscription};
use moira_store::Store;
use tracing::warn;

use crate::schedule::next_allowed;

/// `(window_seconds, event_threshold, delay_seconds)`, evaluated in order;
/// the first level whose threshold is met wins.
const THROTTLING_LEVELS: [(i64, u64, i64); 2] = [
    (3 * 3600, 20, 3600),
    (3600, 10, 30 * 60),
];

/// Compute the target delivery instant and throttled flag for `event`
/// against `subscription`, per §4.2.
///
/// `send_fail` is the notification's current resend counter — nonzero means
/// this call is re-scheduling a previously failed delivery, which bypasses
/// throttling entirely (step: resend bypass).
pub async fn compute_next_delivery(
    store: &dyn Store,
    clock: &dyn Clock,
    event: &Event,
    subscription: &Subscription,
    send_fail: u32,
) -> (i64, bool) {
    let now = clock.now();

    if event.state == moira_common::State::Test {
        return (now, false);
    }
    if send_fail > 0 {
        return (now + 60, false);
    }

    let (next_allowed_ts, throttling_beginning) = store
        .get_trigger_throttling_timestamps(&event.trigger_id)
        .await
        .unwrap_or((0, 0));

    let (mut base, mut throttled) = if next_allowed_ts > now {
        (next_allowed_ts, true)
    } else {
        (now, false)
    };

    if !subscription.throttling_enabled {
        base = now;
        throttled = false;
    } else if base <= now {
        for &(window, threshold, delay) in &THROTTLING_LEVELS {
            let from = (now - window).max(throttling_beginning);
            let count = store
                .get_trigger_events_count(&event.trigger_id, from)
                .await
                .unwrap_or(0);

            if count >= threshold {
                base = now + delay;
                throttled = true;
                let _ = store
                    .set_trigger_throttling_timestamp(&event.trigger_id, base)
                    .await;
                break;
            } else if count + 1 == threshold {
                throttled = true;
            }
        }
    }

    match next_allowed(base, &subscription.schedule) {
        Ok(adjusted) => base = adjusted,
        Err(error) => {
            warn!(trigger_id = %event.trigger_id, %error, "schedule evaluator found no allowed window, delivering at unadjusted base");
        }
    }

    (base, throttled)
}
