//! Stream counters, emitted through the `metrics` facade.

use std::sync::LazyLock;

use evmgw_sdk::objects::SubscriptionKind;
use metrics::{Counter, counter, describe_counter};

const SUBSCRIPTIONS_CREATED: &str = "evmgw.stream.subscriptions_created";
const SUBSCRIPTIONS_CREATED_HELP: &str = "Number of subscriptions created";

const SUBSCRIPTIONS_CLOSED: &str = "evmgw.stream.subscriptions_closed";
const SUBSCRIPTIONS_CLOSED_HELP: &str = "Number of subscriptions closed";

const NOTIFY_FAILURES: &str = "evmgw.stream.notify_failures";
const NOTIFY_FAILURES_HELP: &str = "Number of payloads the transport failed to deliver";

const HEIGHTS_STREAMED: &str = "evmgw.stream.heights_streamed";
const HEIGHTS_STREAMED_HELP: &str = "Number of heights a subscription cursor moved past";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(SUBSCRIPTIONS_CREATED, SUBSCRIPTIONS_CREATED_HELP);
    describe_counter!(SUBSCRIPTIONS_CLOSED, SUBSCRIPTIONS_CLOSED_HELP);
    describe_counter!(NOTIFY_FAILURES, NOTIFY_FAILURES_HELP);
    describe_counter!(HEIGHTS_STREAMED, HEIGHTS_STREAMED_HELP);
});

fn kind_counter(name: &'static str, kind: SubscriptionKind) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(name, "kind" => kind.as_str())
}

pub(crate) fn record_subscription_created(kind: SubscriptionKind) {
    kind_counter(SUBSCRIPTIONS_CREATED, kind).increment(1);
}

pub(crate) fn record_subscription_closed(kind: SubscriptionKind) {
    kind_counter(SUBSCRIPTIONS_CLOSED, kind).increment(1);
}

pub(crate) fn record_notify_failure(kind: SubscriptionKind) {
    kind_counter(NOTIFY_FAILURES, kind).increment(1);
}

pub(crate) fn record_height_streamed(kind: SubscriptionKind) {
    kind_counter(HEIGHTS_STREAMED, kind).increment(1);
}
