//! Event channels, callback registry and subscription bookkeeping.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, error};

/// Server error event.
pub const EVENT_ERROR: &str = "atlas_error";
/// Measurement result event.
pub const EVENT_RESULTS: &str = "atlas_result";
/// Measurement metadata event.
pub const EVENT_METADATA: &str = "atlas_metadata";
/// Probe connection status event.
pub const EVENT_PROBESTATUS: &str = "atlas_probestatus";
/// Subscription acknowledgement.
pub const EVENT_SUBSCRIBED: &str = "atlas_subscribed";
/// Unsubscription acknowledgement.
pub const EVENT_UNSUBSCRIBED: &str = "atlas_unsubscribed";
/// End of the replay of past results.
pub const EVENT_REPLAY_FINISHED: &str = "atlas_replay_finished";

/// Emitted to start a subscription.
pub const EVENT_SUBSCRIBE: &str = "atlas_subscribe";
/// Emitted to end a subscription.
pub const EVENT_UNSUBSCRIBE: &str = "atlas_unsubscribe";

/// Result stream type.
pub const STREAM_TYPE_RESULT: &str = "result";
/// Probe status stream type.
pub const STREAM_TYPE_PROBE: &str = "probe";
/// Metadata stream type.
pub const STREAM_TYPE_METADATA: &str = "metadata";

/// Old channel names still accepted by `bind_channel`.
pub const DEPRECATED_CHANNELS: &[(&str, &str)] = &[
    ("result", EVENT_RESULTS),
    ("probe", EVENT_PROBESTATUS),
    ("error", EVENT_ERROR),
];

/// Maps a deprecated channel name to its current one.
#[must_use]
pub fn resolve_channel(channel: &str) -> &str {
    DEPRECATED_CHANNELS
        .iter()
        .find(|(old, _)| *old == channel)
        .map_or(channel, |(_, new)| new)
}

/// Callback invoked with the payload of an event.
pub type Callback = Box<dyn FnMut(Value) + Send>;

/// Routes inbound events to callbacks and tracks acknowledged subscriptions.
#[derive(Default)]
pub(crate) struct Dispatcher {
    handlers: HashMap<String, Callback>,
    subscriptions: Vec<Value>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channels", &self.handlers.keys().collect::<Vec<_>>())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

impl Dispatcher {
    pub(crate) fn bind(&mut self, channel: &str, callback: Callback) {
        self.handlers
            .insert(resolve_channel(channel).to_string(), callback);
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
        self.subscriptions.clear();
    }

    pub(crate) fn subscriptions(&self) -> &[Value] {
        &self.subscriptions
    }

    pub(crate) fn dispatch(&mut self, name: &str, data: Value) {
        match name {
            EVENT_SUBSCRIBED => {
                debug!(params = %data, "subscribed");
                if !self.subscriptions.contains(&data) {
                    self.subscriptions.push(data.clone());
                }
            }
            EVENT_UNSUBSCRIBED => {
                debug!(params = %data, "unsubscribed");
                self.subscriptions.retain(|params| *params != data);
            }
            _ => {}
        }

        let Some(callback) = self.handlers.get_mut(name) else {
            match name {
                EVENT_ERROR => error!(error = %data, "got an error from stream server"),
                EVENT_SUBSCRIBED | EVENT_UNSUBSCRIBED => {}
                _ => debug!(event = name, "received event but no handler is set"),
            }
            return;
        };

        match data {
            Value::Array(results) if name == EVENT_RESULTS => {
                for result in results {
                    callback(result);
                }
            }
            data => callback(data),
        }
    }
}
