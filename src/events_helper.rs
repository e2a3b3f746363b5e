use kube::Resource;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::debug;

/// Publish a Normal event on `obj`. Publishing failures are logged and otherwise ignored.
pub async fn emit_info<R: Resource<DynamicType = ()>>(
    recorder: &Recorder,
    obj: &R,
    reason: &str,
    action: &str,
    note: impl Into<Option<String>>,
) {
    let event = Event {
        type_: EventType::Normal,
        reason: reason.into(),
        note: note.into(),
        action: action.into(),
        secondary: None,
    };
    if let Err(e) = recorder.publish(&event, &obj.object_ref(&())).await {
        debug!(reason, "unable to publish event: {e}");
    }
}
