//! Listener implementations.

use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use tracing::debug;

use crate::job::{UploadListener, UploadRequest};

/// Publishes job notifications as [`UploadEvent`]s on an [`EventBus`].
pub struct EventBusListener {
    bus: EventBus,
    job_id: String,
    name: String,
}

impl EventBusListener {
    pub fn new(bus: EventBus, request: &UploadRequest) -> Self {
        Self {
            bus,
            job_id: request.job_id.clone(),
            name: request.display_name(),
        }
    }

    fn publish(&self, event: UploadEvent) {
        if self.bus.emit(CoreEvent::Upload(event)).is_err() {
            debug!(job_id = %self.job_id, "No subscribers for upload event");
        }
    }
}

impl UploadListener for EventBusListener {
    fn on_upload_started(&self, name: &str) {
        self.publish(UploadEvent::Started {
            job_id: self.job_id.clone(),
            name: name.to_string(),
        });
    }

    fn on_upload_complete(&self, link: &str, name: &str) {
        self.publish(UploadEvent::Completed {
            job_id: self.job_id.clone(),
            name: name.to_string(),
            link: link.to_string(),
        });
    }

    fn on_upload_error(&self, message: &str) {
        self.publish(UploadEvent::Failed {
            job_id: self.job_id.clone(),
            name: self.name.clone(),
            message: message.to_string(),
        });
    }
}

/// Forwards every notification to two listeners, `first` then `second`.
pub struct TeeListener<'a> {
    first: &'a dyn UploadListener,
    second: &'a dyn UploadListener,
}

impl<'a> TeeListener<'a> {
    pub fn new(first: &'a dyn UploadListener, second: &'a dyn UploadListener) -> Self {
        Self { first, second }
    }
}

impl UploadListener for TeeListener<'_> {
    fn on_upload_started(&self, name: &str) {
        self.first.on_upload_started(name);
        self.second.on_upload_started(name);
    }

    fn on_upload_complete(&self, link: &str, name: &str) {
        self.first.on_upload_complete(link, name);
        self.second.on_upload_complete(link, name);
    }

    fn on_upload_error(&self, message: &str) {
        self.first.on_upload_error(message);
        self.second.on_upload_error(message);
    }
}
