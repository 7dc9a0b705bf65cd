//! Dispatcher for hosts without a push transport.

use super::{DeliveryOutcome, DispatchError, Dispatcher, Notice};
use crate::model::recipient::RecipientId;
use crate::repo::recipient_repo::EndpointRepository;
use log::info;
use std::sync::Arc;

/// Records notices in the log instead of pushing them.
///
/// Reports `Delivered` when the recipient has a registered endpoint and
/// `NoEndpoint` otherwise, so batch summaries stay meaningful.
pub struct LogDispatcher {
    endpoints: Arc<dyn EndpointRepository + Send + Sync>,
}

impl LogDispatcher {
    pub fn new(endpoints: Arc<dyn EndpointRepository + Send + Sync>) -> Self {
        Self { endpoints }
    }
}

impl Dispatcher for LogDispatcher {
    fn send(
        &self,
        recipient_id: &RecipientId,
        notice: &Notice,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let endpoint = self
            .endpoints
            .endpoint_for(recipient_id)
            .map_err(|err| DispatchError::Unavailable(err.to_string()))?;
        if endpoint.is_none() {
            return Ok(DeliveryOutcome::NoEndpoint);
        }
        info!(
            "event=notify_log module=notify status=ok recipient_id={} link={} title_chars={}",
            recipient_id,
            notice.link,
            notice.title.chars().count()
        );
        Ok(DeliveryOutcome::Delivered)
    }
}
