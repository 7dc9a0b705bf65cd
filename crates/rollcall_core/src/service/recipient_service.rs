//! Roster and push endpoint registration.

use super::error::RollCallResult;
use crate::model::recipient::{Recipient, RecipientId};
use crate::model::ModelValidationError;
use crate::repo::recipient_repo::{EndpointRepository, RecipientRepository};
use log::info;
use std::sync::Arc;

/// Roster/endpoint facade over repository implementations.
pub struct RecipientService<R: RecipientRepository + EndpointRepository> {
    repo: Arc<R>,
}

impl<R: RecipientRepository + EndpointRepository> RecipientService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Adds a recipient to the known population, or renames it.
    pub fn register_recipient(&self, id: &str, display_name: &str) -> RollCallResult<Recipient> {
        let recipient = Recipient {
            id: RecipientId::parse(id)?,
            display_name: display_name.trim().to_string(),
        };
        self.repo.upsert_recipient(&recipient)?;
        info!(
            "event=recipient_register module=recipient status=ok recipient_id={}",
            recipient.id
        );
        Ok(recipient)
    }

    pub fn list_recipients(&self) -> RollCallResult<Vec<Recipient>> {
        Ok(self.repo.list_recipients()?)
    }

    /// Stores the push token for a recipient, replacing any previous one.
    pub fn register_endpoint(&self, recipient_id: &str, token: &str) -> RollCallResult<()> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ModelValidationError::EmptyEndpointToken.into());
        }
        self.repo.register_endpoint(&recipient_id, token)?;
        info!(
            "event=endpoint_register module=recipient status=ok recipient_id={}",
            recipient_id
        );
        Ok(())
    }

    /// Returns whether an endpoint existed.
    pub fn deregister_endpoint(&self, recipient_id: &str) -> RollCallResult<bool> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        Ok(self.repo.deregister_endpoint(&recipient_id)?)
    }

    pub fn has_endpoint(&self, recipient_id: &str) -> RollCallResult<bool> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        Ok(self.repo.endpoint_for(&recipient_id)?.is_some())
    }
}
