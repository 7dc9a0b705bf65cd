//! Recipient targeting resolution.
//!
//! # Responsibility
//! - Turn a `Targeting` descriptor into the fixed `TargetSet` of a new session.
//! - Own the rule for how strictly `Single` targets are checked.
//!
//! # Invariants
//! - Resolution only reads; it never writes.
//! - The returned set is a point-in-time snapshot of roster/group state.
//! - A successful resolution never yields an empty set.

use crate::model::recipient::RecipientId;
use crate::model::session::{TargetSet, Targeting};
use crate::repo::group_repo::GroupRepository;
use crate::repo::recipient_repo::RecipientRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a `Single` target is checked against the known population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleTargetPolicy {
    /// Any syntactically valid id is addressed, registered or not.
    #[default]
    AcceptAny,
    /// The id must be in the roster.
    RequireKnown,
}

/// Targeting resolution failures.
#[derive(Debug)]
pub enum ResolveError {
    GroupNotFound(String),
    EmptyGroup(String),
    EmptyPopulation,
    UnknownRecipient(RecipientId),
    Repo(RepoError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(name) => write!(f, "group not found: {name}"),
            Self::EmptyGroup(name) => write!(f, "group `{name}` has no members"),
            Self::EmptyPopulation => write!(f, "no recipients are registered"),
            Self::UnknownRecipient(id) => write!(f, "recipient not registered: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Resolves targeting descriptors against roster and group storage.
pub struct RecipientResolver<'a, S> {
    store: &'a S,
    single_policy: SingleTargetPolicy,
}

impl<'a, S> RecipientResolver<'a, S>
where
    S: RecipientRepository + GroupRepository,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            single_policy: SingleTargetPolicy::default(),
        }
    }

    pub fn with_single_policy(mut self, policy: SingleTargetPolicy) -> Self {
        self.single_policy = policy;
        self
    }

    /// Resolves `targeting` to a deduplicated, non-empty recipient set.
    pub fn resolve(&self, targeting: &Targeting) -> Result<TargetSet, ResolveError> {
        match targeting {
            Targeting::All => {
                let targets: TargetSet = self
                    .store
                    .list_recipients()?
                    .into_iter()
                    .map(|recipient| recipient.id)
                    .collect();
                if targets.is_empty() {
                    return Err(ResolveError::EmptyPopulation);
                }
                Ok(targets)
            }
            Targeting::Group(name) => {
                let group = self
                    .store
                    .find_group_by_name(name)?
                    .ok_or_else(|| ResolveError::GroupNotFound(name.clone()))?;
                let targets: TargetSet = group.member_ids.into_iter().collect();
                if targets.is_empty() {
                    return Err(ResolveError::EmptyGroup(name.clone()));
                }
                Ok(targets)
            }
            Targeting::Single(recipient_id) => {
                if self.single_policy == SingleTargetPolicy::RequireKnown
                    && !self.store.contains_recipient(recipient_id)?
                {
                    return Err(ResolveError::UnknownRecipient(recipient_id.clone()));
                }
                Ok(std::iter::once(recipient_id.clone()).collect())
            }
        }
    }
}
