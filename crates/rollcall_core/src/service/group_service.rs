//! Preset group use-case service.
//!
//! # Responsibility
//! - Validate and normalize group names and member lists.
//! - Map storage uniqueness failures to `DuplicateName`.
//!
//! # Invariants
//! - Names are trimmed and non-empty.
//! - Members are validated, deduplicated and sorted before persistence.
//! - Empty member lists are accepted here; they fail only at session start.

use crate::model::group::PresetGroup;
use crate::model::recipient::RecipientId;
use crate::model::ModelValidationError;
use crate::repo::group_repo::GroupRepository;
use crate::repo::RepoError;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service error for group use-cases.
#[derive(Debug)]
pub enum GroupServiceError {
    Invalid(ModelValidationError),
    DuplicateName(String),
    GroupNotFound(String),
    Repo(RepoError),
}

impl Display for GroupServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::DuplicateName(name) => write!(f, "a group named `{name}` already exists"),
            Self::GroupNotFound(what) => write!(f, "group not found: {what}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GroupServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl GroupServiceError {
    /// Stable machine-readable code, aligned with `RollCallError::code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid_argument",
            Self::DuplicateName(_) => "duplicate_name",
            Self::GroupNotFound(_) => "not_found",
            Self::Repo(_) => "dependency_unavailable",
        }
    }
}

impl From<ModelValidationError> for GroupServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for GroupServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateName(name) => Self::DuplicateName(name),
            RepoError::NotFound(what) => Self::GroupNotFound(what),
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Group facade over repository implementations.
pub struct GroupService<R: GroupRepository> {
    repo: Arc<R>,
}

impl<R: GroupRepository> GroupService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn create_group<I, T>(&self, name: &str, member_ids: I) -> Result<PresetGroup, GroupServiceError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let name = normalize_group_name(name)?;
        let members = normalize_members(member_ids)?;
        let group = self.repo.create_group(&name, &members)?;
        info!(
            "event=group_create module=group status=ok group_id={} members={}",
            group.id,
            group.member_ids.len()
        );
        Ok(group)
    }

    /// Replaces name and members. Sessions created earlier keep their targets.
    pub fn update_group<I, T>(
        &self,
        id: i64,
        name: &str,
        member_ids: I,
    ) -> Result<PresetGroup, GroupServiceError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let name = normalize_group_name(name)?;
        let members = normalize_members(member_ids)?;
        let group = self.repo.update_group(id, &name, &members)?;
        info!(
            "event=group_update module=group status=ok group_id={} members={}",
            group.id,
            group.member_ids.len()
        );
        Ok(group)
    }

    pub fn delete_group(&self, id: i64) -> Result<(), GroupServiceError> {
        self.repo.delete_group(id)?;
        info!("event=group_delete module=group status=ok group_id={id}");
        Ok(())
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<PresetGroup>, GroupServiceError> {
        let name = normalize_group_name(name)?;
        Ok(self.repo.find_group_by_name(&name)?)
    }

    pub fn list_groups(&self) -> Result<Vec<PresetGroup>, GroupServiceError> {
        Ok(self.repo.list_groups()?)
    }
}

fn normalize_group_name(name: &str) -> Result<String, ModelValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ModelValidationError::EmptyGroupName);
    }
    Ok(trimmed.to_string())
}

fn normalize_members<I, T>(member_ids: I) -> Result<Vec<RecipientId>, ModelValidationError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut unique = BTreeSet::new();
    for raw in member_ids {
        unique.insert(RecipientId::parse(raw.as_ref())?);
    }
    Ok(unique.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::{normalize_group_name, normalize_members, GroupServiceError};
    use crate::model::ModelValidationError;
    use crate::repo::RepoError;

    #[test]
    fn members_are_deduplicated_and_sorted() {
        let members = normalize_members(["20230002", " 20230001", "20230002"]).unwrap();
        let ids: Vec<&str> = members.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["20230001", "20230002"]);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            normalize_group_name("  "),
            Err(ModelValidationError::EmptyGroupName)
        );
    }

    #[test]
    fn repo_errors_map_to_distinct_codes() {
        let duplicate = GroupServiceError::from(RepoError::DuplicateName("a".to_string()));
        let missing = GroupServiceError::from(RepoError::NotFound("group 9".to_string()));
        let invalid = GroupServiceError::from(ModelValidationError::EmptyGroupName);
        let broken = GroupServiceError::from(RepoError::InvalidData("bad".to_string()));
        assert_eq!(duplicate.code(), "duplicate_name");
        assert_eq!(missing.code(), "not_found");
        assert_eq!(invalid.code(), "invalid_argument");
        assert_eq!(broken.code(), "dependency_unavailable");
    }
}
