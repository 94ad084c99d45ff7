//! Authorization checks run by the handlers before touching the service.
//!
//! | Check              | Passes when                                        |
//! |--------------------|----------------------------------------------------|
//! | project access     | no project given, caller is admin, or team member  |
//! | manager access     | caller is admin, or a manager in the project team   |
//! | entity access      | caller is not a vendor, or is assigned to a task    |
//! | vendor denial      | caller is not a vendor                              |
//!
//! Unknown projects surface as not-found rather than permission errors.

use tracing::debug;

use crate::error::{EntityError, PermissionDenied};
use crate::model::{Caller, Criteria, Role};
use crate::store::{EntityService, EntityStore};

/// Access checks for one caller.
pub struct Access<'a, S: EntityStore> {
    service: &'a EntityService<S>,
    caller: &'a Caller,
}

impl<'a, S: EntityStore> Access<'a, S> {
    pub fn new(service: &'a EntityService<S>, caller: &'a Caller) -> Self {
        Self { service, caller }
    }

    pub fn caller(&self) -> &Caller {
        self.caller
    }

    /// Require read access to a project. `None` means no project was named.
    pub async fn check_project_access(&self, project_id: Option<&str>) -> Result<(), EntityError> {
        let Some(project_id) = project_id else {
            return Ok(());
        };
        let project = self.service.get_project(project_id).await?;

        if self.caller.role.is_admin() || project.has_member(&self.caller.person_id) {
            Ok(())
        } else {
            Err(self.deny(format!("not a member of project {}", project_id)))
        }
    }

    /// Require write access to a project.
    pub async fn check_manager_project_access(&self, project_id: &str) -> Result<(), EntityError> {
        let project = self.service.get_project(project_id).await?;

        let allowed = match self.caller.role {
            Role::Admin => true,
            Role::Manager => project.has_member(&self.caller.person_id),
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(self.deny(format!("manager access to project {} required", project_id)))
        }
    }

    /// Vendors may only see entities they have a task on.
    pub async fn check_entity_access(&self, entity_id: &str) -> Result<(), EntityError> {
        if !self.caller.role.is_vendor() {
            return Ok(());
        }
        if self
            .service
            .is_assigned(&self.caller.person_id, entity_id)
            .await?
        {
            Ok(())
        } else {
            Err(self.deny(format!("not assigned to entity {}", entity_id)))
        }
    }

    pub fn deny_vendor(&self) -> Result<(), EntityError> {
        if self.caller.role.is_vendor() {
            Err(self.deny("route not available to vendors".to_string()))
        } else {
            Ok(())
        }
    }

    /// Narrow listing criteria to what the caller may see.
    ///
    /// Vendors get `assigned_to` forced to themselves. Non-admins that did
    /// not name a project are limited to the projects they belong to.
    pub async fn scope_criteria(&self, criteria: &mut Criteria) -> Result<(), EntityError> {
        if self.caller.role.is_vendor() {
            criteria.set_assigned_to(self.caller.person_id.clone());
        }

        if !self.caller.role.is_admin() && criteria.project_id().is_none() {
            let projects = self
                .service
                .projects_for_person(&self.caller.person_id)
                .await?;
            criteria.restrict_to_projects(projects);
        }

        Ok(())
    }

    /// Person whose assignments bound project listings, if any.
    pub fn only_assigned(&self) -> Option<&str> {
        self.caller
            .role
            .is_vendor()
            .then_some(self.caller.person_id.as_str())
    }

    fn deny(&self, reason: String) -> EntityError {
        debug!(person_id = %self.caller.person_id, reason = %reason, "Access denied");
        PermissionDenied(reason).into()
    }
}
