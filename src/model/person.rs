use serde::{Deserialize, Serialize};

/// Role of a person, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Supervisor,
    #[default]
    User,
    Client,
    /// Restricted role: sees only the work assigned to it
    Vendor,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }

    pub fn is_vendor(&self) -> bool {
        *self == Role::Vendor
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    pub name: String,

    /// Ids of the people working on the project
    #[serde(default)]
    pub team: Vec<String>,
}

impl Project {
    pub fn has_member(&self, person_id: &str) -> bool {
        self.team.iter().any(|member| member == person_id)
    }
}

/// Authenticated identity attached to a request.
///
/// Inserted into the request extensions by the auth middleware and passed
/// explicitly to the access checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub person_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(person_id: impl Into<String>, role: Role) -> Self {
        Self {
            person_id: person_id.into(),
            role,
        }
    }
}

impl From<&Person> for Caller {
    fn from(person: &Person) -> Self {
        Caller::new(person.id.clone(), person.role)
    }
}
