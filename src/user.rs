use serde::{Deserialize, Serialize};

/// Server assigned identifier of a [`User`]
pub type UserId = u64;

/// A user record, as stored on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// The input for a user, that has not been created yet. \
/// Same shape as [`User`], minus the identifier.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl User {

    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Copies the editable fields into a [`NewUser`]
    pub fn draft(&self) -> NewUser {
        NewUser {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    /// If both name and email contain something other than whitespace
    pub fn has_required_fields(&self) -> bool {
        has_required_fields(&self.name, &self.email)
    }

}

impl NewUser {

    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Attaches a server assigned id, turning the draft into a [`User`]
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
        }
    }

    /// If both name and email contain something other than whitespace
    pub fn has_required_fields(&self) -> bool {
        has_required_fields(&self.name, &self.email)
    }

    /// Resets both fields to empty strings
    pub fn clear(&mut self) {
        *self = Self::default();
    }

}

/// Checks the only validation done locally: both fields must be non-empty after trimming. \
/// No format validation is done on the email.
pub fn has_required_fields(name: &str, email: &str) -> bool {
    !name.trim().is_empty() && !email.trim().is_empty()
}
