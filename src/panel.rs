use std::fmt::{Display, Formatter};
use log::{debug, info, warn};
use crate::error::{ApiError, Operation, REQUIRED_FIELDS_MESSAGE};
use crate::user::{NewUser, User, UserId};
use crate::{UsersApi, UsersClient};

/// Whether a user is currently being edited
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    /// Holds a detached copy of the user, changes only reach the list after a successful update
    Editing(User),
}

/// The state behind a users list screen: the list itself, the draft for a new user,
/// the user being edited and the last error. \
/// Every command issues at most one request and only changes local state once the server confirmed it.
///
/// Commands take `&mut self` and finish their request before returning,
/// so responses can never be applied out of order.
#[derive(Debug)]
pub struct UsersPanel<A: UsersApi = UsersClient> {
    api: A,
    users: Vec<User>,
    draft: NewUser,
    edit: EditState,
    error_message: Option<String>,
}

impl<A: UsersApi> UsersPanel<A> {

    /// Creates an empty panel. Nothing is loaded until [`UsersPanel::on_init()`] or [`UsersPanel::load_users()`]
    pub fn new(api: A) -> Self {
        Self {
            api,
            users: vec![],
            draft: NewUser::default(),
            edit: EditState::Idle,
            error_message: None,
        }
    }

    /// Creates a panel and immediately loads the collection
    pub fn activate(api: A) -> Self {
        let mut panel = Self::new(api);
        panel.on_init();
        panel
    }

    /// Activation hook, fetches the whole collection
    pub fn on_init(&mut self) {
        self.load_users();
    }

    /// Replaces the list with the servers collection. \
    /// On failure the previous list stays.
    pub fn load_users(&mut self) -> bool {
        debug!("Loading users");
        match self.api.list() {
            Ok(users) => {
                info!("Loaded {} users", users.len());
                self.users = users;
                self.error_message = None;
                true
            }
            Err(e) => self.fail(Operation::Load, &e),
        }
    }

    /// Submits the draft. On success, the created user is appended and the draft is reset.
    pub fn add_user(&mut self) -> bool {
        if !self.draft.has_required_fields() {
            self.error_message = Some(REQUIRED_FIELDS_MESSAGE.to_string());
            return false;
        }
        debug!("Adding user {:?}", self.draft.name);
        match self.api.create(&self.draft) {
            Ok(user) => {
                info!("Added user {}", user.id);
                self.users.push(user);
                self.draft.clear();
                self.error_message = None;
                true
            }
            Err(e) => self.fail(Operation::Add, &e),
        }
    }

    /// Starts editing a copy of `user`, replacing any edit in progress
    pub fn start_edit(&mut self, user: &User) {
        self.edit = EditState::Editing(user.clone());
    }

    /// Starts editing the listed user with the given id. Returns `false` if there is none.
    pub fn start_edit_by_id(&mut self, id: UserId) -> bool {
        let Some(user) = self.users.iter().find(|user| user.id == id) else {
            return false;
        };
        self.edit = EditState::Editing(user.clone());
        true
    }

    /// Drops the edit buffer and the error, without talking to the server
    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Idle;
        self.error_message = None;
    }

    /// Submits the edit buffer. On success the matching list entry is replaced and editing stops.
    pub fn update_user(&mut self) -> bool {
        let EditState::Editing(user) = &self.edit else {
            self.error_message = Some(REQUIRED_FIELDS_MESSAGE.to_string());
            return false;
        };
        if !user.has_required_fields() {
            self.error_message = Some(REQUIRED_FIELDS_MESSAGE.to_string());
            return false;
        }
        debug!("Updating user {}", user.id);
        match self.api.update(user) {
            Ok(updated) => {
                match self.users.iter_mut().find(|user| user.id == updated.id) {
                    Some(entry) => {
                        info!("Updated user {}", updated.id);
                        *entry = updated;
                    }
                    None => warn!("Updated user {} is not in the local list, list left as is", updated.id),
                }
                self.edit = EditState::Idle;
                self.error_message = None;
                true
            }
            Err(e) => self.fail(Operation::Update, &e),
        }
    }

    /// Deletes a user on the server and drops every local entry with that id
    pub fn delete_user(&mut self, id: UserId) -> bool {
        debug!("Deleting user {id}");
        match self.api.delete(id) {
            Ok(()) => {
                let before = self.users.len();
                self.users.retain(|user| user.id != id);
                info!("Deleted user {id}, removed {} local entries", before - self.users.len());
                self.error_message = None;
                true
            }
            Err(e) => self.fail(Operation::Delete, &e),
        }
    }

    fn fail(&mut self, operation: Operation, error: &ApiError) -> bool {
        let message = operation.failure_message(error);
        warn!("{message}");
        self.error_message = Some(message);
        false
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn draft(&self) -> &NewUser {
        &self.draft
    }

    /// The draft, for binding form inputs
    pub fn draft_mut(&mut self) -> &mut NewUser {
        &mut self.draft
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn edit_buffer(&self) -> Option<&User> {
        match &self.edit {
            EditState::Editing(user) => Some(user),
            EditState::Idle => None,
        }
    }

    /// The edit buffer, for binding form inputs
    pub fn edit_buffer_mut(&mut self) -> Option<&mut User> {
        match &mut self.edit {
            EditState::Editing(user) => Some(user),
            EditState::Idle => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.edit, EditState::Editing(_))
    }

    /// The error of the last failed command, until the next command settles
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

}

impl<A: UsersApi> Display for UsersPanel<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(error) = &self.error_message {
            writeln!(f, "! {error}")?;
        }
        writeln!(f, "id | name | email")?;
        for user in &self.users {
            writeln!(f, "{} | {} | {}", user.id, user.name, user.email)?;
        }
        match &self.edit {
            EditState::Editing(user) => writeln!(f, "editing {}: {} <{}>", user.id, user.name, user.email),
            EditState::Idle => writeln!(f, "new: {} <{}>", self.draft.name, self.draft.email),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use reqwest::StatusCode;
    use url::Url;
    use crate::error::ErrorBody;

    /// In memory users endpoint, that records every call and can be told to fail the next one
    #[derive(Debug, Default)]
    struct StubApi {
        users: RefCell<Vec<User>>,
        next_id: Cell<UserId>,
        calls: RefCell<Vec<String>>,
        next_error: RefCell<Option<ApiError>>,
        /// Overrides the id returned by `update`
        update_id: Cell<Option<UserId>>,
    }

    impl StubApi {
        fn with_users(users: Vec<User>) -> Self {
            let next_id = users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
            Self {
                users: RefCell::new(users),
                next_id: Cell::new(next_id),
                ..Default::default()
            }
        }

        fn fail_next(&self, error: ApiError) {
            *self.next_error.borrow_mut() = Some(error);
        }

        fn call(&self, call: String) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(call);
            match self.next_error.borrow_mut().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl UsersApi for StubApi {
        fn list(&self) -> Result<Vec<User>, ApiError> {
            self.call("GET".to_string())?;
            Ok(self.users.borrow().clone())
        }

        fn create(&self, draft: &NewUser) -> Result<User, ApiError> {
            self.call("POST".to_string())?;
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let user = draft.clone().with_id(id);
            self.users.borrow_mut().push(user.clone());
            Ok(user)
        }

        fn update(&self, user: &User) -> Result<User, ApiError> {
            self.call(format!("PUT {}", user.id))?;
            let mut updated = user.clone();
            if let Some(id) = self.update_id.get() {
                updated.id = id;
            }
            Ok(updated)
        }

        fn delete(&self, id: UserId) -> Result<(), ApiError> {
            self.call(format!("DELETE {id}"))?;
            self.users.borrow_mut().retain(|user| user.id != id);
            Ok(())
        }
    }

    fn bad_request(body: &str) -> ApiError {
        ApiError::Status {
            url: Url::parse("http://localhost:8080/api/users").unwrap(),
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::parse(body),
        }
    }

    fn loaded_panel() -> UsersPanel<StubApi> {
        let api = StubApi::with_users(vec![
            User::new(1, "A", "a@x.com"),
            User::new(2, "B", "b@x.com"),
        ]);
        UsersPanel::activate(api)
    }

    #[test]
    fn test_activate_loads() {
        let panel = loaded_panel();
        assert_eq!(panel.users().len(), 2);
        assert_eq!(panel.api().calls(), vec!["GET"]);
        assert_eq!(panel.error_message(), None);
        assert!(!panel.is_editing());
    }

    #[test]
    fn test_load_failure_keeps_list() {
        let mut panel = loaded_panel();
        panel.draft_mut().name = "half typed".to_string();
        assert!(panel.start_edit_by_id(2));
        let (users, draft, edit) = (panel.users().to_vec(), panel.draft().clone(), panel.edit_state().clone());
        // The server side list changed, but the failed load must not show any of it
        panel.api().users.borrow_mut().clear();
        panel.api().fail_next(ApiError::Transport { message: "connection refused".to_string() });
        assert!(!panel.load_users());
        assert_eq!(panel.users(), users.as_slice());
        assert_eq!(panel.draft(), &draft);
        assert_eq!(panel.edit_state(), &edit);
        assert_eq!(panel.error_message(), Some("Failed to load users: connection refused"));
        // Success clears the error again
        assert!(panel.load_users());
        assert_eq!(panel.error_message(), None);
    }

    #[test]
    fn test_add_appends_and_resets_draft() {
        let mut panel = loaded_panel();
        *panel.draft_mut() = NewUser::new("C", "c@x.com");
        assert!(panel.add_user());
        assert_eq!(panel.users().len(), 3);
        assert_eq!(panel.users()[2], User::new(3, "C", "c@x.com"));
        assert_eq!(panel.draft(), &NewUser::default());
        assert_eq!(panel.error_message(), None);
    }

    #[test]
    fn test_add_requires_fields() {
        let mut panel = loaded_panel();
        for draft in [NewUser::new("", "c@x.com"), NewUser::new("C", " ")] {
            *panel.draft_mut() = draft.clone();
            assert!(!panel.add_user());
            assert_eq!(panel.error_message(), Some(REQUIRED_FIELDS_MESSAGE));
            assert_eq!(panel.draft(), &draft);
        }
        assert_eq!(panel.api().calls(), vec!["GET"]);
        assert_eq!(panel.users().len(), 2);
    }

    #[test]
    fn test_add_failure_keeps_draft() {
        let mut panel = loaded_panel();
        *panel.draft_mut() = NewUser::new("C", "c@x.com");
        panel.api().fail_next(bad_request(r#"{"message":"bad input"}"#));
        assert!(!panel.add_user());
        assert_eq!(panel.error_message(), Some("Failed to add user: bad input"));
        assert_eq!(panel.draft(), &NewUser::new("C", "c@x.com"));
        assert_eq!(panel.users().len(), 2);
    }

    #[test]
    fn test_repeated_add_creates_duplicates() {
        let mut panel = loaded_panel();
        for _ in 0..2 {
            *panel.draft_mut() = NewUser::new("C", "c@x.com");
            assert!(panel.add_user());
        }
        assert_eq!(panel.users().len(), 4);
        assert_ne!(panel.users()[2].id, panel.users()[3].id);
    }

    #[test]
    fn test_cancel_edit_isolates_copy() {
        let mut panel = loaded_panel();
        let first = panel.users()[0].clone();
        panel.start_edit(&first);
        panel.edit_buffer_mut().unwrap().name = "Changed".to_string();
        assert_eq!(panel.users()[0].name, "A");
        panel.cancel_edit();
        assert_eq!(panel.edit_state(), &EditState::Idle);
        assert_eq!(panel.users()[0], first);
        assert_eq!(panel.api().calls(), vec!["GET"]);
    }

    #[test]
    fn test_cancel_clears_error() {
        let mut panel = loaded_panel();
        assert!(panel.start_edit_by_id(1));
        panel.edit_buffer_mut().unwrap().email = String::new();
        assert!(!panel.update_user());
        assert!(panel.error_message().is_some());
        panel.cancel_edit();
        assert_eq!(panel.error_message(), None);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut panel = loaded_panel();
        assert!(panel.start_edit_by_id(2));
        panel.edit_buffer_mut().unwrap().name = "Bee".to_string();
        assert!(panel.update_user());
        assert_eq!(panel.users()[1], User::new(2, "Bee", "b@x.com"));
        assert!(!panel.is_editing());
        assert_eq!(panel.api().calls(), vec!["GET", "PUT 2"]);
    }

    #[test]
    fn test_update_without_match_leaves_list() {
        let mut panel = loaded_panel();
        panel.start_edit(&User::new(1, "Z", "z@x.com"));
        panel.api().update_id.set(Some(99));
        let before = panel.users().to_vec();
        assert!(panel.update_user());
        assert_eq!(panel.users(), before.as_slice());
        assert_eq!(panel.edit_buffer(), None);
        assert_eq!(panel.error_message(), None);
    }

    #[test]
    fn test_update_preconditions() {
        let mut panel = loaded_panel();
        assert!(!panel.update_user());
        assert_eq!(panel.error_message(), Some(REQUIRED_FIELDS_MESSAGE));
        assert!(!panel.start_edit_by_id(42));
        assert!(panel.start_edit_by_id(1));
        panel.edit_buffer_mut().unwrap().name = "  ".to_string();
        assert!(!panel.update_user());
        assert!(panel.is_editing());
        assert_eq!(panel.api().calls(), vec!["GET"]);
    }

    #[test]
    fn test_update_failure_keeps_buffer() {
        let mut panel = loaded_panel();
        assert!(panel.start_edit_by_id(1));
        panel.edit_buffer_mut().unwrap().name = "Changed".to_string();
        panel.api().fail_next(bad_request("oops"));
        assert!(!panel.update_user());
        assert_eq!(panel.error_message(), Some("Failed to update user: oops"));
        assert_eq!(panel.edit_buffer().unwrap().name, "Changed");
        assert_eq!(panel.users()[0].name, "A");
    }

    #[test]
    fn test_delete() {
        let mut panel = UsersPanel::activate(StubApi::with_users(vec![User::new(1, "A", "a@x.com")]));
        assert!(panel.delete_user(1));
        assert!(panel.users().is_empty());
        assert_eq!(panel.error_message(), None);
    }

    #[test]
    fn test_delete_unknown_id() {
        let mut panel = loaded_panel();
        assert!(panel.delete_user(42));
        assert_eq!(panel.users().len(), 2);
        assert_eq!(panel.error_message(), None);
        assert_eq!(panel.api().calls(), vec!["GET", "DELETE 42"]);
    }

    #[test]
    fn test_delete_failure_keeps_list() {
        let mut panel = loaded_panel();
        *panel.draft_mut() = NewUser::new("C", "c@x.com");
        assert!(panel.start_edit_by_id(1));
        let (users, draft, edit) = (panel.users().to_vec(), panel.draft().clone(), panel.edit_state().clone());
        panel.api().fail_next(bad_request("{}"));
        assert!(!panel.delete_user(1));
        assert_eq!(panel.users(), users.as_slice());
        assert_eq!(panel.draft(), &draft);
        assert_eq!(panel.edit_state(), &edit);
        assert_eq!(panel.error_message(), Some("Failed to delete user: {}"));
    }

    #[test]
    fn test_display() {
        let mut panel = loaded_panel();
        panel.draft_mut().name = "C".to_string();
        let rendered = panel.to_string();
        assert_eq!(rendered, "id | name | email\n1 | A | a@x.com\n2 | B | b@x.com\nnew: C <>\n");
        panel.api().fail_next(ApiError::Transport { message: "down".to_string() });
        panel.load_users();
        assert!(panel.to_string().starts_with("! Failed to load users: down\n"));
    }
}
