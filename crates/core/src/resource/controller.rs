use std::sync::{Arc, Weak};

use tracing::{error, info, warn};

use super::{client::ResourceApi, store::CollectionStore};
use crate::{
    error::{Action, ApiError},
    models::{Item, ItemId, ResourceKind},
    session::SessionGuard,
};

/// Lifecycle of one resource screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    /// Nothing requested yet.
    Idle,
    /// First fetch in flight.
    Loading,
    /// Collection mirrors the server.
    Loaded,
    /// First fetch failed; the message is user-facing.
    Error(String),
    /// The server rejected the token; the session has been cleared.
    LoggedOut,
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
}

/// User-facing notification produced by a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

impl Notice {
    fn success(message: String) -> Self {
        Self {
            level: NoticeLevel::Success,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
        }
    }
}

/// Mutating operations a screen can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Add a new item.
    Create,
    /// Change the selected item.
    Update,
    /// Remove an item after confirmation.
    Delete,
}

impl Mutation {
    fn action(self) -> Action {
        match self {
            Mutation::Create => Action::Create,
            Mutation::Update => Action::Update,
            Mutation::Delete => Action::Delete,
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Mutation::Create => "added",
            Mutation::Update => "updated",
            Mutation::Delete => "deleted",
        }
    }
}

/// Weak reference used by background requests to check that the controller
/// that issued them still exists.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    kind: ResourceKind,
    alive: Weak<()>,
}

impl ControllerHandle {
    /// Resource of the issuing controller.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// `false` once the controller has been dropped.
    pub fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Orchestrates fetch, add, edit and delete for one resource type.
///
/// The `async` methods run a whole flow (request, state update, resync).
/// Front ends that run requests on their own tasks use
/// [`apply_list`](Self::apply_list) and [`apply_mutation`](Self::apply_mutation)
/// to feed results back instead.
pub struct ListController<A> {
    kind: ResourceKind,
    api: A,
    session: SessionGuard,
    store: CollectionStore,
    state: ListState,
    selected: Option<Item>,
    pending_delete: Option<ItemId>,
    notice: Option<Notice>,
    alive: Arc<()>,
}

impl<A: ResourceApi> ListController<A> {
    /// Controller for the resource served by `api`.
    pub fn new(api: A, session: SessionGuard) -> Self {
        let kind = api.kind();
        Self {
            kind,
            api,
            session,
            store: CollectionStore::new(kind),
            state: ListState::Idle,
            selected: None,
            pending_delete: None,
            notice: None,
            alive: Arc::new(()),
        }
    }

    /// Resource managed here.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Underlying API, e.g. to run requests on a background task.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current state.
    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// Collection view.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Mutable collection view, for search and paging.
    pub fn store_mut(&mut self) -> &mut CollectionStore {
        &mut self.store
    }

    /// Latest notification, if not yet taken.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Take the latest notification.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Handle for detecting teardown from background tasks.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            kind: self.kind,
            alive: Arc::downgrade(&self.alive),
        }
    }

    /// Whether requests may be issued (the session has not been lost).
    pub fn is_active(&self) -> bool {
        self.state != ListState::LoggedOut
    }

    /// Mark the first fetch as in flight.
    pub fn begin_load(&mut self) {
        if self.state == ListState::Idle || matches!(self.state, ListState::Error(_)) {
            self.state = ListState::Loading;
        }
    }

    /// Fetch the collection (on mount and after every mutation).
    pub async fn refresh(&mut self) {
        if !self.is_active() {
            return;
        }
        self.begin_load();
        let result = self.api.list().await;
        self.apply_list(result);
    }

    /// Apply the outcome of a `list()` call.
    pub fn apply_list(&mut self, result: Result<Vec<Item>, ApiError>) {
        match result {
            Ok(items) => {
                let page = self.store.current_page();
                self.store.set_items(items);
                if self.state == ListState::Loaded {
                    self.store.set_page(page.min(self.store.page_count()));
                }
                self.state = ListState::Loaded;
                info!(
                    resource = self.kind.endpoint(),
                    count = self.store.len(),
                    "collection loaded"
                );
            }
            Err(ApiError::AuthExpired) => self.expire(),
            Err(err) => {
                error!(resource = self.kind.endpoint(), %err, "fetch failed");
                let message = format!(
                    "Failed to fetch {}: {}",
                    self.kind.endpoint(),
                    reason(&err)
                );
                if self.state != ListState::Loaded {
                    self.state = ListState::Error(message.clone());
                }
                self.notice = Some(Notice::error(message));
            }
        }
    }

    /// Apply the outcome of a mutation. Returns `true` when the collection
    /// must be resynced from the server.
    pub fn apply_mutation(&mut self, mutation: Mutation, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                if mutation == Mutation::Update {
                    self.selected = None;
                }
                self.notice = Some(Notice::success(format!(
                    "{} has been {} successfully",
                    capitalize(self.kind.singular()),
                    mutation.past_tense()
                )));
                true
            }
            Err(ApiError::AuthExpired) => {
                self.expire();
                false
            }
            Err(err) => {
                warn!(
                    resource = self.kind.endpoint(),
                    action = %mutation.action(),
                    %err,
                    "mutation failed"
                );
                self.notice = Some(Notice::error(format!(
                    "Failed to {} {}: {}",
                    mutation.action(),
                    self.kind.singular(),
                    reason(&err)
                )));
                false
            }
        }
    }

    /// Submit a new item, then resync.
    pub async fn create(&mut self, item: Item) {
        if !self.is_active() {
            return;
        }
        let result = self.api.create(&item).await.map(|_| ());
        if self.apply_mutation(Mutation::Create, result) {
            self.refresh().await;
        }
    }

    /// Open the edit form for `id`. Returns `false` if the item is unknown.
    pub fn select_for_edit(&mut self, id: &ItemId) -> bool {
        self.selected = self.store.get(id).cloned();
        self.selected.is_some()
    }

    /// Item being edited.
    pub fn selected(&self) -> Option<&Item> {
        self.selected.as_ref()
    }

    /// Close the edit form without saving.
    pub fn cancel_edit(&mut self) {
        self.selected = None;
    }

    /// Identity and full payload for saving `patch` onto the selected item.
    ///
    /// The identity key always comes from the selected item.
    pub fn edit_target(&self, patch: &Item) -> Option<(ItemId, Item)> {
        let selected = self.selected.as_ref()?;
        let key = self.kind.id_key();
        let id = selected.id(key)?;
        let mut payload = selected.clone();
        for (field, value) in patch.fields() {
            if field != key {
                payload.set(field.clone(), value.clone());
            }
        }
        Some((id, payload))
    }

    /// Save `patch` onto the selected item, then resync.
    pub async fn update(&mut self, patch: Item) {
        if !self.is_active() {
            return;
        }
        let Some((id, payload)) = self.edit_target(&patch) else {
            return;
        };
        let result = self.api.update(&id, &payload).await;
        if self.apply_mutation(Mutation::Update, result) {
            self.refresh().await;
        }
    }

    /// Ask for confirmation before deleting `id`.
    ///
    /// Unknown ids leave nothing pending and return `false`.
    pub fn request_delete(&mut self, id: &ItemId) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        self.pending_delete = Some(id.clone());
        true
    }

    /// Item awaiting delete confirmation.
    pub fn pending_delete(&self) -> Option<&ItemId> {
        self.pending_delete.as_ref()
    }

    /// Decline the pending delete. Not an error.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Confirm the pending delete and take its id, leaving the request to
    /// the caller.
    pub fn take_pending_delete(&mut self) -> Option<ItemId> {
        self.pending_delete.take()
    }

    /// Delete the pending item, then resync.
    pub async fn confirm_delete(&mut self) {
        let Some(id) = self.take_pending_delete() else {
            return;
        };
        if !self.is_active() {
            return;
        }
        let result = self.api.delete(&id).await;
        if self.apply_mutation(Mutation::Delete, result) {
            self.refresh().await;
        }
    }

    fn expire(&mut self) {
        self.session.expire();
        self.store.set_items(Vec::new());
        self.selected = None;
        self.pending_delete = None;
        self.state = ListState::LoggedOut;
    }
}

fn reason(err: &ApiError) -> String {
    match err {
        ApiError::RequestFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
