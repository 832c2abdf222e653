// MedDesk
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Guard, visibility and button adapters over access decisions
//!
//! These are UI-agnostic: a view layer maps [`GuardView`] and [`ButtonState`]
//! onto its own widgets.

use crate::rbac::access::{AccessController, AccessDecision, AccessRequest};
use crate::rbac::resolver::effective_permissions;
use crate::rbac::roles::{Department, Role};
use crate::session::Session;
use crate::users::{UserStatus, UserStore};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::debug;

/// Tooltip prefix used by buttons when no text is supplied
pub const DEFAULT_BUTTON_FALLBACK: &str = "Insufficient permissions";

/// What to show when access is denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback<T> {
    /// Caller-supplied content
    Custom(T),
    /// The built-in access denied panel
    DefaultPanel,
    /// Nothing at all
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig<T> {
    pub fallback: Fallback<T>,
}

impl<T> Default for GuardConfig<T> {
    fn default() -> Self {
        Self { fallback: Fallback::DefaultPanel }
    }
}

impl<T> GuardConfig<T> {
    pub fn hidden() -> Self {
        Self { fallback: Fallback::Hidden }
    }

    pub fn custom(fallback: T) -> Self {
        Self { fallback: Fallback::Custom(fallback) }
    }
}

/// Built-in access denied panel, with enough context for operator self-diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedPanel {
    pub reason: String,
    pub role: Option<Role>,
    pub department: Option<Department>,
    pub status: Option<UserStatus>,
    /// Size of the effective permission set
    pub permission_count: Option<usize>,
}

impl DeniedPanel {
    pub fn from_decision(decision: &AccessDecision) -> Self {
        let profile = decision.profile.as_ref();

        Self {
            reason: decision.reason.clone(),
            role: profile.map(|p| p.role),
            department: profile.map(|p| p.department),
            status: profile.map(|p| p.status),
            permission_count: profile.map(|p| effective_permissions(p).len()),
        }
    }
}

/// Rendered guard output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<T> {
    /// Check still in flight
    Loading,
    /// Access allowed: the guarded content
    Children(T),
    /// Access denied: the caller's fallback
    Fallback(T),
    /// Access denied: the built-in panel
    Denied(DeniedPanel),
    /// Access denied: render nothing
    Hidden,
}

impl<T> GuardView<T> {
    pub fn is_visible(&self) -> bool {
        !matches!(self, GuardView::Loading | GuardView::Hidden)
    }
}

/// Pick the view for a decision
pub fn render_guard<T>(decision: &AccessDecision, children: T, config: GuardConfig<T>) -> GuardView<T> {
    if decision.allowed {
        return GuardView::Children(children);
    }

    match config.fallback {
        Fallback::Custom(fallback) => GuardView::Fallback(fallback),
        Fallback::DefaultPanel => GuardView::Denied(DeniedPanel::from_decision(decision)),
        Fallback::Hidden => GuardView::Hidden,
    }
}

/// Pick the view for a guard state
pub fn render_state<T>(state: &GuardState, children: T, config: GuardConfig<T>) -> GuardView<T> {
    match state {
        GuardState::Loading => GuardView::Loading,
        GuardState::Ready(decision) => render_guard(decision, children, config),
    }
}

/// Visibility variant: a guard whose fallback is hidden
pub fn visible(decision: &AccessDecision) -> bool {
    decision.allowed
}

/// Button presentation derived from an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub disabled: bool,
    /// Show a lock marker
    pub locked: bool,
    pub loading: bool,
    pub tooltip: Option<String>,
}

impl ButtonState {
    /// Placeholder while the check is in flight
    pub fn loading() -> Self {
        Self {
            disabled: true,
            locked: false,
            loading: true,
            tooltip: None,
        }
    }

    /// Denied buttons stay visible but disabled, with the reason as tooltip
    pub fn from_decision(decision: &AccessDecision, fallback_text: &str, disabled: bool) -> Self {
        if decision.allowed {
            return Self {
                disabled,
                locked: false,
                loading: false,
                tooltip: None,
            };
        }

        let tooltip = if decision.reason.is_empty() { fallback_text.to_string() } else { format!("{fallback_text}: {}", decision.reason) };

        Self {
            disabled: true,
            locked: true,
            loading: false,
            tooltip: Some(tooltip),
        }
    }

    pub fn from_state(state: &GuardState, fallback_text: &str, disabled: bool) -> Self {
        match state {
            GuardState::Loading => Self::loading(),
            GuardState::Ready(decision) => Self::from_decision(decision, fallback_text, disabled),
        }
    }
}

/// Guard lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Loading,
    Ready(AccessDecision),
}

impl GuardState {
    pub fn decision(&self) -> Option<&AccessDecision> {
        match self {
            GuardState::Loading => None,
            GuardState::Ready(decision) => Some(decision),
        }
    }
}

/// Inputs that trigger re-evaluation when they change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DependencyKey {
    request: AccessRequest,
    identity: Option<String>,
    authenticated: bool,
}

impl DependencyKey {
    fn new(request: &AccessRequest, session: &Session) -> Self {
        Self {
            request: request.clone(),
            identity: session.identity().map(str::to_string),
            authenticated: session.is_authenticated(),
        }
    }
}

struct Shared {
    tx: watch::Sender<GuardState>,
    generation: AtomicU64,
}

/// A mounted guard.
///
/// Each [`Guard::sync`] with changed dependencies spawns one check on the
/// tokio runtime and publishes its decision through a watch channel. Results
/// from superseded checks, or from checks that finish after the guard is
/// dropped, are discarded.
pub struct Guard<S: UserStore + ?Sized + 'static> {
    controller: AccessController<S>,
    request: AccessRequest,
    dependency_key: Option<DependencyKey>,
    shared: Arc<Shared>,
}

impl<S: UserStore + ?Sized + 'static> Guard<S> {
    pub fn new(controller: AccessController<S>, request: AccessRequest) -> Self {
        let (tx, _rx) = watch::channel(GuardState::Loading);

        Self {
            controller,
            request,
            dependency_key: None,
            shared: Arc::new(Shared { tx, generation: AtomicU64::new(0) }),
        }
    }

    pub fn request(&self) -> &AccessRequest {
        &self.request
    }

    /// Replace the request; takes effect on the next [`Guard::sync`]
    pub fn set_request(&mut self, request: AccessRequest) {
        self.request = request;
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.shared.tx.subscribe()
    }

    pub fn state(&self) -> GuardState {
        self.shared.tx.borrow().clone()
    }

    /// Start a check if the request or the session changed since the last one.
    ///
    /// Returns `true` when a check was started. Must be called inside a tokio runtime.
    pub fn sync(&mut self, session: &Session) -> bool {
        let key = DependencyKey::new(&self.request, session);
        if self.dependency_key.as_ref() == Some(&key) {
            return false;
        }
        self.dependency_key = Some(key);

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.tx.send_replace(GuardState::Loading);

        let controller = self.controller.clone();
        let request = self.request.clone();
        let session = session.clone();
        let shared = Arc::downgrade(&self.shared);

        tokio::spawn(async move {
            let decision = controller.evaluate(&session, &request).await;
            publish(&shared, generation, decision);
        });

        true
    }

    /// Wait for the current check to finish
    pub async fn ready(&self) -> Option<AccessDecision> {
        let mut rx = self.subscribe();
        let state = rx.wait_for(|state| matches!(state, GuardState::Ready(_))).await.ok()?;
        state.decision().cloned()
    }

    pub fn view<T>(&self, children: T, config: GuardConfig<T>) -> GuardView<T> {
        render_state(&self.shared.tx.borrow(), children, config)
    }

    pub fn button(&self, fallback_text: &str, disabled: bool) -> ButtonState {
        ButtonState::from_state(&self.shared.tx.borrow(), fallback_text, disabled)
    }
}

fn publish(shared: &Weak<Shared>, generation: u64, decision: AccessDecision) {
    let Some(shared) = shared.upgrade() else {
        debug!("Guard dropped before its check resolved; discarding decision");
        return;
    };

    let published = shared.tx.send_if_modified(|state| {
        if shared.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *state = GuardState::Ready(decision);
        true
    });

    if !published {
        debug!(generation, "Discarding superseded guard decision");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Denial, StoreError};
    use crate::rbac::catalog::Permission;
    use crate::users::{MockUserStore, UserProfile};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn perm(key: &str) -> Permission {
        key.parse().unwrap()
    }

    fn viewer() -> UserProfile {
        UserProfile::new("uid-1", "v@clinic.example", Role::Viewer, Department::Administration)
    }

    fn denied() -> AccessDecision {
        AccessDecision::deny(Denial::MissingPermission { missing: perm("users:delete") }, Some(viewer()))
    }

    #[test]
    fn test_render_allowed_shows_children() {
        let decision = AccessDecision::allow(viewer());
        assert_eq!(render_guard(&decision, "content", GuardConfig::custom("fallback")), GuardView::Children("content"));
        assert!(visible(&decision));
    }

    #[test]
    fn test_render_denied_variants() {
        let decision = denied();

        assert_eq!(render_guard(&decision, "content", GuardConfig::custom("fallback")), GuardView::Fallback("fallback"));
        assert_eq!(render_guard(&decision, "content", GuardConfig::hidden()), GuardView::Hidden);
        assert!(!visible(&decision));

        match render_guard(&decision, "content", GuardConfig::default()) {
            GuardView::Denied(panel) => {
                assert_eq!(panel.reason, decision.reason);
                assert_eq!(panel.role, Some(Role::Viewer));
                assert_eq!(panel.department, Some(Department::Administration));
                assert_eq!(panel.status, Some(UserStatus::Active));
                assert_eq!(panel.permission_count, Some(effective_permissions(&viewer()).len()));
            }
            other => panic!("expected default panel, got {other:?}"),
        }
    }

    #[test]
    fn test_denied_panel_without_profile() {
        let panel = DeniedPanel::from_decision(&AccessDecision::deny(Denial::NotAuthenticated, None));
        assert_eq!(panel.reason, "User not authenticated");
        assert_eq!(panel.role, None);
        assert_eq!(panel.permission_count, None);
    }

    #[test]
    fn test_button_state() {
        let allowed = ButtonState::from_decision(&AccessDecision::allow(viewer()), DEFAULT_BUTTON_FALLBACK, false);
        assert!(!allowed.disabled && !allowed.locked);
        assert_eq!(allowed.tooltip, None);

        // an explicitly disabled button stays disabled
        assert!(ButtonState::from_decision(&AccessDecision::allow(viewer()), DEFAULT_BUTTON_FALLBACK, true).disabled);

        let locked = ButtonState::from_decision(&denied(), DEFAULT_BUTTON_FALLBACK, false);
        assert!(locked.disabled && locked.locked);
        let tooltip = locked.tooltip.unwrap();
        assert!(tooltip.starts_with("Insufficient permissions: Missing required permission"), "got: {tooltip}");

        assert!(ButtonState::from_state(&GuardState::Loading, DEFAULT_BUTTON_FALLBACK, false).loading);
    }

    #[tokio::test]
    async fn test_guard_resolves_and_skips_unchanged_dependencies() {
        let mut store = MockUserStore::new();
        store.expect_fetch_user_profile().times(1).returning(|_| Ok(Some(viewer())));
        let controller = AccessController::new(Arc::new(store));

        let mut guard = Guard::new(controller, AccessRequest::new().permission(perm("devices:read")));
        assert_eq!(guard.state(), GuardState::Loading);
        assert_eq!(guard.view("content", GuardConfig::default()), GuardView::Loading);

        let session = Session::authenticated("uid-1");
        assert!(guard.sync(&session));
        let decision = guard.ready().await.unwrap();
        assert!(decision.allowed);

        assert!(!guard.sync(&session));
        assert_eq!(guard.view("content", GuardConfig::default()), GuardView::Children("content"));
    }

    #[tokio::test]
    async fn test_guard_reevaluates_on_dependency_change() {
        let mut store = MockUserStore::new();
        store.expect_fetch_user_profile().times(2).returning(|_| Ok(Some(viewer())));
        let controller = AccessController::new(Arc::new(store));
        let session = Session::authenticated("uid-1");

        let mut guard = Guard::new(controller, AccessRequest::new().permission(perm("devices:read")));
        guard.sync(&session);
        assert!(guard.ready().await.unwrap().allowed);

        guard.set_request(AccessRequest::new().permission(perm("users:delete")));
        assert!(guard.sync(&session));
        assert!(!guard.ready().await.unwrap().allowed);

        // logging out changes the dependency key but needs no fetch
        assert!(guard.sync(&session.logout()));
        assert_eq!(guard.ready().await.unwrap().denial(), Some(&Denial::NotAuthenticated));
    }

    struct GatedStore {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl UserStore for GatedStore {
        async fn fetch_user_profile(&self, _user_id: &str) -> Result<Option<UserProfile>, StoreError> {
            self.gate.notified().await;
            Ok(Some(viewer()))
        }

        async fn list_user_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
            Ok(Vec::new())
        }

        async fn save_user_profile(&self, _profile: UserProfile) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dropped_guard_discards_late_result() {
        let gate = Arc::new(Notify::new());
        let controller = AccessController::new(Arc::new(GatedStore { gate: Arc::clone(&gate) }));

        let mut guard = Guard::new(controller, AccessRequest::new());
        guard.sync(&Session::authenticated("uid-1"));
        let mut rx = guard.subscribe();
        drop(guard);

        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(*rx.borrow(), GuardState::Loading);
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_superseded_result_is_discarded() {
        let gate = Arc::new(Notify::new());
        let controller = AccessController::new(Arc::new(GatedStore { gate: Arc::clone(&gate) }));

        let mut guard = Guard::new(controller, AccessRequest::new());
        guard.sync(&Session::authenticated("uid-1"));

        // the second check needs no fetch and resolves first
        guard.sync(&Session::anonymous());
        let decision = guard.ready().await.unwrap();
        assert_eq!(decision.denial(), Some(&Denial::NotAuthenticated));

        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(guard.state().decision().and_then(|d| d.denial()), Some(&Denial::NotAuthenticated));
    }
}
