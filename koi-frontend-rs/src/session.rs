//! Session state: the signed-in user, the auth modal flag and the listeners
//! the host UI registers to re-render on auth changes.

use koi_utils::User;
use slotmap::SlotMap;

use crate::supabase::{AuthSession, map_user};

slotmap::new_key_type! {
    pub struct SessionListenerKey;
}

type SessionListener = Box<dyn Fn(Option<&User>)>;

pub struct SessionState {
    session: Option<AuthSession>,
    user: Option<User>,
    /// True until the first session resolution lands, so the UI can hold the
    /// auth-dependent chrome instead of flashing the signed-out state.
    loading: bool,
    auth_modal_open: bool,
    listeners: SlotMap<SessionListenerKey, SessionListener>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            session: None,
            user: None,
            loading: true,
            auth_modal_open: false,
            listeners: SlotMap::with_key(),
        }
    }
}

impl SessionState {
    pub fn new() -> SessionState {
        SessionState::default()
    }

    /// Install a session (or clear it) and notify listeners synchronously.
    pub fn set_session(&mut self, session: Option<AuthSession>) {
        self.user = session.as_ref().map(|s| map_user(&s.user));
        self.session = session;
        self.loading = false;
        for listener in self.listeners.values() {
            listener(self.user.as_ref());
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn subscribe(&mut self, listener: SessionListener) -> SessionListenerKey {
        self.listeners.insert(listener)
    }

    pub fn unsubscribe(&mut self, key: SessionListenerKey) {
        self.listeners.remove(key);
    }

    pub fn open_auth_modal(&mut self) {
        self.auth_modal_open = true;
    }

    pub fn close_auth_modal(&mut self) {
        self.auth_modal_open = false;
    }

    pub fn is_auth_modal_open(&self) -> bool {
        self.auth_modal_open
    }
}
