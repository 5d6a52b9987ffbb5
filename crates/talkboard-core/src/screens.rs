//! Screen controllers: the clear button and the login/room flow.

use crate::auth::{AuthResult, Credentials, IdentityProvider, UserHandle};
use crate::call::{CallRequest, ClientRole, VideoProfile};
use crate::signal::{BoardSignal, SignalBus};

/// The clear-all button.
pub struct ClearController {
    bus: SignalBus,
}

impl ClearController {
    pub fn new(bus: &SignalBus) -> Self {
        Self { bus: bus.clone() }
    }

    /// Post a clear-all signal to every canvas. Returns how many received it.
    pub fn press(&self) -> usize {
        log::info!("Clear all requested");
        self.bus.post(BoardSignal::ClearAll)
    }
}

/// Which screen the login flow is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    /// Waiting for the broadcaster/audience prompt.
    RoleSelection,
    /// In a call and on the board.
    Live(CallRequest),
}

/// Login screen state and transitions.
#[derive(Debug, Default)]
pub struct LoginController {
    pub email: String,
    pub password: String,
    pub room_name: String,
    error: Option<String>,
    screen: Screen,
    user: Option<UserHandle>,
    video_profile: VideoProfile,
}

impl LoginController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Last failure message, if any. Cleared by the next successful action.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn user(&self) -> Option<&UserHandle> {
        self.user.as_ref()
    }

    pub fn video_profile(&self) -> VideoProfile {
        self.video_profile
    }

    pub fn set_video_profile(&mut self, profile: VideoProfile) {
        log::debug!("Video profile set to {}", profile);
        self.video_profile = profile;
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(self.email.trim(), self.password.as_str())
    }

    /// Sign in with the entered credentials and move to role selection.
    pub async fn sign_in(&mut self, provider: &dyn IdentityProvider) -> AuthResult<()> {
        let credentials = self.credentials();
        match provider.sign_in(&credentials).await {
            Ok(user) => {
                log::info!("Signed in as {}", user.email);
                self.user = Some(user);
                self.error = None;
                self.screen = Screen::RoleSelection;
                Ok(())
            }
            Err(e) => {
                log::warn!("Sign-in failed: {}", e);
                self.error = Some(e.to_string());
                self.screen = Screen::Login;
                Err(e)
            }
        }
    }

    /// Register the entered credentials. On success both fields are emptied.
    pub async fn sign_up(&mut self, provider: &dyn IdentityProvider) -> AuthResult<()> {
        let credentials = self.credentials();
        match provider.sign_up(&credentials).await {
            Ok(user) => {
                log::info!("Registered {}", user.email);
                self.email.clear();
                self.password.clear();
                self.error = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("Sign-up failed: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Return-key action on the room field. Returns `true` if the prompt opened.
    pub fn submit_room_name(&mut self) -> bool {
        if self.room_name.trim().is_empty() {
            return false;
        }
        self.screen = Screen::RoleSelection;
        true
    }

    /// Answer the role prompt. `None` cancels back to the login screen.
    pub fn choose_role(&mut self, role: Option<ClientRole>) -> &Screen {
        let room = self.room_name.trim();
        self.screen = match role {
            Some(_) if room.is_empty() => {
                self.error = Some("Enter a room name.".to_string());
                Screen::Login
            }
            Some(role) => {
                log::info!("Joining room {} as {:?}", room, role);
                self.error = None;
                Screen::Live(CallRequest {
                    room: room.to_string(),
                    role,
                    profile: self.video_profile,
                })
            }
            None => Screen::Login,
        };
        &self.screen
    }

    /// Leave the call and return to the login screen.
    pub fn leave_room(&mut self) {
        if let Screen::Live(request) = &self.screen {
            log::info!("Leaving room {}", request.room);
            self.screen = Screen::Login;
        }
    }
}
