pub mod flow;
pub mod redirect;
pub mod result;

pub use flow::{
    AuthFlowController, AuthOutcome, AuthRequest, AuthSession, AuthState, AuthSurface,
    NavigationError, SessionId, RESULT_METHOD,
};
pub use redirect::is_redirect;
pub use result::AuthResult;
