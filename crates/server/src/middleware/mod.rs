pub mod session;

pub use session::{SESSION_COOKIE, SessionContext, load_session, session_cookie};
