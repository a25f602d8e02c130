//! Teacher sign-in and registration form: field state, validation,
//! submission to the backend and the persisted session.

pub mod form;
pub mod session;
pub mod submit;

pub use form::{AuthForm, AuthMode, AuthRequest, Field, FieldErrors};
pub use session::{SessionStore, StoreError, TEACHER_KEY, TOKEN_KEY};
pub use submit::{AuthClient, ClientError, Notice, NoticeLevel, SubmitOutcome, ADMIN_ROUTE};
