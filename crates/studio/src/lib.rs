//! Glide Studio
//!
//! The editing session a UI drives: every timeline mutation goes through
//! [`EditorSession`], is recorded as an undoable [`Transaction`], and
//! recomputes the effective camera trajectory before returning.

pub mod history;
pub mod session;

pub use history::{History, Transaction};
pub use session::{EditorSession, ExportMessage, Selection, SessionError};
