//! Client side of Tasknest: a session-scoped cache of the current user's notes
//! and tasks that works offline as a guest and mirrors the REST API once the
//! user signs in.

pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod sync;

mod collection;

pub use api::{Api, HttpApi};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use model::{NewNote, NewTask, Note, NoteChanges, RowId, Summary, Task, TaskChanges, User, UserId};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use sync::{DataSync, Mode};
