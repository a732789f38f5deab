//! Worker tasks that back the runtime orchestration.
//!
//! The authority worker is the single writer of encounter state. Combat
//! events it emits are handed to the handler worker, which runs the
//! condition handlers against the actor store without holding up turns.

mod authority;
mod handlers;

pub use authority::{AuthorityWorker, Command};
pub use handlers::{HandlerCommand, HandlerWorker};
