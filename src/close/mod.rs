//! Close protocols for tabshell
//!
//! Two state machines gate destructive actions behind a user decision
//! whenever unsaved changes exist:
//! - `TabClose`: closing a single tab
//! - `SessionClose`: terminating the whole session
//!
//! Neither machine performs I/O. They report the next step (ask the user,
//! start a save, done) and the owner wires those steps to the gateway and
//! the `SaveCoordinator`. Saves already issued are never cancelled; the
//! machines wait in their saving state for the outcome.

mod session;
mod tab;

pub use session::{SessionClose, SessionCloseState, SessionCloseStep};
pub use tab::{TabClose, TabCloseState, TabCloseStep};
