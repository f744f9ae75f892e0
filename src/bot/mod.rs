//! Bot core: dialog state, routing, and the event loop.

pub mod bot_loop;
pub mod router;
pub mod state;

pub use bot_loop::{Bot, BotDeps, dispatch};
pub use router::{Command, Route, SelectionTag};
pub use state::{DialogState, StateGuard, StateKey, StateRegister};
