//! Dialog handlers.
//!
//! Each handler recovers from its own failures and answers the user with a
//! fixed text; only transport errors are returned to the dispatcher.

pub mod menu;
pub mod question;
pub mod roots;
pub mod texts;

#[cfg(test)]
pub(crate) mod test_support;
