//! Routing decision: which handler an event goes to.
//!
//! Pure function of the event and the sender's current dialog state, so the
//! priority rules can be tested without a transport. Priority:
//! 1. bot commands (`/start`, `/help`)
//! 2. recognized button tags (current state ignored)
//! 3. free text in a state that accepts text
//! 4. everything else falls back to navigation

use crate::bot::state::DialogState;
use crate::channels::EventKind;

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

impl Command {
    /// Parse a message as a command. Accepts a `@botname` suffix and ignores
    /// trailing arguments; unknown commands are not commands.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Tags carried by the main-menu buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTag {
    Lessons,
    RootsHelp,
    JewishGoods,
    CommandmentsHelp,
}

impl SelectionTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "lessons" => Some(Self::Lessons),
            "roots_help" => Some(Self::RootsHelp),
            "jewish_goods" => Some(Self::JewishGoods),
            "commandments_help" => Some(Self::CommandmentsHelp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lessons => "lessons",
            Self::RootsHelp => "roots_help",
            Self::JewishGoods => "jewish_goods",
            Self::CommandmentsHelp => "commandments_help",
        }
    }
}

/// Where an event should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    Selection(SelectionTag),
    /// Button with a tag we don't know: acknowledge and warn.
    UnknownSelection(String),
    RootsSubmission,
    Question,
    Navigation,
}

/// Decide the route for an event given the sender's current state.
pub fn route(kind: &EventKind, state: Option<DialogState>) -> Route {
    match kind {
        EventKind::Selection { tag, .. } => match SelectionTag::parse(tag) {
            Some(tag) => Route::Selection(tag),
            None => Route::UnknownSelection(tag.clone()),
        },
        EventKind::Text { text, .. } => {
            if let Some(command) = Command::parse(text) {
                return Route::Command(command);
            }
            match state {
                Some(DialogState::AwaitingRoots) => Route::RootsSubmission,
                Some(DialogState::AwaitingQuestion) => Route::Question,
                _ => Route::Navigation,
            }
        }
    }
}
