//! Handlers of the bot's chain, in order: [`CommandHandler`] (group prefix filter, `/start`,
//! `/reset`), [`AccessHandler`] (allow-list), [`CompletionHandler`] (AI reply).

mod access;
mod command;
mod completion;

pub use access::{AccessHandler, MSG_NO_ACCESS};
pub use command::{CommandHandler, CommandPrefix, MSG_RESET, MSG_START, MSG_WHAT};
pub use completion::{CompletionHandler, MSG_EMPTY_REPLY};
