//! Message derivation.
//!
//! Given a populated train, the town registry and the configured
//! templates, produce the ordered list of messages to send and when.

mod derive;
mod templates;
mod towns;

pub use derive::{DESTINATION_KEY, Message, MessageRole, ORIGIN_KEY, derive_messages};
pub use templates::{MessageTemplates, Slot, Slots, Template, TemplateConfig, TemplateError};
pub use towns::{TownEntry, TownRegistry};
