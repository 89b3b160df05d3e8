//! In-memory conversation storage.
//!
//! A [`Conversation`] is the ordered list of [`Message`]s shown on screen.
//! Insertion order is display order and ids are assigned by the store, so
//! they are unique and increase in creation order.
//!
//! # Example
//!
//! ```rust
//! use chatstream::conversation::{Conversation, MessagePatch, NewMessage};
//!
//! let mut conversation = Conversation::new();
//! let user = conversation.append(NewMessage::user("Hello!"));
//! let reply = conversation.append(NewMessage::placeholder());
//! assert_eq!((user, reply), (1, 2));
//!
//! conversation.patch(reply, MessagePatch::content("Hi").loaded());
//! assert_eq!(conversation.get(reply).unwrap().content, "Hi");
//! ```

mod store;

pub use store::{Conversation, Message, MessageId, MessageKind, MessagePatch, NewMessage};
