//! # Chat
//!
//! Per-room session controller and the list/search helpers it renders from.

pub mod search;
pub mod session;
pub mod timeline;

pub use search::{SearchState, SearchView};
pub use session::{room_topic, ChatDeps, ChatSession, Delivery};
