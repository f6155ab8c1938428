mod chat_complete;
mod reply;

pub use chat_complete::{StreamingChatProvider, check_preconditions};
pub use reply::{CancelHandle, Failure, FailureKind, ReplyEvent, ReplyHandle, ReplyStream};
