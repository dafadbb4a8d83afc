//! Room events and sequence tracking

mod room_event;
mod sequence;

pub use room_event::{RemovalReason, RoomEvent, RoomEventDraft, RoomEventPayload};
pub use sequence::{SequenceCheck, SequenceTracker};
