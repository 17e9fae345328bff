pub use path::{KeyPath, KeyPathBuf};
pub use segment::{ParseSegmentError, Segment, SegmentBuf};
pub use selector::Selector;

mod path;
mod segment;
mod selector;
