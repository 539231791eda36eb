pub mod coordinator;
pub mod error;
pub mod overlay;
pub mod provider;
pub mod source;

pub use coordinator::{MergeCoordinator, RequestStatus};
pub use error::{MergeError, Result};
pub use overlay::{merge_segments, Segment};
pub use provider::{MergeProvider, MergeRequest};
pub use source::{OverlayProvider, SegmentSource, StaticSegments};
