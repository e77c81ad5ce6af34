//! Application state management modules.

mod project;
mod session;
mod store;

pub use project::{IMAGE_EXTENSIONS, ProjectState, is_image_file, list_images};
pub use session::{Candidate, ImageSession};
pub use store::{AnnotationStore, ResetScope};
