//! Data models for the annotation session.

mod annotation;
mod class_registry;
mod geometry;
mod mask;
mod point;

pub use annotation::{Annotation, MaskId};
pub use class_registry::{ClassEntry, ClassRegistry, class_color};
pub use geometry::{BoundingBox, ImageSize, PixelRect};
pub use mask::Mask;
pub use point::{Point, Polarity};
