//! seglabel - point-prompted segmentation annotator
//!
//! Users place positive and negative points on an image, an external
//! segmentation oracle proposes masks, and committed masks are exported as
//! YOLO polygon or box labels.

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod format;
pub mod message;
pub mod model;
pub mod oracle;
pub mod picker;
pub mod script;
pub mod state;
pub mod undo;
pub mod view_transform;

pub use config::AppConfig;
pub use controller::{Outcome, SessionController};
pub use error::{Error, Result};
pub use message::Message;
pub use oracle::{CommandOracle, OracleRequest, Prediction, SegmentationOracle};
pub use view_transform::{ViewTransform, ZoomDirection};
