// lottie-data: typed readers over the Lottie JSON tree and the serde keyframe model
pub mod json;
pub mod model;

pub use json::{dump, parse, parse_default, Parse};
pub use model::{BezierPath, EasingHandle, Keyframe};
