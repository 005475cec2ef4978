//! Tangent Numeric - Local estimators
//!
//! Everything here is synchronous and works on any `Univariate` function:
//! - central-difference derivatives with a stability test
//! - composite Simpson integration
//! - classification of directional limits
//! - plot sampling with asymptote detection

mod derivative;
mod integral;
mod limit;
mod sampler;
mod viewport;

pub use derivative::{central_difference, numeric_derivative, STEPS};
pub use integral::{numeric_integral, simpson, SLICES};
pub use limit::{classify_bilateral, classify_one_sided, DirectionalLimit, Side};
pub use sampler::{merge_asymptotes, sample, sample_count, Sampling, Segment, EDGE_PADDING, Y_CAP};
pub use viewport::{parse_point, Viewport, ZOOM_STEP};
