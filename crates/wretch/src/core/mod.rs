//! Pure transformations: option merging, parameter encoding and status
//! classification. Nothing in here performs I/O or touches shared state.

mod encode;
mod mix;
mod status;

pub use encode::{form_url, param_pairs, stringify};
pub use mix::mix;
pub use status::{error_message, is_ok};
