//! Input side of the pipeline: chunked bytes to lines to fields.

mod fields;
mod lines;

pub use fields::split_fields;
pub use lines::LineSplitter;
