//! Leaf template scanning
//!
//! This module provides the span locators and the rewrite loop used by the
//! leaf pipeline. A leaf template is plain prototxt text with placeholders:
//!
//! ```text
//! layer {
//!   name: "conv"
//!   type: "Convolution"
//!   bottom: "[INPUT]"
//!   top: "conv"
//!   convolution_param { num_output: [[ [NUM] * 2 ]] kernel_size: [KERNEL:3] }
//! }
//! [conv]
//! ```

mod placeholder;
mod scan;

pub use placeholder::{parse_output_entries, InputRef, OutputEntry, Variable};
pub use scan::{
    find_expression, find_input, find_key_value, find_prefix_key, find_variable,
    last_layer_top, rewrite_all, split_output_declaration, Resume, MAX_REWRITES, PREFIX_KEYS,
};
