use serde::{Deserialize, Serialize};

/// Generates `Option`-setting builder methods for request structs.
macro_rules! impl_builder_methods {
    ($builder:ident, $($field:ident: $field_type:ty),*) => {
        impl $builder {
            $(
                pub fn $field(mut self, $field: $field_type) -> Self {
                    self.$field = Some($field);
                    self
                }
            )*
        }
    };
}
pub(crate) use impl_builder_methods;

/// Token accounting reported by non-streaming responses. Missing counters
/// read as zero; compatible servers often omit some of them.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
