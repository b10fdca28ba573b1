//! Launch record encoding
//!
//! Turns one kernel snapshot into the JSON record consumed by offline
//! verification tooling. Field order is part of the format and follows the
//! struct declaration order below: language, kernel_file, global_offset,
//! global_size, local_size, entry_point, then kernel_arguments only when at
//! least one argument slot exists.
//!
//! # Argument classification
//!
//! The host API gives no type channel for kernel arguments, so classification
//! is a documented best-effort heuristic:
//!
//! - a null binding is an array; its declared length is reported as `size`
//!   unless it matches a handle size (then it is taken to be global/constant
//!   memory of unspecified size rather than local memory);
//! - a handle-sized payload whose bit pattern matches a live buffer in the
//!   registry is an array with that buffer's recorded size. A scalar that
//!   happens to alias a live handle's value is indistinguishable and will be
//!   misclassified; accepted imprecision;
//! - anything else is a scalar, rendered as lowercase hex in storage order.

use std::mem;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handles::{BufferHandle, KernelHandle, SamplerHandle};
use crate::registry::{ArgRecord, Registry};

/// Literal language tag emitted in every record.
pub const LANGUAGE: &str = "OpenCL";

/// One recorded kernel launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchTrace {
    pub language: String,
    /// Name of the per-launch source dump, relative to the trace directory.
    pub kernel_file: String,
    pub global_offset: Vec<usize>,
    pub global_size: Vec<usize>,
    pub local_size: Vec<usize>,
    pub entry_point: String,
    /// Present only when the kernel has at least one argument slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_arguments: Option<Vec<KernelArgument>>,
}

/// Classification of one argument slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    Array,
    Scalar,
}

/// One argument descriptor within a launch record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelArgument {
    #[serde(rename = "type")]
    pub kind: ArgumentKind,
    /// Buffer size in bytes, when known or inferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Scalar payload as `0x`-prefixed lowercase hex, most significant stored
    /// byte first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Apply the type-ambiguity heuristic to one argument slot.
pub fn classify_argument(arg: &ArgRecord, registry: &Registry) -> KernelArgument {
    const HANDLE_SIZE: usize = mem::size_of::<BufferHandle>();
    const SAMPLER_SIZE: usize = mem::size_of::<SamplerHandle>();

    match arg {
        ArgRecord::Unset | ArgRecord::Null { .. } => {
            // Null binding: unallocated memory. A length that matches no
            // handle size is taken to be local memory sized by that length.
            let len = arg.recorded_len();
            let size = (len != HANDLE_SIZE && len != SAMPLER_SIZE).then_some(len);
            KernelArgument {
                kind: ArgumentKind::Array,
                size,
                value: None,
            }
        }
        ArgRecord::Value { bytes } => {
            if bytes.len() == HANDLE_SIZE {
                if let Some(candidate) = BufferHandle::from_payload(bytes) {
                    if let Some(buffer) = registry.buffer(candidate) {
                        return KernelArgument {
                            kind: ArgumentKind::Array,
                            size: Some(buffer.size),
                            value: None,
                        };
                    }
                }
            }
            KernelArgument {
                kind: ArgumentKind::Scalar,
                size: None,
                value: Some(format!("0x{}", hex::encode(bytes))),
            }
        }
    }
}

/// Build the record for one launch from the kernel's current shadow state.
///
/// `kernel_file` is the name of the freshly written source dump for this
/// launch. Geometry vectors have equal length by construction; the registry
/// rewrites all three wholesale on every launch.
pub fn encode_launch(
    registry: &Registry,
    kernel: KernelHandle,
    kernel_file: String,
) -> Result<LaunchTrace> {
    let record = registry.kernel(kernel)?;
    debug_assert_eq!(record.global_offset.len(), record.global_size.len());
    debug_assert_eq!(record.global_size.len(), record.local_size.len());

    let kernel_arguments = (!record.arguments.is_empty()).then(|| {
        record
            .arguments
            .iter()
            .map(|arg| classify_argument(arg, registry))
            .collect()
    });

    Ok(LaunchTrace {
        language: LANGUAGE.to_string(),
        kernel_file,
        global_offset: record.global_offset.clone(),
        global_size: record.global_size.clone(),
        local_size: record.local_size.clone(),
        entry_point: record.entry_point.clone(),
        kernel_arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::{MemFlags, ProgramHandle};
    use proptest::prelude::*;

    const HANDLE_SIZE: usize = mem::size_of::<BufferHandle>();

    #[test]
    fn test_scalar_hex_rendering_literal_example() {
        let registry = Registry::new();
        let arg = ArgRecord::Value {
            bytes: vec![0x2a, 0x00, 0x00, 0x00],
        };
        let classified = classify_argument(&arg, &registry);
        assert_eq!(classified.kind, ArgumentKind::Scalar);
        assert_eq!(classified.value.as_deref(), Some("0x2a000000"));
        assert_eq!(classified.size, None);
    }

    #[test]
    fn test_handle_sized_payload_matching_live_buffer_is_array() {
        let mut registry = Registry::new();
        let handle = BufferHandle(0x5000);
        registry.record_buffer_created(handle, 1024, 0, MemFlags(0));

        let arg = ArgRecord::Value {
            bytes: handle.0.to_ne_bytes().to_vec(),
        };
        let classified = classify_argument(&arg, &registry);
        assert_eq!(classified.kind, ArgumentKind::Array);
        assert_eq!(classified.size, Some(1024));
        assert_eq!(classified.value, None);
    }

    #[test]
    fn test_handle_sized_payload_without_match_is_scalar() {
        let registry = Registry::new();
        let arg = ArgRecord::Value {
            bytes: 0x5000usize.to_ne_bytes().to_vec(),
        };
        let classified = classify_argument(&arg, &registry);
        assert_eq!(classified.kind, ArgumentKind::Scalar);
        assert!(classified.value.is_some());
    }

    #[test]
    fn test_null_binding_with_non_handle_length_reports_size() {
        let registry = Registry::new();
        let arg = ArgRecord::Null { size: 256 };
        let classified = classify_argument(&arg, &registry);
        assert_eq!(classified.kind, ArgumentKind::Array);
        assert_eq!(classified.size, Some(256));
        assert_eq!(classified.value, None);
    }

    #[test]
    fn test_null_binding_with_handle_length_reports_no_size() {
        let registry = Registry::new();
        let arg = ArgRecord::Null { size: HANDLE_SIZE };
        let classified = classify_argument(&arg, &registry);
        assert_eq!(classified.kind, ArgumentKind::Array);
        assert_eq!(classified.size, None);
    }

    #[test]
    fn test_unset_slot_reports_length_zero() {
        let registry = Registry::new();
        let classified = classify_argument(&ArgRecord::Unset, &registry);
        assert_eq!(classified.kind, ArgumentKind::Array);
        assert_eq!(classified.size, Some(0));
    }

    #[test]
    fn test_encode_launch_field_order_and_optional_arguments() {
        let mut registry = Registry::new();
        let program = ProgramHandle(1);
        let kernel = KernelHandle(2);
        registry.record_program_created(program, vec![b"__kernel void f() {}".to_vec()]);
        registry.record_kernel_created(kernel, program, "f").unwrap();
        registry
            .record_launch_geometry(kernel, 2, None, &[64, 1], None)
            .unwrap();

        let trace = encode_launch(&registry, kernel, "f.0.cl".to_string()).unwrap();
        assert_eq!(trace.language, "OpenCL");
        assert_eq!(trace.global_offset, vec![0, 0]);
        assert_eq!(trace.local_size, vec![64, 1]);
        // No argument was ever bound, so the field is omitted entirely
        assert!(trace.kernel_arguments.is_none());

        let json = serde_json::to_string(&trace).unwrap();
        assert!(!json.contains("kernel_arguments"));
        let language_at = json.find("\"language\"").unwrap();
        let file_at = json.find("\"kernel_file\"").unwrap();
        let entry_at = json.find("\"entry_point\"").unwrap();
        assert!(language_at < file_at && file_at < entry_at);
    }

    #[test]
    fn test_encode_launch_unknown_kernel() {
        let registry = Registry::new();
        assert!(encode_launch(&registry, KernelHandle(9), "x.0.cl".into()).is_err());
    }

    proptest! {
        #[test]
        fn prop_scalar_hex_is_two_lowercase_digits_per_stored_byte(
            bytes in proptest::collection::vec(any::<u8>(), 1..64)
        ) {
            // Avoid the handle-sized case: with an empty registry it still
            // classifies as scalar, but keep the property about rendering only.
            let registry = Registry::new();
            let arg = ArgRecord::Value { bytes: bytes.clone() };
            let classified = classify_argument(&arg, &registry);
            prop_assert_eq!(classified.kind, ArgumentKind::Scalar);

            let value = classified.value.unwrap();
            let hex_part = value.strip_prefix("0x").unwrap();
            prop_assert_eq!(hex_part.len(), bytes.len() * 2);
            for (i, byte) in bytes.iter().enumerate() {
                let rendered = &hex_part[i * 2..i * 2 + 2];
                prop_assert_eq!(rendered, format!("{:02x}", byte));
            }
        }
    }
}
