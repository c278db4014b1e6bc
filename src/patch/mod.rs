//! SCIM PATCH support (RFC 7644 section 3.5.2).
//!
//! - [`parse_patch_path`] turns `members[value eq "x"].display` style paths
//!   into a [`PatchOperationPath`].
//! - [`PatchRequest`] and [`PatchOperation`] model the request body.
//! - [`apply_patch`] runs the add/remove/replace state machine against
//!   resource JSON.

pub mod apply;
pub mod operation;
pub mod path;

pub use apply::{apply_patch, apply_patch_with_config, patched};
pub use operation::{PATCH_OP_URN, PatchOp, PatchOperation, PatchRequest};
pub use path::{PatchOperationPath, parse_patch_path, parse_patch_path_with_config};
