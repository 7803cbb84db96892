//! macport Core - Shared types and inventory storage
//!
//! This crate provides the foundational types for macport:
//! - Vendor tags and the static vendor -> OID registry
//! - Host, MAC address and MAC/port observation types
//! - The per-host skip reason taxonomy and failure reporting trait
//! - The SQLite inventory store

pub mod host;
pub mod inventory;
pub mod mac;
pub mod report;
pub mod vendor;

pub use host::{is_macro_placeholder, Host, MacPortEntry, UNKNOWN_PORT};
pub use inventory::{InventoryError, InventoryRecord, InventoryStore};
pub use mac::{MacAddress, MacParseError};
pub use report::{FailureReporter, RecordingReporter, SkipReason};
pub use vendor::{ParseVendorError, Vendor, VendorMap, VendorOids, ACCESS_MODE, MAC_TABLE_OID};
