//! macport SNMP - Switch table walks and MAC/port correlation
//!
//! Opens SNMP v2c sessions, bulk-walks the bridge forwarding table plus the
//! vendor's interface-name and VLAN-mode tables, and joins them into
//! access-port MAC observations.

pub mod correlate;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod value;

pub use correlate::{access_ports, correlate, port_names, Correlator, SwitchTables};
pub use session::{
    parse_oid, SessionFactory, SnmpError, SnmpSession, SnmpTarget, V2cSessionFactory, WalkEntry,
    DEFAULT_MAX_REPETITIONS, DEFAULT_TIMEOUT_SECS, SNMP_PORT,
};
pub use value::SnmpValue;
