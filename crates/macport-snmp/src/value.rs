//! Normalised SNMP values
//!
//! Switches are inconsistent about how they encode table cells: interface
//! names arrive as printable strings or raw octets, indexes as integers or
//! digit strings. Each table gets one decoding function here instead of
//! inspecting types at every use site.

/// A decoded varbind value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
}

impl SnmpValue {
    /// Classify an OCTET STRING: printable UTF-8 becomes `Text`, anything else `Bytes`
    pub fn from_octets(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(s) if !s.chars().any(|c| c.is_control() && c != '\t') => Self::Text(s.to_string()),
            _ => Self::Bytes(bytes.to_vec()),
        }
    }

    /// Interface-name table cell -> port name, surrounding quotes removed.
    /// `None` if nothing is left.
    pub fn port_name(&self) -> Option<String> {
        let name = match self {
            SnmpValue::Text(s) => trim_quotes(s).to_string(),
            SnmpValue::Bytes(b) => trim_quotes(&String::from_utf8_lossy(b)).to_string(),
            SnmpValue::Integer(i) => i.to_string(),
        };
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// VLAN-mode table cell -> mode code (1 = access, 2 = trunk)
    pub fn vlan_mode(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(i) => Some(*i),
            SnmpValue::Text(s) => trim_quotes(s).trim().parse().ok(),
            SnmpValue::Bytes(_) => None,
        }
    }

    /// MAC forwarding table cell -> owning interface index
    pub fn if_index(&self) -> Option<u32> {
        match self {
            SnmpValue::Integer(i) => u32::try_from(*i).ok(),
            SnmpValue::Text(s) => trim_quotes(s).trim().parse().ok(),
            SnmpValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }
}

impl From<i64> for SnmpValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SnmpValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SnmpValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

fn trim_quotes(s: &str) -> &str {
    s.trim_matches('"')
}
