//! JSON-RPC envelope and the directory's host/macro payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request envelope
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: P,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<&'a str>,
    pub id: u64,
}

/// Incoming response envelope. Exactly one of `result` / `error` is expected.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// `host.get` parameters
#[derive(Debug, Serialize)]
pub struct HostGetParams {
    pub groupids: u64,
    pub output: [&'static str; 2],
    #[serde(rename = "selectInterfaces")]
    pub select_interfaces: [&'static str; 3],
    #[serde(rename = "selectParentTemplates")]
    pub select_parent_templates: [&'static str; 1],
}

impl HostGetParams {
    pub fn for_group(group_id: u64) -> Self {
        Self {
            groupids: group_id,
            output: ["host", "hostid"],
            select_interfaces: ["ip", "details", "type"],
            select_parent_templates: ["templateid"],
        }
    }
}

/// `usermacro.get` parameters
#[derive(Debug, Serialize)]
pub struct MacroGetParams<'a> {
    pub hostids: &'a str,
    pub output: [&'static str; 2],
    pub globalmacro: bool,
    pub templatemacros: bool,
}

impl<'a> MacroGetParams<'a> {
    pub fn for_host(host_id: &'a str) -> Self {
        Self {
            hostids: host_id,
            output: ["macro", "value"],
            globalmacro: true,
            templatemacros: true,
        }
    }
}

/// Interface type code the directory uses for SNMP agents
pub const INTERFACE_TYPE_SNMP: &str = "2";

#[derive(Debug, Clone, Deserialize)]
pub struct HostRecord {
    pub host: String,
    #[serde(default)]
    pub hostid: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(default, rename = "parentTemplates")]
    pub parent_templates: Vec<TemplateRecord>,
}

impl HostRecord {
    /// First SNMP interface. Interfaces without a type field are assumed to be SNMP.
    pub fn snmp_interface(&self) -> Option<&InterfaceRecord> {
        self.interfaces.iter().find(|i| {
            i.interface_type
                .as_deref()
                .map_or(true, |t| t == INTERFACE_TYPE_SNMP)
        })
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.parent_templates.iter().map(|t| t.templateid.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceRecord {
    #[serde(default)]
    pub ip: String,
    #[serde(default, rename = "type")]
    pub interface_type: Option<String>,
    /// An object for SNMP interfaces, an empty array for everything else
    #[serde(default)]
    pub details: Value,
}

impl InterfaceRecord {
    /// SNMP community (literal or `{$MACRO}`), empty if absent
    pub fn community(&self) -> String {
        self.details
            .get("community")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    pub templateid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserMacro {
    #[serde(rename = "macro")]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Exact-name lookup in a macro listing
pub fn find_macro<'a>(macros: &'a [UserMacro], name: &str) -> Option<&'a UserMacro> {
    macros.iter().find(|m| m.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: "host.get",
            params: HostGetParams::for_group(12),
            auth: Some("token"),
            id: 1,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "host.get");
        assert_eq!(value["auth"], "token");
        assert_eq!(value["id"], 1);
        assert_eq!(value["params"]["groupids"], 12);
        assert_eq!(value["params"]["selectParentTemplates"], json!(["templateid"]));
    }

    #[test]
    fn test_macro_params_shape() {
        let value = serde_json::to_value(MacroGetParams::for_host("10101")).unwrap();
        assert_eq!(value["hostids"], "10101");
        assert_eq!(value["globalmacro"], true);
        assert_eq!(value["templatemacros"], true);
    }

    #[test]
    fn test_parse_host_record() {
        let record: HostRecord = serde_json::from_value(json!({
            "host": "sw1",
            "hostid": "10101",
            "interfaces": [
                {"ip": "10.0.0.9", "type": "1", "details": []},
                {
                    "ip": "10.0.0.1",
                    "type": "2",
                    "details": {"version": "2", "community": "{$SNMP_COMMUNITY}"}
                }
            ],
            "parentTemplates": [{"templateid": "10251"}, {"templateid": "10001"}]
        }))
        .unwrap();

        let iface = record.snmp_interface().unwrap();
        assert_eq!(iface.ip, "10.0.0.1");
        assert_eq!(iface.community(), "{$SNMP_COMMUNITY}");
        assert_eq!(record.template_ids().collect::<Vec<_>>(), vec!["10251", "10001"]);
    }

    #[test]
    fn test_host_without_snmp_interface() {
        let record: HostRecord = serde_json::from_value(json!({
            "host": "srv1",
            "hostid": "10102",
            "interfaces": [{"ip": "10.0.0.9", "type": "1", "details": []}]
        }))
        .unwrap();
        assert!(record.snmp_interface().is_none());

        let empty: HostRecord =
            serde_json::from_value(json!({"host": "x", "hostid": "1"})).unwrap();
        assert!(empty.snmp_interface().is_none());
    }

    #[test]
    fn test_find_macro_exact() {
        let macros = vec![
            UserMacro { name: "{$SNMP_COMMUNITY_RO}".into(), value: "nope".into() },
            UserMacro { name: "{$SNMP_COMMUNITY}".into(), value: "public123".into() },
        ];
        assert_eq!(find_macro(&macros, "{$SNMP_COMMUNITY}").unwrap().value, "public123");
        assert!(find_macro(&macros, "{$SNMP}").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let response: RpcResponse<Vec<HostRecord>> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32602, "message": "Invalid params.", "data": "Not authorised."},
            "id": 1
        }))
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
