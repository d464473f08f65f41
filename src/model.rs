// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration objects pushed over NETCONF.
//!
//! Objects render themselves to the XML body netopeer2-cli takes with
//! `edit-config --config=<file>`. Only the leaves the scenarios touch are
//! modelled: interface name, type, enabled flag, MTU and IPv4 addresses for
//! ietf-interfaces, and the equivalent subset of openconfig-interfaces.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::validation;

pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const IETF_INTERFACES_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";
pub const IETF_IP_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-ip";
pub const IANA_IF_TYPE_NS: &str = "urn:ietf:params:xml:ns:yang:iana-if-type";
pub const OC_INTERFACES_NS: &str = "http://openconfig.net/yang/interfaces";
pub const OC_IP_NS: &str = "http://openconfig.net/yang/interfaces/ip";

/// `ianaift:ethernetCsmacd`
pub const ETHERNET_CSMACD: &str = "ethernetCsmacd";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid IPv4 prefix '{input}': {reason}")]
    InvalidPrefix { input: String, reason: String },

    #[error("failed to render XML: {0}")]
    Xml(#[from] xml::writer::Error),
}

/// NETCONF `operation` attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOperation {
    Merge,
    Replace,
    Create,
    Delete,
    Remove,
}

impl EditOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            EditOperation::Merge => "merge",
            EditOperation::Replace => "replace",
            EditOperation::Create => "create",
            EditOperation::Delete => "delete",
            EditOperation::Remove => "remove",
        }
    }

    /// Deletions only need the list keys.
    pub const fn is_removal(self) -> bool {
        matches!(self, EditOperation::Delete | EditOperation::Remove)
    }
}

/// An IPv4 address with its prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Prefix {
    pub ip: Ipv4Addr,
    pub prefix_length: u8,
}

impl Ipv4Prefix {
    pub fn new(ip: Ipv4Addr, prefix_length: u8) -> Result<Self, ModelError> {
        validation::validate_prefix_length(prefix_length, &ip.to_string()).map_err(|reason| {
            ModelError::InvalidPrefix {
                input: format!("{}/{}", ip, prefix_length),
                reason,
            }
        })?;
        Ok(Self { ip, prefix_length })
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_length)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ModelError::InvalidPrefix {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (ip, prefix) = s.split_once('/').ok_or_else(|| invalid("missing /prefix"))?;
        let ip: Ipv4Addr = ip.parse().map_err(|_| invalid("bad address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix length"))?;
        Ipv4Prefix::new(ip, prefix)
    }
}

/// Something that can be created or deleted with `edit-config`
pub trait ConfigObject {
    /// Short description for logs
    fn describe(&self) -> String;

    /// XML body for `edit-config` with the given operation on the list entry.
    fn to_xml(&self, operation: EditOperation) -> Result<String, ModelError>;

    /// XPath selecting this object for `get --filter-xpath`.
    fn xpath(&self) -> String;
}

type Writer<'a> = EventWriter<&'a mut Vec<u8>>;

fn writer(buffer: &mut Vec<u8>) -> Writer<'_> {
    EmitterConfig::new()
        .perform_indent(true)
        .write_document_declaration(false)
        .create_writer(buffer)
}

fn leaf(w: &mut Writer<'_>, name: &str, value: &str) -> Result<(), ModelError> {
    w.write(XmlEvent::start_element(name))?;
    w.write(XmlEvent::characters(value))?;
    w.write(XmlEvent::end_element())?;
    Ok(())
}

fn end(w: &mut Writer<'_>) -> Result<(), ModelError> {
    w.write(XmlEvent::end_element())?;
    Ok(())
}

/// `<interface>` list entry, tagged with `operation` unless it is a merge.
fn start_list_entry(w: &mut Writer<'_>, operation: EditOperation) -> Result<(), ModelError> {
    let entry = XmlEvent::start_element("interface");
    let entry = match operation {
        EditOperation::Merge => entry,
        op => entry
            .ns("xc", NETCONF_BASE_NS)
            .attr("xc:operation", op.as_str()),
    };
    w.write(entry)?;
    Ok(())
}

fn finish(buffer: Vec<u8>) -> String {
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Entry of the ietf-interfaces `interfaces/interface` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IetfInterface {
    pub name: String,
    /// iana-if-type identity, e.g. `ethernetCsmacd`
    pub interface_type: Option<String>,
    pub enabled: Option<bool>,
    pub mtu: Option<u16>,
    pub ipv4: Vec<Ipv4Prefix>,
}

impl IetfInterface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interface_type: Some(ETHERNET_CSMACD.to_string()),
            enabled: None,
            mtu: None,
            ipv4: Vec::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn address(mut self, prefix: Ipv4Prefix) -> Self {
        self.ipv4.push(prefix);
        self
    }
}

impl ConfigObject for IetfInterface {
    fn describe(&self) -> String {
        format!("ietf-interfaces interface {}", self.name)
    }

    fn to_xml(&self, operation: EditOperation) -> Result<String, ModelError> {
        let mut buffer = Vec::new();
        {
            let mut w = writer(&mut buffer);
            w.write(XmlEvent::start_element("interfaces").default_ns(IETF_INTERFACES_NS))?;
            start_list_entry(&mut w, operation)?;
            leaf(&mut w, "name", &self.name)?;

            if !operation.is_removal() {
                if let Some(interface_type) = &self.interface_type {
                    w.write(XmlEvent::start_element("type").ns("ianaift", IANA_IF_TYPE_NS))?;
                    w.write(XmlEvent::characters(&format!("ianaift:{}", interface_type)))?;
                    end(&mut w)?;
                }
                if let Some(enabled) = self.enabled {
                    leaf(&mut w, "enabled", &enabled.to_string())?;
                }
                if self.mtu.is_some() || !self.ipv4.is_empty() {
                    w.write(XmlEvent::start_element("ipv4").default_ns(IETF_IP_NS))?;
                    if let Some(mtu) = self.mtu {
                        leaf(&mut w, "mtu", &mtu.to_string())?;
                    }
                    for prefix in &self.ipv4 {
                        w.write(XmlEvent::start_element("address"))?;
                        leaf(&mut w, "ip", &prefix.ip.to_string())?;
                        leaf(&mut w, "prefix-length", &prefix.prefix_length.to_string())?;
                        end(&mut w)?;
                    }
                    end(&mut w)?;
                }
            }

            end(&mut w)?;
            end(&mut w)?;
        }
        Ok(finish(buffer))
    }

    fn xpath(&self) -> String {
        format!(
            "/ietf-interfaces:interfaces/interface[name='{}']",
            self.name
        )
    }
}

/// Entry of the openconfig-interfaces `interfaces/interface` list.
///
/// Addresses go on subinterface 0, the way VPP maps untagged interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcInterface {
    pub name: String,
    pub interface_type: Option<String>,
    pub enabled: Option<bool>,
    pub ipv4: Vec<Ipv4Prefix>,
}

impl OcInterface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interface_type: Some(ETHERNET_CSMACD.to_string()),
            enabled: None,
            ipv4: Vec::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn address(mut self, prefix: Ipv4Prefix) -> Self {
        self.ipv4.push(prefix);
        self
    }
}

impl ConfigObject for OcInterface {
    fn describe(&self) -> String {
        format!("openconfig-interfaces interface {}", self.name)
    }

    fn to_xml(&self, operation: EditOperation) -> Result<String, ModelError> {
        let mut buffer = Vec::new();
        {
            let mut w = writer(&mut buffer);
            w.write(XmlEvent::start_element("interfaces").default_ns(OC_INTERFACES_NS))?;
            start_list_entry(&mut w, operation)?;
            leaf(&mut w, "name", &self.name)?;

            if !operation.is_removal() {
                w.write(XmlEvent::start_element("config"))?;
                leaf(&mut w, "name", &self.name)?;
                if let Some(interface_type) = &self.interface_type {
                    w.write(XmlEvent::start_element("type").ns("ianaift", IANA_IF_TYPE_NS))?;
                    w.write(XmlEvent::characters(&format!("ianaift:{}", interface_type)))?;
                    end(&mut w)?;
                }
                if let Some(enabled) = self.enabled {
                    leaf(&mut w, "enabled", &enabled.to_string())?;
                }
                end(&mut w)?;

                if !self.ipv4.is_empty() {
                    w.write(XmlEvent::start_element("subinterfaces"))?;
                    w.write(XmlEvent::start_element("subinterface"))?;
                    leaf(&mut w, "index", "0")?;
                    w.write(XmlEvent::start_element("config"))?;
                    leaf(&mut w, "index", "0")?;
                    end(&mut w)?;
                    w.write(XmlEvent::start_element("ipv4").default_ns(OC_IP_NS))?;
                    w.write(XmlEvent::start_element("addresses"))?;
                    for prefix in &self.ipv4 {
                        let ip = prefix.ip.to_string();
                        w.write(XmlEvent::start_element("address"))?;
                        leaf(&mut w, "ip", &ip)?;
                        w.write(XmlEvent::start_element("config"))?;
                        leaf(&mut w, "ip", &ip)?;
                        leaf(&mut w, "prefix-length", &prefix.prefix_length.to_string())?;
                        end(&mut w)?;
                        end(&mut w)?;
                    }
                    end(&mut w)?; // addresses
                    end(&mut w)?; // ipv4
                    end(&mut w)?; // subinterface
                    end(&mut w)?; // subinterfaces
                }
            }

            end(&mut w)?;
            end(&mut w)?;
        }
        Ok(finish(buffer))
    }

    fn xpath(&self) -> String {
        format!(
            "/openconfig-interfaces:interfaces/interface[name='{}']",
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(xml: &str) -> String {
        xml.lines().map(str::trim).collect()
    }

    #[test]
    fn test_prefix_parse_and_display() {
        let prefix: Ipv4Prefix = "142.168.0.1/14".parse().unwrap();
        assert_eq!(prefix.ip, Ipv4Addr::new(142, 168, 0, 1));
        assert_eq!(prefix.prefix_length, 14);
        assert_eq!(prefix.to_string(), "142.168.0.1/14");
    }

    #[test]
    fn test_prefix_rejects_garbage() {
        assert!("192.168.0.1".parse::<Ipv4Prefix>().is_err());
        assert!("192.168.0.1/33".parse::<Ipv4Prefix>().is_err());
        assert!("192.168.0/24".parse::<Ipv4Prefix>().is_err());
    }

    #[test]
    fn test_ietf_interface_merge() {
        let interface = IetfInterface::new("host-vpp1")
            .enabled(true)
            .address("192.168.0.1/24".parse().unwrap());
        let xml = compact(&interface.to_xml(EditOperation::Merge).unwrap());

        assert!(xml.starts_with(&format!("<interfaces xmlns=\"{}\">", IETF_INTERFACES_NS)));
        assert!(xml.contains("<interface><name>host-vpp1</name>"));
        assert!(xml.contains("ianaift:ethernetCsmacd</type>"));
        assert!(xml.contains("<enabled>true</enabled>"));
        assert!(xml.contains(&format!("<ipv4 xmlns=\"{}\">", IETF_IP_NS)));
        assert!(xml.contains("<address><ip>192.168.0.1</ip><prefix-length>24</prefix-length></address>"));
        assert!(!xml.contains("operation"));
    }

    #[test]
    fn test_ietf_interface_delete_has_only_key() {
        let interface = IetfInterface::new("host-vpp1")
            .enabled(true)
            .address("192.168.0.1/24".parse().unwrap());
        let xml = compact(&interface.to_xml(EditOperation::Delete).unwrap());

        assert!(xml.contains("xc:operation=\"delete\""));
        assert!(xml.contains(&format!("xmlns:xc=\"{}\"", NETCONF_BASE_NS)));
        assert!(xml.contains("<name>host-vpp1</name>"));
        assert!(!xml.contains("enabled"));
        assert!(!xml.contains("ipv4"));
    }

    #[test]
    fn test_interface_name_is_escaped() {
        let xml = IetfInterface::new("a<b&c")
            .to_xml(EditOperation::Merge)
            .unwrap();
        assert!(xml.contains("<name>a&lt;b&amp;c</name>"));
    }

    #[test]
    fn test_oc_interface_with_address() {
        let interface = OcInterface::new("host-vpp1")
            .enabled(false)
            .address("10.0.0.2/24".parse().unwrap());
        let xml = compact(&interface.to_xml(EditOperation::Merge).unwrap());

        assert!(xml.starts_with(&format!("<interfaces xmlns=\"{}\">", OC_INTERFACES_NS)));
        assert!(xml.contains("<config><name>host-vpp1</name>"));
        assert!(xml.contains("<enabled>false</enabled>"));
        assert!(xml.contains("<subinterface><index>0</index>"));
        assert!(xml.contains("<config><ip>10.0.0.2</ip><prefix-length>24</prefix-length></config>"));
    }

    #[test]
    fn test_xpath() {
        assert_eq!(
            IetfInterface::new("host-vpp1").xpath(),
            "/ietf-interfaces:interfaces/interface[name='host-vpp1']"
        );
        assert_eq!(
            OcInterface::new("host-vpp2").xpath(),
            "/openconfig-interfaces:interfaces/interface[name='host-vpp2']"
        );
    }
}
