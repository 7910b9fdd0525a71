//! Static metadata for the torrc keys the control panel knows how to render.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::torrc::error::TorrcError;
use crate::torrc::validate::{
    FieldRule, validate_bandwidth, validate_choice, validate_ip_or_localhost, validate_onion_dir,
    validate_port_mapping, validate_port_spec,
};

/// Declared value type of a catalog option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    String,
    Int,
    Bool,
    List,
}

/// One known torrc key. Read-only, lives for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TorOption {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub default: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub multiple: bool,
    pub deprecated: bool,
    pub advanced: bool,
    pub required: bool,
    pub resettable: bool,
    pub input_type: &'static str,
    #[serde(skip_serializing_if = "no_choices")]
    pub choices: &'static [&'static str],
    #[serde(skip_serializing_if = "no_placeholder")]
    pub placeholder: &'static str,
    #[serde(rename = "validation")]
    pub rule: FieldRule,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_choices(choices: &&'static [&'static str]) -> bool {
    choices.is_empty()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_placeholder(placeholder: &&'static str) -> bool {
    placeholder.is_empty()
}

impl TorOption {
    const fn basic(
        name: &'static str,
        option_type: OptionType,
        default: &'static str,
        description: &'static str,
        category: &'static str,
        rule: FieldRule,
    ) -> Self {
        let input_type = match option_type {
            OptionType::Int => "number",
            OptionType::Bool => "checkbox",
            OptionType::String | OptionType::List => "text",
        };
        Self {
            name,
            option_type,
            default,
            description,
            category,
            multiple: false,
            deprecated: false,
            advanced: false,
            required: false,
            resettable: true,
            input_type,
            choices: &[],
            placeholder: "",
            rule,
        }
    }

    const fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;
        self
    }

    const fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    const fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.input_type = "select";
        self.choices = choices;
        self
    }

    /// Runs this option's [`FieldRule`] against `value`.
    ///
    /// # Errors
    /// Returns [`TorrcError::InvalidFormat`] when `value` breaks the rule.
    pub fn validate(&self, value: &str) -> Result<(), TorrcError> {
        match self.rule {
            FieldRule::Any => Ok(()),
            FieldRule::PortSpec => validate_port_spec(value),
            FieldRule::Choice => validate_choice(value, self.choices),
            FieldRule::Bandwidth => validate_bandwidth(value),
            FieldRule::PortMapping => validate_port_mapping(value),
            FieldRule::OnionDir => validate_onion_dir(value),
            FieldRule::IpOrLocalhost => validate_ip_or_localhost(value),
        }
    }
}

const NETWORK: &str = "Network";
const BANDWIDTH: &str = "Bandwidth";
const HIDDEN_SERVICES: &str = "Hidden Services";
const RELAY: &str = "Relay";
const LOGGING: &str = "Logging";

static CATALOG: [TorOption; 13] = [
    TorOption::basic("SocksPort", OptionType::String, "9050", "SOCKS proxy port", NETWORK, FieldRule::PortSpec)
        .placeholder("9050")
        .required(),
    TorOption::basic("ControlPort", OptionType::String, "9051", "Tor controller port", NETWORK, FieldRule::PortSpec)
        .placeholder("9051"),
    TorOption::basic("ORPort", OptionType::String, "0", "Port advertised for onion router traffic", RELAY, FieldRule::PortSpec)
        .placeholder("9001")
        .advanced(),
    TorOption::basic("BandwidthRate", OptionType::String, "1 MB", "Bandwidth rate limit", BANDWIDTH, FieldRule::Bandwidth)
        .placeholder("5 MB"),
    TorOption::basic("BandwidthBurst", OptionType::String, "1 MB", "Bandwidth burst", BANDWIDTH, FieldRule::Bandwidth)
        .placeholder("10 MB"),
    TorOption::basic("AccountingMax", OptionType::String, "", "Traffic allowed per accounting period", BANDWIDTH, FieldRule::Bandwidth)
        .placeholder("100 GB")
        .advanced(),
    TorOption::basic("AccountingStart", OptionType::String, "", "Start of the accounting period", BANDWIDTH, FieldRule::Any)
        .choices(&["day 00:00", "week 1 00:00", "month 1 00:00"])
        .advanced(),
    TorOption::basic("HiddenServiceDir", OptionType::String, "", "Hidden Service directory", HIDDEN_SERVICES, FieldRule::OnionDir)
        .placeholder("/var/lib/tor/hs1")
        .multiple(),
    TorOption::basic("HiddenServicePort", OptionType::String, "", "Map virtual port to target address", HIDDEN_SERVICES, FieldRule::PortMapping)
        .placeholder("80 127.0.0.1:8080")
        .multiple(),
    TorOption::basic("Nickname", OptionType::String, "", "Relay nickname", RELAY, FieldRule::Any)
        .placeholder("myrelay"),
    TorOption::basic("ExitRelay", OptionType::Bool, "auto", "Advertise as an exit node", RELAY, FieldRule::Choice)
        .choices(&["0", "1", "auto"]),
    TorOption::basic("SafeLogging", OptionType::Bool, "1", "Avoid logging sensitive info", LOGGING, FieldRule::Choice)
        .choices(&["0", "1", "relay"]),
    TorOption::basic("Log", OptionType::String, "notice stdout", "Log level and target", LOGGING, FieldRule::Any)
        .placeholder("notice stdout")
        .multiple(),
];

/// Every catalog option in declaration order.
#[must_use]
pub fn all_options() -> &'static [TorOption] {
    &CATALOG
}

/// Catalog grouped by UI category, options kept in declaration order.
#[must_use]
pub fn options_by_category() -> BTreeMap<&'static str, Vec<&'static TorOption>> {
    let mut grouped: BTreeMap<&'static str, Vec<&'static TorOption>> = BTreeMap::new();
    for option in &CATALOG {
        grouped.entry(option.category).or_default().push(option);
    }
    grouped
}

/// Looks up an option by its exact (case-sensitive) key.
#[must_use]
pub fn option(name: &str) -> Option<&'static TorOption> {
    CATALOG.iter().find(|option| option.name == name)
}
