use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::torrc::{FieldRule, OptionType, TorOption};

/// Catalog option as rendered to the UI.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct OptionDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: String,
    pub default: String,
    pub description: String,
    pub category: String,
    pub multiple: bool,
    pub deprecated: bool,
    pub advanced: bool,
    pub required: bool,
    pub resettable: bool,
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub validation: String,
}

/// `GET /api/options`: category name to its options.
pub type OptionCatalog = BTreeMap<String, Vec<OptionDescriptor>>;

fn type_name(option_type: OptionType) -> &'static str {
    match option_type {
        OptionType::String => "string",
        OptionType::Int => "int",
        OptionType::Bool => "bool",
        OptionType::List => "list",
    }
}

fn rule_name(rule: FieldRule) -> &'static str {
    match rule {
        FieldRule::Any => "any",
        FieldRule::PortSpec => "port_spec",
        FieldRule::Choice => "choice",
        FieldRule::Bandwidth => "bandwidth",
        FieldRule::PortMapping => "port_mapping",
        FieldRule::OnionDir => "onion_dir",
        FieldRule::IpOrLocalhost => "ip_or_localhost",
    }
}

impl From<&TorOption> for OptionDescriptor {
    fn from(option: &TorOption) -> Self {
        Self {
            name: option.name.to_string(),
            option_type: type_name(option.option_type).to_string(),
            default: option.default.to_string(),
            description: option.description.to_string(),
            category: option.category.to_string(),
            multiple: option.multiple,
            deprecated: option.deprecated,
            advanced: option.advanced,
            required: option.required,
            resettable: option.resettable,
            input_type: option.input_type.to_string(),
            choices: option.choices.iter().map(ToString::to_string).collect(),
            placeholder: (!option.placeholder.is_empty()).then(|| option.placeholder.to_string()),
            validation: rule_name(option.rule).to_string(),
        }
    }
}

/// One key/value line of the torrc, in file order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct TorrcEntryView {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct UpdateTorrcResponse {
    pub saved: bool,
    /// Keys written, in request order.
    pub updated: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct HiddenService {
    pub dir: String,
    /// Contents of `<dir>/hostname`, absent until tor has published the service.
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct HiddenServicesResponse {
    pub configured: bool,
    pub services: Vec<HiddenService>,
}
