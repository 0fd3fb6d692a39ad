//! Tracking plan intermediate representation.
//!
//! A [`TrackingPlan`] is built once per generation run by the schema parser and
//! handed read-only to code generators. Custom types are shared through [`Arc`]
//! so every reference to `#/$defs/<Name>` points at the same resolved value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::TyperError;

// ── Types ──────────────────────────────────────────────────────────────────

/// Built-in JSON Schema type tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Used when a schema node declares no `type`.
    Any,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Array => "array",
            PrimitiveType::Object => "object",
            PrimitiveType::Any => "any",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimitiveType {
    type Err = TyperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(PrimitiveType::String),
            "integer" => Ok(PrimitiveType::Integer),
            "number" => Ok(PrimitiveType::Number),
            "boolean" => Ok(PrimitiveType::Boolean),
            "array" => Ok(PrimitiveType::Array),
            "object" => Ok(PrimitiveType::Object),
            "any" => Ok(PrimitiveType::Any),
            other => Err(TyperError::SchemaError(format!(
                "unknown type '{other}'; expected one of string, integer, number, boolean, array, object"
            ))),
        }
    }
}

/// A named, reusable type declared under `$defs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomType {
    pub name: String,
    pub description: String,
    pub base_type: PrimitiveType,
    /// Set iff `base_type` is [`PrimitiveType::Object`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ObjectSchema>,
    /// Non-empty iff `base_type` is [`PrimitiveType::Array`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_types: Vec<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PropertyConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl CustomType {
    /// Primitive custom types become aliases; object ones become classes.
    pub fn is_primitive(&self) -> bool {
        self.base_type != PrimitiveType::Object
    }
}

/// One member of a property's type union.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    Primitive(PrimitiveType),
    Custom(Arc<CustomType>),
}

impl PropertyType {
    pub fn as_custom(&self) -> Option<&Arc<CustomType>> {
        match self {
            PropertyType::Primitive(_) => None,
            PropertyType::Custom(custom) => Some(custom),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Primitive(primitive) => write!(f, "{primitive}"),
            PropertyType::Custom(custom) => write!(f, "#/$defs/{}", custom.name),
        }
    }
}

// Custom types are written as their `$ref` so a dumped plan stays flat.
impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyType::Primitive(primitive) => primitive.serialize(serializer),
            PropertyType::Custom(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyConfig {
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<JsonValue>>,
}

impl PropertyConfig {
    /// Returns the enum values when the constraint is present and non-empty.
    pub fn non_empty_enum(config: Option<&PropertyConfig>) -> Option<&[JsonValue]> {
        config
            .and_then(|c| c.enum_values.as_deref())
            .filter(|values| !values.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub description: String,
    /// Never empty once parsed; `[Any]` when the schema gives no type.
    pub types: Vec<PropertyType>,
    /// Only meaningful when `types` contains [`PrimitiveType::Array`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_types: Vec<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PropertyConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, PropertySchema>,
    pub additional_properties: bool,
}

impl ObjectSchema {
    /// Closed schema without properties, used for a variant with no explicit default.
    pub fn empty_closed() -> Self {
        Self {
            properties: BTreeMap::new(),
            additional_properties: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    pub property: Property,
    pub required: bool,
    /// Populated when the property resolves to an inline object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ObjectSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Discriminator,
}

/// Discriminated union: the value of `discriminator` selects a case schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub kind: VariantKind,
    pub discriminator: String,
    pub cases: Vec<VariantCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<ObjectSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A case matches when the discriminator equals any of these values.
    pub match_values: Vec<JsonValue>,
    pub schema: ObjectSchema,
}

// ── Events ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    Page,
    Screen,
    Group,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Track => "track",
            EventType::Identify => "identify",
            EventType::Page => "page",
            EventType::Screen => "screen",
            EventType::Group => "group",
        }
    }

    /// Whether a rule for this event type may target `section`.
    pub fn accepts_section(&self, section: IdentitySection) -> bool {
        match self {
            EventType::Track | EventType::Screen | EventType::Page => {
                section == IdentitySection::Properties
            }
            EventType::Identify | EventType::Group => matches!(
                section,
                IdentitySection::Traits | IdentitySection::ContextTraits
            ),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TyperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(EventType::Track),
            "identify" => Ok(EventType::Identify),
            "page" => Ok(EventType::Page),
            "screen" => Ok(EventType::Screen),
            "group" => Ok(EventType::Group),
            other => Err(TyperError::SchemaError(format!(
                "unknown event type '{other}'"
            ))),
        }
    }
}

/// Where in the event payload a rule's schema applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IdentitySection {
    #[serde(rename = "properties")]
    Properties,
    #[serde(rename = "traits")]
    Traits,
    #[serde(rename = "context.traits")]
    ContextTraits,
}

impl IdentitySection {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySection::Properties => "properties",
            IdentitySection::Traits => "traits",
            IdentitySection::ContextTraits => "context.traits",
        }
    }
}

impl fmt::Display for IdentitySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentitySection {
    type Err = TyperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "properties" => Ok(IdentitySection::Properties),
            "traits" => Ok(IdentitySection::Traits),
            "context.traits" => Ok(IdentitySection::ContextTraits),
            other => Err(TyperError::IdentitySectionError(format!(
                "unknown identity section '{other}'; expected properties, traits or context.traits"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_type: EventType,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRule {
    pub event: Event,
    pub section: IdentitySection,
    pub schema: ObjectSchema,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanMetadata {
    pub tracking_plan_id: String,
    pub tracking_plan_version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Root artifact produced by the parser and consumed by generators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingPlan {
    pub name: String,
    pub rules: Vec<EventRule>,
    pub metadata: PlanMetadata,
}

// ── Traversal ──────────────────────────────────────────────────────────────

impl TrackingPlan {
    /// Every custom type reachable from the plan, sorted by name.
    ///
    /// Two `$defs` entries sharing a name but differing in definition are both
    /// returned, in first-seen order.
    pub fn extract_all_custom_types(&self) -> Vec<Arc<CustomType>> {
        let mut collector = CustomTypeCollector::default();
        for rule in &self.rules {
            collector.visit_schema(&rule.schema);
            collector.visit_variants(&rule.variants);
        }
        let mut found = collector.found;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Every property declared anywhere in the plan, sorted by name.
    pub fn extract_all_properties(&self) -> Vec<Property> {
        let mut collector = PropertyCollector::default();
        for rule in &self.rules {
            collector.visit_schema(&rule.schema);
            collector.visit_variants(&rule.variants);
        }
        for custom_type in self.extract_all_custom_types() {
            if let Some(schema) = &custom_type.schema {
                collector.visit_schema(schema);
            }
            collector.visit_variants(&custom_type.variants);
        }
        let mut found = collector.found;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

fn variant_schemas(variants: &[Variant]) -> impl Iterator<Item = &ObjectSchema> {
    variants.iter().flat_map(|variant| {
        variant
            .cases
            .iter()
            .map(|case| &case.schema)
            .chain(variant.default_schema.iter())
    })
}

#[derive(Default)]
struct CustomTypeCollector {
    found: Vec<Arc<CustomType>>,
}

impl CustomTypeCollector {
    fn visit_schema(&mut self, schema: &ObjectSchema) {
        for prop_schema in schema.properties.values() {
            self.visit_types(&prop_schema.property.types);
            self.visit_types(&prop_schema.property.item_types);
            if let Some(nested) = &prop_schema.schema {
                self.visit_schema(nested);
            }
        }
    }

    fn visit_variants(&mut self, variants: &[Variant]) {
        for schema in variant_schemas(variants) {
            self.visit_schema(schema);
        }
    }

    fn visit_types(&mut self, types: &[PropertyType]) {
        for custom_type in types.iter().filter_map(PropertyType::as_custom) {
            if self.found.iter().any(|seen| seen == custom_type) {
                continue;
            }
            self.found.push(Arc::clone(custom_type));
            if let Some(schema) = &custom_type.schema {
                self.visit_schema(schema);
            }
            self.visit_types(&custom_type.item_types);
            self.visit_variants(&custom_type.variants);
        }
    }
}

#[derive(Default)]
struct PropertyCollector {
    found: Vec<Property>,
}

impl PropertyCollector {
    fn visit_schema(&mut self, schema: &ObjectSchema) {
        for prop_schema in schema.properties.values() {
            if !self.found.contains(&prop_schema.property) {
                self.found.push(prop_schema.property.clone());
            }
            if let Some(nested) = &prop_schema.schema {
                self.visit_schema(nested);
            }
        }
    }

    fn visit_variants(&mut self, variants: &[Variant]) {
        for schema in variant_schemas(variants) {
            self.visit_schema(schema);
        }
    }
}
