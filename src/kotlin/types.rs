//! Kotlin declarations for custom types, properties and event payloads.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{ResultExt, TyperError};
use crate::naming::NameRegistry;
use crate::plan::{
    CustomType, EventRule, EventType, IdentitySection, ObjectSchema, PrimitiveType, Property,
    PropertyConfig, PropertyType, TrackingPlan,
};

use super::context::{
    KotlinContext, KotlinDataClass, KotlinEnum, KotlinEnumValue, KotlinProperty, KotlinTypeAlias,
};
use super::naming::{
    format_class_name, format_enum_value, format_property_name, literal_text, DefinitionKeys,
    TYPES_SCOPE,
};

/// Accumulates one [`KotlinContext`] while walking a plan.
///
/// Every identifier is obtained through the registry, so asking for the same
/// type's name from two call sites yields the same answer.
pub(crate) struct KotlinBuilder {
    pub(super) registry: NameRegistry,
    pub(super) ctx: KotlinContext,
    custom_type_keys: DefinitionKeys<Arc<CustomType>>,
    property_keys: DefinitionKeys<Property>,
}

impl KotlinBuilder {
    pub(crate) fn new() -> Self {
        Self {
            registry: NameRegistry::default(),
            ctx: KotlinContext::default(),
            custom_type_keys: DefinitionKeys::new("customtype"),
            property_keys: DefinitionKeys::new("property"),
        }
    }

    pub(crate) fn into_context(mut self) -> KotlinContext {
        self.ctx.sort();
        self.ctx
    }

    /// Custom types, then properties, then event rules.
    pub(crate) fn process_plan(&mut self, plan: &TrackingPlan) -> Result<(), TyperError> {
        let custom_types = plan.extract_all_custom_types();
        for custom_type in &custom_types {
            self.process_custom_type(custom_type)
                .with_context(|| format!("custom type '{}'", custom_type.name))?;
        }

        let properties = plan.extract_all_properties();
        for property in &properties {
            self.process_property(property)
                .with_context(|| format!("property '{}'", property.name))?;
        }

        let mut rules: Vec<&EventRule> = plan.rules.iter().collect();
        rules.sort_by_cached_key(|rule| rule_key(rule));
        for rule in rules {
            self.process_event_rule(rule)
                .with_context(|| format!("event '{}'", rule.event.name))?;
        }

        debug!(
            custom_types = custom_types.len(),
            properties = properties.len(),
            aliases = self.ctx.type_aliases.len(),
            enums = self.ctx.enums.len(),
            sealed_classes = self.ctx.sealed_classes.len(),
            data_classes = self.ctx.data_classes.len(),
            methods = self.ctx.methods.len(),
            "built kotlin context"
        );
        Ok(())
    }

    // ── Names ──────────────────────────────────────────────────────────────

    fn custom_type_id(&mut self, custom_type: &Arc<CustomType>) -> String {
        self.custom_type_keys.key(&custom_type.name, custom_type)
    }

    fn property_id(&mut self, property: &Property) -> String {
        self.property_keys.key(&property.name, property)
    }

    /// The single top-level name of a custom type, whatever it renders as.
    pub(super) fn custom_type_name(
        &mut self,
        custom_type: &Arc<CustomType>,
    ) -> Result<String, TyperError> {
        let id = self.custom_type_id(custom_type);
        self.registry.register_name(
            &id,
            TYPES_SCOPE,
            &format_class_name("CustomType", &custom_type.name),
        )
    }

    /// The single top-level name of a property's alias, enum or sealed class.
    pub(super) fn property_type_name(&mut self, property: &Property) -> Result<String, TyperError> {
        let id = self.property_id(property);
        self.registry
            .register_name(&id, TYPES_SCOPE, &format_class_name("Property", &property.name))
    }

    fn array_item_name(&mut self, property: &Property) -> Result<String, TyperError> {
        let id = format!("item:{}", self.property_id(property));
        self.registry
            .register_name(&id, TYPES_SCOPE, &format_class_name("ArrayItem", &property.name))
    }

    fn custom_type_item_name(&mut self, custom_type: &Arc<CustomType>) -> Result<String, TyperError> {
        let id = format!("item:{}", self.custom_type_id(custom_type));
        let owner = self.custom_type_name(custom_type)?;
        self.registry
            .register_name(&id, TYPES_SCOPE, &format!("{owner}Item"))
    }

    /// Registers the constant for `value` in the enum's own scope.
    pub(super) fn enum_constant(
        &mut self,
        enum_name: &str,
        value: &JsonValue,
    ) -> Result<String, TyperError> {
        self.registry.register_name(
            &literal_text(value),
            &format!("enumvalue:{enum_name}"),
            &format_enum_value(value),
        )
    }

    // ── Type references ────────────────────────────────────────────────────

    pub(super) fn type_reference(&mut self, property_type: &PropertyType) -> Result<String, TyperError> {
        match property_type {
            PropertyType::Primitive(primitive) => Ok(kotlin_primitive(*primitive).to_string()),
            PropertyType::Custom(custom_type) => self.custom_type_name(custom_type),
        }
    }

    /// `List<...>` for an array; several item types need a named item class.
    fn array_type(
        &mut self,
        item_types: &[PropertyType],
        item_class: Option<String>,
    ) -> Result<String, TyperError> {
        match (item_types, item_class) {
            ([], _) => Ok("List<JsonElement>".to_string()),
            ([single], _) => Ok(format!("List<{}>", self.type_reference(single)?)),
            (_, Some(item_class)) => Ok(format!("List<{item_class}>")),
            (many, None) => Err(TyperError::EmissionError(format!(
                "array with {} item types has no item class",
                many.len()
            ))),
        }
    }

    // ── Custom types ───────────────────────────────────────────────────────

    fn process_custom_type(&mut self, custom_type: &Arc<CustomType>) -> Result<(), TyperError> {
        let name = self.custom_type_name(custom_type)?;

        if custom_type.is_primitive() {
            if let Some(values) = string_enum(custom_type.config.as_ref()) {
                return self.push_enum(name, &custom_type.description, values);
            }
            let target = if custom_type.base_type == PrimitiveType::Array {
                let item_class = if custom_type.item_types.len() > 1 {
                    let item_name = self.custom_type_item_name(custom_type)?;
                    let comment = format!("Item type for {} array", custom_type.name);
                    self.push_union(item_name.clone(), comment, &custom_type.item_types)?;
                    Some(item_name)
                } else {
                    None
                };
                self.array_type(&custom_type.item_types, item_class)?
            } else {
                kotlin_primitive(custom_type.base_type).to_string()
            };
            self.push_alias(name, &custom_type.description, target);
            return Ok(());
        }

        let Some(schema) = &custom_type.schema else {
            return Err(TyperError::EmissionError(
                "object custom type has no schema".to_string(),
            ));
        };
        if !custom_type.variants.is_empty() {
            let sealed =
                self.variant_sealed_class(name, &custom_type.description, schema, &custom_type.variants)?;
            self.ctx.sealed_classes.push(sealed);
        } else if schema.is_empty() {
            self.push_alias(name, &custom_type.description, "JsonObject".to_string());
        } else {
            let class = self.data_class(&name, &custom_type.description, schema)?;
            self.ctx.data_classes.push(class);
        }
        Ok(())
    }

    // ── Properties ─────────────────────────────────────────────────────────

    fn process_property(&mut self, property: &Property) -> Result<(), TyperError> {
        let name = self.property_type_name(property)?;

        if let Some(values) = string_enum(property.config.as_ref()) {
            return self.push_enum(name, &property.description, values);
        }

        match property.types.as_slice() {
            [PropertyType::Primitive(PrimitiveType::Array)] => {
                let item_class = if property.item_types.len() > 1 {
                    let item_name = self.array_item_name(property)?;
                    let comment = format!("Item type for {} array", property.name);
                    self.push_union(item_name.clone(), comment, &property.item_types)?;
                    Some(item_name)
                } else {
                    None
                };
                let target = self.array_type(&property.item_types, item_class)?;
                self.push_alias(name, &property.description, target);
            }
            [single] => {
                let target = self.type_reference(single)?;
                self.push_alias(name, &property.description, target);
            }
            [] => self.push_alias(name, &property.description, "JsonElement".to_string()),
            many => {
                let description = property.description.clone();
                self.push_union(name, description, many)?;
            }
        }
        Ok(())
    }

    /// Type of a field holding `property`: its alias, enum or sealed class.
    pub(super) fn field_type(&mut self, property: &Property) -> Result<String, TyperError> {
        self.property_type_name(property)
    }

    // ── Event rules ────────────────────────────────────────────────────────

    fn process_event_rule(&mut self, rule: &EventRule) -> Result<(), TyperError> {
        let name = self.event_class_name(rule)?;
        if !rule.variants.is_empty() {
            let sealed =
                self.variant_sealed_class(name.clone(), &rule.event.description, &rule.schema, &rule.variants)?;
            self.ctx.sealed_classes.push(sealed);
        } else if rule.schema.is_empty() {
            if rule.schema.additional_properties {
                self.push_alias(name.clone(), &rule.event.description, "JsonObject".to_string());
            }
        } else {
            let class = self.data_class(&name, &rule.event.description, &rule.schema)?;
            self.ctx.data_classes.push(class);
        }

        if let Some(method) = self.analytics_method(rule, &name)? {
            self.ctx.methods.push(method);
        }
        Ok(())
    }

    /// `Track<Event>Properties`, `IdentifyTraits`, `ScreenProperties`, ...
    pub(super) fn event_class_name(&mut self, rule: &EventRule) -> Result<String, TyperError> {
        let (prefix, base) = match rule.event.event_type {
            EventType::Track => ("Track", rule.event.name.as_str()),
            EventType::Identify => ("Identify", ""),
            EventType::Page => ("Page", ""),
            EventType::Screen => ("Screen", ""),
            EventType::Group => ("Group", ""),
        };
        let suffix = match rule.section {
            IdentitySection::Properties => "Properties",
            IdentitySection::Traits => "Traits",
            IdentitySection::ContextTraits => "ContextTraits",
        };
        self.registry.register_name(
            &event_id(rule),
            TYPES_SCOPE,
            &format_class_name(prefix, &format!("{base} {suffix}")),
        )
    }

    // ── Declarations ───────────────────────────────────────────────────────

    fn push_alias(&mut self, name: String, comment: &str, target: String) {
        self.ctx.type_aliases.push(KotlinTypeAlias {
            name,
            comment: comment.to_string(),
            target,
        });
    }

    fn push_enum(
        &mut self,
        name: String,
        comment: &str,
        values: &[JsonValue],
    ) -> Result<(), TyperError> {
        let mut constants = Vec::with_capacity(values.len());
        for value in values {
            let constant = self.enum_constant(&name, value)?;
            if constants.iter().any(|known: &KotlinEnumValue| known.name == constant) {
                continue;
            }
            constants.push(KotlinEnumValue {
                name: constant,
                serial_name: literal_text(value),
            });
        }
        self.ctx.enums.push(KotlinEnum {
            name,
            comment: comment.to_string(),
            values: constants,
        });
        Ok(())
    }

    /// Data class for an object schema; inline objects become nested classes.
    ///
    /// `class_path` is the dotted path used to reference the class, e.g.
    /// `TrackOrderProperties.Address`.
    pub(super) fn data_class(
        &mut self,
        class_path: &str,
        comment: &str,
        schema: &ObjectSchema,
    ) -> Result<KotlinDataClass, TyperError> {
        let field_scope = format!("field:{class_path}");
        let nested_scope = format!("nested:{class_path}");
        let mut properties = Vec::with_capacity(schema.properties.len());
        let mut nested_classes = Vec::new();

        for (prop_name, prop_schema) in &schema.properties {
            let field_name = self.registry.register_name(
                prop_name,
                &field_scope,
                &format_property_name(prop_name),
            )?;

            let type_name = match &prop_schema.schema {
                Some(nested) if !nested.is_empty() => {
                    let nested_name = self.registry.register_name(
                        prop_name,
                        &nested_scope,
                        &format_class_name("", prop_name),
                    )?;
                    let nested_path = format!("{class_path}.{nested_name}");
                    let mut class = self
                        .data_class(&nested_path, &prop_schema.property.description, nested)
                        .with_context(|| format!("property '{prop_name}'"))?;
                    class.name = nested_name;
                    nested_classes.push(class);
                    nested_path
                }
                _ => self.field_type(&prop_schema.property)?,
            };

            properties.push(KotlinProperty {
                name: field_name,
                serial_name: prop_name.clone(),
                type_name,
                comment: prop_schema.property.description.clone(),
                nullable: !prop_schema.required,
                default: (!prop_schema.required).then(|| "null".to_string()),
                ..KotlinProperty::default()
            });
        }

        let name = class_path
            .rsplit('.')
            .next()
            .unwrap_or(class_path)
            .to_string();
        Ok(KotlinDataClass {
            name,
            comment: comment.to_string(),
            properties,
            nested_classes,
        })
    }
}

/// Registry id of an event rule's class and method.
pub(super) fn event_id(rule: &EventRule) -> String {
    format!("event:{}", rule_key(rule))
}

fn rule_key(rule: &EventRule) -> String {
    format!("{}:{}:{}", rule.event.event_type, rule.event.name, rule.section)
}

/// Enum values usable as Kotlin enum constants: non-empty and all strings.
pub(super) fn string_enum(config: Option<&PropertyConfig>) -> Option<&[JsonValue]> {
    PropertyConfig::non_empty_enum(config).filter(|values| values.iter().all(JsonValue::is_string))
}

pub(super) fn kotlin_primitive(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::String => "String",
        PrimitiveType::Integer => "Long",
        PrimitiveType::Number => "Double",
        PrimitiveType::Boolean => "Boolean",
        PrimitiveType::Array => "List<JsonElement>",
        PrimitiveType::Object => "JsonObject",
        PrimitiveType::Any => "JsonElement",
    }
}
