//! `$defs` resolution.
//!
//! Every `$defs` key gets a slot up front so references may point forward in
//! the document. Slots are then filled on demand, memoized, and guarded by a
//! resolving marker so a `$ref` cycle fails instead of recursing forever.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::error::{ResultExt, TyperError};
use crate::jsonschema::{parse_type_definition, parse_variants};
use crate::plan::{CustomType, PrimitiveType, PropertyType};

const DEFS_PREFIX: &str = "#/$defs/";

enum Slot<'a> {
    Pending(&'a JsonValue),
    Resolving,
    Resolved(Arc<CustomType>),
}

/// Resolves `#/$defs/<Name>` references against one rules document.
pub struct CustomTypeResolver<'a> {
    slots: HashMap<String, Slot<'a>>,
    /// Names currently being resolved, outermost first.
    stack: Vec<String>,
}

impl<'a> CustomTypeResolver<'a> {
    /// Registers a pending slot for every `$defs` entry.
    pub fn new(defs: &'a JsonMap<String, JsonValue>) -> Self {
        let slots = defs
            .iter()
            .map(|(name, node)| (name.clone(), Slot::Pending(node)))
            .collect();
        Self {
            slots,
            stack: Vec::new(),
        }
    }

    /// Resolves every registered definition, in name order.
    pub fn resolve_all(&mut self) -> Result<(), TyperError> {
        let mut names: Vec<String> = self.slots.keys().cloned().collect();
        names.sort();
        for name in &names {
            self.resolve_name(name)?;
        }
        debug!(count = names.len(), "resolved custom types");
        Ok(())
    }

    /// Resolves a `$ref` string of the form `#/$defs/<Name>`.
    pub fn resolve_ref(&mut self, reference: &str) -> Result<Arc<CustomType>, TyperError> {
        let name = reference
            .strip_prefix(DEFS_PREFIX)
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| {
                TyperError::ReferenceError(format!(
                    "malformed $ref '{reference}'; expected '{DEFS_PREFIX}<Name>'"
                ))
            })?;
        self.resolve_name(name)
            .with_context(|| format!("$ref '{reference}'"))
    }

    /// Returns the resolved custom type for `name`, resolving it on first use.
    pub fn resolve_name(&mut self, name: &str) -> Result<Arc<CustomType>, TyperError> {
        let node = match self.slots.get(name) {
            None => {
                return Err(TyperError::ReferenceError(format!(
                    "custom type '{name}' is not defined in $defs"
                )))
            }
            Some(Slot::Resolved(custom_type)) => return Ok(Arc::clone(custom_type)),
            Some(Slot::Resolving) => {
                let mut chain = self.stack.clone();
                chain.push(name.to_string());
                return Err(TyperError::ReferenceError(format!(
                    "cyclic custom type reference: {}",
                    chain.join(" -> ")
                )));
            }
            Some(Slot::Pending(node)) => *node,
        };

        self.slots.insert(name.to_string(), Slot::Resolving);
        self.stack.push(name.to_string());
        let built = self
            .build_custom_type(name, node)
            .with_context(|| format!("custom type '{name}'"));
        self.stack.pop();

        match built {
            Ok(custom_type) => {
                let custom_type = Arc::new(custom_type);
                self.slots
                    .insert(name.to_string(), Slot::Resolved(Arc::clone(&custom_type)));
                Ok(custom_type)
            }
            Err(err) => {
                self.slots.insert(name.to_string(), Slot::Pending(node));
                Err(err)
            }
        }
    }

    /// Consumes the resolver, returning every definition resolved so far.
    pub fn into_resolved(self) -> BTreeMap<String, Arc<CustomType>> {
        self.slots
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Resolved(custom_type) => Some((name, custom_type)),
                Slot::Pending(_) | Slot::Resolving => None,
            })
            .collect()
    }

    fn build_custom_type(
        &mut self,
        name: &str,
        node: &'a JsonValue,
    ) -> Result<CustomType, TyperError> {
        let definition = parse_type_definition(node, self)?;

        let base_type = match definition.types.as_slice() {
            [PropertyType::Primitive(primitive)] => *primitive,
            [PropertyType::Custom(other)] => {
                return Err(TyperError::SchemaError(format!(
                    "custom type cannot alias another custom type ('{}')",
                    other.name
                )))
            }
            types => {
                return Err(TyperError::SchemaError(format!(
                    "custom type must resolve to exactly one primitive type, found {}",
                    types.len()
                )))
            }
        };

        let variants = if base_type == PrimitiveType::Object {
            parse_variants(node, self)?
        } else {
            Vec::new()
        };

        Ok(CustomType {
            name: name.to_string(),
            description: node
                .get("description")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
            base_type,
            schema: definition.schema,
            item_types: definition.item_types,
            config: definition.config,
            variants,
        })
    }
}

/// Resolves every entry of a `$defs` map.
pub fn resolve_custom_type_definitions(
    defs: &JsonMap<String, JsonValue>,
) -> Result<BTreeMap<String, Arc<CustomType>>, TyperError> {
    let mut resolver = CustomTypeResolver::new(defs);
    resolver.resolve_all()?;
    Ok(resolver.into_resolved())
}
