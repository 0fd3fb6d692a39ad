//! Render-ready model of one generated Kotlin file.
//!
//! Everything here is already named, typed and escaped where needed except
//! comments and literals, which the renderer escapes on output.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KotlinContext {
    pub type_aliases: Vec<KotlinTypeAlias>,
    pub enums: Vec<KotlinEnum>,
    pub sealed_classes: Vec<KotlinSealedClass>,
    pub data_classes: Vec<KotlinDataClass>,
    pub methods: Vec<KotlinMethod>,
    /// Entries of the embedded `ruddertyper` context, as Kotlin expressions.
    pub event_context: Vec<(String, String)>,
}

impl KotlinContext {
    /// Orders top-level declarations by name; sealed classes keep build order.
    pub fn sort(&mut self) {
        self.type_aliases.sort_by(|a, b| a.name.cmp(&b.name));
        self.enums.sort_by(|a, b| a.name.cmp(&b.name));
        self.data_classes.sort_by(|a, b| a.name.cmp(&b.name));
        self.methods.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinTypeAlias {
    pub name: String,
    pub comment: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinEnum {
    pub name: String,
    pub comment: String,
    pub values: Vec<KotlinEnumValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinEnumValue {
    pub name: String,
    /// Raw JSON string the constant serializes to.
    pub serial_name: String,
}

/// A constructor parameter or body member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KotlinProperty {
    pub name: String,
    pub serial_name: String,
    pub type_name: String,
    pub comment: String,
    pub nullable: bool,
    /// Kotlin expression for the initializer.
    pub default: Option<String>,
    pub is_override: bool,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinDataClass {
    pub name: String,
    pub comment: String,
    pub properties: Vec<KotlinProperty>,
    pub nested_classes: Vec<KotlinDataClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinSealedClass {
    pub name: String,
    pub comment: String,
    /// Abstract members shared by every subclass (the discriminator).
    pub properties: Vec<KotlinProperty>,
    pub subclasses: Vec<KotlinSealedSubclass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinSealedSubclass {
    pub name: String,
    pub comment: String,
    pub properties: Vec<KotlinProperty>,
    pub body_properties: Vec<KotlinProperty>,
    pub json_element: JsonElementSource,
}

/// How a subclass computes its `_jsonElement`.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonElementSource {
    /// A single expression such as `JsonPrimitive(value)`.
    Expression(String),
    /// `buildJsonObject` over constructor then body members.
    Members,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinMethod {
    pub name: String,
    pub comment: String,
    pub arguments: Vec<KotlinMethodArgument>,
    pub sdk_call: SdkCall,
    /// Payload argument merged into the custom context as `traits`.
    pub context_payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinMethodArgument {
    pub name: String,
    pub type_name: String,
    /// Kotlin expression for the default value.
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdkCall {
    pub method_name: &'static str,
    pub arguments: Vec<SdkCallArgument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdkCallArgument {
    pub name: String,
    pub value: SdkArgumentValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SdkArgumentValue {
    /// Forwarded method parameter.
    Parameter(String),
    /// String literal, escaped on render.
    Literal(String),
    /// Parameter serialized to a `JsonObject`.
    Serialized(String),
}
