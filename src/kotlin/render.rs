//! Renders a [`KotlinContext`] into `Main.kt` source.

use crate::error::TyperError;
use crate::template::{render_template, TemplateVars};

use super::context::{
    JsonElementSource, KotlinContext, KotlinDataClass, KotlinEnum, KotlinMethod, KotlinProperty,
    KotlinSealedClass, KotlinSealedSubclass, KotlinTypeAlias, SdkArgumentValue,
};
use super::escape::{escape_comment, escape_string_literal};

pub const MAIN_FILE_NAME: &str = "Main.kt";

const MAIN_TEMPLATE: &str = include_str!("../../templates/kotlin/Main.kt.tmpl");

const SEALED_CLASS_SUPPORT: &str = r#"abstract class SealedClassWithJson {
    abstract val _jsonElement: JsonElement
}

open class SealedClassJsonSerializer<T : SealedClassWithJson> : KSerializer<T> {
    override val descriptor: SerialDescriptor = buildClassSerialDescriptor("SealedClass")

    override fun serialize(encoder: Encoder, value: T) {
        val jsonEncoder = encoder as? JsonEncoder
            ?: throw SerializationException("This serializer only works with JSON")
        jsonEncoder.encodeJsonElement(value._jsonElement)
    }

    override fun deserialize(decoder: Decoder): T {
        throw NotImplementedError("Deserialization is not supported")
    }
}"#;

const INDENT: &str = "    ";

// ── Public API ─────────────────────────────────────────────────────────────

/// Renders the whole file for `package_name`.
pub fn render_main_file(ctx: &KotlinContext, package_name: &str) -> Result<String, TyperError> {
    let mut declarations: Vec<String> = Vec::new();
    declarations.extend(ctx.type_aliases.iter().map(render_type_alias));
    declarations.extend(ctx.enums.iter().map(render_enum));
    if !ctx.sealed_classes.is_empty() {
        declarations.push(SEALED_CLASS_SUPPORT.to_string());
    }
    declarations.extend(ctx.sealed_classes.iter().map(render_sealed_class));
    declarations.extend(ctx.data_classes.iter().map(|class| render_data_class(class, "")));

    let mut declarations = declarations.join("\n\n");
    if !declarations.is_empty() {
        declarations.push_str("\n\n");
    }

    let event_context = ctx
        .event_context
        .iter()
        .map(|(key, value)| format!("            put(\"{}\", {value})", escape_string_literal(key)))
        .collect::<Vec<_>>()
        .join("\n");

    let methods: String = ctx
        .methods
        .iter()
        .map(|method| format!("\n{}\n", render_method(method)))
        .collect();

    let mut vars = TemplateVars::new();
    vars.insert("PACKAGE", package_name.to_string());
    vars.insert("DECLARATIONS", declarations);
    vars.insert("EVENT_CONTEXT", event_context);
    vars.insert("METHODS", methods);
    render_template(MAIN_FILE_NAME, MAIN_TEMPLATE, &vars)
}

// ── Declarations ───────────────────────────────────────────────────────────

fn render_doc(out: &mut String, indent: &str, comment: &str) {
    if !comment.trim().is_empty() {
        out.push_str(&format!("{indent}/** {} */\n", escape_comment(comment.trim())));
    }
}

fn render_type_alias(alias: &KotlinTypeAlias) -> String {
    let mut out = String::new();
    render_doc(&mut out, "", &alias.comment);
    out.push_str(&format!("typealias {} = {}", alias.name, alias.target));
    out
}

fn render_enum(enum_class: &KotlinEnum) -> String {
    let mut out = String::new();
    render_doc(&mut out, "", &enum_class.comment);
    out.push_str("@Serializable\n");
    out.push_str(&format!("enum class {} {{\n", enum_class.name));
    let values = enum_class
        .values
        .iter()
        .map(|value| {
            format!(
                "{INDENT}@SerialName(\"{}\")\n{INDENT}{}",
                escape_string_literal(&value.serial_name),
                value.name
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");
    out.push_str(&values);
    out.push_str("\n}");
    out
}

/// Constructor parameter or body member, without a trailing separator.
fn render_property(property: &KotlinProperty, indent: &str) -> String {
    let mut out = String::new();
    render_doc(&mut out, indent, &property.comment);
    out.push_str(&format!(
        "{indent}@SerialName(\"{}\")\n",
        escape_string_literal(&property.serial_name)
    ));
    out.push_str(indent);
    if property.is_abstract {
        out.push_str("abstract ");
    }
    if property.is_override {
        out.push_str("override ");
    }
    out.push_str(&format!("val {}: {}", property.name, property.type_name));
    if property.nullable {
        out.push('?');
    }
    if let Some(default) = &property.default {
        out.push_str(&format!(" = {default}"));
    }
    out
}

fn render_parameters(properties: &[KotlinProperty], indent: &str) -> String {
    properties
        .iter()
        .map(|property| render_property(property, indent))
        .collect::<Vec<_>>()
        .join(",\n\n")
}

fn render_data_class(class: &KotlinDataClass, indent: &str) -> String {
    let inner = format!("{indent}{INDENT}");
    let mut out = String::new();
    render_doc(&mut out, indent, &class.comment);
    out.push_str(&format!("{indent}@Serializable\n"));
    out.push_str(&format!("{indent}data class {}(\n", class.name));
    out.push_str(&render_parameters(&class.properties, &inner));
    out.push_str(&format!("\n{indent})"));
    if !class.nested_classes.is_empty() {
        let nested = class
            .nested_classes
            .iter()
            .map(|nested| render_data_class(nested, &inner))
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push_str(&format!(" {{\n{nested}\n{indent}}}"));
    }
    out
}

fn render_sealed_class(sealed: &KotlinSealedClass) -> String {
    let serializer = format!("Rudder{}Serializer", sealed.name);
    let mut out = String::new();
    render_doc(&mut out, "", &sealed.comment);
    out.push_str(&format!("@Serializable(with = {serializer}::class)\n"));
    out.push_str(&format!("sealed class {} : SealedClassWithJson() {{\n", sealed.name));
    for property in &sealed.properties {
        out.push_str(&render_property(property, INDENT));
        out.push('\n');
    }
    out.push_str(&format!("{INDENT}abstract override val _jsonElement: JsonElement\n"));
    if !sealed.properties.is_empty() {
        out.push('\n');
    }
    let subclasses = sealed
        .subclasses
        .iter()
        .map(|subclass| render_sealed_subclass(subclass, &sealed.name))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push_str(&subclasses);
    out.push_str("\n}\n\n");
    out.push_str(&format!(
        "private object {serializer} : SealedClassJsonSerializer<{}>()",
        sealed.name
    ));
    out
}

fn render_sealed_subclass(subclass: &KotlinSealedSubclass, parent: &str) -> String {
    let body_indent = format!("{INDENT}{INDENT}");
    let mut out = String::new();
    render_doc(&mut out, INDENT, &subclass.comment);
    out.push_str(&format!("{INDENT}@Serializable\n"));
    if subclass.properties.is_empty() {
        out.push_str(&format!("{INDENT}data object {} : {parent}() {{\n", subclass.name));
    } else {
        out.push_str(&format!("{INDENT}data class {}(\n", subclass.name));
        out.push_str(&render_parameters(&subclass.properties, &body_indent));
        out.push_str(&format!("\n{INDENT}) : {parent}() {{\n"));
    }

    for property in &subclass.body_properties {
        out.push_str(&render_property(property, &body_indent));
        out.push('\n');
    }

    match &subclass.json_element {
        JsonElementSource::Expression(expression) => {
            out.push_str(&format!(
                "\n{body_indent}override val _jsonElement: JsonElement = {expression}\n"
            ));
        }
        JsonElementSource::Members => {
            out.push_str(&format!(
                "{body_indent}override val _jsonElement: JsonElement = buildJsonObject {{\n"
            ));
            for property in subclass.properties.iter().chain(&subclass.body_properties) {
                out.push_str(&render_json_put(property, &format!("{body_indent}{INDENT}")));
            }
            out.push_str(&format!("{body_indent}}}\n"));
        }
    }
    out.push_str(&format!("{INDENT}}}"));
    out
}

fn render_json_put(property: &KotlinProperty, indent: &str) -> String {
    let key = escape_string_literal(&property.serial_name);
    if property.nullable {
        format!(
            "{indent}{}?.let {{ put(\"{key}\", Json.encodeToJsonElement(it)) }}\n",
            property.name
        )
    } else {
        format!(
            "{indent}put(\"{key}\", Json.encodeToJsonElement({}))\n",
            property.name
        )
    }
}

// ── Methods ────────────────────────────────────────────────────────────────

fn render_method(method: &KotlinMethod) -> String {
    let body = format!("{INDENT}{INDENT}");
    let args_indent = format!("{body}{INDENT}");
    let mut out = String::new();

    if !method.comment.trim().is_empty() {
        out.push_str(&format!("{INDENT}/**\n"));
        for line in escape_comment(method.comment.trim()).lines() {
            out.push_str(&format!("{INDENT} * {line}\n").replace(" * \n", " *\n"));
        }
        out.push_str(&format!("{INDENT} */\n"));
    }

    let params = method
        .arguments
        .iter()
        .map(|argument| match &argument.default {
            Some(default) => format!("{}: {} = {default}", argument.name, argument.type_name),
            None => format!("{}: {}", argument.name, argument.type_name),
        })
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("{INDENT}fun {}({params}) {{\n", method.name));

    let custom_context = match &method.context_payload {
        Some(payload) => {
            out.push_str(&format!("{body}val customContext = buildJsonObject {{\n"));
            out.push_str(&format!(
                "{args_indent}context.forEach {{ (key, value) -> put(key, value) }}\n"
            ));
            out.push_str(&format!(
                "{args_indent}put(\"traits\", json.encodeToJsonElement({payload}))\n"
            ));
            out.push_str(&format!("{body}}}\n"));
            "customContext"
        }
        None => "context",
    };

    out.push_str(&format!("{body}analytics.{}(\n", method.sdk_call.method_name));
    for argument in &method.sdk_call.arguments {
        let value = match &argument.value {
            SdkArgumentValue::Parameter(name) => name.clone(),
            SdkArgumentValue::Literal(text) => format!("\"{}\"", escape_string_literal(text)),
            SdkArgumentValue::Serialized(name) => {
                format!("json.encodeToJsonElement({name}).jsonObject")
            }
        };
        out.push_str(&format!("{args_indent}{} = {value},\n", argument.name));
    }
    out.push_str(&format!(
        "{args_indent}options = RudderOption(customContext = {custom_context})\n"
    ));
    out.push_str(&format!("{body})\n"));
    out.push_str(&format!("{INDENT}}}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kotlin::context::{
        KotlinEnumValue, KotlinMethodArgument, SdkCall, SdkCallArgument,
    };

    fn field(name: &str, type_name: &str, nullable: bool) -> KotlinProperty {
        KotlinProperty {
            name: name.to_string(),
            serial_name: name.to_string(),
            type_name: type_name.to_string(),
            comment: format!("{name} doc"),
            nullable,
            default: nullable.then(|| "null".to_string()),
            ..KotlinProperty::default()
        }
    }

    #[test]
    fn renders_alias_with_escaped_comment() {
        let out = render_type_alias(&KotlinTypeAlias {
            name: "PropertyEmail".to_string(),
            comment: "User's email /* important */".to_string(),
            target: "String".to_string(),
        });
        assert_eq!(
            out,
            "/** User's email /\\* important *\\/ */\ntypealias PropertyEmail = String"
        );
    }

    #[test]
    fn renders_enum_constants_with_serial_names() {
        let out = render_enum(&KotlinEnum {
            name: "PropertyDeviceType".to_string(),
            comment: String::new(),
            values: vec![
                KotlinEnumValue {
                    name: "MOBILE".to_string(),
                    serial_name: "mobile".to_string(),
                },
                KotlinEnumValue {
                    name: "SMART_TV".to_string(),
                    serial_name: "smartTV".to_string(),
                },
            ],
        });
        assert_eq!(
            out,
            "@Serializable\nenum class PropertyDeviceType {\n    @SerialName(\"mobile\")\n    MOBILE,\n    @SerialName(\"smartTV\")\n    SMART_TV\n}"
        );
    }

    #[test]
    fn renders_nested_data_classes() {
        let class = KotlinDataClass {
            name: "TrackOrderProperties".to_string(),
            comment: "Order".to_string(),
            properties: vec![field("address", "TrackOrderProperties.Address", true)],
            nested_classes: vec![KotlinDataClass {
                name: "Address".to_string(),
                comment: String::new(),
                properties: vec![field("city", "PropertyCity", false)],
                nested_classes: Vec::new(),
            }],
        };
        let out = render_data_class(&class, "");
        assert!(out.contains("    val address: TrackOrderProperties.Address? = null\n) {"), "got:\n{out}");
        assert!(out.contains("    @Serializable\n    data class Address(\n        /** city doc */"), "got:\n{out}");
        assert!(out.ends_with("        val city: PropertyCity\n    )\n}"), "got:\n{out}");
    }

    #[test]
    fn renders_variant_subclass_json_element() {
        let mut discriminator = field("kind", "PropertyKind", false);
        discriminator.is_override = true;
        discriminator.default = Some("\"a\"".to_string());
        let subclass = KotlinSealedSubclass {
            name: "CaseA".to_string(),
            comment: "A".to_string(),
            properties: vec![field("note", "PropertyNote", true)],
            body_properties: vec![discriminator],
            json_element: JsonElementSource::Members,
        };
        let out = render_sealed_subclass(&subclass, "Parent");
        assert!(out.contains(") : Parent() {\n"), "got:\n{out}");
        assert!(out.contains("override val kind: PropertyKind = \"a\"\n"), "got:\n{out}");
        assert!(out.contains("note?.let { put(\"note\", Json.encodeToJsonElement(it)) }"), "got:\n{out}");
        assert!(out.contains("put(\"kind\", Json.encodeToJsonElement(kind))"), "got:\n{out}");
    }

    #[test]
    fn parameterless_subclass_is_a_data_object() {
        let subclass = KotlinSealedSubclass {
            name: "CaseA".to_string(),
            comment: String::new(),
            properties: Vec::new(),
            body_properties: Vec::new(),
            json_element: JsonElementSource::Members,
        };
        let out = render_sealed_subclass(&subclass, "Parent");
        assert!(out.starts_with("    @Serializable\n    data object CaseA : Parent() {\n"), "got:\n{out}");
    }

    #[test]
    fn renders_method_with_escaped_event_name() {
        let method = KotlinMethod {
            name: "trackPrice".to_string(),
            comment: "Costs $5".to_string(),
            arguments: vec![KotlinMethodArgument {
                name: "properties".to_string(),
                type_name: "TrackPriceProperties".to_string(),
                default: None,
            }],
            sdk_call: SdkCall {
                method_name: "track",
                arguments: vec![
                    SdkCallArgument {
                        name: "name".to_string(),
                        value: SdkArgumentValue::Literal("Price $ \"x\"".to_string()),
                    },
                    SdkCallArgument {
                        name: "properties".to_string(),
                        value: SdkArgumentValue::Serialized("properties".to_string()),
                    },
                ],
            },
            context_payload: None,
        };
        let out = render_method(&method);
        assert!(out.contains("     * Costs $5\n"), "got:\n{out}");
        assert!(out.contains("fun trackPrice(properties: TrackPriceProperties) {"), "got:\n{out}");
        assert!(out.contains(r#"name = "Price \$ \"x\"","#), "got:\n{out}");
        assert!(out.contains("properties = json.encodeToJsonElement(properties).jsonObject,"), "got:\n{out}");
        assert!(out.contains("options = RudderOption(customContext = context)"), "got:\n{out}");
    }

    #[test]
    fn context_traits_method_builds_custom_context() {
        let method = KotlinMethod {
            name: "identify".to_string(),
            comment: String::new(),
            arguments: Vec::new(),
            sdk_call: SdkCall {
                method_name: "identify",
                arguments: Vec::new(),
            },
            context_payload: Some("traits".to_string()),
        };
        let out = render_method(&method);
        assert!(out.contains("val customContext = buildJsonObject {"), "got:\n{out}");
        assert!(out.contains("put(\"traits\", json.encodeToJsonElement(traits))"), "got:\n{out}");
        assert!(out.contains("options = RudderOption(customContext = customContext)"), "got:\n{out}");
    }

    #[test]
    fn support_classes_only_with_sealed_classes() {
        let ctx = KotlinContext::default();
        let out = render_main_file(&ctx, "com.example").unwrap();
        assert!(out.starts_with("package com.example\n"));
        assert!(!out.contains("SealedClassWithJson"));
        assert!(out.contains("\nclass RudderAnalytics(private val analytics: Analytics) {"));
        assert!(out.ends_with("    }\n}\n"), "got:\n{out}");
    }
}
