//! # Dynamic Message Factory
//!
//! Builds and converts messages purely from runtime descriptors, with no generated code.
//!
//! The structured text format is the canonical protobuf JSON mapping, implemented by
//! `prost-reflect`'s serde support:
//!
//! * **Rendering** always includes fields at their default value, so a freshly instantiated
//!   message shows the operator the full shape of the request. 64-bit integers are rendered as
//!   plain numbers.
//! * **Parsing** is tolerant: unknown fields are ignored and enum names are matched without
//!   regard to case. Any other mismatch is an error; a partial message is never returned.
//!
//! Every function is stateless, so the same descriptors can be reused across unrelated calls.
use bytes::Bytes;
use prost::Message;
use prost_reflect::{
    DeserializeOptions, DynamicMessage, FieldDescriptor, Kind, MessageDescriptor,
    ReflectMessage, SerializeOptions, Value,
};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("{0}")]
    InvalidText(#[source] serde_json::Error),
    #[error("failed to render message as text: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to decode message bytes: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// A zero-valued instance: scalars at their default, repeated fields empty, messages unset.
pub fn instantiate(desc: MessageDescriptor) -> DynamicMessage {
    DynamicMessage::new(desc)
}

/// Renders `message` as pretty-printed JSON, default values included.
pub fn to_text(message: &DynamicMessage) -> Result<String, MessageError> {
    let options = SerializeOptions::new()
        .skip_default_fields(false)
        .stringify_64_bit_integers(false);

    let mut serializer = serde_json::Serializer::pretty(Vec::new());
    message
        .serialize_with_options(&mut serializer, &options)
        .map_err(MessageError::Render)?;

    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&serializer.into_inner()).into_owned())
}

/// Parses JSON text into a message of type `desc`.
pub fn from_text(desc: MessageDescriptor, text: &str) -> Result<DynamicMessage, MessageError> {
    let mut value: serde_json::Value =
        serde_json::from_str(text).map_err(MessageError::InvalidText)?;
    normalize_enum_names(&desc, &mut value);

    let options = DeserializeOptions::new().deny_unknown_fields(false);
    let mut message = DynamicMessage::deserialize_with_options(desc, value, &options)
        .map_err(MessageError::InvalidText)?;
    clear_default_fields(&mut message);
    Ok(message)
}

/// Encodes `message` in the protobuf binary wire format.
pub fn to_wire(message: &DynamicMessage) -> Bytes {
    Bytes::from(message.encode_to_vec())
}

/// Decodes binary wire bytes into a message of type `desc`.
pub fn from_wire(desc: MessageDescriptor, bytes: &[u8]) -> Result<DynamicMessage, MessageError> {
    let mut message = DynamicMessage::decode(desc, bytes)?;
    clear_default_fields(&mut message);
    Ok(message)
}

/// Rewrites enum names in `value` to their declared spelling, wherever a case-insensitive
/// match exists. Unknown names are left alone for the deserializer to reject.
fn normalize_enum_names(desc: &MessageDescriptor, value: &mut serde_json::Value) {
    let serde_json::Value::Object(object) = value else {
        return;
    };

    for (key, field_value) in object.iter_mut() {
        let Some(field) = desc
            .get_field_by_name(key)
            .or_else(|| desc.get_field_by_json_name(key))
        else {
            continue;
        };

        if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                continue;
            };
            let value_field = entry.map_entry_value_field();
            if let serde_json::Value::Object(entries) = field_value {
                for entry_value in entries.values_mut() {
                    normalize_single(&value_field, entry_value);
                }
            }
        } else if field.is_list() {
            if let serde_json::Value::Array(items) = field_value {
                for item in items {
                    normalize_single(&field, item);
                }
            }
        } else {
            normalize_single(&field, field_value);
        }
    }
}

fn normalize_single(field: &FieldDescriptor, value: &mut serde_json::Value) {
    match (field.kind(), value) {
        (Kind::Enum(enum_desc), serde_json::Value::String(name)) => {
            if enum_desc.get_value_by_name(name).is_some() {
                return;
            }
            if let Some(matched) = enum_desc
                .values()
                .find(|v| v.name().eq_ignore_ascii_case(name))
            {
                *name = matched.name().to_string();
            }
        }
        (Kind::Message(message_desc), value @ serde_json::Value::Object(_)) => {
            normalize_enum_names(&message_desc, value)
        }
        _ => {}
    }
}

/// Removes explicitly set default values from fields without presence, recursively, so that a
/// message read back from text or bytes compares equal to the one that produced them.
fn clear_default_fields(message: &mut DynamicMessage) {
    let fields: Vec<FieldDescriptor> = message.descriptor().fields().collect();

    for field in fields {
        if !field.supports_presence()
            && *message.get_field(&field) == Value::default_value_for_field(&field)
        {
            message.clear_field(&field);
            continue;
        }

        if !message.has_field(&field) {
            continue;
        }

        match message.get_field_mut(&field) {
            Value::Message(nested) => clear_default_fields(nested),
            Value::List(items) => {
                for item in items {
                    if let Value::Message(nested) = item {
                        clear_default_fields(nested);
                    }
                }
            }
            Value::Map(entries) => {
                for entry in entries.values_mut() {
                    if let Value::Message(nested) = entry {
                        clear_default_fields(nested);
                    }
                }
            }
            _ => {}
        }
    }
}
