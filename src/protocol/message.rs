//! NXCP message implementation

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use super::{BodyShape, Error, Field, Flags, MAX_CONTENT_LEN, Result};

/// Field dictionary keyed by id, iterated in insertion order
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: Vec<Field>,
    index: HashMap<u32, usize>,
}

impl FieldMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` fields
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a field, replacing any field with the same id in place
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        match self.index.get(&field.id()) {
            Some(&slot) => Some(std::mem::replace(&mut self.fields[slot], field)),
            None => {
                self.index.insert(field.id(), self.fields.len());
                self.fields.push(field);
                None
            }
        }
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Field> {
        self.index.get(&id).map(|&slot| &self.fields[slot])
    }

    /// Remove a field
    pub fn remove(&mut self, id: u32) -> Option<Field> {
        let slot = self.index.remove(&id)?;
        let field = self.fields.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(field)
    }

    /// Check whether a field id is present
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the map holds no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }
}

impl PartialEq for FieldMap {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Active message body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Field dictionary
    Fields(FieldMap),
    /// Raw payload
    Binary(Bytes),
    /// Control value
    Control(u32),
}

impl Body {
    /// Shape of this body
    #[must_use]
    pub const fn shape(&self) -> BodyShape {
        match self {
            Self::Fields(_) => BodyShape::Fields,
            Self::Binary(_) => BodyShape::Binary,
            Self::Control(_) => BodyShape::Control,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Fields(FieldMap::new())
    }
}

/// NXCP message
///
/// The `BINARY` and `CONTROL` flag bits always reflect the active [`Body`];
/// every other bit is stored as given.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    code: u16,
    id: u32,
    /// Flags with the shape bits masked out
    flags: Flags,
    body: Body,
}

impl Message {
    /// Create an empty field message
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self::with_id(code, 0)
    }

    /// Create an empty field message with an explicit ID
    #[must_use]
    pub fn with_id(code: u16, id: u32) -> Self {
        Self {
            code,
            id,
            flags: Flags::new(),
            body: Body::default(),
        }
    }

    /// Assemble a message from decoded parts
    pub(crate) fn from_parts(code: u16, id: u32, flags: Flags, body: Body) -> Self {
        Self {
            code,
            id,
            flags: flags.without(Flags::SHAPE_MASK),
            body,
        }
    }

    /// Get message code
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Set message code
    pub fn set_code(&mut self, code: u16) {
        self.code = code;
    }

    /// Get message ID
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Set message ID
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// Get flags, shape bits included
    #[must_use]
    pub fn flags(&self) -> Flags {
        match self.body {
            Body::Fields(_) => self.flags,
            Body::Binary(_) => self.flags.with(Flags::BINARY),
            Body::Control(_) => self.flags.with(Flags::CONTROL),
        }
    }

    /// Replace all flags
    ///
    /// Shape bits switch the body to an empty body of the requested shape
    /// when it differs from the current one.
    pub fn set_flags(&mut self, flags: Flags) -> Result<()> {
        if flags.is_conflicting() {
            return Err(Error::InvalidFlagCombination {
                flags: flags.as_u16(),
            });
        }

        if flags.shape() != self.shape() {
            self.body = match flags.shape() {
                BodyShape::Fields => Body::default(),
                BodyShape::Binary => Body::Binary(Bytes::new()),
                BodyShape::Control => Body::Control(0),
            };
        }
        self.flags = flags.without(Flags::SHAPE_MASK);
        Ok(())
    }

    /// Active body
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Active body shape
    #[must_use]
    pub const fn shape(&self) -> BodyShape {
        self.body.shape()
    }

    /// Check if this is a raw (binary) message
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self.body, Body::Binary(_))
    }

    /// Check if this is a control message
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self.body, Body::Control(_))
    }

    /// Check if end of file
    #[must_use]
    pub fn is_end_of_file(&self) -> bool {
        self.flags.is_end_of_file()
    }

    /// Set or clear end of file
    pub fn set_end_of_file(&mut self, on: bool) {
        self.flags = self.flags.toggled(Flags::END_OF_FILE, on);
    }

    /// Check if end of sequence
    #[must_use]
    pub fn is_end_of_sequence(&self) -> bool {
        self.flags.is_end_of_sequence()
    }

    /// Set or clear end of sequence
    pub fn set_end_of_sequence(&mut self, on: bool) {
        self.flags = self.flags.toggled(Flags::END_OF_SEQUENCE, on);
    }

    /// Check if reverse order
    #[must_use]
    pub fn is_reverse_order(&self) -> bool {
        self.flags.is_reverse_order()
    }

    /// Set or clear reverse order
    pub fn set_reverse_order(&mut self, on: bool) {
        self.flags = self.flags.toggled(Flags::REVERSE_ORDER, on);
    }

    /// Raw payload, if this is a binary message
    #[must_use]
    pub fn binary_data(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Turn this into a binary message carrying `data`
    ///
    /// The payload is limited to [`MAX_CONTENT_LEN`] bytes.
    pub fn set_binary_data(&mut self, data: impl Into<Bytes>) {
        self.body = Body::Binary(data.into());
    }

    /// Control value, if this is a control message
    #[must_use]
    pub fn control_data(&self) -> Option<u32> {
        match self.body {
            Body::Control(value) => Some(value),
            _ => None,
        }
    }

    /// Turn this into a control message carrying `value`
    pub fn set_control_data(&mut self, value: u32) {
        self.body = Body::Control(value);
    }

    /// Reset to an empty field message
    pub fn clear_body(&mut self) {
        self.body = Body::default();
    }

    /// Field dictionary, if this is a field message
    #[must_use]
    pub fn field_map(&self) -> Option<&FieldMap> {
        match &self.body {
            Body::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Iterate fields in insertion order; empty for binary and control messages
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.field_map().into_iter().flat_map(FieldMap::iter)
    }

    /// Number of fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_map().map_or(0, FieldMap::len)
    }

    /// Look up a field
    #[must_use]
    pub fn field(&self, id: u32) -> Option<&Field> {
        self.field_map().and_then(|fields| fields.get(id))
    }

    /// Check whether a field is present
    #[must_use]
    pub fn contains_field(&self, id: u32) -> bool {
        self.field(id).is_some()
    }

    /// Remove a field
    pub fn remove_field(&mut self, id: u32) -> Option<Field> {
        match &mut self.body {
            Body::Fields(fields) => fields.remove(id),
            _ => None,
        }
    }

    /// Insert a field, silently replacing one with the same id
    ///
    /// Binary and control messages become field messages.
    pub fn set_field(&mut self, field: Field) -> Option<Field> {
        let mut fields = match std::mem::take(&mut self.body) {
            Body::Fields(fields) => fields,
            Body::Binary(_) | Body::Control(_) => FieldMap::new(),
        };
        let previous = fields.insert(field);
        self.body = Body::Fields(fields);
        previous
    }

    /// Insert a field, rejecting a duplicate id
    pub fn try_set_field(&mut self, field: Field) -> Result<()> {
        if self.contains_field(field.id()) {
            return Err(Error::FieldIdCollision {
                field_id: field.id(),
            });
        }
        self.set_field(field);
        Ok(())
    }

    /// Set 16-bit integer field
    pub fn set_u16(&mut self, id: u32, value: u16) {
        self.set_field(Field::new(id, value));
    }

    /// Set 16-bit integer field from a signed value
    pub fn set_i16(&mut self, id: u32, value: i16) {
        self.set_u16(id, value as u16);
    }

    /// Set 32-bit integer field
    pub fn set_u32(&mut self, id: u32, value: u32) {
        self.set_field(Field::new(id, value));
    }

    /// Set 32-bit integer field from a signed value
    pub fn set_i32(&mut self, id: u32, value: i32) {
        self.set_u32(id, value as u32);
    }

    /// Set 64-bit integer field
    pub fn set_u64(&mut self, id: u32, value: u64) {
        self.set_field(Field::new(id, value));
    }

    /// Set 64-bit integer field from a signed value
    pub fn set_i64(&mut self, id: u32, value: i64) {
        self.set_u64(id, value as u64);
    }

    /// Set floating point field
    pub fn set_f64(&mut self, id: u32, value: f64) {
        self.set_field(Field::new(id, value));
    }

    /// Set string field
    pub fn set_string(&mut self, id: u32, value: impl Into<String>) {
        self.set_field(Field::new(id, value.into()));
    }

    /// Set binary field
    ///
    /// The content is limited to [`MAX_CONTENT_LEN`] bytes.
    pub fn set_bytes(&mut self, id: u32, value: impl Into<Bytes>) {
        self.set_field(Field::new(id, value.into()));
    }

    /// Set binary field to the content of a file
    ///
    /// The field is left untouched if the file cannot be read.
    pub fn set_bytes_from_file(&mut self, id: u32, path: impl AsRef<Path>) -> Result<()> {
        let data = std::fs::read(path)?;
        if data.len() > MAX_CONTENT_LEN {
            return Err(Error::MessageTooLarge {
                size: data.len(),
                max: MAX_CONTENT_LEN,
            });
        }
        self.set_bytes(id, data);
        Ok(())
    }

    /// Set boolean field
    pub fn set_bool(&mut self, id: u32, value: bool) {
        self.set_field(Field::from_bool(id, value));
    }

    /// Set IP address field
    pub fn set_ip_addr(&mut self, id: u32, addr: IpAddr) {
        self.set_field(Field::from_ip_addr(id, addr));
    }

    /// Set UUID field
    pub fn set_uuid(&mut self, id: u32, uuid: Uuid) {
        self.set_field(Field::from_uuid(id, uuid));
    }

    /// Set timestamp field (whole seconds)
    pub fn set_timestamp(&mut self, id: u32, time: SystemTime) {
        self.set_field(Field::from_timestamp(id, time));
    }

    /// Set packed `u32` array field
    pub fn set_u32_array(&mut self, id: u32, values: &[u32]) {
        self.set_field(Field::from_u32_array(id, values));
    }

    /// Set count-prefixed `u32` array field
    pub fn set_u32_array_ex(&mut self, id: u32, values: &[u32]) {
        self.set_field(Field::from_u32_array_ex(id, values));
    }

    fn integer(&self, id: u32) -> u64 {
        self.field(id).and_then(Field::as_integer).unwrap_or(0)
    }

    /// 16-bit integer; `0` if missing
    #[must_use]
    pub fn get_u16(&self, id: u32) -> u16 {
        self.integer(id) as u16
    }

    /// 16-bit integer, sign-extended; `0` if missing
    #[must_use]
    pub fn get_i16(&self, id: u32) -> i16 {
        self.integer(id) as u16 as i16
    }

    /// 32-bit integer; `0` if missing
    #[must_use]
    pub fn get_u32(&self, id: u32) -> u32 {
        self.integer(id) as u32
    }

    /// Signed 32-bit integer; `0` if missing
    #[must_use]
    pub fn get_i32(&self, id: u32) -> i32 {
        self.integer(id) as u32 as i32
    }

    /// 64-bit integer; `0` if missing
    #[must_use]
    pub fn get_u64(&self, id: u32) -> u64 {
        self.integer(id)
    }

    /// Signed 64-bit integer; `0` if missing
    #[must_use]
    pub fn get_i64(&self, id: u32) -> i64 {
        self.integer(id) as i64
    }

    /// Floating point value; `0.0` if missing
    #[must_use]
    pub fn get_f64(&self, id: u32) -> f64 {
        self.field(id).and_then(Field::as_real).unwrap_or(0.0)
    }

    /// String value; empty if missing
    #[must_use]
    pub fn get_str(&self, id: u32) -> &str {
        self.field(id).and_then(Field::as_str).unwrap_or("")
    }

    /// Binary value; empty if missing
    #[must_use]
    pub fn get_bytes(&self, id: u32) -> &[u8] {
        self.field(id)
            .and_then(Field::as_bytes)
            .map_or(&[][..], |b| &b[..])
    }

    /// Boolean value; `false` if missing
    #[must_use]
    pub fn get_bool(&self, id: u32) -> bool {
        self.integer(id) != 0
    }

    /// IP address; `0.0.0.0` if missing or not an address
    #[must_use]
    pub fn get_ip_addr(&self, id: u32) -> IpAddr {
        self.field(id)
            .and_then(Field::as_ip_addr)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// UUID; nil if missing or not 16 bytes
    #[must_use]
    pub fn get_uuid(&self, id: u32) -> Uuid {
        self.field(id).and_then(Field::as_uuid).unwrap_or_else(Uuid::nil)
    }

    /// Timestamp; the Unix epoch if missing
    #[must_use]
    pub fn get_timestamp(&self, id: u32) -> SystemTime {
        self.field(id)
            .and_then(Field::as_timestamp)
            .unwrap_or(UNIX_EPOCH)
    }

    /// Packed `u32` array; empty if missing
    #[must_use]
    pub fn get_u32_array(&self, id: u32) -> Vec<u32> {
        self.field(id)
            .and_then(Field::as_u32_array)
            .unwrap_or_default()
    }

    /// Count-prefixed `u32` array; empty if missing or malformed
    #[must_use]
    pub fn get_u32_array_ex(&self, id: u32) -> Vec<u32> {
        let Some(field) = self.field(id) else {
            return Vec::new();
        };
        field.as_u32_array_ex().unwrap_or_else(|| {
            warn!(field_id = id, field_type = %field.field_type(), "malformed u32 array");
            Vec::new()
        })
    }

    /// Encode message to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        super::encode(self)
    }

    /// Decode message from bytes
    pub fn decode(bytes: &[u8]) -> super::Result<Self> {
        super::decode(bytes)
    }
}

/// Builder for outbound messages
///
/// In strict mode a repeated field id makes [`MessageBuilder::build`] fail
/// instead of overwriting the earlier field.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
    strict: bool,
    collision: Option<u32>,
}

impl MessageBuilder {
    /// Start a field message
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self {
            message: Message::new(code),
            strict: false,
            collision: None,
        }
    }

    /// Reject duplicate field ids
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Set message ID
    #[must_use]
    pub fn id(mut self, id: u32) -> Self {
        self.message.set_id(id);
        self
    }

    /// Set end of file
    #[must_use]
    pub fn end_of_file(mut self) -> Self {
        self.message.set_end_of_file(true);
        self
    }

    /// Set end of sequence
    #[must_use]
    pub fn end_of_sequence(mut self) -> Self {
        self.message.set_end_of_sequence(true);
        self
    }

    /// Set reverse order
    #[must_use]
    pub fn reverse_order(mut self) -> Self {
        self.message.set_reverse_order(true);
        self
    }

    /// Add a field
    #[must_use]
    pub fn field(mut self, id: u32, value: impl Into<super::FieldValue>) -> Self {
        let field = Field::new(id, value);
        if self.strict {
            if self.message.try_set_field(field).is_err() && self.collision.is_none() {
                self.collision = Some(id);
            }
        } else {
            self.message.set_field(field);
        }
        self
    }

    /// Finish the message
    pub fn build(self) -> Result<Message> {
        match self.collision {
            Some(field_id) => Err(Error::FieldIdCollision { field_id }),
            None => Ok(self.message),
        }
    }
}
