//! XML form of a message
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <nxcp version="2">
//!   <message code="100" id="7">
//!     <variable id="5" type="int32"><value>42</value></variable>
//!     <variable id="6" type="binary"><value>AQID</value></variable>
//!   </message>
//! </nxcp>
//! ```
//!
//! Only the field dictionary has an XML form. Binary values are base64,
//! integers may be written in decimal, negative decimal or `0x` hex.

use base64::{Engine, engine::general_purpose::STANDARD};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::trace;

use super::{Error, Field, FieldType, FieldValue, Message, PROTOCOL_VERSION, Result};

impl Message {
    /// Render the message as an XML document
    ///
    /// Binary and control bodies produce a message element without variables.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let version = PROTOCOL_VERSION.to_string();
        writer.write_event(Event::Start(
            BytesStart::new("nxcp").with_attributes([("version", version.as_str())]),
        ))?;

        let code = self.code().to_string();
        let id = self.id().to_string();
        writer.write_event(Event::Start(
            BytesStart::new("message")
                .with_attributes([("code", code.as_str()), ("id", id.as_str())]),
        ))?;

        for field in self.fields() {
            let field_id = field.id().to_string();
            writer.write_event(Event::Start(BytesStart::new("variable").with_attributes([
                ("id", field_id.as_str()),
                ("type", field.field_type().name()),
            ])))?;
            writer.write_event(Event::Start(BytesStart::new("value")))?;
            writer.write_event(Event::Text(BytesText::new(&value_text(field.value()))))?;
            writer.write_event(Event::End(BytesEnd::new("value")))?;
            writer.write_event(Event::End(BytesEnd::new("variable")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("message")))?;
        writer.write_event(Event::End(BytesEnd::new("nxcp")))?;

        String::from_utf8(writer.into_inner()).map_err(|_| invalid("document is not UTF-8"))
    }

    /// Parse a message from an XML document produced by [`Message::to_xml`]
    /// or by another NXCP peer
    ///
    /// Variables without a `<value>` element are skipped.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut state = XmlState::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) => state.open(&element)?,
                Event::Empty(element) => {
                    state.open(&element)?;
                    state.close(element.name().as_ref())?;
                }
                Event::End(element) => state.close(element.name().as_ref())?,
                Event::Text(text) => {
                    state.text(&text.unescape().map_err(quick_xml::Error::from)?);
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|_| invalid("CDATA section is not UTF-8"))?;
                    state.text(text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        trace!(
            code = state.message.code(),
            fields = state.message.field_count(),
            "parsed XML message"
        );
        Ok(state.message)
    }
}

struct XmlState {
    message: Message,
    variable: Option<(u32, FieldType)>,
    value: Option<String>,
}

impl XmlState {
    fn new() -> Self {
        Self {
            message: Message::new(0),
            variable: None,
            value: None,
        }
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        match element.name().as_ref() {
            b"nxcp" => {}
            b"message" => {
                if let Some(code) = attribute(element, "code")? {
                    let code = u16::try_from(parse_integer(&code)?)
                        .map_err(|_| invalid(format!("message code {code} out of range")))?;
                    self.message.set_code(code);
                }
                if let Some(id) = attribute(element, "id")? {
                    self.message.set_id(parse_u32(&id)?);
                }
            }
            b"variable" => {
                let id = match attribute(element, "id")? {
                    Some(id) => parse_u32(&id)?,
                    None => 0,
                };
                let name = attribute(element, "type")?
                    .ok_or_else(|| invalid(format!("variable {id} has no type")))?;
                let field_type = FieldType::from_name(&name)
                    .ok_or_else(|| invalid(format!("variable {id} has unknown type {name:?}")))?;
                self.variable = Some((id, field_type));
            }
            b"value" => {
                if self.variable.is_none() {
                    return Err(invalid("value outside of a variable"));
                }
                self.value = Some(String::new());
            }
            other => {
                return Err(invalid(format!(
                    "unexpected element <{}>",
                    String::from_utf8_lossy(other)
                )));
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"value" => {
                if let (Some((id, field_type)), Some(text)) = (self.variable, self.value.take()) {
                    let value = parse_value(field_type, &text)
                        .map_err(|reason| invalid(format!("variable {id}: {reason}")))?;
                    self.message.set_field(Field::new(id, value));
                }
            }
            b"variable" => self.variable = None,
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(value) = self.value.as_mut() {
            value.push_str(text);
        }
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidXml {
        reason: reason.into(),
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Int16(v) => v.to_string(),
        FieldValue::Int32(v) => v.to_string(),
        FieldValue::Int64(v) => v.to_string(),
        FieldValue::Float64(v) => v.to_string(),
        FieldValue::String(s) => s.clone(),
        FieldValue::Binary(b) => STANDARD.encode(b),
    }
}

fn parse_value(field_type: FieldType, text: &str) -> std::result::Result<FieldValue, String> {
    let value = match field_type {
        FieldType::Int16 => FieldValue::Int16(narrow(text, 16)? as u16),
        FieldType::Int32 => FieldValue::Int32(narrow(text, 32)? as u32),
        FieldType::Int64 => FieldValue::Int64(integer(text)?),
        FieldType::Float64 => FieldValue::Float64(
            text.trim()
                .parse()
                .map_err(|_| format!("invalid float {:?}", text.trim()))?,
        ),
        FieldType::String => FieldValue::String(text.to_owned()),
        FieldType::Binary => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let data = STANDARD
                .decode(compact)
                .map_err(|e| format!("invalid base64: {e}"))?;
            FieldValue::Binary(data.into())
        }
    };
    Ok(value)
}

/// Decimal, negative decimal (two's complement) or `0x` hex
fn integer(text: &str) -> std::result::Result<u64, String> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if text.starts_with('-') {
        text.parse::<i64>().ok().map(|v| v as u64)
    } else {
        text.parse::<u64>().ok()
    };
    parsed.ok_or_else(|| format!("invalid integer {text:?}"))
}

/// Integer that fits `bits` either unsigned or as a negative signed value
fn narrow(text: &str, bits: u32) -> std::result::Result<u64, String> {
    let value = integer(text)?;
    let signed = value as i64;
    let min = -(1i64 << (bits - 1));
    if value >> bits == 0 || (signed < 0 && signed >= min) {
        Ok(value & ((1u64 << bits) - 1))
    } else {
        Err(format!("{} does not fit in {bits} bits", text.trim()))
    }
}

fn parse_integer(text: &str) -> Result<u64> {
    integer(text).map_err(invalid)
}

fn parse_u32(text: &str) -> Result<u32> {
    let value = parse_integer(text)?;
    u32::try_from(value).map_err(|_| invalid(format!("{} out of range", text.trim())))
}
