//! ADT request bodies and response parsing.
//!
//! Element and attribute names are matched on their local part, so the
//! parsers do not depend on the namespace prefixes a server picks.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rac_core::{
    ActivationMessage, ActivationResult, InactiveObject, MessageSeverity, NewObject, RemoteError,
};

/// Body for creating a global class.
#[must_use]
pub fn create_class_body(object: &NewObject, responsible: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<class:abapClass xmlns:class="http://www.sap.com/adt/oo/classes" xmlns:adtcore="http://www.sap.com/adt/core" adtcore:description="{description}" adtcore:name="{name}" adtcore:type="{kind}" adtcore:responsible="{responsible}" class:final="true" class:visibility="public">
  <adtcore:packageRef adtcore:uri="{package_path}" adtcore:name="{package}"/>
  <class:include adtcore:name="{kind}" adtcore:type="{kind}" class:includeType="testclasses"/>
  <class:superClassRef/>
</class:abapClass>"#,
        description = escape(object.description.as_str()),
        name = escape(object.name.to_uppercase().as_str()),
        kind = escape(object.kind.as_str()),
        responsible = escape(responsible.to_uppercase().as_str()),
        package = escape(object.package.as_str()),
        package_path = escape(object.package_path.as_str()),
    )
}

/// Body for activating one object by name and URI.
#[must_use]
pub fn activate_object_body(name: &str, uri: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
  <adtcore:objectReference adtcore:uri="{}" adtcore:name="{}"/>
</adtcore:objectReferences>"#,
        escape(uri),
        escape(name.to_uppercase().as_str()),
    )
}

/// Body for activating the objects a previous pass left inactive.
#[must_use]
pub fn activate_inactive_body(objects: &[InactiveObject]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
"#,
    );
    for object in objects {
        body.push_str(&format!(
            "  <adtcore:objectReference adtcore:uri=\"{}\" adtcore:type=\"{}\" adtcore:name=\"{}\" adtcore:parentUri=\"{}\"/>\n",
            escape(object.uri.as_str()),
            escape(object.object_type.as_str()),
            escape(object.name.as_str()),
            escape(object.parent_uri.as_str()),
        ));
    }
    body.push_str("</adtcore:objectReferences>");
    body
}

fn protocol(err: impl std::fmt::Display) -> RemoteError {
    RemoteError::Protocol(format!("Malformed XML: {}", err))
}

fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, RemoteError> {
    for attr in element.attributes() {
        let attr = attr.map_err(protocol)?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value().map_err(protocol)?.into_owned()));
        }
    }
    Ok(None)
}

/// Text of the first element with the given local name.
fn first_text(xml: &str, local_name: &[u8]) -> Result<Option<String>, RemoteError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut inside = false;
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == local_name => inside = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == local_name => {
                return Ok(Some(String::new()))
            }
            Ok(Event::Text(e)) if inside => text.push_str(&e.unescape().map_err(protocol)?),
            Ok(Event::End(e)) if inside && e.local_name().as_ref() == local_name => {
                return Ok(Some(text))
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(protocol(e)),
            _ => {}
        }
        buf.clear();
    }
}

/// Lock handle from a lock response.
pub fn parse_lock_handle(xml: &str) -> Result<String, RemoteError> {
    match first_text(xml, b"LOCK_HANDLE")? {
        Some(handle) if !handle.is_empty() => Ok(handle),
        _ => Err(RemoteError::Protocol(
            "Lock response carries no LOCK_HANDLE".to_string(),
        )),
    }
}

/// Human-readable message of an ADT exception body, if it is one.
#[must_use]
pub fn parse_exception_message(xml: &str) -> Option<String> {
    if !xml.trim_start().starts_with('<') {
        return None;
    }
    first_text(xml, b"message")
        .ok()
        .flatten()
        .filter(|message| !message.is_empty())
}

/// Activation response: diagnostics and objects left inactive.
///
/// An empty body means a clean activation.
pub fn parse_activation_result(xml: &str) -> Result<ActivationResult, RemoteError> {
    if xml.trim().is_empty() {
        return Ok(ActivationResult::activated());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut messages = Vec::new();
    let mut inactive = Vec::new();
    let mut current: Option<ActivationMessage> = None;
    let mut in_text = false;
    let mut in_object = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"msg" => current = Some(message_from(&e)?),
                b"txt" => in_text = current.is_some(),
                b"object" => in_object = true,
                b"ref" if in_object => inactive.push(inactive_from(&e)?),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"msg" => messages.push(message_from(&e)?),
                b"ref" if in_object => inactive.push(inactive_from(&e)?),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                if let Some(message) = current.as_mut() {
                    message.short_text.push_str(&e.unescape().map_err(protocol)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"msg" => messages.extend(current.take()),
                b"txt" => in_text = false,
                b"object" => in_object = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(protocol(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(ActivationResult::from_parts(messages, inactive))
}

fn message_from(element: &BytesStart<'_>) -> Result<ActivationMessage, RemoteError> {
    Ok(ActivationMessage {
        obj_descr: attribute(element, b"objDescr")?.unwrap_or_default(),
        severity: MessageSeverity::from_code(&attribute(element, b"type")?.unwrap_or_default()),
        force_supported: attribute(element, b"forceSupported")?.as_deref() == Some("true"),
        href: attribute(element, b"href")?.unwrap_or_default(),
        short_text: String::new(),
    })
}

fn inactive_from(element: &BytesStart<'_>) -> Result<InactiveObject, RemoteError> {
    Ok(InactiveObject {
        uri: attribute(element, b"uri")?.unwrap_or_default(),
        object_type: attribute(element, b"type")?.unwrap_or_default(),
        name: attribute(element, b"name")?.unwrap_or_default(),
        parent_uri: attribute(element, b"parentUri")?.unwrap_or_default(),
    })
}
