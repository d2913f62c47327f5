//! Parsers for ECP query responses.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rokutv_core::{DeviceError, DeviceInfo, RawApp};

use crate::controller::DeviceResult;

fn protocol_error(context: &str, err: impl std::fmt::Display) -> DeviceError {
    DeviceError::Protocol(format!("{}: {}", context, err))
}

fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

/// Collect `id`, `type` and `version` from an `<app>` element.
fn app_attributes(element: &BytesStart<'_>) -> DeviceResult<(Option<String>, String, String)> {
    let mut id = None;
    let mut kind = String::new();
    let mut version = String::new();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| protocol_error("Bad app attribute", e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| protocol_error("Bad app attribute value", e))?
            .into_owned();
        match attr.key.as_ref() {
            b"id" => id = Some(value),
            b"type" => kind = value,
            b"version" => version = value,
            _ => {}
        }
    }

    Ok((id, kind, version))
}

/// Parse `query/device-info`.
pub fn parse_device_info(xml: &str) -> DeviceResult<DeviceInfo> {
    let mut reader = reader(xml);
    let mut info = DeviceInfo::default();
    let mut friendly_name = String::new();
    let mut current = String::new();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if current == "device-info" {
                    saw_root = true;
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| protocol_error("Bad device-info text", e))?
                    .into_owned();
                match current.as_str() {
                    "power-mode" => info.power_mode = text,
                    "vendor-name" => info.vendor_name = text,
                    "model-name" => info.model_name = text,
                    "serial-number" => info.serial_number = text,
                    "user-device-name" => info.user_device_name = text,
                    "friendly-device-name" => friendly_name = text,
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(protocol_error("Malformed device-info", e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(DeviceError::Protocol(
            "Response has no <device-info> element".to_string(),
        ));
    }
    if info.user_device_name.is_empty() {
        info.user_device_name = friendly_name;
    }

    Ok(info)
}

/// Parse `query/apps`.
pub fn parse_apps(xml: &str) -> DeviceResult<Vec<RawApp>> {
    let mut reader = reader(xml);
    let mut apps = Vec::new();
    let mut pending: Option<RawApp> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"app" => {
                let (id, kind, version) = app_attributes(&e)?;
                let id = id.ok_or_else(|| DeviceError::Protocol("App without id".to_string()))?;
                pending = Some(RawApp::new(id, "", kind, version));
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"app" => {
                let (id, kind, version) = app_attributes(&e)?;
                let id = id.ok_or_else(|| DeviceError::Protocol("App without id".to_string()))?;
                apps.push(RawApp::new(id, "", kind, version));
            }
            Ok(Event::Text(t)) => {
                if let Some(app) = pending.as_mut() {
                    app.name = t
                        .unescape()
                        .map_err(|e| protocol_error("Bad app name", e))?
                        .into_owned();
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"app" => {
                if let Some(app) = pending.take() {
                    apps.push(app);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(protocol_error("Malformed app list", e)),
            _ => {}
        }
    }

    Ok(apps)
}

/// Parse `query/active-app`. An `<app>` without an id is the home screen.
pub fn parse_active_app(xml: &str) -> DeviceResult<Option<String>> {
    let mut reader = reader(xml);
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"active-app" => saw_root = true,
                b"app" if saw_root => {
                    let (id, _, _) = app_attributes(&e)?;
                    return Ok(id.filter(|id| !id.is_empty()));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(protocol_error("Malformed active-app", e)),
            _ => {}
        }
    }

    if saw_root {
        Ok(None)
    } else {
        Err(DeviceError::Protocol(
            "Response has no <active-app> element".to_string(),
        ))
    }
}
