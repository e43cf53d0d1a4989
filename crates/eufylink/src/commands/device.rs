//! Station / device commands: property requests and RTSP toggling.
//!
//! Both are fire-and-forget on the wire; the server's reply is not
//! correlated. The serial is checked against the live snapshot first.

use eufylink_core::{Coordinator, CoordinatorConfig, CoreError, DeviceType, MergedState};
use serde_json::Value;

use crate::cli::{GlobalOpts, PropertiesArgs, RtspArgs};
use crate::error::CliError;

pub async fn properties(
    config: CoordinatorConfig,
    args: PropertiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let PropertiesArgs {
        serial,
        station,
        metadata,
    } = args;

    let sent = serial.clone();
    let device_type = Coordinator::oneshot(config, |coordinator| async move {
        let Some(device_type) = resolve_device_type(&coordinator.snapshot(), &serial, station)
        else {
            return Ok(None);
        };
        if metadata {
            coordinator
                .get_properties_metadata(device_type, &serial)
                .await?;
        } else {
            coordinator.get_properties(device_type, &serial).await?;
        }
        Ok::<_, CoreError>(Some(device_type))
    })
    .await?
    .ok_or_else(|| CliError::NotFound {
        resource_type: "station or device".into(),
        identifier: sent.clone(),
    })?;

    if !global.quiet {
        let what = if metadata { "property metadata" } else { "properties" };
        eprintln!("Requested {what} for {device_type} {sent}");
    }
    Ok(())
}

pub async fn rtsp(
    config: CoordinatorConfig,
    args: RtspArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let RtspArgs { serial, off } = args;
    let enabled = !off;

    let sent = serial.clone();
    let found = Coordinator::oneshot(config, |coordinator| async move {
        if coordinator.snapshot().data.entity("devices", &serial).is_none() {
            return Ok(false);
        }
        coordinator.set_rtsp(&serial, enabled).await?;
        Ok::<_, CoreError>(true)
    })
    .await?;

    if !found {
        return Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: sent,
        });
    }
    if !global.quiet {
        let state = if enabled { "on" } else { "off" };
        eprintln!("Turned RTSP stream {state} for {sent}");
    }
    Ok(())
}

/// Pick the command target for `serial` from the snapshot.
///
/// `force_station` wins; otherwise stations are found by collection and
/// devices by their `type` code. `None` when the serial is unknown.
fn resolve_device_type(state: &MergedState, serial: &str, force_station: bool) -> Option<DeviceType> {
    if force_station || state.data.entity("stations", serial).is_some() {
        return Some(DeviceType::Station);
    }
    let device = state.data.entity("devices", serial)?;
    let code = device
        .get("type")
        .and_then(Value::as_u64)
        .and_then(|code| u32::try_from(code).ok())
        .map_or(DeviceType::Unknown(u32::MAX), DeviceType::from);
    Some(code)
}
