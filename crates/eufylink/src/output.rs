//! Output formatting: table, JSON, YAML.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde.

use std::io::{self, Write};

use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use eufylink_core::{DeviceType, MergedState};

use crate::cli::OutputFormat;

// ── Table row ────────────────────────────────────────────────────────

#[derive(Debug, Tabled)]
struct EntityRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Cached")]
    cached: String,
}

/// One row per live entity, then one per cache-only serial.
fn state_rows(state: &MergedState) -> Vec<EntityRow> {
    let mut rows: Vec<EntityRow> = state
        .data
        .entities()
        .map(|(collection, entity)| {
            let serial = text(entity.get("serialNumber"));
            EntityRow {
                kind: collection.trim_end_matches('s').to_owned(),
                cached: cached_summary(state, &serial),
                name: text(entity.get("name")),
                dtype: entity
                    .get("type")
                    .and_then(Value::as_u64)
                    .and_then(|code| u32::try_from(code).ok())
                    .map(|code| DeviceType::from(code).to_string())
                    .unwrap_or_default(),
                serial,
            }
        })
        .collect();

    for (serial, _) in state.cache.iter() {
        if rows.iter().any(|row| &row.serial == serial) {
            continue;
        }
        rows.push(EntityRow {
            kind: "-".into(),
            serial: serial.clone(),
            name: String::new(),
            dtype: String::new(),
            cached: cached_summary(state, serial),
        });
    }
    rows
}

fn cached_summary(state: &MergedState, serial: &str) -> String {
    state
        .cache
        .device(serial)
        .map(|props| {
            props
                .iter()
                .map(|(name, value)| format!("{name}={}", text(Some(value))))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a merged state in the chosen format.
pub fn render_state(format: OutputFormat, state: &MergedState) -> String {
    match format {
        OutputFormat::Table => {
            let rows = state_rows(state);
            if rows.is_empty() {
                return "(no stations or devices)".into();
            }
            render_table(&rows)
        }
        OutputFormat::Json => render_json_pretty(state),
        OutputFormat::JsonCompact => render_json_compact(state),
        OutputFormat::Yaml => render_yaml(state),
    }
}

/// Render any serializable value; table falls back to `table_fn`.
pub fn render_single<T>(format: OutputFormat, data: &T, table_fn: impl Fn(&T) -> String) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => table_fn(data),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use eufylink_core::StateStore;
    use serde_json::json;

    use super::*;

    fn state() -> MergedState {
        let mut store = StateStore::new();
        let Value::Object(collections) = json!({
            "driver": { "connected": true },
            "stations": [{ "serialNumber": "S1", "name": "Base", "type": 0 }],
            "devices": [{ "serialNumber": "D1", "name": "Porch", "type": 31 }]
        }) else {
            unreachable!()
        };
        store.replace_live_snapshot(collections);
        store.update_cached_property("D1", "motionDetected", json!(true));
        store.update_cached_property("D9", "ringing", json!(false));
        store.merged()
    }

    #[test]
    fn rows_cover_live_and_cache_only_serials() {
        let rows = state_rows(&state());
        let serials: Vec<&str> = rows.iter().map(|r| r.serial.as_str()).collect();
        assert_eq!(serials.len(), 3);
        assert!(serials.contains(&"S1") && serials.contains(&"D1") && serials.contains(&"D9"));

        let d1 = rows.iter().find(|r| r.serial == "D1").unwrap();
        assert_eq!(d1.kind, "device");
        assert_eq!(d1.dtype, "indoor_pt_camera");
        assert_eq!(d1.cached, "motionDetected=true");

        let d9 = rows.iter().find(|r| r.serial == "D9").unwrap();
        assert_eq!(d9.kind, "-");
    }

    #[test]
    fn table_mentions_names() {
        let table = render_state(OutputFormat::Table, &state());
        assert!(table.contains("Porch"));
        assert!(table.contains("station"));
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render_state(OutputFormat::JsonCompact, &state());
        assert!(!out.contains('\n'));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["cache"]["D1"]["motionDetected"], json!(true));
        assert_eq!(parsed["data"]["driver"]["connected"], json!(true));
    }

    #[test]
    fn empty_state_table_has_placeholder() {
        assert_eq!(
            render_state(OutputFormat::Table, &MergedState::default()),
            "(no stations or devices)"
        );
    }
}
