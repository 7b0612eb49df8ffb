//! One-shot status: fetch the account's locks and display them.

use std::sync::Arc;

use tabled::Tabled;

use latchkey_core::{Bridge, LockDevice, LockId, NoopRegistry};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::run::build_directory;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LockRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "House")]
    house: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

fn to_row(device: &Arc<LockDevice>, color: bool) -> LockRow {
    let mut battery = format!("{}%", device.battery_pct);
    if device.low_battery {
        battery.push_str(" (low)");
    }
    LockRow {
        id: device.id.to_string(),
        name: device.name.clone(),
        house: device.house.clone().unwrap_or_default(),
        state: output::paint_state(device.state, color),
        battery,
    }
}

fn detail(device: &Arc<LockDevice>) -> String {
    [
        format!("ID:       {}", device.id),
        format!("Name:     {}", device.name),
        format!("House:    {}", device.house.as_deref().unwrap_or("-")),
        format!("Serial:   {}", device.serial.as_deref().unwrap_or("-")),
        format!("Model:    {}", device.model.as_deref().unwrap_or("-")),
        format!("Firmware: {}", device.firmware.as_deref().unwrap_or("-")),
        format!("State:    {}", device.state),
        format!(
            "Battery:  {}%{}",
            device.battery_pct,
            if device.low_battery { " (low)" } else { "" }
        ),
        format!("Seen:     {}", device.last_seen.to_rfc3339()),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::resolve(global, None)?;
    let directory = build_directory(&cfg)?;
    let color = output::should_color(&global.color);

    let snapshot = Bridge::oneshot(cfg, directory, NoopRegistry, |bridge| async move {
        Ok(bridge.devices_snapshot())
    })
    .await?;

    match &args.lock_id {
        Some(raw) => {
            let id = LockId::new(raw);
            let found = snapshot.iter().find(|d| d.id == id);
            match found {
                Some(device) => {
                    let out = output::render_single(&global.output, device, detail, |d| {
                        d.id.to_string()
                    });
                    output::print_output(&out, global.quiet);
                }
                None => {
                    return Err(CliError::NotFound {
                        identifier: raw.clone(),
                    });
                }
            }
        }
        None => {
            let out = output::render_list(
                &global.output,
                &snapshot,
                |d| to_row(d, color),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}
