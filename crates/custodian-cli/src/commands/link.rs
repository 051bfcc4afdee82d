use anyhow::{Context, Result};
use custodian_core::{AppConfig, CommandRequest};
use custodian_link::{ConsoleLink, HttpLink};
use custodian_ui::dispatch::LINK_FAILED_LINES;
use custodian_ui::{MapSink, SectorMap};
use serde_json::json;

use crate::output::{print_json, print_lines};

pub(crate) fn run_send(cfg: &AppConfig, directive: &str, json_mode: bool) -> Result<()> {
    let raw = directive.trim();
    if raw.is_empty() {
        anyhow::bail!("directive is empty");
    }
    let link = HttpLink::new(cfg.link.clone())?;
    let request = CommandRequest::new(raw);
    let response = match link.send_command(&request) {
        Ok(response) => response,
        Err(err) => {
            if !json_mode {
                print_lines(&LINK_FAILED_LINES.map(String::from));
            }
            return Err(err).with_context(|| format!("sending to {}", cfg.link.command_url()));
        }
    };

    if json_mode {
        print_json(&json!({
            "command_id": request.command_id,
            "raw": request.raw,
            "ok": response.ok,
            "lines": response.lines,
        }))?;
    } else {
        println!("> {}", raw.to_uppercase());
        print_lines(&response.lines);
    }
    Ok(())
}

pub(crate) fn run_snapshot(cfg: &AppConfig, json_mode: bool) -> Result<()> {
    let link = HttpLink::new(cfg.link.clone())?;
    let snapshot = link
        .fetch_snapshot()
        .with_context(|| format!("fetching {}", cfg.link.snapshot_url()))?;
    if json_mode {
        return print_json(&snapshot);
    }

    let mut map = SectorMap::default();
    map.present(&snapshot);
    print_lines(&map.panel_lines());
    println!();
    for row in map.rows() {
        println!("{:<3} {:<12} {}", row.id, row.name, row.shown);
    }
    if map.is_failed() {
        println!();
        println!("STATION FAILED");
    }
    Ok(())
}
