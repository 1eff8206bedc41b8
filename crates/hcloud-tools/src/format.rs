//! Narrative (markdown) and structured (JSON) rendering of API records.
//!
//! All functions here are pure: they take borrowed records and return text.

use chrono::{DateTime, Utc};
use hcloud_api::{Action, Image, Labels, Location, Server, ServerType, SshKey};
use serde::Serialize;

const NOT_AVAILABLE: &str = "N/A";

/// Maximum characters returned from a single tool call.
pub const CHARACTER_LIMIT: usize = 25_000;

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// `key=value` pairs joined by `, `, or `None` when there are no labels.
pub fn format_labels(labels: &Labels) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Pretty-printed JSON for the structured response format.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Structured dump of a list as `{"total": n, "<key>": [...]}`.
///
/// When the document would exceed [`CHARACTER_LIMIT`], trailing entries are
/// dropped until it fits and the object gains `truncated` and
/// `truncation_message` fields. The result is always a complete document.
pub fn json_list<T: Serialize>(key: &str, items: &[T]) -> serde_json::Result<String> {
    let total = items.len();
    let mut shown = total;

    loop {
        let mut body = serde_json::Map::new();
        body.insert("total".into(), total.into());
        body.insert(key.into(), serde_json::to_value(&items[..shown])?);
        if shown < total {
            body.insert("truncated".into(), true.into());
            body.insert(
                "truncation_message".into(),
                format!(
                    "Showing {shown} of {total} {key}. \
                     Narrow the results with a label_selector or filter."
                )
                .into(),
            );
        }

        let text = to_json(&body)?;
        let len = text.chars().count();
        if len <= CHARACTER_LIMIT || shown == 0 {
            return Ok(text);
        }
        // Shrink proportionally, always by at least one entry.
        shown = (shown * CHARACTER_LIMIT / len).min(shown - 1);
    }
}

/// Cut markdown longer than [`CHARACTER_LIMIT`] characters and say so.
pub fn truncate_markdown(text: String) -> String {
    let total = text.chars().count();
    if total <= CHARACTER_LIMIT {
        return text;
    }
    let mut cut: String = text.chars().take(CHARACTER_LIMIT).collect();
    cut.push_str(&format!(
        "\n\n[Output truncated: showing {CHARACTER_LIMIT} of {total} characters. \
         Narrow the results with a label_selector or filter.]"
    ));
    cut
}

fn push_labels(lines: &mut Vec<String>, labels: &Labels) {
    if let Some(labels) = format_labels(labels) {
        lines.push(format!("- **Labels**: {labels}"));
    }
}

/// Render a list with a counted heading, or `empty` when there is nothing to show.
fn format_list<T>(title: &str, items: &[T], empty: &str, render: fn(&T) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let blocks: Vec<String> = items.iter().map(render).collect();
    truncate_markdown(format!(
        "# {title} ({})\n\n{}",
        items.len(),
        blocks.join("\n\n")
    ))
}

// ── Servers ─────────────────────────────────────────────────────────

pub fn format_server(server: &Server) -> String {
    let st = &server.server_type;
    let loc = &server.datacenter.location;

    let mut lines = vec![
        format!("## {} (ID: {})", server.name, server.id),
        format!("- **Status**: {}", server.status),
        format!("- **IPv4**: {}", server.ipv4().unwrap_or(NOT_AVAILABLE)),
        format!("- **IPv6**: {}", server.ipv6().unwrap_or(NOT_AVAILABLE)),
        format!(
            "- **Type**: {} ({} vCPU, {} GB RAM, {} GB disk)",
            st.name, st.cores, st.memory, st.disk
        ),
        format!("- **Location**: {} ({}, {})", loc.name, loc.city, loc.country),
    ];
    if let Some(image) = &server.image {
        lines.push(format!("- **Image**: {}", image_label(image)));
    }
    lines.push(format!("- **Created**: {}", format_timestamp(&server.created)));
    push_labels(&mut lines, &server.labels);

    lines.join("\n")
}

pub fn format_servers(servers: &[Server]) -> String {
    format_list("Servers", servers, "No servers found.", format_server)
}

// ── Actions ─────────────────────────────────────────────────────────

pub fn format_action(action: &Action) -> String {
    let mut lines = vec![
        format!("- **Action**: {} (ID: {})", action.command, action.id),
        format!("- **Status**: {}", action.status),
        format!("- **Progress**: {}%", action.progress),
        format!("- **Started**: {}", format_timestamp(&action.started)),
    ];
    if let Some(finished) = &action.finished {
        lines.push(format!("- **Finished**: {}", format_timestamp(finished)));
    }
    if let Some(err) = &action.error {
        lines.push(format!("- **Error**: {} ({})", err.message, err.code));
    }
    lines.join("\n")
}

// ── SSH keys ────────────────────────────────────────────────────────

pub fn format_ssh_key(key: &SshKey) -> String {
    let mut lines = vec![
        format!("## {} (ID: {})", key.name, key.id),
        format!("- **Fingerprint**: {}", key.fingerprint),
        format!("- **Public key**: `{}`", key.public_key.trim()),
        format!("- **Created**: {}", format_timestamp(&key.created)),
    ];
    push_labels(&mut lines, &key.labels);
    lines.join("\n")
}

pub fn format_ssh_keys(keys: &[SshKey]) -> String {
    format_list("SSH Keys", keys, "No SSH keys found.", format_ssh_key)
}

// ── Reference data ──────────────────────────────────────────────────

/// Prices arrive as long decimal strings; show two places when parseable.
fn format_price(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(v) => format!("€{v:.2}"),
        Err(_) => raw.to_string(),
    }
}

pub fn format_server_type(st: &ServerType) -> String {
    let heading = if st.is_deprecated() {
        format!("## {} (ID: {}) [deprecated]", st.name, st.id)
    } else {
        format!("## {} (ID: {})", st.name, st.id)
    };

    let mut lines = vec![
        heading,
        format!("- **Description**: {}", st.description),
        format!(
            "- **Compute**: {} vCPU ({}), {} GB RAM, {} GB disk",
            st.cores, st.cpu_type, st.memory, st.disk
        ),
        format!("- **Architecture**: {}", st.architecture),
    ];
    for price in &st.prices {
        lines.push(format!(
            "- **Price ({})**: {}/hour, {}/month",
            price.location,
            format_price(&price.price_hourly.gross),
            format_price(&price.price_monthly.gross)
        ));
    }
    lines.join("\n")
}

pub fn format_server_types(types: &[ServerType]) -> String {
    format_list("Server Types", types, "No server types found.", format_server_type)
}

fn image_label(image: &Image) -> &str {
    if !image.description.is_empty() {
        image.description.as_str()
    } else {
        image.name.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

pub fn format_image(image: &Image) -> String {
    [
        format!("## {} (ID: {})", image_label(image), image.id),
        format!("- **Name**: {}", image.name.as_deref().unwrap_or(NOT_AVAILABLE)),
        format!("- **Type**: {}", image.image_type),
        format!(
            "- **OS**: {} {}",
            image.os_flavor,
            image.os_version.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string(),
        format!("- **Architecture**: {}", image.architecture),
    ]
    .join("\n")
}

pub fn format_images(images: &[Image]) -> String {
    format_list("Images", images, "No images found.", format_image)
}

pub fn format_location(loc: &Location) -> String {
    [
        format!("## {} (ID: {})", loc.name, loc.id),
        format!("- **Description**: {}", loc.description),
        format!("- **City**: {}, {}", loc.city, loc.country),
        format!("- **Network zone**: {}", loc.network_zone),
        format!("- **Coordinates**: {:.4}, {:.4}", loc.latitude, loc.longitude),
    ]
    .join("\n")
}

pub fn format_locations(locations: &[Location]) -> String {
    format_list("Locations", locations, "No locations found.", format_location)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn server(labels: serde_json::Value) -> Server {
        serde_json::from_value(server_json(42, "my-app", labels)).unwrap()
    }

    #[test]
    fn server_block_has_fixed_field_order() {
        let text = format_server(&server(json!({"env": "prod"})));
        assert_eq!(
            text,
            "## my-app (ID: 42)\n\
             - **Status**: running\n\
             - **IPv4**: 203.0.113.10\n\
             - **IPv6**: N/A\n\
             - **Type**: cx22 (2 vCPU, 4 GB RAM, 40 GB disk)\n\
             - **Location**: fsn1 (Falkenstein, DE)\n\
             - **Image**: Ubuntu 24.04\n\
             - **Created**: 2024-03-01 12:30:00 UTC\n\
             - **Labels**: env=prod"
        );
    }

    #[test]
    fn labels_line_is_omitted_when_empty() {
        let text = format_server(&server(json!({})));
        assert!(!text.contains("Labels"));
        assert!(text.ends_with("- **Created**: 2024-03-01 12:30:00 UTC"));
    }

    #[test]
    fn labels_are_sorted_and_joined() {
        let labels: Labels = serde_json::from_value(json!({"tier": "web", "env": "prod"})).unwrap();
        assert_eq!(format_labels(&labels).as_deref(), Some("env=prod, tier=web"));
    }

    #[test]
    fn server_without_image_skips_image_line() {
        let mut raw = server_json(1, "bare", json!({}));
        raw["image"] = serde_json::Value::Null;
        let text = format_server(&serde_json::from_value(raw).unwrap());
        assert!(!text.contains("**Image**"));
    }

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(format_servers(&[]), "No servers found.");
        assert_eq!(format_ssh_keys(&[]), "No SSH keys found.");
    }

    #[test]
    fn list_heading_counts_entries() {
        let servers = vec![server(json!({})), server(json!({}))];
        assert!(format_servers(&servers).starts_with("# Servers (2)\n\n## my-app"));
    }

    #[test]
    fn long_markdown_is_cut_with_note() {
        let out = truncate_markdown("x".repeat(CHARACTER_LIMIT + 10));
        assert!(out.starts_with(&"x".repeat(CHARACTER_LIMIT)));
        assert!(out.ends_with("Narrow the results with a label_selector or filter.]"));
        assert_eq!(truncate_markdown("short".into()), "short");
    }

    #[test]
    fn small_json_list_is_complete() {
        let servers = vec![server(json!({})), server(json!({}))];
        let parsed: serde_json::Value =
            serde_json::from_str(&json_list("servers", &servers).unwrap()).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["servers"].as_array().unwrap().len(), 2);
        assert!(parsed.get("truncated").is_none());
    }

    #[test]
    fn oversized_json_list_drops_entries_but_stays_valid() {
        let servers: Vec<Server> = (0..200).map(|_| server(json!({"env": "prod"}))).collect();
        let text = json_list("servers", &servers).unwrap();
        assert!(text.chars().count() <= CHARACTER_LIMIT);

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let shown = parsed["servers"].as_array().unwrap().len();
        assert!(shown > 0 && shown < 200);
        assert_eq!(parsed["total"], 200);
        assert_eq!(parsed["truncated"], true);
        assert_eq!(
            parsed["truncation_message"],
            format!(
                "Showing {shown} of 200 servers. \
                 Narrow the results with a label_selector or filter."
            )
        );
    }

    #[test]
    fn price_is_rounded() {
        assert_eq!(format_price("4.5100000000000000"), "€4.51");
        assert_eq!(format_price("n/a"), "n/a");
    }

    #[test]
    fn action_block_includes_error() {
        let mut raw = action_json(9, "start_server");
        raw["status"] = json!("error");
        raw["error"] = json!({"code": "action_failed", "message": "Action failed"});
        let action: Action = serde_json::from_value(raw).unwrap();
        let text = format_action(&action);
        assert!(text.contains("- **Status**: error"));
        assert!(text.contains("- **Error**: Action failed (action_failed)"));
    }
}
