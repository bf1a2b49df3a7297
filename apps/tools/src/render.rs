use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use client_core::export_columns;
use listing::{ListController, DEFAULT_PAGE_WINDOW};
use shared::{domain::EntityKind, record::Record};
use tracing::warn;

/// Tab-separated page of the table followed by its pagination footer.
pub fn render_page(controller: &ListController<Record>, entity: EntityKind) -> String {
    let columns = export_columns(entity);
    let mut lines = vec![columns
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join("\t")];

    let mut visible = controller.visible_rows().peekable();
    if visible.peek().is_none() {
        lines.push("no rows".to_string());
    }
    lines.extend(visible.map(|row| {
        columns
            .iter()
            .map(|c| c.render(row))
            .collect::<Vec<_>>()
            .join("\t")
    }));

    let p = controller.pagination();
    let mut footer = format!(
        "Showing {} to {} of {} entries",
        p.first_item, p.last_item, p.filtered_count
    );
    if p.filtered_count != p.total_count {
        footer.push_str(&format!(" (filtered from {} total entries)", p.total_count));
    }
    lines.push(footer);

    if p.total_pages > 1 {
        let pages = controller
            .page_numbers(DEFAULT_PAGE_WINDOW)
            .into_iter()
            .map(|n| {
                if n == p.page_index {
                    format!("[{n}]")
                } else {
                    n.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("Page {} of {}: {pages}", p.page_index, p.total_pages));
    }

    lines.join("\n")
}

pub fn parse_record(raw: &str) -> Result<Record> {
    let value: serde_json::Value = serde_json::from_str(raw).context("record is not valid JSON")?;
    if !value.is_object() {
        bail!("record must be a JSON object");
    }
    serde_json::from_value(value).context("record fields must be null, boolean, number or string")
}

/// Reads a json-server style database file: one array of records per resource.
pub fn parse_seed_file(raw: &str) -> Result<Vec<(EntityKind, Vec<Record>)>> {
    let collections: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(raw).context("seed file must be a JSON object of collections")?;

    let mut parsed = Vec::new();
    for (resource, records) in collections {
        let Some(entity) = EntityKind::from_resource(&resource) else {
            warn!(%resource, "skipping unknown collection in seed file");
            continue;
        };
        let records: Vec<Record> = serde_json::from_value(records)
            .with_context(|| format!("collection '{resource}' must be an array of records"))?;
        parsed.push((entity, records));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use listing::ListConfig;

    use super::*;

    fn batches(count: usize) -> Vec<Record> {
        (1..=count)
            .map(|n| {
                Record::new()
                    .with("id", n as i64)
                    .with("batchName", format!("Batch {n:02}"))
                    .with("batchCode", format!("B-{n:02}"))
            })
            .collect()
    }

    #[test]
    fn renders_header_rows_and_footer() {
        let controller = ListController::new(
            batches(2),
            ListConfig::new(EntityKind::Batch.searchable_fields().iter().copied()),
        );
        let page = render_page(&controller, EntityKind::Batch);
        let lines: Vec<&str> = page.lines().collect();

        assert_eq!(lines[0], "Batch Name\tBatch Code\tRemarks\tCreated At");
        assert_eq!(lines[1], "Batch 01\tB-01\tN/A\t");
        assert_eq!(lines.last().copied(), Some("Showing 1 to 2 of 2 entries"));
    }

    #[test]
    fn marks_current_page_and_filter_counts() {
        let size = NonZeroUsize::new(2).expect("page size");
        let mut controller = ListController::new(
            batches(9),
            ListConfig::new(EntityKind::Batch.searchable_fields().iter().copied())
                .with_page_size(size),
        );
        controller.set_search_text("batch 0");
        controller.go_to_page(3);

        let page = render_page(&controller, EntityKind::Batch);
        assert!(page.contains("Showing 5 to 6 of 9 entries"));
        assert!(page.ends_with("Page 3 of 5: 1 2 [3] 4 5"));

        controller.set_search_text("zzz");
        let page = render_page(&controller, EntityKind::Batch);
        assert!(page.contains("\nno rows\n"));
        assert!(page.ends_with("Showing 0 to 0 of 0 entries (filtered from 9 total entries)"));
    }

    #[test]
    fn record_argument_must_be_an_object() {
        let record = parse_record(r#"{"batchName":"Morning","size":12}"#).expect("record");
        assert_eq!(record.text("size"), "12");
        assert!(parse_record("[1,2]").is_err());
        assert!(parse_record("{oops").is_err());
    }

    #[test]
    fn seed_file_skips_unknown_collections() {
        let parsed = parse_seed_file(
            r#"{
                "users": [{"id": 1, "username": "admin"}],
                "login": [{"token": "x"}],
                "batches": []
            }"#,
        )
        .expect("seed");

        let kinds: Vec<EntityKind> = parsed.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![EntityKind::Batch, EntityKind::User]);
        assert_eq!(parsed[1].1[0].text("username"), "admin");
    }
}
