//! Documentation listing generated from registered procedures.

use crate::context::Context;
use crate::registry::ProcedureMeta;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Renders every registered procedure as a categorized HTML listing.
/// Procedures whose name does not contain `filter` (case-insensitive)
/// are skipped; an empty filter keeps everything. Categories and
/// procedure names are sorted alphabetically; a missing category
/// renders as "Other".
pub fn documentation(ctx: &Context, filter: &str) -> String {
    let filter = filter.to_lowercase();
    let mut by_category: BTreeMap<&str, Vec<&Arc<ProcedureMeta>>> = BTreeMap::new();

    let metas = ctx
        .procedures
        .values()
        .map(|procedure| &procedure.meta)
        .chain(ctx.rest_routes.iter().map(|route| &route.procedure.meta));
    for meta in metas {
        if !filter.is_empty() && !meta.name.to_lowercase().contains(&filter) {
            continue;
        }
        by_category
            .entry(meta.category.as_str())
            .or_default()
            .push(meta);
    }

    let mut out = String::new();
    for (category, mut metas) in by_category {
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        let label = if category.is_empty() { "Other" } else { category };
        out.push_str("<details open=\"true\">\n");
        let _ = writeln!(out, "<summary><b>{} ({})</b></summary>", label, metas.len());
        for meta in metas {
            out.push_str(&meta.documentation);
        }
        out.push_str("</details>\n");
    }
    out
}
