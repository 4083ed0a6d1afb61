//! Header resolution for loosely named tabular sources.

use std::collections::HashMap;

pub const QUANTITY_CANDIDATES: &[&str] = &["Cantidad", "cantidad", "unidades", "quantity"];
pub const SPEND_CANDIDATES: &[&str] = &["gasto_total", "total_gasto", "gasto", "total_spend"];
pub const VISITORS_CANDIDATES: &[&str] =
    &["cantidad_visitantes", "visitas", "visitantes", "visitors"];
pub const SITE_CANDIDATES: &[&str] = &["sede", "site"];
pub const TIP_CANDIDATES: &[&str] = &["propina", "tip"];

/// Return the header matching the first candidate, compared case-insensitively.
///
/// The header is returned with its original spelling. When two headers differ
/// only in case, the last one wins.
pub fn resolve_column<S, C>(headers: &[S], candidates: &[C]) -> Option<String>
where
    S: AsRef<str>,
    C: AsRef<str>,
{
    let by_lower: HashMap<String, &str> = headers
        .iter()
        .map(|h| (h.as_ref().to_lowercase(), h.as_ref()))
        .collect();
    candidates
        .iter()
        .find_map(|c| by_lower.get(&c.as_ref().to_lowercase()))
        .map(|h| (*h).to_string())
}
