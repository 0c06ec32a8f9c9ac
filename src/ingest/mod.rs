// src/ingest/mod.rs
pub mod fetch;
pub mod media;
pub mod poller;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Fallback text when an entry carries no usable summary.
pub const SUMMARY_PLACEHOLDER: &str = "No description available.";
/// Hard cap on summary length, in characters.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_polls_total", "Feed polls attempted, per feed kind.");
        describe_counter!(
            "feed_poll_errors_total",
            "Feed fetch/parse errors; the cycle yields no items."
        );
        describe_counter!(
            "feed_new_items_total",
            "Items reported as new after the watermark scan."
        );
        describe_counter!(
            "watermark_write_errors_total",
            "Watermark writes that failed; the in-memory value was kept."
        );
        describe_counter!("delivery_attempts_total", "Per-destination send attempts.");
        describe_counter!("delivery_failures_total", "Per-destination send failures.");
        describe_histogram!("feed_fetch_ms", "Feed fetch + parse time in milliseconds.");
        describe_gauge!(
            "scheduler_last_cycle_ts",
            "Unix ts when the last broadcast cycle finished."
        );
        describe_gauge!("scheduler_poll_interval_secs", "Configured poll period.");
    });
}

/// Strip tags, decode entities, collapse whitespace.
pub fn clean_html(raw: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    let stripped = re_tags.replace_all(raw, " ");

    // Entities are decoded after stripping so escaped markup stays literal text.
    let decoded = html_escape::decode_html_entities(&stripped);

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Plain-text excerpt capped at [`SUMMARY_MAX_CHARS`] (ellipsis included).
pub fn summarize(raw: Option<&str>) -> String {
    let cleaned = raw.map(clean_html).unwrap_or_default();
    if cleaned.is_empty() {
        return SUMMARY_PLACEHOLDER.to_string();
    }
    if cleaned.chars().count() > SUMMARY_MAX_CHARS {
        let mut cut: String = cleaned.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        cut.push_str("...");
        return cut;
    }
    cleaned
}

/// Stable stand-in key for entries that carry no id, guid or link.
///
/// Derived from content, so the same malformed entry maps to the same key on
/// every poll while two different malformed entries do not collide.
pub fn synthetic_identifier(fingerprint: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::from("synthetic:");
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Replace HTML-only entities that would make a strict XML parser bail.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&laquo;", "\"")
        .replace("&raquo;", "\"")
        .replace("&copy;", "(c)")
}
