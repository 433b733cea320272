//! Prometheus text exposition format.
//!
//! Renders the probe series for scraping by a Prometheus server or
//! compatible agent.

use crate::collector::MetricFamilies;

const DURATION: &str = "site_prober_request_duration_seconds";
const UP: &str = "site_prober_up";
const CONSECUTIVE_FAILURES: &str = "site_prober_consecutive_failures";

/// Render probe series into Prometheus text format.
///
/// Produces one HISTOGRAM (`target`, `code` labels) and two GAUGE
/// families (`target` label).
pub fn render_prometheus(families: &MetricFamilies) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# HELP {DURATION} Duration of probe HTTP requests in seconds.\n"
    ));
    out.push_str(&format!("# TYPE {DURATION} histogram\n"));
    for (target, code, histogram) in &families.durations {
        let labels = format!(
            "target=\"{}\",code=\"{}\"",
            escape_label(target),
            escape_label(code)
        );
        for (le, count) in histogram.cumulative() {
            out.push_str(&format!("{DURATION}_bucket{{{labels},le=\"{le}\"}} {count}\n"));
        }
        out.push_str(&format!(
            "{DURATION}_bucket{{{labels},le=\"+Inf\"}} {}\n",
            histogram.count()
        ));
        out.push_str(&format!("{DURATION}_sum{{{labels}}} {}\n", histogram.sum()));
        out.push_str(&format!("{DURATION}_count{{{labels}}} {}\n", histogram.count()));
    }

    out.push_str(&format!(
        "# HELP {UP} Whether the last probe for a target succeeded (1) or failed (0).\n"
    ));
    out.push_str(&format!("# TYPE {UP} gauge\n"));
    for (target, up) in &families.up {
        out.push_str(&format!(
            "{UP}{{target=\"{}\"}} {up}\n",
            escape_label(target)
        ));
    }

    out.push_str(&format!(
        "# HELP {CONSECUTIVE_FAILURES} Number of consecutive failures for a target.\n"
    ));
    out.push_str(&format!("# TYPE {CONSECUTIVE_FAILURES} gauge\n"));
    for (target, failures) in &families.consecutive_failures {
        out.push_str(&format!(
            "{CONSECUTIVE_FAILURES}{{target=\"{}\"}} {failures}\n",
            escape_label(target)
        ));
    }

    out
}

/// Escape a label value (`\`, `"` and newline).
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
