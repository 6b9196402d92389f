//! End-of-run report: top-N table and plain-English summaries

use super::context::{ContextIndex, SymbolContext};
use super::types::{ScoreRecord, SignalId};

/// Highest totals first, ties broken by symbol
pub fn top_n(records: &[ScoreRecord], n: usize) -> Vec<&ScoreRecord> {
    let mut ranked: Vec<&ScoreRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(n);
    ranked
}

/// `SYMBOL: <what fired>[; context]. Phase: <PHASE>`
pub fn summary_line(record: &ScoreRecord, context: Option<&SymbolContext>) -> String {
    let fired: Vec<&str> = record
        .signals
        .entries()
        .iter()
        .filter(|(_, v)| *v > 0.0)
        .map(|(id, _)| id.describe())
        .collect();
    let notes = context.map(SymbolContext::notes).unwrap_or_default();

    let mut detail = if fired.is_empty() {
        "no anomalies detected".to_string()
    } else {
        fired.join(", ")
    };
    if !notes.is_empty() {
        detail.push_str("; ");
        detail.push_str(&notes.join(", "));
    }

    format!("{}: {}. Phase: {}", record.symbol, detail, record.phase)
}

/// Fixed-width table of the given rows
pub fn render_table(rows: &[&ScoreRecord]) -> String {
    let mut header = format!("{:<15} {:>6}", "SYMBOL", "TOTAL");
    for id in SignalId::all() {
        header.push_str(&format!(" {:>6}", short_label(id)));
    }
    header.push_str(&format!(" {:<13} {}", "PHASE", "SIGNALS"));
    let sep = "-".repeat(header.len());

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&header);
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for record in rows {
        out.push_str(&format!("{:<15} {:>6.2}", record.symbol, record.total));
        for (_, value) in record.signals.entries() {
            out.push_str(&format!(" {:>6.2}", value));
        }
        out.push_str(&format!(
            " {:<13} {}\n",
            record.phase.as_str(),
            record.signals_triggered
        ));
    }
    out.push_str(&sep);
    out
}

/// Table plus one summary line per row
pub fn render_report(records: &[ScoreRecord], context: &ContextIndex, n: usize) -> String {
    let top = top_n(records, n);
    if top.is_empty() {
        return "No symbols scored.".to_string();
    }

    let mut out = format!("TOP {} SCORED SYMBOLS\n", top.len());
    out.push_str(&render_table(&top));
    out.push_str("\n\nSUMMARIES\n");
    for record in &top {
        out.push_str("  ");
        out.push_str(&summary_line(record, context.get(&record.symbol)));
        out.push('\n');
    }
    out
}

fn short_label(id: SignalId) -> &'static str {
    match id {
        SignalId::AbnormalConsistency => "CONS",
        SignalId::ChronicLowDelivery => "DELIV",
        SignalId::SteadyGrind => "GRIND",
        SignalId::PriceDetachment => "DETACH",
        SignalId::VelocityFingerprint => "VEL",
        SignalId::MicroCapDetachment => "MICRO",
        SignalId::ReversalRisk => "REV",
    }
}
