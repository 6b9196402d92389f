//! Per-symbol corporate-event and bulk-deal context
//!
//! Built once per batch in a single pass over the loaded events and deals.
//! Context never changes a signal value or the total; it annotates the audit
//! summary.

use super::types::{BulkDealRecord, EventRecord};
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

/// Results/dividend announcements keep a symbol out of scoring
pub const RESULTS_KEYWORDS: &[&str] = &["results", "dividend"];
pub const BONUS_SPLIT_KEYWORDS: &[&str] = &["bonus", "split"];
pub const PARTNERSHIP_KEYWORDS: &[&str] = &[
    "partnership",
    "memorandum of understanding",
    "acquisition",
    "merger",
    "amalgamation",
];
pub const PREFERENTIAL_KEYWORDS: &[&str] = &["preferential", "allotment"];

/// Calendar lookbacks for context
pub const EVENT_LOOKBACK_DAYS: i64 = 30;
pub const ALLOTMENT_LOOKBACK_DAYS: i64 = 548;
pub const DEAL_WEEK_DAYS: i64 = 7;
pub const DEAL_LOOKBACK_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolContext {
    pub bonus_or_split_30d: bool,
    pub partnership_30d: bool,
    pub preferential_allotment_548d: bool,
    pub bulk_deals_7d: usize,
    pub new_bulk_counterparty_today: bool,
}

impl SymbolContext {
    /// Short human-readable notes for summaries
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.bonus_or_split_30d {
            notes.push("bonus/split announced".to_string());
        }
        if self.partnership_30d {
            notes.push("MoU/partnership news".to_string());
        }
        if self.preferential_allotment_548d {
            notes.push("preferential allotment on record".to_string());
        }
        if self.bulk_deals_7d > 1 {
            notes.push(format!("{} bulk deals this week", self.bulk_deals_7d));
        }
        if self.new_bulk_counterparty_today {
            notes.push("new bulk-deal counterparty".to_string());
        }
        notes
    }
}

#[derive(Default)]
struct DealAccumulator {
    today: Vec<String>,
    prior: HashSet<String>,
    week: usize,
}

/// Symbol-indexed context for one target date
#[derive(Debug, Clone, Default)]
pub struct ContextIndex {
    by_symbol: HashMap<String, SymbolContext>,
}

impl ContextIndex {
    /// Build context for `target_date`
    ///
    /// Records dated after `target_date` are ignored, so a store that
    /// returns a wider range cannot leak future information.
    pub fn build(target_date: NaiveDate, events: &[EventRecord], deals: &[BulkDealRecord]) -> Self {
        let event_from = target_date - Duration::days(EVENT_LOOKBACK_DAYS);
        let allotment_from = target_date - Duration::days(ALLOTMENT_LOOKBACK_DAYS);
        let week_from = target_date - Duration::days(DEAL_WEEK_DAYS);
        let deal_from = target_date - Duration::days(DEAL_LOOKBACK_DAYS);

        let mut by_symbol: HashMap<String, SymbolContext> = HashMap::new();

        for event in events {
            if event.date > target_date || event.date < allotment_from {
                continue;
            }
            let ctx = by_symbol.entry(event.symbol.clone()).or_default();
            if event.mentions_any(PREFERENTIAL_KEYWORDS) {
                ctx.preferential_allotment_548d = true;
            }
            if event.date >= event_from {
                if event.mentions_any(BONUS_SPLIT_KEYWORDS) {
                    ctx.bonus_or_split_30d = true;
                }
                if event.mentions_any(PARTNERSHIP_KEYWORDS) || event.mentions_word("mou") {
                    ctx.partnership_30d = true;
                }
            }
        }

        let mut deal_acc: HashMap<&str, DealAccumulator> = HashMap::new();
        for deal in deals {
            if deal.date > target_date || deal.date < deal_from {
                continue;
            }
            let acc = deal_acc.entry(deal.symbol.as_str()).or_default();
            if deal.date == target_date {
                acc.today.push(deal.client_name.clone());
            } else {
                acc.prior.insert(deal.client_name.clone());
            }
            if deal.date >= week_from {
                acc.week += 1;
            }
        }

        for (symbol, acc) in deal_acc {
            let ctx = by_symbol.entry(symbol.to_string()).or_default();
            ctx.bulk_deals_7d = acc.week;
            ctx.new_bulk_counterparty_today =
                acc.today.iter().any(|client| !acc.prior.contains(client));
        }

        Self { by_symbol }
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolContext> {
        self.by_symbol.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
