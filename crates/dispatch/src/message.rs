//! HTML message rendering for Telegram.
//!
//! Only metrics present on a row are shown. All user-supplied text is
//! escaped before it reaches the markup.

use bourse_tracker_core::{Field, Match};
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
enum Style {
    Ratio,
    Multiple,
    Percent,
    Amount,
}

/// Metric lines shown under each symbol, in display order.
const METRIC_LINES: &[(Field, &str, &str, Style)] = &[
    (Field::ValueRatio, "📊", "ارزش معاملات / میانگین ماهانه", Style::Multiple),
    (Field::RealMoneyRatio, "💵", "پول حقیقی / میانگین ماهانه", Style::Ratio),
    (Field::BuyPerCapita, "📈", "سرانه خرید", Style::Amount),
    (Field::SellPerCapita, "📉", "سرانه فروش", Style::Amount),
    (Field::BuyPower, "💪", "قدرت خرید", Style::Ratio),
    (Field::TickDiff, "⏱", "اختلاف آخرین و پایانی", Style::Percent),
    (Field::BuyQueueValue, "🟢", "صف خرید", Style::Amount),
    (Field::BuyQueuePerOrder, "🧮", "سرانه صف خرید", Style::Amount),
    (Field::SellQueueValue, "🔴", "صف فروش", Style::Amount),
];

/// Display title of a rule.
#[must_use]
pub fn rule_title(rule: &str) -> &str {
    match rule {
        "strong_buying" => "هشدار خرید قوی",
        "per_capita_cross" => "هشدار کراس سرانه خرید",
        "watchlist" => "هشدار عبور از آستانه",
        "ceiling_queue" => "هشدار صف خرید سقف",
        "real_money_ratio" => "هشدار ورود پول حقیقی قوی",
        "tick_time" => "هشدار تیک تایم",
        "suspicious_volume" => "هشدار حجم مشکوک",
        "swing_trade" => "هشدار سوئینگ ترید",
        "first_hour" => "هشدار ساعت اول بازار",
        "heavy_buy_queue" => "هشدار صف خرید سنگین",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct MessageRenderer {
    channel_name: String,
}

impl MessageRenderer {
    #[must_use]
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
        }
    }

    /// One message for one dispatch batch of a rule.
    #[must_use]
    pub fn render_batch(&self, rule: &str, matches: &[Match], at: &DateTime<Tz>) -> String {
        let mut out = String::new();
        let _ = write!(out, "🔔 <b>{}</b>\n\n", escape_html(rule_title(rule)));

        for m in matches {
            render_match(&mut out, m);
            out.push('\n');
        }

        self.footer(&mut out, at);
        out
    }

    /// The end-of-day summary: symbols grouped by how many rules they
    /// triggered, most frequent group first.
    #[must_use]
    pub fn render_summary(
        &self,
        frequent: &[(String, usize)],
        total_symbols: usize,
        at: &DateTime<Tz>,
    ) -> String {
        let mut out = String::from("📊 <b>خلاصه هشدارها</b>\n\n");

        if frequent.is_empty() {
            out.push_str("هیچ نماد پرتکراری نبود\n");
        } else {
            let mut groups: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
            for (symbol, count) in frequent {
                groups.entry(*count).or_default().push(symbol);
            }
            for (count, mut symbols) in groups.into_iter().rev() {
                symbols.sort_unstable();
                let tags: Vec<String> = symbols.iter().map(|s| hashtag(s)).collect();
                let _ = writeln!(out, "<b>({count}×)</b> {}", tags.join(" "));
            }
        }

        let _ = write!(
            out,
            "\n🎯 {} نماد پرتکرار از {} نماد هشداردهنده\n\n",
            frequent.len(),
            total_symbols
        );
        self.footer(&mut out, at);
        out
    }

    fn footer(&self, out: &mut String, at: &DateTime<Tz>) {
        let _ = write!(
            out,
            "📅 {} | 🕐 {}\n📢 {}",
            at.format("%Y/%m/%d"),
            at.format("%H:%M"),
            escape_html(&self.channel_name)
        );
    }
}

fn render_match(out: &mut String, m: &Match) {
    let row = &m.row;
    let _ = write!(out, "📌 <b>{}</b>", escape_html(&row.symbol));
    if let Some(industry) = row.industry.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, " - {}", escape_html(industry));
    }
    out.push('\n');

    if let Some(price) = row.last_price {
        let _ = write!(out, "💰 قیمت آخرین: {} ریال", group_thousands(price));
        if let Some(change) = row.last_change_pct {
            let dot = if change > 0.0 { "🟢" } else { "🔴" };
            let _ = write!(out, " ({dot}<b>{change:+.2}%</b>)");
        }
        out.push('\n');
    } else if let Some(change) = row.last_change_pct {
        let _ = writeln!(out, "📊 درصد تغییر آخرین: <b>{change:+.2}%</b>");
    }

    if let Some(threshold) = m.threshold {
        let _ = writeln!(out, "🎯 آستانه: {threshold:.2}%");
        if let Some(change) = row.last_change_pct {
            let _ = writeln!(out, "🔺 عبور: {:+.2}%", change - threshold);
        }
    }

    for (field, icon, label, style) in METRIC_LINES {
        if let Some(value) = row.get(*field) {
            let _ = writeln!(out, "{icon} {label}: {}", format_value(value, *style));
        }
    }
}

fn format_value(value: f64, style: Style) -> String {
    match style {
        Style::Ratio => format!("{value:.2}"),
        Style::Multiple => format!("<b>{value:.2}x</b>"),
        Style::Percent => format!("{value:+.2}%"),
        Style::Amount => group_thousands(value),
    }
}

/// Rounds to an integer and inserts thousands separators.
#[must_use]
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Escapes the characters Telegram's HTML parser treats as markup.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Symbol as a hashtag: whitespace removed, markup escaped.
fn hashtag(symbol: &str) -> String {
    let compact: String = symbol.split_whitespace().collect();
    format!("#{}", escape_html(&compact))
}
