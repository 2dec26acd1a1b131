//! Plain-text message rendering for Telegram.
//!
//! Messages are sent without a parse mode, so nothing here needs escaping.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use crate::domain::signal::{OrderType, Signal, SignalClose, SignalUpdate};
use crate::domain::subscriber::{Subscriber, SubscriberStats};
use crate::domain::trade::{BroadcastSummary, TradeResult, TradeStatus};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";

fn price_or_dash(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |p| p.normalize().to_string())
}

fn status_icon(status: TradeStatus) -> &'static str {
    match status {
        TradeStatus::Success => "✅",
        TradeStatus::InsufficientBalance => "💰",
        TradeStatus::SymbolNotFound => "❓",
        TradeStatus::ApiError => "❌",
        TradeStatus::Skipped => "⏭",
    }
}

/// Summary shown to the admin before a new signal is broadcast.
#[must_use]
pub fn format_signal_summary(signal: &Signal) -> String {
    let entry = match signal.order_type {
        OrderType::Market => signal
            .entry_price
            .map_or_else(|| "MARKET".to_string(), |p| format!("MARKET (~{})", p.normalize())),
        OrderType::Limit => price_or_dash(signal.entry_price),
    };

    format!(
        "📡 New signal {id}\n{RULE}\n{side} {symbol}\nType: {order_type}\nEntry: {entry}\n\
         Stop loss: {sl}\nTake profit: {tp}\nLeverage: {lev}x\n{RULE}\nBroadcasting to subscribers...",
        id = signal.id,
        side = signal.side,
        symbol = signal.symbol,
        order_type = signal.order_type,
        sl = price_or_dash(signal.stop_loss),
        tp = price_or_dash(signal.take_profit),
        lev = signal.leverage,
    )
}

/// Admin summary after a broadcast of any kind.
#[must_use]
pub fn format_broadcast_summary(title: &str, signal_id: &str, results: &[TradeResult]) -> String {
    let summary = BroadcastSummary::from_results(results);
    let mut text = format!("📊 {title} {signal_id}\n{RULE}\n");

    if summary.total == 0 {
        text.push_str("No subscribers were affected.");
        return text;
    }

    let _ = writeln!(text, "✅ Success: {}/{}", summary.success, summary.total);
    if summary.insufficient_balance > 0 {
        let _ = writeln!(text, "💰 Insufficient balance: {}", summary.insufficient_balance);
    }
    if summary.failed > 0 {
        let _ = writeln!(text, "❌ Failed: {}", summary.failed);
    }
    if summary.skipped > 0 {
        let _ = writeln!(text, "⏭ Skipped: {}", summary.skipped);
    }

    let failures: Vec<&TradeResult> = results
        .iter()
        .filter(|r| !r.is_success() && r.status != TradeStatus::Skipped)
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(text, "{RULE}");
        for result in failures.iter().take(10) {
            let who = result
                .username
                .as_deref()
                .map_or_else(|| result.subscriber_id.to_string(), |u| format!("@{u}"));
            let _ = writeln!(text, "{} {who}: {}", status_icon(result.status), result.message);
        }
        if failures.len() > 10 {
            let _ = writeln!(text, "... and {} more", failures.len() - 10);
        }
    }

    text.trim_end().to_string()
}

/// Direct message telling a subscriber what happened on their account.
#[must_use]
pub fn format_user_trade_notification(signal: &Signal, result: &TradeResult) -> String {
    let mut text = format!(
        "{} Signal {}\n{RULE}\n{} {} ({})\n",
        status_icon(result.status),
        signal.id,
        signal.side,
        signal.symbol,
        signal.order_type,
    );

    match result.status {
        TradeStatus::Success => {
            if let (Some(quantity), Some(value)) = (&result.quantity, result.actual_value) {
                let _ = writeln!(text, "Quantity: {quantity} (~{value:.2} USDT)");
            }
            if let Some(order_id) = &result.order_id {
                let _ = writeln!(text, "Order: {order_id}");
            }
            if signal.has_risk_orders() {
                let _ = writeln!(
                    text,
                    "SL: {} | TP: {}",
                    price_or_dash(signal.stop_loss),
                    price_or_dash(signal.take_profit)
                );
            }
            let _ = write!(text, "{}", result.message);
        }
        _ => {
            let _ = write!(text, "Not executed: {}", result.message);
        }
    }

    text
}

/// Direct message for an update or close that touched a subscriber's position.
#[must_use]
pub fn format_followup_notification(title: &str, signal_id: &str, result: &TradeResult) -> String {
    format!(
        "{} {title} {signal_id}\n{RULE}\n{}",
        status_icon(result.status),
        result.message
    )
}

/// Admin summary line for an update instruction.
#[must_use]
pub fn format_update_header(update: &SignalUpdate) -> String {
    format!(
        "🔄 Updating {}: SL {} | TP {}",
        update.id,
        price_or_dash(update.stop_loss),
        price_or_dash(update.take_profit)
    )
}

/// Admin summary line for a close instruction.
#[must_use]
pub fn format_close_header(close: &SignalClose) -> String {
    match close.partial_percent {
        Some(percent) if !close.is_full() => {
            format!("✂️ Closing {}% of {}", percent.normalize(), close.id)
        }
        _ => format!("🛑 Closing {}", close.id),
    }
}

/// Registration details for `/status`.
#[must_use]
pub fn format_subscriber_status(subscriber: &Subscriber) -> String {
    format!(
        "👤 Your subscription\n{RULE}\nStatus: {status}\nTrade amount: {amount} USDT\n\
         Max leverage: {lev}x\nTrades executed: {trades}\nTotal PnL: {pnl} USDT\n\
         Registered: {since}\n{RULE}\n/setamount <usdt> to change the amount\n\
         /setleverage <n> to change the leverage cap",
        status = if subscriber.is_active { "Active" } else { "Inactive" },
        amount = subscriber.trade_amount_usdt.normalize(),
        lev = subscriber.max_leverage,
        trades = subscriber.total_trades,
        pnl = subscriber.total_pnl.round_dp(2),
        since = subscriber.created_at.format("%Y-%m-%d"),
    )
}

/// Output of `/adminstats`.
#[must_use]
pub fn format_admin_stats(stats: &SubscriberStats) -> String {
    format!(
        "📈 Bot statistics\n{RULE}\nSubscribers: {} ({} active)\nSuccessful trades: {}\nActive signals: {}",
        stats.total_subscribers, stats.active_subscribers, stats.total_trades, stats.active_signals
    )
}

/// Help text for subscribers; the admin also sees the signal syntax.
#[must_use]
pub fn format_help(is_admin: bool) -> String {
    let mut text = String::from(
        "🤖 Signal bot commands\n\
         /register - connect your Mudrex account\n\
         /status - show your subscription\n\
         /setamount <usdt> - trade amount per signal\n\
         /setleverage <n> - maximum leverage (1-125)\n\
         /unregister - stop receiving trades\n\
         /cancel - abort registration\n\
         /help - this message",
    );

    if is_admin {
        text.push_str(
            "\n\nAdmin\n\
             /signal LONG BTCUSDT entry=65000 sl=63000 tp=70000 lev=10\n\
             /long ETHUSDT market sl=3000 5x\n\
             /update <id> sl=<price> tp=<price>\n\
             /close <id> [percent%]\n\
             /adminstats - bot statistics",
        );
    }

    text
}
