//! Stats Aggregator
//!
//! Rollups over an order-store snapshot, recomputed per request with no
//! cache. Windows are local calendar periods: today, the week starting
//! Monday, the month starting on the 1st. Cancelled orders count toward
//! nothing.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus};
use shared::money;

/// Only this many drinks make the leaderboard
const TOP_SELLERS_LIMIT: usize = 10;

/// Revenue and order count over one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub revenue: f64,
    pub orders: u32,
}

/// One drink summed across all counted orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSeller {
    pub name: String,
    pub quantity: u32,
}

/// One non-empty hour of the current day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub revenue: f64,
    pub orders: u32,
}

/// Full analytics response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub today: PeriodStats,
    pub week: PeriodStats,
    pub month: PeriodStats,
    pub top_sellers: Vec<TopSeller>,
    /// Current-day histogram, empty hours omitted
    pub hourly: Vec<HourlyBucket>,
    /// Mean rating over orders carrying feedback; absent when none do
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<f64>,
    /// Mean `estimatedTime` over orders carrying one; absent when none do
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_wait_minutes: Option<f64>,
}

impl AnalyticsReport {
    /// Aggregate a snapshot. `now` anchors the day/week/month windows so
    /// tests can pin the clock.
    pub fn compute(orders: &[Order], now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        let day_end = day_start_millis(today + Duration::days(1));
        let today_start = day_start_millis(today);
        let week_start =
            day_start_millis(today - Duration::days(today.weekday().num_days_from_monday() as i64));
        let month_start = day_start_millis(today.with_day(1).unwrap_or(today));

        let mut today_stats = WindowAccumulator::new(today_start, day_end);
        let mut week_stats = WindowAccumulator::new(week_start, day_end);
        let mut month_stats = WindowAccumulator::new(month_start, day_end);

        let mut sellers: HashMap<&str, u32> = HashMap::new();
        let mut hourly: BTreeMap<u32, (Decimal, u32)> = BTreeMap::new();

        let mut rating_sum = 0u32;
        let mut rating_count = 0u32;
        let mut wait_sum = 0u64;
        let mut wait_count = 0u32;

        for order in orders {
            if order.status == OrderStatus::Cancelled {
                continue;
            }

            if let Some(feedback) = &order.feedback {
                rating_sum += u32::from(feedback.rating);
                rating_count += 1;
            }
            if let Some(estimated) = order.estimated_time {
                wait_sum += u64::from(estimated);
                wait_count += 1;
            }

            today_stats.observe(order);
            week_stats.observe(order);
            month_stats.observe(order);

            for item in &order.items {
                *sellers.entry(item.name.as_str()).or_default() += item.quantity;
            }

            if order.timestamp >= today_start
                && order.timestamp < day_end
                && let Some(hour) = local_hour(order.timestamp)
            {
                let bucket = hourly.entry(hour).or_insert((Decimal::ZERO, 0));
                bucket.0 += money::to_decimal(order.total);
                bucket.1 += 1;
            }
        }

        let mut top_sellers: Vec<TopSeller> = sellers
            .into_iter()
            .map(|(name, quantity)| TopSeller {
                name: name.to_string(),
                quantity,
            })
            .collect();
        top_sellers.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
        top_sellers.truncate(TOP_SELLERS_LIMIT);

        let hourly = hourly
            .into_iter()
            .map(|(hour, (revenue, orders))| HourlyBucket {
                hour,
                revenue: money::to_f64(money::round_money(revenue)),
                orders,
            })
            .collect();

        let satisfaction =
            (rating_count > 0).then(|| f64::from(rating_sum) / f64::from(rating_count));
        let average_wait_minutes =
            (wait_count > 0).then(|| wait_sum as f64 / f64::from(wait_count));

        Self {
            today: today_stats.finish(),
            week: week_stats.finish(),
            month: month_stats.finish(),
            top_sellers,
            hourly,
            satisfaction,
            average_wait_minutes,
        }
    }
}

/// Running revenue/count for one `[start, end)` window
struct WindowAccumulator {
    start: i64,
    end: i64,
    revenue: Decimal,
    orders: u32,
}

impl WindowAccumulator {
    fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            revenue: Decimal::ZERO,
            orders: 0,
        }
    }

    fn observe(&mut self, order: &Order) {
        if order.timestamp >= self.start && order.timestamp < self.end {
            self.revenue += money::to_decimal(order.total);
            self.orders += 1;
        }
    }

    fn finish(self) -> PeriodStats {
        PeriodStats {
            revenue: money::to_f64(money::round_money(self.revenue)),
            orders: self.orders,
        }
    }
}

/// Local midnight of `date` as Unix millis.
///
/// DST gap fallback: if local midnight does not exist, fall back to UTC.
fn day_start_millis(date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(Local)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Local hour-of-day for a timestamp; `None` if out of chrono's range
fn local_hour(millis: i64) -> Option<u32> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&Local).hour())
}
