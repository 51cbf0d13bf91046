//! Trading-session classification of intraday timestamps.
//!
//! Boundaries are in exchange-local time: pre-market 04:00-09:30, regular
//! 09:30-16:00, after-hours 16:00-20:00. Start inclusive, end exclusive.
//! Weekends are closed; holidays are not modelled.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::data::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSession {
    PreMarket,
    Regular,
    AfterHours,
    Closed,
}

impl MarketSession {
    pub fn of(timestamp: DateTime<Utc>, timezone: Tz) -> Self {
        let local = timestamp.with_timezone(&timezone);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return Self::Closed;
        }

        let minute_of_day = local.time().hour() * 60 + local.time().minute();
        match minute_of_day {
            m if (4 * 60..9 * 60 + 30).contains(&m) => Self::PreMarket,
            m if (9 * 60 + 30..16 * 60).contains(&m) => Self::Regular,
            m if (16 * 60..20 * 60).contains(&m) => Self::AfterHours,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreMarket => "Pre-Market",
            Self::Regular => "Market Open",
            Self::AfterHours => "After Hours",
            Self::Closed => "Market Closed",
        }
    }
}

/// Bars falling inside the regular session, order preserved.
pub fn regular_session(bars: &[PriceBar], timezone: Tz) -> Vec<PriceBar> {
    bars.iter()
        .filter(|b| MarketSession::of(b.timestamp, timezone) == MarketSession::Regular)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::US::Eastern;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        // 2024-06-14 is a Friday in EDT (UTC-4)
        Utc.with_ymd_and_hms(2024, 6, 14, h + 4, m, 0).unwrap()
    }

    #[test]
    fn test_session_boundaries() {
        assert_eq!(MarketSession::of(at(3, 59), Eastern), MarketSession::Closed);
        assert_eq!(MarketSession::of(at(4, 0), Eastern), MarketSession::PreMarket);
        assert_eq!(MarketSession::of(at(9, 29), Eastern), MarketSession::PreMarket);
        assert_eq!(MarketSession::of(at(9, 30), Eastern), MarketSession::Regular);
        assert_eq!(MarketSession::of(at(15, 59), Eastern), MarketSession::Regular);
        assert_eq!(MarketSession::of(at(16, 0), Eastern), MarketSession::AfterHours);
        assert_eq!(MarketSession::of(at(19, 59), Eastern), MarketSession::AfterHours);
    }

    #[test]
    fn test_weekend_closed() {
        let saturday = Utc.with_ymd_and_hms(2024, 6, 15, 15, 0, 0).unwrap();
        assert_eq!(MarketSession::of(saturday, Eastern), MarketSession::Closed);
    }

    #[test]
    fn test_regular_session_filter() {
        let bars: Vec<PriceBar> = [(8, 0), (9, 30), (12, 0), (16, 30)]
            .iter()
            .map(|&(h, m)| PriceBar::new(at(h, m), 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        let regular = regular_session(&bars, Eastern);
        assert_eq!(regular.len(), 2);
        assert_eq!(regular[0].timestamp, at(9, 30));
    }
}
