use anyhow::Context;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

const KST_OFFSET_SECS: i32 = 9 * 3600;

// KRX regular session.
const OPEN_HOUR_KST: u32 = 9;
const CLOSE_HOUR_KST: u32 = 15;
const CLOSE_MINUTE_KST: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    PreOpen,
    Regular,
    AfterClose,
    Closed,
}

impl MarketPhase {
    /// Urgency framing for the prompt's context section.
    pub fn urgency(&self) -> &'static str {
        match self {
            Self::PreOpen => "장 시작 전 빠른 의사결정이 필요하며 단타 관점입니다.",
            Self::Regular => "장중 실시간 대응이 필요하며 단타 관점입니다.",
            Self::AfterClose => "장 마감 후 다음 거래일 시초가 대응을 준비하는 단타 관점입니다.",
            Self::Closed => "휴장일이며 다음 거래일 장 시작 전 준비를 위한 단타 관점입니다.",
        }
    }
}

/// Wall-clock snapshot used to frame one briefing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketClock {
    pub date: NaiveDate,
    pub phase: MarketPhase,
}

impl MarketClock {
    pub fn now() -> anyhow::Result<Self> {
        Self::at(Utc::now())
    }

    pub fn at(now_utc: DateTime<Utc>) -> anyhow::Result<Self> {
        let kst = FixedOffset::east_opt(KST_OFFSET_SECS).context("invalid KST offset")?;
        let now_kst = now_utc.with_timezone(&kst);
        let date = now_kst.date_naive();

        let open = NaiveTime::from_hms_opt(OPEN_HOUR_KST, 0, 0).context("invalid open time")?;
        let close = NaiveTime::from_hms_opt(CLOSE_HOUR_KST, CLOSE_MINUTE_KST, 0)
            .context("invalid close time")?;
        let time = now_kst.time();

        let phase = if is_weekend(date) || configured_holidays().contains(&date) {
            MarketPhase::Closed
        } else if time < open {
            MarketPhase::PreOpen
        } else if time < close {
            MarketPhase::Regular
        } else {
            MarketPhase::AfterClose
        };

        Ok(Self { date, phase })
    }

    pub fn korean_date(&self) -> String {
        self.date.format("%Y년 %m월 %d일").to_string()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

fn configured_holidays() -> HashSet<NaiveDate> {
    // Fixed-date holidays only; lunar holidays come from KR_MARKET_HOLIDAYS="YYYY-MM-DD,...".
    let mut out = HashSet::new();
    let years = [2024, 2025, 2026, 2027, 2028, 2029, 2030];
    for y in years {
        for (m, d) in [(1, 1), (3, 1), (5, 5), (8, 15), (10, 3), (10, 9), (12, 25)] {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                out.insert(date);
            }
        }
    }

    if let Ok(s) = std::env::var("KR_MARKET_HOLIDAYS") {
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Ok(d) = NaiveDate::parse_from_str(part, "%Y-%m-%d") {
                out.insert(d);
            }
        }
    }

    out
}
