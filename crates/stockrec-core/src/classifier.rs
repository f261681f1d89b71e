//! Session classification of minute bars.

use tracing::trace;

use crate::chart::{TradingPeriods, TradingWindow};
use crate::domain::{DailyAnalysis, MinuteBar, TradingSession};
use crate::validation::ValidatedChart;

/// First window of each session's first window group.
///
/// Only `[0][0]` is consulted. Responses covering several days carry one
/// group per day, and later groups are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindows<'a> {
    pub pre: &'a TradingWindow,
    pub regular: &'a TradingWindow,
    pub post: &'a TradingWindow,
}

impl<'a> SessionWindows<'a> {
    /// `None` when any session lacks a first window.
    pub fn first_of(periods: &'a TradingPeriods) -> Option<Self> {
        Some(Self {
            pre: periods.pre.first()?.first()?,
            regular: periods.regular.first()?.first()?,
            post: periods.post.first()?.first()?,
        })
    }

    pub const fn window(&self, session: TradingSession) -> &'a TradingWindow {
        match session {
            TradingSession::Pre => self.pre,
            TradingSession::Regular => self.regular,
            TradingSession::Post => self.post,
        }
    }

    /// First session, in pre/regular/post order, whose window holds `ts`.
    pub fn session_of(&self, ts: i64) -> Option<TradingSession> {
        TradingSession::ALL
            .into_iter()
            .find(|session| self.window(*session).contains(ts))
    }
}

/// Append one bar per timestamp to the session it falls in.
///
/// Timestamps outside all three windows are dropped. Missing (`null`) quote
/// values become zero. Returns the number of dropped timestamps.
pub fn classify_into(chart: &ValidatedChart<'_>, analysis: &mut DailyAnalysis) -> usize {
    let quote = chart.quote;
    let (open, close, high, low, volume) = (
        quote.open(),
        quote.close(),
        quote.high(),
        quote.low(),
        quote.volume(),
    );

    let mut dropped = 0;
    for (index, &ts) in chart.timestamps.iter().enumerate() {
        let Some(session) = chart.windows.session_of(ts) else {
            trace!(ts, "timestamp outside every session window");
            dropped += 1;
            continue;
        };

        let bar = MinuteBar::new(
            analysis.code.as_str(),
            analysis.market.as_str(),
            ts,
            price_at(open, index),
            price_at(close, index),
            price_at(high, index),
            price_at(low, index),
            volume.get(index).copied().flatten().unwrap_or_default(),
        );
        analysis.push(session, bar);
    }

    dropped
}

fn price_at(values: &[Option<f64>], index: usize) -> f64 {
    values.get(index).copied().flatten().unwrap_or_default()
}
