use crate::rollover::clock::CalendarMoment;
use serde::Serialize;
use serde_json::Value;

pub const DONE_SENTINEL: i64 = 0;
pub const PENDING_SENTINEL: i64 = 1;

/// Decoded idempotency flag. Only an integer `0` means the day has already
/// been rolled over; every other value, including an absent one, is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagState {
    Pending,
    Done,
}

impl FlagState {
    pub fn decode(raw: Option<&Value>) -> Self {
        let Some(value) = raw else {
            return Self::Pending;
        };
        let is_zero = value.as_i64() == Some(DONE_SENTINEL)
            || value.as_f64().is_some_and(|v| v == 0.0);
        if is_zero { Self::Done } else { Self::Pending }
    }

    pub fn encode(self) -> Value {
        match self {
            Self::Pending => Value::from(PENDING_SENTINEL),
            Self::Done => Value::from(DONE_SENTINEL),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }
}

/// Half-open `[start, end)` range of minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EligibilityWindow {
    pub start: u32,
    pub end: u32,
}

impl EligibilityWindow {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.start && minute_of_day < self.end
    }

    pub fn describe(&self) -> String {
        format!("{}-{}", format_minute(self.start), format_minute(self.end))
    }
}

pub fn format_minute(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum GateDecision {
    Proceed,
    AlreadyDone,
    OutsideWindow { minute_of_day: u32 },
}

impl GateDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::AlreadyDone => "already-done",
            Self::OutsideWindow { .. } => "outside-window",
        }
    }
}

pub fn evaluate(
    flag: FlagState,
    now: &CalendarMoment,
    window: EligibilityWindow,
) -> GateDecision {
    if flag == FlagState::Done {
        return GateDecision::AlreadyDone;
    }
    let minute_of_day = now.minute_of_day();
    if !window.contains(minute_of_day) {
        return GateDecision::OutsideWindow { minute_of_day };
    }
    GateDecision::Proceed
}
