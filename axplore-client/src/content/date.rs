use chrono::NaiveDate;

/// The display format existing records use, e.g. "Jun 03, 2025"
pub const DATE_FORMAT: &str = "%b %d, %Y";

/// The literal separator multi-day events are stored with
pub const RANGE_SEPARATOR: &str = " to ";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// The day or day range an event covers.
///
/// Existing records store this as a single string field, either
/// "<start>" or "<start> to <end>". Both shapes must keep round-tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EventSpan {
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// None when end is before start
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.split_once(RANGE_SEPARATOR) {
            Some((start, end)) => Self::new(parse_date(start)?, parse_date(end)?),
            None => parse_date(value).map(Self::single),
        }
    }

    /// The stored shape: the bare date for a single day, otherwise the
    /// separated pair
    pub fn encode(&self) -> String {
        if self.is_single_day() {
            self.start_display()
        } else {
            format!(
                "{}{}{}",
                self.start_display(),
                RANGE_SEPARATOR,
                self.end_display()
            )
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn start_display(&self) -> String {
        format_date(self.start)
    }

    pub fn end_display(&self) -> String {
        format_date(self.end)
    }

    /// The zero-padded day of month of the start, for the date badge
    pub fn day(&self) -> String {
        self.start.format("%d").to_string()
    }

    /// The month abbreviation of the start, for the date badge
    pub fn month(&self) -> String {
        self.start.format("%b").to_string()
    }
}
