use std::fmt;

use serde::{Serialize, Serializer};

/// A UTC timestamp as stored by SQLite's `CURRENT_TIMESTAMP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time(time::OffsetDateTime);

pub(crate) const TIME_FORMAT : &[time::format_description::FormatItem<
    'static,
>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

impl Time {
    pub fn parse(s : &str) -> Result<Self, time::error::Parse> {
        let dt = time::PrimitiveDateTime::parse(s, &TIME_FORMAT)?;

        Ok(dt.assume_offset(time::UtcOffset::UTC).into())
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(&TIME_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl Serialize for Time {
    fn serialize<S>(
        &self,
        serializer : S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S : Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<time::OffsetDateTime> for Time {
    fn from(t : time::OffsetDateTime) -> Self {
        Time(t)
    }
}

impl std::ops::Deref for Time {
    type Target = time::OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
