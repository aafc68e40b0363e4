use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

const MAX_IDLE_TTL_HOURS: i64 = 1_000_000;

pub(crate) fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub(crate) fn format_timestamp(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Sessions whose last activity is older than the returned instant are idle.
pub(crate) fn idle_cutoff(now: OffsetDateTime, idle_ttl_hours: u64) -> OffsetDateTime {
    let hours = i64::try_from(idle_ttl_hours).unwrap_or(i64::MAX).min(MAX_IDLE_TTL_HOURS);
    now.checked_sub(Duration::hours(hours)).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
