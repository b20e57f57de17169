//! Packed DOS date/time conversion.
//!
//! The archive format stores modification times as two 16-bit words: the
//! date as day/month/year-since-1980 and the time as second-halved/minute/
//! hour. This module converts between that packing (date in the high half
//! of a u32, time in the low half) and [`SystemTime`], using exact civil
//! calendar arithmetic. Timestamps outside the representable 1980..=2107
//! range clamp to the nearest bound.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Packed value for the DOS epoch, 1980-01-01 00:00:00.
pub const DOS_EPOCH: u32 = 0x0021_0000;

// Days from 1970-01-01 to year/month/day (proleptic Gregorian).
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (if month > 2 { month - 3 } else { month + 9 }) as i64;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

// Year/month/day for a day count from 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

/// Convert a timestamp to the packed DOS representation.
pub fn to_packed(time: SystemTime) -> u32 {
    let Ok(since_epoch) = time.duration_since(UNIX_EPOCH) else {
        return DOS_EPOCH;
    };

    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    if year < 1980 {
        return DOS_EPOCH;
    }
    if year > 2107 {
        // 2107-12-31 23:59:58, the last representable instant.
        return 0xFF9F_BF7D;
    }

    let time_of_day = secs % 86400;
    let hours = (time_of_day / 3600) as u32;
    let minutes = (time_of_day % 3600 / 60) as u32;
    let half_secs = (time_of_day % 60 / 2) as u32;

    let date = ((year as u32 - 1980) << 9) | (month << 5) | day;
    let time = (hours << 11) | (minutes << 5) | half_secs;
    (date << 16) | time
}

/// Convert a packed DOS value back to a timestamp.
///
/// Field values outside their calendar range (a garbage record's month 0 or
/// day 37) are clamped rather than rejected; the packing carries no
/// validity guarantee.
pub fn from_packed(packed: u32) -> SystemTime {
    let date = (packed >> 16) as u16;
    let time = packed as u16;

    let year = ((date >> 9) & 0x7F) as i64 + 1980;
    let month = ((date >> 5) & 0x0F).clamp(1, 12) as u32;
    let day = (date & 0x1F).clamp(1, 31) as u32;
    let hours = ((time >> 11) & 0x1F) as u64;
    let minutes = ((time >> 5) & 0x3F) as u64;
    let seconds = (time & 0x1F) as u64 * 2;

    let days = days_from_civil(year, month, day) as u64;
    let secs = days * 86400 + hours * 3600 + minutes * 60 + seconds;
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2020-01-01T00:00:00Z
    const Y2020: u64 = 1_577_836_800;

    #[test]
    fn test_known_packing() {
        let time = UNIX_EPOCH + Duration::from_secs(Y2020);
        // year 40 since 1980, month 1, day 1, midnight.
        assert_eq!(to_packed(time), 0x5021_0000);
        assert_eq!(from_packed(0x5021_0000), time);
    }

    #[test]
    fn test_roundtrip_truncates_to_two_seconds() {
        // 01:02:03 rounds down to 01:02:02.
        let time = UNIX_EPOCH + Duration::from_secs(Y2020 + 3723);
        let back = from_packed(to_packed(time));
        assert_eq!(back, UNIX_EPOCH + Duration::from_secs(Y2020 + 3722));
    }

    #[test]
    fn test_pre_dos_epoch_clamps() {
        assert_eq!(to_packed(UNIX_EPOCH), DOS_EPOCH);
        assert_eq!(
            from_packed(DOS_EPOCH),
            UNIX_EPOCH + Duration::from_secs(315_532_800) // 1980-01-01
        );
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T12:00:00Z
        let time = UNIX_EPOCH + Duration::from_secs(1_709_208_000);
        let packed = to_packed(time);
        assert_eq!((packed >> 16) & 0x1F, 29);
        assert_eq!((packed >> 21) & 0x0F, 2);
        assert_eq!(from_packed(packed), time);
    }

    #[test]
    fn test_garbage_fields_clamp() {
        // Month 0, day 0 in a corrupt record must still convert.
        let t = from_packed(0x0000_0000);
        assert_eq!(t, from_packed(DOS_EPOCH));
    }
}
