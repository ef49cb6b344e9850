//! Wall clock
//!
//! The node has no battery-backed clock. Wall time is derived from one
//! network time sample anchored to the monotonic uptime counter, shifted by
//! a fixed UTC offset and converted to a civil date with Hinnant's
//! `civil_from_days` algorithm.

/// Seconds between the NTP era start (1900-01-01) and the Unix epoch
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Length of an SNTP packet
pub const NTP_PACKET_LEN: usize = 48;

const SECONDS_PER_DAY: i64 = 86_400;

/// Errors decoding a network time response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Response shorter than an SNTP packet
    Truncated,
    /// Server is unsynchronised or answered in the wrong mode
    Unsynchronized,
    /// Transmit timestamp lies before the Unix epoch
    BeforeEpoch,
}

/// One network time sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSync {
    /// Seconds since the Unix epoch (UTC)
    pub unix_secs: u64,
    /// Uptime at which the sample was taken (ms)
    pub uptime_ms: u64,
}

/// Build an SNTP client request (LI=0, VN=3, Mode=3)
pub fn sntp_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

/// Extract Unix seconds from an SNTP server response
pub fn parse_sntp_response(response: &[u8]) -> Result<u64, ClockError> {
    if response.len() < NTP_PACKET_LEN {
        return Err(ClockError::Truncated);
    }

    let mode = response[0] & 0x07;
    let stratum = response[1];
    if mode != 4 || stratum == 0 || stratum >= 16 {
        return Err(ClockError::Unsynchronized);
    }

    let ntp_secs = u32::from_be_bytes([response[40], response[41], response[42], response[43]]);
    (ntp_secs as u64)
        .checked_sub(NTP_UNIX_OFFSET)
        .ok_or(ClockError::BeforeEpoch)
}

/// Civil date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    /// Convert seconds since the Unix epoch to a civil date and time
    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let secs_today = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }
}

fn civil_from_days(days: i64) -> (u16, u8, u8) {
    // Shift the epoch to 0000-03-01 so the leap day ends the year
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };

    (year.clamp(0, u16::MAX as i64) as u16, month, day)
}

/// Wall clock anchored to the uptime counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    anchor: Option<TimeSync>,
    utc_offset_minutes: i32,
}

impl WallClock {
    /// Create an unsynchronised clock
    pub const fn new(utc_offset_minutes: i32) -> Self {
        Self {
            anchor: None,
            utc_offset_minutes,
        }
    }

    /// Anchor the clock to a network time sample
    pub fn sync(&mut self, sample: TimeSync) {
        self.anchor = Some(sample);
    }

    /// Check if the clock has ever been synchronised
    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Local civil time at `now_ms` uptime, if synchronised
    pub fn local_time(&self, now_ms: u64) -> Option<CivilTime> {
        let anchor = self.anchor?;
        let elapsed_s = now_ms.saturating_sub(anchor.uptime_ms) / 1000;
        let utc = anchor.unix_secs.saturating_add(elapsed_s) as i64;
        Some(CivilTime::from_unix(
            utc + self.utc_offset_minutes as i64 * 60,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let t = CivilTime::from_unix(0);
        assert_eq!((t.year, t.month, t.day), (1970, 1, 1));
        assert_eq!((t.hour, t.minute, t.second), (0, 0, 0));
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29 12:34:56 UTC
        let t = CivilTime::from_unix(1_709_210_096);
        assert_eq!((t.year, t.month, t.day), (2024, 2, 29));
        assert_eq!((t.hour, t.minute, t.second), (12, 34, 56));
    }

    #[test]
    fn test_century_non_leap() {
        // 2100-03-01 00:00:00 UTC
        let t = CivilTime::from_unix(4_107_542_400);
        assert_eq!((t.year, t.month, t.day), (2100, 3, 1));
    }

    #[test]
    fn test_negative_offset_crosses_midnight() {
        let mut clock = WallClock::new(-60);
        clock.sync(TimeSync {
            // 2023-01-01 00:30:00 UTC
            unix_secs: 1_672_533_000,
            uptime_ms: 10_000,
        });
        let t = clock.local_time(10_000).unwrap();
        assert_eq!((t.year, t.month, t.day), (2022, 12, 31));
        assert_eq!((t.hour, t.minute), (23, 30));
    }

    #[test]
    fn test_clock_advances_with_uptime() {
        let mut clock = WallClock::new(0);
        assert_eq!(clock.local_time(0), None);

        clock.sync(TimeSync {
            unix_secs: 0,
            uptime_ms: 5_000,
        });
        let t = clock.local_time(5_000 + 3_725_999).unwrap();
        assert_eq!((t.hour, t.minute, t.second), (1, 2, 5));
        assert!(clock.is_synced());
    }

    #[test]
    fn test_parse_sntp_response() {
        let mut response = [0u8; NTP_PACKET_LEN];
        response[0] = 0x1C; // LI=0, VN=3, Mode=4
        response[1] = 2;
        let ntp = (NTP_UNIX_OFFSET + 1_000) as u32;
        response[40..44].copy_from_slice(&ntp.to_be_bytes());

        assert_eq!(parse_sntp_response(&response), Ok(1_000));
    }

    #[test]
    fn test_parse_sntp_rejects_bad_packets() {
        assert_eq!(parse_sntp_response(&[0u8; 12]), Err(ClockError::Truncated));

        let mut response = [0u8; NTP_PACKET_LEN];
        response[0] = 0x1C;
        response[1] = 0;
        assert_eq!(parse_sntp_response(&response), Err(ClockError::Unsynchronized));

        response[1] = 1;
        assert_eq!(parse_sntp_response(&response), Err(ClockError::BeforeEpoch));
    }

    #[test]
    fn test_request_header() {
        let request = sntp_request();
        assert_eq!(request[0], 0x1B);
        assert!(request[1..].iter().all(|&b| b == 0));
    }
}
