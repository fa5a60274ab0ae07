//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_signal_values() {
        assert_eq!(Signal::Sell.value(), -1.0);
        assert_eq!(Signal::Hold.value(), 0.0);
        assert_eq!(Signal::Buy.value(), 1.0);
        assert_eq!(Signal::default(), Signal::Hold);
    }

    #[test]
    fn test_signal_from_i8() {
        assert_eq!(Signal::try_from(-1i8).unwrap(), Signal::Sell);
        assert_eq!(Signal::try_from(0i8).unwrap(), Signal::Hold);
        assert_eq!(Signal::try_from(1i8).unwrap(), Signal::Buy);
        assert!(Signal::try_from(2i8).is_err());
    }

    #[test]
    fn test_signal_serialization() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Signal::Sell).unwrap(), "-1");
        let hold: Signal = serde_json::from_str("0").unwrap();
        assert_eq!(hold, Signal::Hold);
        assert!(serde_json::from_str::<Signal>("5").is_err());
    }

    #[test]
    fn test_interval_keys() {
        let keys: Vec<&str> = Interval::ALL.iter().map(|i| i.key()).collect();
        assert_eq!(keys, vec!["15m", "1h", "1d", "1wk"]);
        assert_eq!(Interval::OneHour.provider_code(), "60m");
        assert_eq!(Interval::OneWeek.to_string(), "1wk");
    }

    #[test]
    fn test_interval_lookback() {
        assert_eq!(Interval::FifteenMinutes.max_lookback(), Some(Duration::days(60)));
        assert_eq!(Interval::OneHour.max_lookback(), Some(Duration::days(730)));
        assert_eq!(Interval::OneDay.max_lookback(), None);
        assert_eq!(Interval::OneWeek.max_lookback(), None);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::OneDay);
        assert_eq!("15m".parse::<Interval>().unwrap(), Interval::FifteenMinutes);
        assert!("60m".parse::<Interval>().is_err());
    }

    #[test]
    fn test_interval_serde_uses_keys() {
        assert_eq!(serde_json::to_string(&Interval::OneHour).unwrap(), "\"1h\"");
        let parsed: Interval = serde_json::from_str("\"1wk\"").unwrap();
        assert_eq!(parsed, Interval::OneWeek);
    }

    #[test]
    fn test_bar_serialization() {
        let bar = Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100.0,
        };
        let json = serde_json::to_string(&bar).unwrap();
        assert!(json.contains("\"close\":1.5"));
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bar);
    }
}
