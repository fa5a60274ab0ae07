//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;

    #[test]
    fn test_data_config_default() {
        let config = DataConfig::default();
        assert_eq!(config.base_url, "https://query1.finance.yahoo.com");
        assert_eq!(config.output_dir, "data");
        assert_eq!(config.start, "2015-01-01");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.auto_adjust);
    }

    #[test]
    fn test_feature_config_defaults() {
        let config: FeatureConfig = toml::from_str("").unwrap();
        assert_eq!(config.output_dir, "features");
        assert_eq!(config.rsi_period, 14);
        assert_eq!(config.macd_fast, 12);
        assert_eq!(config.macd_slow, 26);
        assert_eq!(config.macd_signal, 9);
        assert_eq!(config.bollinger_period, 20);
        assert_eq!(config.bollinger_std_factor, 2.0);
    }

    #[test]
    fn test_backtest_config_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.capital, 1.0);
        assert_eq!(config.output, "equity.csv");
    }

    #[test]
    fn test_partial_sections() {
        let toml_str = r#"
[data]
concurrency = 8
auto_adjust = false

[backtest]
capital = 10000.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data.concurrency, 8);
        assert!(!config.data.auto_adjust);
        assert_eq!(config.data.start, "2015-01-01");
        assert_eq!(config.backtest.capital, 10000.0);
        assert_eq!(config.backtest.output, "equity.csv");
        assert_eq!(config.features.rsi_period, 14);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data.output_dir, "data");
        assert_eq!(config.features.output_dir, "features");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.features.bollinger_period, 20);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[features]
rsi_period = 7
output_dir = "out/features"

[backtest]
output = "reports/equity.csv"
"#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.features.rsi_period, 7);
        assert_eq!(config.features.output_dir, "out/features");
        assert_eq!(config.backtest.output, "reports/equity.csv");
        assert_eq!(config.data.concurrency, 4);
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("data/raw"), std::path::PathBuf::from("data/raw"));
    }
}
