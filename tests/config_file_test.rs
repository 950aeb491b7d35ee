/// Tests for TOML scan configuration files and CLI layering
#[cfg(test)]
mod config_file_tests {
    use cipherprobe::protocols::ScannerDetail;
    use cipherprobe::{Args, ScanConfig, ScanError};
    use clap::Parser;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.toml");

        ScanConfig::create_example(&path).unwrap();
        let loaded = ScanConfig::from_file(&path).unwrap();

        assert_eq!(loaded, ScanConfig::default());
    }

    #[test]
    fn test_custom_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(
            &path,
            r#"
threads = 2
scan_detail = "detailed"
watchdog_interval_ms = 120000
check_reachability = false
"#,
        )
        .unwrap();

        let config = ScanConfig::from_file(&path).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.scan_detail, ScannerDetail::Detailed);
        assert_eq!(config.watchdog_interval(), Duration::from_secs(120));
        assert_eq!(config.force_join_timeout(), Duration::from_secs(60));
        assert!(!config.check_reachability);
    }

    #[test]
    fn test_malformed_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "threads = \"eight\"\n").unwrap();

        assert!(matches!(
            ScanConfig::from_file(&path),
            Err(ScanError::TomlError(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "threads = 0\n").unwrap();

        assert!(matches!(
            ScanConfig::from_file(&path),
            Err(ScanError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ScanConfig::from_file(dir.path().join("absent.toml")),
            Err(ScanError::IoError { .. })
        ));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "threads = 2\nscan_detail = \"quick\"\n").unwrap();

        let args = Args::try_parse_from([
            "cipherprobe",
            "example.com",
            "--config",
            path.to_str().unwrap(),
            "--threads",
            "6",
        ])
        .unwrap();
        let config = ScanConfig::from_args(&args).unwrap();

        assert_eq!(config.threads, 6);
        assert_eq!(config.scan_detail, ScannerDetail::Quick);
    }
}
