//! Property-based tests for configuration parsing and validation

use proptest::prelude::*;
use qserver_core::models::is_valid_service_name;
use qserver_core::{AppConfig, ConfigError, ConnectionConfigError, MonitoringSettings};

// ========== Strategies ==========

fn arb_service_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9@._:-]{0,20}"
}

fn arb_unsafe_service_name() -> impl Strategy<Value = String> {
    // Edge whitespace is trimmed away, so the bad part always sits between two names
    let bad = prop_oneof![
        Just(";"),
        Just("|"),
        Just("$("),
        Just(" "),
        Just("`"),
        Just("&"),
    ];
    ("[a-z]{1,8}", bad, "[a-z]{1,8}").prop_map(|(a, bad, b)| format!("{a}{bad}{b}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// List and comma-separated forms produce the same services
    #[test]
    fn service_list_forms_agree(
        names in proptest::collection::btree_set(arb_service_name(), 1..6)
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let quoted: Vec<String> = names.iter().map(|n| format!("\"{n}\"")).collect();

        let as_list = format!(
            "[ssh]\nhostname = \"h\"\nusername = \"u\"\nservices = [{}]\n",
            quoted.join(", ")
        );
        let as_csv = format!(
            "[ssh]\nhostname = \"h\"\nusername = \"u\"\nservices = \"{}\"\n",
            names.join(",")
        );

        let list = AppConfig::from_toml_str(&as_list).unwrap();
        let csv = AppConfig::from_toml_str(&as_csv).unwrap();
        prop_assert_eq!(list.ssh.services.as_slice(), names.as_slice());
        prop_assert_eq!(csv.ssh.services, list.ssh.services);
    }

    /// Names containing shell metacharacters never validate
    #[test]
    fn unsafe_service_names_are_rejected(name in arb_unsafe_service_name()) {
        prop_assert!(!is_valid_service_name(&name));
        let toml = format!(
            "[ssh]\nhostname = \"h\"\nusername = \"u\"\nservices = [{:?}]\n",
            name
        );
        let is_invalid_service = matches!(
            AppConfig::from_toml_str(&toml),
            Err(ConfigError::Validation(ConnectionConfigError::InvalidServiceName(_)))
        );
        prop_assert!(is_invalid_service);
    }

    /// Effective interval always lands in 1–3600 seconds
    #[test]
    fn effective_interval_is_clamped(secs in any::<u32>()) {
        let settings = MonitoringSettings { interval_secs: secs, ..Default::default() };
        let effective = settings.effective_interval_secs();
        prop_assert!((1..=3600).contains(&effective));
        if (1..=3600).contains(&secs) {
            prop_assert_eq!(effective, secs);
        }
    }

    /// Timeouts always land in 1–300 seconds
    #[test]
    fn timeouts_are_clamped(connect in any::<u32>(), command in any::<u32>()) {
        let settings = MonitoringSettings {
            connect_timeout_secs: connect,
            command_timeout_secs: command,
            ..Default::default()
        };
        prop_assert!((1..=300).contains(&settings.connect_timeout().as_secs()));
        prop_assert!((1..=300).contains(&settings.command_timeout().as_secs()));
    }
}
