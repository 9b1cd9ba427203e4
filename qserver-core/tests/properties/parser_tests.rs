//! Property-based tests for the metric output parsers

use proptest::prelude::*;
use qserver_core::MetricsParser;
use qserver_core::monitoring::StorageAmount;

// ========== Strategies ==========

/// `free -m` output for the given totals, with arbitrary column padding
fn free_output(total: u64, used: u64, pad: usize) -> String {
    let gap = " ".repeat(pad);
    format!(
        "               total        used        free      shared  buff/cache   available\n\
         Mem:{gap}{total}{gap}{used}{gap}{free}{gap}0{gap}0{gap}{free}\n\
         Swap:           2047           0        2047\n",
        free = total - used,
    )
}

fn arb_memory() -> impl Strategy<Value = (u64, u64)> {
    (0u64..=4_194_304).prop_flat_map(|total| (Just(total), 0..=total))
}

fn arb_unit() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just("K"), Just("M"), Just("G"), Just("T")]
}

fn arb_service_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("active".to_string()),
        Just("inactive".to_string()),
        Just("failed".to_string()),
        Just("activating".to_string()),
        Just("unknown".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ========== Memory ==========

    /// Same input always gives the same result
    #[test]
    fn memory_parse_is_deterministic((total, used) in arb_memory(), pad in 1usize..12) {
        let output = free_output(total, used, pad);
        prop_assert_eq!(
            MetricsParser::parse_memory(&output).ok(),
            MetricsParser::parse_memory(&output).ok()
        );
    }

    /// Columns are read verbatim and used never exceeds total
    #[test]
    fn memory_parse_reads_columns((total, used) in arb_memory(), pad in 1usize..12) {
        let memory = MetricsParser::parse_memory(&free_output(total, used, pad)).unwrap();
        prop_assert_eq!(memory.total_mb, total);
        prop_assert_eq!(memory.used_mb, used);
        prop_assert!(memory.used_mb <= memory.total_mb);
    }

    /// Percentage is absent exactly when total is zero, otherwise within 0–100
    #[test]
    fn memory_percent_is_bounded((total, used) in arb_memory()) {
        let memory = MetricsParser::parse_memory(&free_output(total, used, 4)).unwrap();
        match memory.percent() {
            None => prop_assert_eq!(total, 0),
            Some(p) => prop_assert!((0.0..=100.0).contains(&p)),
        }
    }

    /// Used above total is rejected rather than clamped
    #[test]
    fn memory_used_above_total_is_rejected(total in 0u64..1_000_000, extra in 1u64..1000) {
        let output = format!("header\nMem: {total} {} 0 0 0 0\n", total + extra);
        prop_assert!(MetricsParser::parse_memory(&output).is_err());
    }

    /// Parsers never panic on arbitrary text
    #[test]
    fn parsers_do_not_panic(output in ".{0,200}") {
        let _ = MetricsParser::parse_memory(&output);
        let _ = MetricsParser::parse_cpu(&output);
        let _ = MetricsParser::parse_storage(&output);
        let _ = MetricsParser::parse_distro_name(&output);
        let _ = MetricsParser::parse_service_status(&output);
    }

    // ========== CPU ==========

    /// Any in-range user percentage survives the `top` line format
    #[test]
    fn cpu_user_percentage_round_trips(tenths in 0u32..=1000, glued in any::<bool>()) {
        let value = f64::from(tenths) / 10.0;
        let sep = if glued { "" } else { "  " };
        let line = format!("%Cpu(s):{sep}{value:.1} us,  2.0 sy,  0.0 ni, 90.0 id,  0.0 wa\n");
        let parsed = MetricsParser::parse_cpu(&line).unwrap();
        prop_assert!((parsed - value).abs() < 1e-9);
    }

    // ========== Storage ==========

    /// Sizes are kept verbatim and their numeric part is recoverable
    #[test]
    fn storage_sizes_kept_verbatim(
        total in 1u32..100_000,
        used in 0u32..100_000,
        unit in arb_unit(),
    ) {
        let line = format!("total {total}{unit} {used}{unit} 0{unit} 0% -\n");
        let storage = MetricsParser::parse_storage(&line).unwrap();
        let total_display = format!("{total}{unit}");
        let used_display = format!("{used}{unit}");
        prop_assert_eq!(storage.total.display(), total_display.as_str());
        prop_assert_eq!(storage.used.display(), used_display.as_str());
        prop_assert_eq!(storage.total.numeric(), Some(f64::from(total)));
        prop_assert_eq!(storage.used.numeric(), Some(f64::from(used)));
    }

    /// Same-unit percentages match the plain ratio
    #[test]
    fn storage_percent_matches_ratio(
        total in 1u32..100_000,
        used in 0u32..100_000,
        unit in arb_unit(),
    ) {
        let line = format!("total {total}{unit} {used}{unit}\n");
        let storage = MetricsParser::parse_storage(&line).unwrap();
        let expected = f64::from(used) / f64::from(total) * 100.0;
        let actual = storage.percent().unwrap();
        prop_assert!((actual - expected).abs() < 1e-6);
    }

    /// Units scale by powers of 1024
    #[test]
    fn storage_units_are_binary(n in 1u32..10_000) {
        let kib = StorageAmount::new(format!("{n}K")).bytes().unwrap();
        let mib = StorageAmount::new(format!("{n}M")).bytes().unwrap();
        prop_assert!((mib / kib - 1024.0).abs() < 1e-9);
    }

    // ========== Services ==========

    /// Statuses pair with configured names in order
    #[test]
    fn service_statuses_keep_configured_order(
        statuses in proptest::collection::vec(arb_service_status(), 0..8)
    ) {
        let names: Vec<String> = (0..statuses.len()).map(|i| format!("svc{i}")).collect();
        let outputs: Vec<String> = statuses.iter().map(|s| format!("{s}\n")).collect();
        let output_refs: Vec<&str> = outputs.iter().map(String::as_str).collect();

        let parsed = MetricsParser::parse_service_statuses(&names, &output_refs).unwrap();

        prop_assert_eq!(parsed.len(), names.len());
        for (entry, (name, status)) in parsed.iter().zip(names.iter().zip(&statuses)) {
            prop_assert_eq!(&entry.name, name);
            prop_assert_eq!(&entry.status, status);
            prop_assert_eq!(entry.is_active(), status == "active");
        }
    }
}

#[test]
fn service_count_mismatch_is_rejected() {
    let names = vec!["nginx".to_string(), "redis".to_string()];
    assert!(MetricsParser::parse_service_statuses(&names, &["active"]).is_err());
}
