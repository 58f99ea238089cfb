//! Tests for adapter selection.

use super::test_fixtures::StaticSource;
use super::{AdapterLocator, ClassEntry, DiscoveryError, DriverFamily};

const OAS: &str = "tapoas";
const V9: &str = "tap0901";

fn locator(source: StaticSource) -> AdapterLocator<StaticSource> {
    AdapterLocator::new(source, DriverFamily::TapOas)
}

mod exact_name {
    use super::*;

    #[test]
    fn no_exact_match_returns_not_found() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "{A}", "Ethernet 2")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3"),
        );

        let result = loc.locate(0, Some("Lanemu"));

        assert!(matches!(
            result,
            Err(DiscoveryError::NotFound {
                family: DriverFamily::TapOas
            })
        ));
    }

    #[test]
    fn without_name_returns_first_in_enumeration_order() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "{A}", "Ethernet 2")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3"),
        );

        let candidate = loc.locate(0, None).unwrap();

        assert_eq!(candidate.instance_id, "{A}");
        assert_eq!(candidate.friendly_name, "Ethernet 2");
        assert_eq!(candidate.component_id, OAS);
    }

    #[test]
    fn exact_name_selects_later_entry() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "{A}", "Ethernet 2")
                .with_adapter("0002", OAS, "{B}", "Lanemu"),
        );

        let candidate = loc.locate(0, Some("Lanemu")).unwrap();

        assert_eq!(candidate.instance_id, "{B}");
    }

    #[test]
    fn name_comparison_is_case_sensitive() {
        let loc = locator(StaticSource::new().with_adapter("0001", OAS, "{A}", "lanemu"));

        assert!(loc.locate(0, Some("Lanemu")).is_err());
    }
}

mod family_filter {
    use super::*;

    #[test]
    fn empty_source_is_not_found_with_or_without_name() {
        let loc = locator(StaticSource::new());

        assert!(loc.locate(0, None).unwrap_err().is_not_found());
        assert!(loc.locate(0, Some("Lanemu")).unwrap_err().is_not_found());
    }

    #[test]
    fn other_family_is_ignored() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", V9, "{A}", "Lanemu")
                .with_adapter("0002", "e1iexpress", "{B}", "Ethernet"),
        );

        assert!(loc.locate(0, None).unwrap_err().is_not_found());
    }

    #[test]
    fn v9_locator_matches_tap0901_only() {
        let source = StaticSource::new()
            .with_adapter("0001", OAS, "{A}", "Lanemu")
            .with_adapter("0002", V9, "{B}", "Lanemu");
        let loc = AdapterLocator::new(source, DriverFamily::TapV9);

        let candidate = loc.locate(0, Some("Lanemu")).unwrap();

        assert_eq!(candidate.instance_id, "{B}");
        assert_eq!(candidate.component_id, V9);
    }

    #[test]
    fn reserved_keys_are_never_candidates() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("Configuration", OAS, "{CFG}", "Lanemu")
                .with_adapter("Properties", OAS, "{PROP}", "Lanemu")
                .with_adapter("0003", OAS, "{REAL}", "Lanemu"),
        );

        assert_eq!(loc.locate(0, None).unwrap().instance_id, "{REAL}");
        assert!(loc.locate(1, None).unwrap_err().is_not_found());
    }

    #[test]
    fn entries_without_component_id_are_ignored() {
        let loc = locator(
            StaticSource::new()
                .with_entry(ClassEntry {
                    key_name: "0001".to_string(),
                    component_id: None,
                    instance_id: Some("{A}".to_string()),
                })
                .with_adapter("0002", OAS, "{B}", "Lanemu"),
        );

        assert_eq!(loc.locate(0, None).unwrap().instance_id, "{B}");
    }

    #[test]
    fn source_failure_is_propagated() {
        let loc = locator(StaticSource::failing());

        let error = loc.locate(0, None).unwrap_err();

        assert!(matches!(error, DiscoveryError::Source { .. }));
    }
}

mod skip_count {
    use super::*;

    fn three_adapters() -> StaticSource {
        StaticSource::new()
            .with_adapter("0001", OAS, "{A}", "Ethernet 2")
            .with_adapter("0002", V9, "{X}", "Other")
            .with_adapter("0003", OAS, "{B}", "Ethernet 3")
            .with_adapter("0004", OAS, "{C}", "Ethernet 4")
    }

    #[test]
    fn skip_selects_nth_family_match() {
        let loc = locator(three_adapters());

        assert_eq!(loc.locate(0, None).unwrap().instance_id, "{A}");
        assert_eq!(loc.locate(1, None).unwrap().instance_id, "{B}");
        assert_eq!(loc.locate(2, None).unwrap().instance_id, "{C}");
    }

    #[test]
    fn skip_past_last_match_is_not_found() {
        let loc = locator(three_adapters());

        assert!(loc.locate(3, None).unwrap_err().is_not_found());
        assert!(loc.locate(100, None).unwrap_err().is_not_found());
    }

    #[test]
    fn skip_consumes_entries_regardless_of_name() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "{A}", "Lanemu")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3")
                .with_adapter("0003", OAS, "{C}", "Lanemu"),
        );

        // "{A}" is passed over by skip even though its name matches.
        assert_eq!(loc.locate(1, Some("Lanemu")).unwrap().instance_id, "{C}");
    }

    #[test]
    fn unnamed_entry_counts_toward_skip_but_is_not_selectable() {
        let loc = locator(
            StaticSource::new()
                .with_unnamed("0001", OAS, "{A}")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3"),
        );

        assert_eq!(loc.locate(0, None).unwrap().instance_id, "{B}");
        assert_eq!(loc.locate(1, None).unwrap().instance_id, "{B}");
        assert!(loc.locate(2, None).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_instance_id_is_not_selectable() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "", "Ghost")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3"),
        );

        assert_eq!(loc.locate(0, None).unwrap().instance_id, "{B}");
    }
}

mod candidates {
    use super::*;

    #[test]
    fn lists_resolvable_family_matches_with_ordinals() {
        let loc = locator(
            StaticSource::new()
                .with_adapter("0001", OAS, "{A}", "Ethernet 2")
                .with_adapter("0002", V9, "{X}", "Other")
                .with_unnamed("0003", OAS, "{U}")
                .with_adapter("0004", OAS, "{C}", "Lanemu"),
        );

        let listed = loc.candidates().unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].ordinal, 0);
        assert_eq!(listed[0].candidate.instance_id, "{A}");
        assert_eq!(listed[1].ordinal, 2);
        assert_eq!(listed[1].candidate.friendly_name, "Lanemu");
    }

    #[test]
    fn ordinal_is_the_skip_that_selects_the_entry() {
        let loc = locator(
            StaticSource::new()
                .with_unnamed("0001", OAS, "{U}")
                .with_adapter("0002", OAS, "{B}", "Ethernet 3")
                .with_unnamed("0003", OAS, "{V}")
                .with_adapter("0004", OAS, "{C}", "Lanemu"),
        );

        for listed in loc.candidates().unwrap() {
            assert_eq!(loc.locate(listed.ordinal, None).unwrap(), listed.candidate);
        }
    }

    #[test]
    fn empty_when_nothing_matches() {
        let loc = locator(StaticSource::new().with_adapter("0001", V9, "{A}", "Lanemu"));

        assert!(loc.candidates().unwrap().is_empty());
    }
}
