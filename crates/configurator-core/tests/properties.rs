//! Property-based tests for session invariants.
//!
//! Invariants that hold for ALL action sequences:
//! - Idempotence: rebuilding from the saved snapshot reproduces the price
//! - Cardinality: a `single` group always holds exactly one option
//! - Preset drift: any deviation from an applied preset clears `presetId`
//! - Step alignment: exact multiples pass, anything in between fails

mod common;

use common::{catalog_with_priced_default_plan, context, storefront_catalog};
use configurator_core::validation::is_step_aligned;
use configurator_core::ConfiguratorSession;
use proptest::prelude::*;

/// Every action a shopper can take on the fixture catalog.
#[derive(Debug, Clone)]
enum Action {
    Option(&'static str, &'static str),
    AddOn(&'static str),
    Plan(Option<&'static str>),
    Field(&'static str, &'static str),
    Preset(&'static str),
}

const ACTIONS: &[Action] = &[
    Action::Option("grp_pkg", "opt_growth"),
    Action::Option("grp_pkg", "opt_scale"),
    Action::Option("grp_extras", "opt_report"),
    Action::Option("grp_extras", "opt_audit"),
    Action::Option("grp_extras", "opt_boost"),
    Action::Option("grp_extras", "opt_unknown"),
    Action::AddOn("add_rush"),
    Action::AddOn("add_care"),
    Action::AddOn("add_ads"),
    Action::Plan(Some("plan_quarter")),
    Action::Plan(Some("plan_once")),
    Action::Plan(None),
    Action::Field("fld_handle", "@shop"),
    Action::Field("fld_handle", ""),
    Action::Field("fld_posts", "12"),
    Action::Field("fld_site", "https://example.com"),
    Action::Preset("preset_full"),
    Action::Preset("preset_starter"),
];

fn apply(session: &mut ConfiguratorSession, action: &Action) {
    match action {
        Action::Option(group, option) => {
            session.toggle_option(group, option);
        }
        Action::AddOn(id) => {
            session.toggle_add_on(id);
        }
        Action::Plan(id) => {
            session.select_plan(*id);
        }
        Action::Field(id, value) => {
            session.set_field_value(id, value);
        }
        Action::Preset(id) => {
            session.apply_preset(id);
        }
    }
}

fn actions() -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec((0..ACTIONS.len()).prop_map(|i| ACTIONS[i].clone()), 0..24)
}

proptest! {
    #[test]
    fn prop_rebuild_from_snapshot_is_idempotent(script in actions()) {
        let mut session = ConfiguratorSession::new(storefront_catalog(), context(None));
        for action in &script {
            apply(&mut session, action);
        }

        let rebuilt = ConfiguratorSession::rehydrate(
            storefront_catalog(),
            context(None),
            &session.to_snapshot(),
        );

        prop_assert_eq!(session.derived().total, rebuilt.derived().total);
        prop_assert_eq!(&session.derived().selected_options, &rebuilt.derived().selected_options);
        prop_assert_eq!(&session.derived().selected_add_ons, &rebuilt.derived().selected_add_ons);
        prop_assert_eq!(&session.derived().add_on_health, &rebuilt.derived().add_on_health);
    }

    #[test]
    fn prop_rebuild_keeps_priced_default_plan(script in actions()) {
        let mut session =
            ConfiguratorSession::new(catalog_with_priced_default_plan(), context(None));
        for action in &script {
            apply(&mut session, action);
        }

        let rebuilt = ConfiguratorSession::rehydrate(
            catalog_with_priced_default_plan(),
            context(None),
            &session.to_snapshot(),
        );

        prop_assert!(session.derived().selected_plan_id.is_some());
        prop_assert_eq!(&session.derived().selected_plan_id, &rebuilt.derived().selected_plan_id);
        prop_assert_eq!(session.derived().total, rebuilt.derived().total);
    }

    #[test]
    fn prop_single_group_holds_exactly_one(script in actions()) {
        let mut session = ConfiguratorSession::new(storefront_catalog(), context(None));
        for action in &script {
            apply(&mut session, action);
            prop_assert_eq!(session.derived().selected_options["grp_pkg"].len(), 1);
        }
    }

    #[test]
    fn prop_deviation_from_preset_clears_it(
        deviation in prop::sample::select(vec![
            Action::Option("grp_extras", "opt_report"),
            Action::Option("grp_extras", "opt_boost"),
            Action::Option("grp_pkg", "opt_growth"),
            Action::AddOn("add_care"),
            Action::AddOn("add_ads"),
            Action::Plan(Some("plan_once")),
            Action::Field("fld_handle", "@other"),
        ])
    ) {
        let mut session = ConfiguratorSession::new(storefront_catalog(), context(None));
        session.apply_preset("preset_full");
        prop_assert_eq!(session.derived().preset_id.as_deref(), Some("preset_full"));

        apply(&mut session, &deviation);
        prop_assert_eq!(session.derived().preset_id.as_deref(), None);
    }

    #[test]
    fn prop_step_multiples_align(k in -10_000i64..10_000, step in 1u32..100) {
        let step = f64::from(step);
        prop_assert!(is_step_aligned(k as f64 * step, step));
    }

    #[test]
    fn prop_step_offsets_do_not_align(k in 0i64..10_000, step in 2u32..100, offset_seed in 1u32..1000) {
        let offset = f64::from(offset_seed % (step - 1) + 1);
        let step = f64::from(step);
        prop_assert!(!is_step_aligned(k as f64 * step + offset, step));
    }
}
