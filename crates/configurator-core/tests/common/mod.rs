//! Shared catalog fixtures for integration tests.

#![allow(dead_code)]

use configurator_core::{Catalog, FxTable, PricingContext};
use rust_decimal_macros::dec;

/// A social-growth product exercising every catalog feature.
pub const STOREFRONT_CATALOG: &str = r#"{
    "basePrice": 1000,
    "currency": "EUR",
    "optionGroups": [
        {
            "id": "grp_pkg", "name": "Package", "type": "single", "editorKey": "package",
            "options": [
                {"id": "opt_growth", "label": "Growth", "recommended": true, "editorKey": "growth",
                 "structuredPricing": {"amount": 3000, "amountUnit": "followers", "basePrice": 1500,
                                       "dripMinPerDay": 300},
                 "metadata": {"calculator": "amount / days"}},
                {"id": "opt_scale", "label": "Scale", "editorKey": "scale",
                 "structuredPricing": {"amount": 6000, "amountUnit": "followers", "basePrice": 1800}}
            ]
        },
        {
            "id": "grp_extras", "name": "Extras", "type": "multiple", "editorKey": "extras",
            "options": [
                {"id": "opt_report", "label": "Report", "priceDelta": 200, "editorKey": "report"},
                {"id": "opt_audit", "label": "Audit", "priceDelta": 100, "editorKey": "audit"},
                {"id": "opt_boost", "label": "Boost pack", "editorKey": "boost",
                 "structuredPricing": {"amount": 500, "basePrice": 250}}
            ]
        }
    ],
    "addOns": [
        {"id": "add_rush", "label": "Rush delivery", "priceDelta": 90, "editorKey": "rush"},
        {"id": "add_care", "label": "Care plan", "pricingMode": "percentage",
         "percentageMultiplier": "0.1", "editorKey": "care"},
        {"id": "add_ads", "label": "Managed ads", "pricingMode": "serviceOverride",
         "priceDelta": 300, "editorKey": "ads",
         "service": {
             "providerId": "adsco", "serviceId": "campaign",
             "providerCost": {"amount": 150, "currency": "USD"},
             "guardrails": {"minimumMarginPercent": 30}
         }}
    ],
    "subscriptionPlans": [
        {"id": "plan_once", "label": "One-off", "billingCycle": "oneTime", "default": true,
         "editorKey": "once"},
        {"id": "plan_quarter", "label": "Quarterly", "billingCycle": "quarterly",
         "priceMultiplier": 3, "editorKey": "quarterly"}
    ],
    "customFields": [
        {"id": "fld_handle", "label": "Instagram handle", "required": true,
         "validation": {"disallowWhitespace": true, "pattern": "^@", "patternMessage": "Handles start with @"}},
        {"id": "fld_posts", "label": "Posts per week", "type": "number", "defaultValue": "5",
         "validation": {"numericMin": 0, "numericMax": 50, "numericStep": 5},
         "visibility": {"conditions": [{"kind": "addOn", "addOnKey": "care"}]}},
        {"id": "fld_site", "label": "Website", "type": "url",
         "visibility": {"mode": "any", "conditions": [
             {"kind": "option", "optionKey": "audit", "groupKey": "extras"},
             {"kind": "subscriptionPlan", "planKey": "quarterly"}
         ]}}
    ],
    "configurationPresets": [
        {"id": "preset_starter", "label": "Starter", "selection": {
            "options": {"grp_pkg": ["opt_growth"]}
        }},
        {"id": "preset_full", "label": "Full service", "selection": {
            "options": {"grp_pkg": ["opt_scale"], "grp_extras": ["opt_audit", "opt_report", "opt_retired"]},
            "addOns": ["add_care", "add_rush"],
            "planId": "plan_quarter",
            "customFields": {"fld_handle": "@acme"}
        }}
    ]
}"#;

pub fn storefront_catalog() -> Catalog {
    Catalog::from_json_str(STOREFRONT_CATALOG).expect("fixture catalog parses")
}

/// The storefront catalog with a default plan that moves the price, so a
/// selection that lost its plan cannot hide behind a neutral default.
pub fn catalog_with_priced_default_plan() -> Catalog {
    let json = STOREFRONT_CATALOG.replace(
        r#""billingCycle": "oneTime", "default": true,"#,
        r#""billingCycle": "oneTime", "default": true, "priceDelta": 40, "priceMultiplier": 2,"#,
    );
    Catalog::from_json_str(&json).expect("fixture catalog parses")
}

pub fn fx() -> FxTable {
    FxTable::new().with_rate("USD", "EUR", dec!(0.9))
}

pub fn context(channel: Option<&str>) -> PricingContext {
    PricingContext {
        fx_rates: fx(),
        active_channel: channel.map(str::to_string),
    }
}
