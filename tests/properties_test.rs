//! Property tests for the view pipeline and the layout history.

use dashdeck::aggregate::aggregate;
use dashdeck::cards::{CardPatch, EligibleColumns};
use dashdeck::filter::ColumnFilterEngine;
use dashdeck::history::History;
use dashdeck::sort::{SortDirection, SortEngine};
use dashdeck::store::RowStore;
use dashdeck::{ChartKind, Dashboard, Dataset};
use proptest::prelude::*;

// ──────────────────── strategies ────────────────────

fn arb_category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("North".to_string()),
        Just("South".to_string()),
        Just("East".to_string()),
        Just("West".to_string()),
    ]
}

fn arb_flag() -> impl Strategy<Value = String> {
    prop_oneof![Just("yes".to_string()), Just("no".to_string()), Just(String::new())]
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, String, i32)>> {
    prop::collection::vec((arb_category(), arb_flag(), -1000i32..1000), 0..40)
}

fn store_from(rows: &[(String, String, i32)]) -> RowStore {
    let dataset = Dataset::new(
        vec!["region".to_string(), "flag".to_string(), "amount".to_string()],
        rows.iter()
            .map(|(region, flag, amount)| vec![region.clone(), flag.clone(), amount.to_string()])
            .collect(),
    )
    .unwrap();
    RowStore::from_dataset(dataset)
}

fn arb_selection() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_category(), 0..3)
        .prop_map(|values| values.into_iter().filter(|v| !v.is_empty()).collect())
}

#[derive(Debug, Clone)]
enum LayoutOp {
    Add,
    Remove(usize),
    Toggle(usize),
    Reorder(usize, usize),
    Merge(usize, usize),
    ExpandLast,
}

fn arb_layout_op() -> impl Strategy<Value = LayoutOp> {
    prop_oneof![
        3 => Just(LayoutOp::Add),
        1 => (0usize..6).prop_map(LayoutOp::Remove),
        2 => (0usize..6).prop_map(LayoutOp::Toggle),
        1 => (0usize..6, 0usize..6).prop_map(|(a, b)| LayoutOp::Reorder(a, b)),
        1 => (0usize..6, 0usize..6).prop_map(|(a, b)| LayoutOp::Merge(a, b)),
        1 => Just(LayoutOp::ExpandLast),
    ]
}

fn dashboard(limit: usize) -> Dashboard {
    let mut dashboard = Dashboard::new(6, limit);
    dashboard.set_eligible(EligibleColumns {
        dimensions: vec!["region".to_string(), "flag".to_string()],
        measures: vec!["amount".to_string()],
    });
    dashboard
}

/// Apply one operation. Returns whether the layout changed.
fn apply_op(dashboard: &mut Dashboard, op: &LayoutOp) -> bool {
    let id_at = |d: &Dashboard, idx: usize| d.cards().get(idx).map(|c| c.id.clone());
    match op {
        LayoutOp::Add => dashboard.add().is_some(),
        LayoutOp::Remove(idx) => match id_at(dashboard, *idx) {
            Some(id) => dashboard.remove(&id),
            None => false,
        },
        LayoutOp::Toggle(idx) => match dashboard.cards().get(*idx).cloned() {
            Some(card) => dashboard.update(
                &card.id,
                &CardPatch {
                    chart_kind: Some(card.chart_kind.toggled()),
                    ..CardPatch::default()
                },
            ),
            None => false,
        },
        LayoutOp::Reorder(a, b) => match (id_at(dashboard, *a), id_at(dashboard, *b)) {
            (Some(a), Some(b)) => dashboard.reorder(&a, &b),
            _ => false,
        },
        LayoutOp::Merge(a, b) => match (id_at(dashboard, *a), id_at(dashboard, *b)) {
            (Some(a), Some(b)) => dashboard.merge_expand(&a, &b),
            _ => false,
        },
        LayoutOp::ExpandLast => match dashboard.cards().last().map(|c| c.id.clone()) {
            Some(id) => dashboard.expand_alone(&id),
            None => false,
        },
    }
}

// ──────────────────── filters ────────────────────

proptest! {
    #[test]
    fn filtering_is_idempotent(rows in arb_rows(), selection in arb_selection(), blanks in any::<bool>()) {
        let store = store_from(&rows);
        let mut engine = ColumnFilterEngine::for_store(&store);
        engine.set_selected("region", selection.clone());
        if blanks {
            engine.toggle_blanks("region");
        }
        let kept = engine.apply(&store);

        let kept_rows: Vec<_> = kept.iter().map(|&i| rows[i].clone()).collect();
        let narrowed = store_from(&kept_rows);
        let mut again = ColumnFilterEngine::for_store(&narrowed);
        again.set_selected("region", selection);
        if blanks {
            again.toggle_blanks("region");
        }
        prop_assert_eq!(again.apply(&narrowed).len(), kept_rows.len());
    }

    #[test]
    fn column_filters_commute(
        rows in arb_rows(),
        regions in arb_selection(),
        flags in prop::collection::vec(arb_flag(), 0..2),
    ) {
        let store = store_from(&rows);
        let flags: Vec<String> = flags.into_iter().filter(|f| !f.is_empty()).collect();

        let mut first = ColumnFilterEngine::for_store(&store);
        first.set_selected("region", regions.clone());
        first.set_selected("flag", flags.clone());

        let mut second = ColumnFilterEngine::for_store(&store);
        second.set_selected("flag", flags);
        second.set_selected("region", regions);

        let kept = first.apply(&store);
        prop_assert_eq!(&kept, &second.apply(&store));
        // The kept rows are in store order.
        prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
    }
}

// ──────────────────── sorting ────────────────────

proptest! {
    #[test]
    fn descending_reverses_ascending_for_distinct_keys(
        values in prop::collection::hash_set(-10_000i32..10_000, 0..40),
    ) {
        let rows: Vec<(String, String, i32)> = values
            .into_iter()
            .map(|v| ("North".to_string(), "yes".to_string(), v))
            .collect();
        let store = store_from(&rows);

        let mut asc: Vec<usize> = (0..store.len()).collect();
        let mut engine = SortEngine::new();
        engine.sort("amount", SortDirection::Asc);
        engine.apply(&store, &mut asc);

        let mut desc: Vec<usize> = (0..store.len()).collect();
        engine.sort("amount", SortDirection::Desc);
        engine.apply(&store, &mut desc);

        asc.reverse();
        prop_assert_eq!(asc, desc);
    }

    #[test]
    fn sorting_twice_changes_nothing(rows in arb_rows(), descending in any::<bool>()) {
        let store = store_from(&rows);
        let direction = if descending { SortDirection::Desc } else { SortDirection::Asc };
        let mut engine = SortEngine::new();
        engine.sort("region", direction);

        let mut once: Vec<usize> = (0..store.len()).collect();
        engine.apply(&store, &mut once);
        let mut twice = once.clone();
        engine.apply(&store, &mut twice);
        prop_assert_eq!(once, twice);
    }
}

// ──────────────────── aggregation ────────────────────

proptest! {
    #[test]
    fn aggregation_preserves_the_total(rows in arb_rows()) {
        let store = store_from(&rows);
        let all: Vec<usize> = (0..store.len()).collect();
        let series = aggregate(&store, &all, "region", "amount");

        let expected: f64 = rows.iter().map(|(_, _, amount)| *amount as f64).sum();
        let actual: f64 = series.iter().map(|e| e.value).sum();
        prop_assert!((expected - actual).abs() < 1e-6);

        let labels: std::collections::HashSet<&str> =
            series.iter().map(|e| e.label.as_str()).collect();
        prop_assert_eq!(labels.len(), series.len());
        prop_assert!(series.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn percentages_add_up(rows in prop::collection::vec((arb_category(), 0i32..1000), 1..40)) {
        let rows: Vec<(String, String, i32)> = rows
            .into_iter()
            .map(|(region, amount)| (region, "yes".to_string(), amount))
            .collect();
        let store = store_from(&rows);
        let all: Vec<usize> = (0..store.len()).collect();
        let series = aggregate(&store, &all, "region", "amount");

        let total: f64 = series.iter().map(|e| e.value).sum();
        let shares: f64 = series
            .iter()
            .map(|e| e.percentage.parse::<f64>().unwrap())
            .sum();
        if total > 0.0 {
            // Each share is rounded to one decimal.
            prop_assert!((shares - 100.0).abs() <= 0.05 * series.len() as f64 + 1e-9);
        } else {
            prop_assert_eq!(shares, 0.0);
        }
    }
}

// ──────────────────── history ────────────────────

proptest! {
    #[test]
    fn history_stays_bounded(limit in 1usize..8, steps in prop::collection::vec(0u8..3, 0..60)) {
        let mut history: History<u32> = History::new(limit);
        let mut next = 0u32;
        for step in steps {
            match step {
                0 => {
                    history.record(next);
                    next += 1;
                }
                1 => {
                    history.undo();
                }
                _ => {
                    history.redo();
                }
            }
            prop_assert!(history.len() <= limit);
            if !history.is_empty() {
                prop_assert!(history.cursor() < history.len());
            }
        }
    }

    #[test]
    fn undo_then_redo_restores_every_step(ops in prop::collection::vec(arb_layout_op(), 1..25)) {
        let mut dashboard = dashboard(100);
        let mut states = vec![dashboard.cards().to_vec()];
        for op in &ops {
            if apply_op(&mut dashboard, op) {
                states.push(dashboard.cards().to_vec());
            }
        }

        for expected in states.iter().rev().skip(1) {
            prop_assert!(dashboard.undo());
            prop_assert_eq!(dashboard.cards(), expected.as_slice());
        }
        prop_assert!(!dashboard.undo());

        for expected in states.iter().skip(1) {
            prop_assert!(dashboard.redo());
            prop_assert_eq!(dashboard.cards(), expected.as_slice());
        }
        prop_assert!(!dashboard.redo());
    }

    #[test]
    fn new_action_discards_redo(ops in prop::collection::vec(arb_layout_op(), 1..15)) {
        let mut dashboard = dashboard(100);
        for op in &ops {
            apply_op(&mut dashboard, op);
        }
        if dashboard.undo() {
            prop_assert!(dashboard.can_redo());
            let before = dashboard.cards().to_vec();
            // Toggling a card or adding one always records.
            let changed = if let Some(card) = before.first() {
                dashboard.update(
                    &card.id,
                    &CardPatch {
                        chart_kind: Some(match card.chart_kind {
                            ChartKind::Bar => ChartKind::Pie,
                            ChartKind::Pie => ChartKind::Bar,
                        }),
                        ..CardPatch::default()
                    },
                )
            } else {
                dashboard.add().is_some()
            };
            prop_assert!(changed);
            prop_assert!(!dashboard.can_redo());
            prop_assert!(dashboard.undo());
            prop_assert_eq!(dashboard.cards(), before.as_slice());
        }
    }

    #[test]
    fn card_ids_stay_unique(ops in prop::collection::vec(arb_layout_op(), 0..40)) {
        let mut dashboard = dashboard(50);
        for op in &ops {
            apply_op(&mut dashboard, op);
            if matches!(op, LayoutOp::Remove(_)) {
                dashboard.undo();
            }
            let ids: std::collections::HashSet<&str> =
                dashboard.cards().iter().map(|c| c.id.as_str()).collect();
            prop_assert_eq!(ids.len(), dashboard.len());
            prop_assert!(dashboard.len() <= dashboard.max_cards());
        }
    }
}
