use proptest::prelude::*;
use std::collections::HashSet;
use threadtrim_core::config::{DetachStrategy, EngineConfig};
use threadtrim_core::ledger::BlockPayload;
use threadtrim_core::restore;
use threadtrim_core::test_utils::{ConversationPage, conversation_page, resident_blocks};
use threadtrim_core::window::{self, WindowState, compute_cut};
use threadtrim_dom::{HostDom, NodeId};

#[derive(Debug, Clone)]
enum Op {
    Apply(f64),
    RestoreAll,
    RestoreBatch(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (500.0..20_000.0f64).prop_map(Op::Apply),
        Just(Op::RestoreAll),
        (1usize..6).prop_map(Op::RestoreBatch),
    ]
}

fn heights() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(20.0..3000.0f64, 1..40)
}

fn run(page: &mut ConversationPage, state: &mut WindowState, op: &Op) {
    run_with(&EngineConfig::default(), page, state, op);
}

fn run_with(config: &EngineConfig, page: &mut ConversationPage, state: &mut WindowState, op: &Op) {
    match *op {
        Op::Apply(budget) => {
            window::apply_window(
                &mut page.dom,
                state,
                &config.window,
                &config.resolver,
                budget,
            )
            .unwrap();
        }
        Op::RestoreAll => {
            restore::restore_all(&mut page.dom, state).unwrap();
        }
        Op::RestoreBatch(count) => {
            restore::restore_batch(&mut page.dom, state, count, Some(page.container)).unwrap();
        }
    }
}

fn ledger_nodes(state: &WindowState) -> Vec<NodeId> {
    state
        .ledger
        .iter()
        .filter_map(|entry| match entry.payload {
            BlockPayload::Live(node) => Some(node),
            BlockPayload::Serialized(_) => None,
        })
        .collect()
}

fn serializing_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.window.detach_strategy = DetachStrategy::Serialize;
    config
}

fn block_html(page: &ConversationPage) -> Vec<String> {
    resident_blocks(&page.dom, page.content_parent)
        .into_iter()
        .map(|block| page.dom.outer_html(block).unwrap())
        .collect()
}

#[test]
fn serialized_blocks_come_back_identical() {
    let config = serializing_config();
    let mut page = conversation_page(&[1000.0; 9]).unwrap();
    let original = block_html(&page);
    let mut state = WindowState::new(page.content_parent);

    run_with(&config, &mut page, &mut state, &Op::Apply(3000.0));
    assert_eq!(state.ledger.len(), 6);
    assert!(
        state
            .ledger
            .iter()
            .all(|entry| matches!(entry.payload, BlockPayload::Serialized(_)))
    );
    assert_eq!(block_html(&page), original[6..]);

    run_with(&config, &mut page, &mut state, &Op::RestoreBatch(2));
    assert_eq!(state.ledger.len(), 4);
    assert_eq!(block_html(&page), original[4..]);

    run_with(&config, &mut page, &mut state, &Op::RestoreAll);
    assert!(state.ledger.is_empty());
    assert_eq!(block_html(&page), original);
}

proptest! {
    #[test]
    fn serialized_restore_preserves_markup_and_order(
        heights in heights(),
        ops in prop::collection::vec(op(), 1..12),
    ) {
        let config = serializing_config();
        let mut page = conversation_page(&heights).unwrap();
        let original = block_html(&page);
        let mut state = WindowState::new(page.content_parent);

        for op in &ops {
            run_with(&config, &mut page, &mut state, op);
            let resident = resident_blocks(&page.dom, page.content_parent).len();
            prop_assert_eq!(resident + state.ledger.len(), heights.len());
        }

        run_with(&config, &mut page, &mut state, &Op::RestoreAll);
        prop_assert_eq!(block_html(&page), original);
    }


    #[test]
    fn blocks_are_never_lost_or_duplicated(
        heights in heights(),
        ops in prop::collection::vec(op(), 1..12),
    ) {
        let mut page = conversation_page(&heights).unwrap();
        let mut state = WindowState::new(page.content_parent);

        for op in &ops {
            run(&mut page, &mut state, op);

            let mut seen = resident_blocks(&page.dom, page.content_parent);
            seen.extend(ledger_nodes(&state));
            let unique: HashSet<NodeId> = seen.iter().copied().collect();
            prop_assert_eq!(seen.len(), page.blocks.len());
            prop_assert_eq!(unique, page.blocks.iter().copied().collect::<HashSet<_>>());
        }
    }

    #[test]
    fn restore_all_recovers_original_order(
        heights in heights(),
        ops in prop::collection::vec(op(), 1..12),
    ) {
        let mut page = conversation_page(&heights).unwrap();
        let mut state = WindowState::new(page.content_parent);
        for op in &ops {
            run(&mut page, &mut state, op);
        }

        restore::restore_all(&mut page.dom, &mut state).unwrap();
        prop_assert_eq!(page.dom.children(page.content_parent), page.blocks.clone());

        let again = restore::restore_all(&mut page.dom, &mut state).unwrap();
        prop_assert_eq!(again.restored, 0);
        prop_assert_eq!(page.dom.children(page.content_parent), page.blocks.clone());
    }

    #[test]
    fn lower_budget_never_hides_fewer(
        heights in heights(),
        a in 500.0..20_000.0f64,
        b in 500.0..20_000.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let hidden = |budget| compute_cut(&heights, budget).hidden_count;
        prop_assert!(hidden(low) >= hidden(high));
    }

    #[test]
    fn visible_extent_stays_within_one_block_of_budget(
        heights in heights(),
        budget in 500.0..20_000.0f64,
    ) {
        let mut page = conversation_page(&heights).unwrap();
        let mut state = WindowState::new(page.content_parent);
        let config = EngineConfig::default();
        let outcome = window::apply_window(
            &mut page.dom,
            &mut state,
            &config.window,
            &config.resolver,
            budget,
        )
        .unwrap();

        let largest = heights.iter().copied().fold(0.0, f64::max);
        prop_assert!(outcome.visible_extent <= budget + largest + 1e-6);
        let accounted = outcome.visible_extent + outcome.hidden_extent;
        prop_assert!((accounted - outcome.total_extent).abs() < 1e-6);
    }
}
