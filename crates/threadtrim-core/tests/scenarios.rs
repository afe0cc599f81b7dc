use rstest::rstest;
use threadtrim_core::config::{EngineConfig, LocatorConfig};
use threadtrim_core::locator::{self, Exclusion};
use threadtrim_core::placeholder;
use threadtrim_core::resolver;
use threadtrim_core::restore;
use threadtrim_core::test_utils::{ConversationPage, conversation_page, resident_blocks};
use threadtrim_core::window::{self, WindowOutcome, WindowState};
use threadtrim_dom::{ComputedStyle, HostDom, Layout, MemoryDom, Rect, Viewport};

fn apply(page: &mut ConversationPage, state: &mut WindowState, budget: f64) -> WindowOutcome {
    let config = EngineConfig::default();
    window::apply_window(&mut page.dom, state, &config.window, &config.resolver, budget).unwrap()
}

fn windowed(heights: &[f64], budget: f64) -> (ConversationPage, WindowState) {
    let mut page = conversation_page(heights).unwrap();
    let mut state = WindowState::new(page.content_parent);
    apply(&mut page, &mut state, budget);
    (page, state)
}

#[test]
fn long_conversation_hides_all_but_the_budget() {
    let (page, state) = windowed(&[1000.0; 15], 5000.0);
    let outcome = state.outcome();

    assert_eq!(outcome.hidden_count, 10);
    assert!((outcome.hidden_extent - 10_000.0).abs() < f64::EPSILON);
    assert!((outcome.visible_extent - 5000.0).abs() < f64::EPSILON);

    let children = page.dom.children(page.content_parent);
    assert_eq!(children.len(), 6);
    assert!(placeholder::is_placeholder(&page.dom, children[0]));
    assert_eq!(&children[1..], &page.blocks[10..]);
    assert_eq!(placeholder::hidden_count(&page.dom, children[0]), Some(10));
}

#[test]
fn short_conversation_is_left_alone() {
    let (page, state) = windowed(&[100.0; 5], 10_000.0);

    assert_eq!(state.outcome().hidden_count, 0);
    assert!(state.outcome().hidden_extent.abs() < f64::EPSILON);
    assert!(state.placeholder.is_none());
    assert_eq!(page.dom.children(page.content_parent), page.blocks);
}

#[rstest]
#[case::sidebar_sized_panel(0.0, 300.0)]
#[case::hugging_the_edge(8.0, 400.0)]
fn narrow_left_panel_never_wins(#[case] left: f64, #[case] width: f64) {
    let mut dom = MemoryDom::new(Viewport::new(1920.0, 1080.0), "/c/panel");
    let root = dom.root();
    let panel = dom.append_element(root, "div", "overflow-y-auto").unwrap();
    dom.set_layout(
        panel,
        Layout::from_rect(Rect::new(left, 0.0, width, 1080.0)).with_scroll_height(50_000.0),
    )
    .unwrap();

    let config = LocatorConfig::default();
    let candidates = locator::collect_candidates(&dom, &config);
    let scored = locator::score_candidates(&dom, &candidates, &config);

    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].breakdown.exclusion, Some(Exclusion::NarrowLeftEdge));
    assert!(scored[0].score().abs() < f64::EPSILON);
    assert_eq!(locator::locate_container(&dom, &config), None);
}

#[rstest]
#[case::sidebar_class("app-sidebar overflow-y-auto", 1.0, Exclusion::SidebarClass)]
#[case::drawer_class("drawer scroll", 1.0, Exclusion::SidebarClass)]
#[case::fixed_width_column("overflow-auto", 0.0, Exclusion::FixedShrinkNarrow)]
fn panels_are_excluded_regardless_of_extent(
    #[case] class: &str,
    #[case] flex_shrink: f64,
    #[case] expected: Exclusion,
) {
    let mut dom = MemoryDom::new(Viewport::default(), "/c/panel");
    let root = dom.root();
    let panel = dom.append_element(root, "div", class).unwrap();
    dom.set_layout(
        panel,
        Layout::from_rect(Rect::new(600.0, 0.0, 700.0, 1080.0)).with_scroll_height(90_000.0),
    )
    .unwrap();
    dom.set_style(
        panel,
        ComputedStyle {
            flex_shrink,
            ..ComputedStyle::default()
        },
    )
    .unwrap();

    let config = LocatorConfig::default();
    let scored = locator::score_candidates(&dom, &[panel], &config);
    assert_eq!(scored[0].breakdown.exclusion, Some(expected));
    assert_eq!(locator::locate_container(&dom, &config), None);
}

#[test]
fn conversation_pane_beats_sidebar() {
    let page = conversation_page(&[1000.0; 8]).unwrap();
    let config = EngineConfig::default();

    let container = locator::locate_container(&page.dom, &config.locator);
    assert_eq!(container, Some(page.container));

    let resolved =
        resolver::resolve_content_parent(&page.dom, page.container, &config.resolver).unwrap();
    assert_eq!(resolved.node, page.content_parent);
    assert_eq!(resolved.block_count, 8);
}

#[test]
fn batch_restore_returns_blocks_nearest_the_placeholder() {
    let (mut page, mut state) = windowed(&[1000.0; 7], 2000.0);
    assert_eq!(state.ledger.len(), 5);

    let outcome = restore::restore_batch(&mut page.dom, &mut state, 3, None).unwrap();

    assert_eq!(outcome.restored, 3);
    assert_eq!(outcome.remaining, 2);
    assert_eq!(state.ledger.len(), 2);
    let children = page.dom.children(page.content_parent);
    assert!(placeholder::is_placeholder(&page.dom, children[0]));
    assert_eq!(&children[1..], &page.blocks[2..]);
    assert_eq!(placeholder::hidden_count(&page.dom, children[0]), Some(2));
}

#[rstest]
#[case::uniform(vec![1000.0; 15], 5000.0)]
#[case::uneven(vec![120.0, 4000.0, 80.0, 950.0, 2200.0, 40.0, 1800.0], 3000.0)]
#[case::single_giant(vec![30_000.0], 1000.0)]
fn repeated_apply_is_deterministic(#[case] heights: Vec<f64>, #[case] budget: f64) {
    let (mut page, mut state) = windowed(&heights, budget);
    let first = state.outcome();

    let second = apply(&mut page, &mut state, budget);

    assert_eq!(first, second);
    let resident = resident_blocks(&page.dom, page.content_parent);
    assert_eq!(resident.len(), heights.len() - second.hidden_count);
}
