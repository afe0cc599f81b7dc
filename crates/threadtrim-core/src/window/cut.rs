use serde::Serialize;

/// Where to split a run of measured blocks.
///
/// Blocks `0..hidden_count` are detached, the rest stay resident. The budget
/// is soft: the resident tail may exceed it by less than one block, and the
/// newest block is never detached even when it alone exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPlan {
    /// Index of the last block to detach.
    pub cut_index: Option<usize>,
    pub hidden_count: usize,
    pub hidden_extent: f64,
    pub visible_extent: f64,
    pub total_extent: f64,
}

impl CutPlan {
    pub fn is_noop(&self) -> bool {
        self.hidden_count == 0
    }
}

/// Walks from the newest block backwards accumulating extent; the first block
/// that pushes the total strictly past `budget` and everything above it is cut.
pub fn compute_cut(heights: &[f64], budget: f64) -> CutPlan {
    let total_extent: f64 = heights.iter().sum();

    let mut accumulated = 0.0;
    let mut crossing = None;
    for (index, height) in heights.iter().enumerate().rev() {
        accumulated += height;
        if accumulated > budget {
            crossing = Some(index);
            break;
        }
    }

    let hidden_count = crossing.map_or(0, |index| (index + 1).min(heights.len().saturating_sub(1)));
    let hidden_extent: f64 = heights.iter().take(hidden_count).sum();

    CutPlan {
        cut_index: hidden_count.checked_sub(1),
        hidden_count,
        hidden_extent,
        visible_extent: total_extent - hidden_extent,
        total_extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_everything_above_the_crossing_block() {
        let plan = compute_cut(&[1000.0; 15], 5000.0);
        assert_eq!(plan.hidden_count, 10);
        assert_eq!(plan.cut_index, Some(9));
        assert!((plan.hidden_extent - 10_000.0).abs() < f64::EPSILON);
        assert!((plan.visible_extent - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn content_under_budget_is_a_noop() {
        let plan = compute_cut(&[100.0; 5], 10_000.0);
        assert!(plan.is_noop());
        assert_eq!(plan.cut_index, None);
        assert!((plan.visible_extent - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_budget_does_not_cut() {
        assert!(compute_cut(&[500.0, 500.0], 1000.0).is_noop());
    }

    #[test]
    fn newest_block_is_always_kept() {
        let plan = compute_cut(&[300.0, 300.0, 9000.0], 1000.0);
        assert_eq!(plan.hidden_count, 2);
        assert!((plan.visible_extent - 9000.0).abs() < f64::EPSILON);

        assert!(compute_cut(&[9000.0], 1000.0).is_noop());
        assert!(compute_cut(&[], 1000.0).is_noop());
    }

    #[test]
    fn uneven_blocks_keep_a_tail_within_budget() {
        let plan = compute_cut(&[700.0, 200.0, 600.0, 300.0, 400.0], 1000.0);
        // 400 + 300 = 700, + 600 crosses at index 2.
        assert_eq!(plan.hidden_count, 3);
        assert!((plan.visible_extent - 700.0).abs() < f64::EPSILON);
    }
}
