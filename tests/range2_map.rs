use pretty_assertions::assert_eq;
use proptest::prelude::*;
use spantree::{Axis, Balance, Direction, Options, Range2Map, Span2};

const TEST_SIZE: usize = 600;

fn options_strategy() -> impl Strategy<Value = Options> {
    any::<bool>().prop_map(|red_black| {
        Options::default().balance(if red_black { Balance::RedBlack } else { Balance::Avl })
    })
}

fn axis_strategy() -> impl Strategy<Value = Axis> {
    any::<bool>().prop_map(|y| if y { Axis::Y } else { Axis::X })
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum Range2Op {
    /// Insert at the boundary with this index (extent included),
    /// addressed by the given axis.
    Insert(Axis, usize, i64, i64),
    Delete(Axis, usize),
    SetLengths(Axis, usize, i64, i64),
    Get(Axis, usize),
}

fn range2_op_strategy() -> impl Strategy<Value = Range2Op> {
    prop_oneof![
        5 => (axis_strategy(), any::<usize>(), 1_i64..8, 1_i64..8)
            .prop_map(|(a, i, x, y)| Range2Op::Insert(a, i, x, y)),
        3 => (axis_strategy(), any::<usize>()).prop_map(|(a, i)| Range2Op::Delete(a, i)),
        2 => (axis_strategy(), any::<usize>(), 1_i64..8, 1_i64..8)
            .prop_map(|(a, i, x, y)| Range2Op::SetLengths(a, i, x, y)),
        2 => (axis_strategy(), any::<usize>()).prop_map(|(a, i)| Range2Op::Get(a, i)),
    ]
}

/// Reference model: x/y length pairs and values in position order.
#[derive(Default)]
struct Model {
    spans: Vec<(i64, i64, u32)>,
}

impl Model {
    fn start_of(&self, index: usize, axis: Axis) -> i64 {
        self.spans[..index]
            .iter()
            .map(|&(x, y, _)| match axis {
                Axis::X => x,
                Axis::Y => y,
            })
            .sum()
    }

    fn extent(&self, axis: Axis) -> i64 {
        self.start_of(self.spans.len(), axis)
    }

    fn span_at(&self, index: usize) -> Span2 {
        Span2 {
            x_start: self.start_of(index, Axis::X),
            x_length: self.spans[index].0,
            y_start: self.start_of(index, Axis::Y),
            y_length: self.spans[index].1,
        }
    }
}

// ─── Model agreement ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of two-axis interval edits, addressed by
    /// a random axis each time, against a plain vector model.
    #[test]
    fn range2_ops_match_model(
        options in options_strategy(),
        ops in proptest::collection::vec(range2_op_strategy(), TEST_SIZE),
    ) {
        let mut map: Range2Map<u32> = Range2Map::with_options(options).unwrap();
        let mut model = Model::default();
        let mut next_id = 0_u32;

        for op in &ops {
            match *op {
                Range2Op::Insert(axis, i, x_length, y_length) => {
                    let index = i % (model.spans.len() + 1);
                    let start = model.start_of(index, axis);
                    map.insert(axis, start, x_length, y_length, next_id).unwrap();
                    model.spans.insert(index, (x_length, y_length, next_id));
                    next_id += 1;
                }
                Range2Op::Delete(axis, i) => {
                    if model.spans.is_empty() {
                        prop_assert_eq!(map.try_delete(axis, 0), None);
                    } else {
                        let index = i % model.spans.len();
                        let start = model.start_of(index, axis);
                        let (.., value) = model.spans.remove(index);
                        prop_assert_eq!(map.try_delete(axis, start), Some(value));
                    }
                }
                Range2Op::SetLengths(axis, i, x_length, y_length) => {
                    if !model.spans.is_empty() {
                        let index = i % model.spans.len();
                        let start = model.start_of(index, axis);
                        map.set_lengths(axis, start, x_length, y_length).unwrap();
                        let value = model.spans[index].2;
                        model.spans[index] = (x_length, y_length, value);
                    }
                }
                Range2Op::Get(axis, i) => {
                    if !model.spans.is_empty() {
                        let index = i % model.spans.len();
                        let start = model.start_of(index, axis);
                        let expected = model.span_at(index);
                        let (span, &value) = map.try_get(axis, start).unwrap();
                        prop_assert_eq!(span, expected);
                        prop_assert_eq!(value, model.spans[index].2);
                    }
                }
            }
            prop_assert_eq!(map.extent(Axis::X), model.extent(Axis::X));
            prop_assert_eq!(map.extent(Axis::Y), model.extent(Axis::Y));
            prop_assert_eq!(map.len(), model.spans.len());
        }

        // Iterator, fast cursor, and robust cursors on both axes agree.
        let reference: Vec<(Span2, u32)> = (0..model.spans.len())
            .map(|i| (model.span_at(i), model.spans[i].2))
            .collect();
        let iterated: Vec<(Span2, u32)> = map.iter().map(|(s, &v)| (s, v)).collect();
        prop_assert_eq!(&iterated, &reference);

        let mut cursor = map.fast_cursor(Direction::Backward);
        let mut backward = Vec::new();
        while let Some((s, &v)) = map.fast_next(&mut cursor).unwrap() {
            backward.push((s, v));
        }
        backward.reverse();
        prop_assert_eq!(&backward, &reference);

        for axis in [Axis::X, Axis::Y] {
            let mut cursor = map.robust_cursor(axis, Direction::Forward);
            let mut robust = Vec::new();
            while let Some((s, &v)) = map.robust_next(&mut cursor) {
                robust.push((s, v));
            }
            prop_assert_eq!(&robust, &reference);
        }
    }
}

// ─── Directed scenarios ───────────────────────────────────────────────────────

#[test]
fn axes_are_addressable_interchangeably() {
    let mut map = Range2Map::new();
    // A text layout: entries are lines, x is characters, y is rows.
    map.insert(Axis::X, 0, 40, 1, "first line").unwrap();
    map.insert(Axis::X, 40, 25, 1, "second line").unwrap();
    map.insert(Axis::Y, 2, 60, 3, "wrapped paragraph").unwrap();

    assert_eq!(map.extent(Axis::X), 125);
    assert_eq!(map.extent(Axis::Y), 5);

    // Row 3 is inside the wrapped paragraph.
    let (span, value) = map.nearest_less_or_equal(Axis::Y, 3).unwrap();
    assert_eq!(*value, "wrapped paragraph");
    assert_eq!(span.x_start, 65);
    assert_eq!(span.y_length, 3);

    // Character 50 is in the second line, which starts at row 1.
    let (span, value) = map.nearest_less_or_equal(Axis::X, 50).unwrap();
    assert_eq!(*value, "second line");
    assert_eq!(span.y_start, 1);
}

#[test]
fn deleting_by_one_axis_updates_both() {
    let mut map = Range2Map::new();
    map.insert(Axis::X, 0, 10, 2, "a").unwrap();
    map.insert(Axis::X, 10, 20, 3, "b").unwrap();
    map.insert(Axis::X, 30, 5, 1, "c").unwrap();

    assert_eq!(map.try_delete(Axis::Y, 2), Some("b"));
    assert_eq!(map.extent(Axis::X), 15);
    assert_eq!(map.extent(Axis::Y), 3);

    let (span, value) = map.get(Axis::X, 10).unwrap();
    assert_eq!(*value, "c");
    assert_eq!(span.y_start, 2);
}
