//! End-to-end reorder scenarios driven through [`ReorderSurface`].
//!
//! Each test feeds canonical pointer/keyboard events, lets the surface run
//! the session, move engine and sync client, and then inspects the
//! collection, the requests the remote saw and the user notifications.

use ordo::prelude::*;
use ordo::sync::ROLLBACK_MESSAGE;
use ordo::{
    Axis, CommitOutcome, KeyCode, KeyEvent, MemoryRemote, NotificationLog, PointerButton,
    PointerEvent, PointerEventKind, PositionAssignment, TransportError,
};
use proptest::prelude::*;

type Surface = ReorderSurface<&'static str, MemoryRemote, NotificationLog>;

fn c(raw: u64) -> ContainerId {
    ContainerId::new(raw)
}

fn i(raw: u64) -> ItemId {
    ItemId::new(raw)
}

fn surface(collection: OrderedCollection<&'static str>, map: DropMap) -> Surface {
    surface_with(collection, map, &OrdoConfig::default())
}

fn surface_with(
    collection: OrderedCollection<&'static str>,
    map: DropMap,
    config: &OrdoConfig,
) -> Surface {
    let mut surface =
        Surface::new(collection, MemoryRemote::new(), NotificationLog::new(), config).unwrap();
    surface.set_drop_map(map);
    surface
}

/// One section holding items 1..=4, rows 50px apart.
fn single_list() -> Surface {
    let mut collection = OrderedCollection::new();
    collection
        .insert_container(c(1), ContainerKind::ListSection)
        .unwrap();
    let mut zone =
        DropZone::new(c(1), Rect::new(0.0, 0.0, 200.0, 200.0)).with_item_axis(Axis::Vertical);
    for (row, name) in ["one", "two", "three", "four"].into_iter().enumerate() {
        let id = i(row as u64 + 1);
        collection.push_item(c(1), id, name).unwrap();
        zone = zone.with_item(id, Rect::new(0.0, row as f64 * 50.0, 200.0, 40.0));
    }
    surface(collection, DropMap::default().with_zone(zone))
}

/// Two board columns: A = [1, 2], B = [3].
fn board() -> Surface {
    board_with(&OrdoConfig::default())
}

fn board_with(config: &OrdoConfig) -> Surface {
    let mut collection = OrderedCollection::new();
    for container in [c(1), c(2)] {
        collection
            .insert_container(container, ContainerKind::BoardList)
            .unwrap();
    }
    collection.push_item(c(1), i(1), "card 1").unwrap();
    collection.push_item(c(1), i(2), "card 2").unwrap();
    collection.push_item(c(2), i(3), "card 3").unwrap();

    let a = DropZone::new(c(1), Rect::new(0.0, 0.0, 200.0, 300.0))
        .with_item(i(1), Rect::new(10.0, 10.0, 180.0, 40.0))
        .with_item(i(2), Rect::new(10.0, 60.0, 180.0, 40.0));
    let b = DropZone::new(c(2), Rect::new(220.0, 0.0, 200.0, 300.0))
        .with_item(i(3), Rect::new(230.0, 10.0, 180.0, 40.0));
    surface_with(collection, DropMap::default().with_zone(a).with_zone(b), config)
}

fn down(x: f64, y: f64) -> Event {
    Event::Pointer(PointerEvent::new(
        PointerEventKind::Down(PointerButton::Primary),
        x,
        y,
    ))
}

fn move_to(x: f64, y: f64) -> Event {
    Event::Pointer(PointerEvent::new(PointerEventKind::Move, x, y))
}

fn up(x: f64, y: f64) -> Event {
    Event::Pointer(PointerEvent::new(
        PointerEventKind::Up(PointerButton::Primary),
        x,
        y,
    ))
}

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code))
}

fn order(surface: &Surface, container: ContainerId) -> Vec<u64> {
    surface
        .collection()
        .items_of(container)
        .unwrap()
        .iter()
        .map(|id| id.get())
        .collect()
}

#[test]
fn reorder_within_one_list() {
    let mut surface = single_list();
    surface.handle(&down(100.0, 120.0));
    surface.handle(&move_to(100.0, 60.0));
    surface.handle(&move_to(100.0, 5.0));
    let event = surface.handle(&up(100.0, 5.0));

    let SurfaceEvent::Committed {
        result, outcome, ..
    } = event
    else {
        panic!("expected a committed drop, got {event:?}");
    };
    assert!(matches!(outcome, CommitOutcome::Dispatched(_)));
    assert_eq!(result.to, ordo::Slot::new(c(1), 0));
    assert_eq!(order(&surface, c(1)), vec![3, 1, 2, 4]);
    assert!(surface.collection().check_invariants().is_clean());

    let requests = surface.remote().requests();
    assert_eq!(requests.len(), 1);
    let mut written: Vec<(u64, usize)> = requests[0]
        .items
        .iter()
        .map(|assignment| (assignment.id.get(), assignment.position))
        .collect();
    written.sort_unstable();
    assert_eq!(written, vec![(1, 1), (2, 2), (3, 0)]);
}

#[test]
fn move_across_containers_to_end() {
    let mut surface = board();
    surface.handle(&down(100.0, 30.0));
    surface.handle(&move_to(300.0, 30.0));
    surface.handle(&move_to(300.0, 200.0));
    let event = surface.handle(&up(300.0, 200.0));

    let SurfaceEvent::Committed { result, .. } = event else {
        panic!("expected a committed drop, got {event:?}");
    };
    assert!(result.is_relocation());
    assert_eq!(order(&surface, c(1)), vec![2]);
    assert_eq!(order(&surface, c(2)), vec![3, 1]);
    assert_eq!(
        surface.collection().item(i(1)).unwrap().container(),
        c(2)
    );

    let mut written = surface.remote().requests()[0].items.clone();
    written.sort_by_key(|assignment| assignment.id);
    assert_eq!(
        written,
        vec![
            PositionAssignment::new(i(1), c(2), 1),
            PositionAssignment::new(i(2), c(1), 0),
        ]
    );
}

#[test]
fn short_press_is_a_click() {
    let mut surface = board();
    surface.handle(&down(100.0, 30.0));
    surface.handle(&move_to(102.0, 30.0));
    let event = surface.handle(&up(102.0, 30.0));

    assert_eq!(event.clicked(), Some(i(1)));
    assert_eq!(order(&surface, c(1)), vec![1, 2]);
    assert_eq!(order(&surface, c(2)), vec![3]);
    assert!(surface.remote().requests().is_empty());
    assert!(!surface.session().is_active());
}

#[test]
fn failed_write_rolls_back_and_notifies() {
    let mut surface = board();
    surface
        .remote_mut()
        .fail_next(TransportError::Network("connection reset".into()));

    surface.handle(&down(100.0, 80.0));
    surface.handle(&move_to(100.0, 40.0));
    surface.handle(&move_to(100.0, 15.0));
    surface.handle(&up(100.0, 15.0));
    assert_eq!(order(&surface, c(1)), vec![2, 1], "optimistic order shown");

    let (commit, outcome) = surface.remote_mut().next_response().unwrap();
    let resolution = surface.acknowledge(commit, outcome);

    assert!(matches!(resolution, Resolution::RolledBack { .. }));
    assert_eq!(order(&surface, c(1)), vec![1, 2]);
    assert_eq!(surface.notifications().messages(), [ROLLBACK_MESSAGE]);
    assert!(surface.collection().check_invariants().is_clean());
}

#[test]
fn drop_refused_at_pending_limit_leaves_board_alone() {
    let mut config = OrdoConfig::default();
    config.sync.max_pending = 1;
    let mut surface = board_with(&config);

    surface.handle(&down(100.0, 80.0));
    surface.handle(&move_to(100.0, 15.0));
    surface.handle(&up(100.0, 15.0));
    assert_eq!(order(&surface, c(1)), vec![2, 1]);

    // Card 3 into column A while the first write is still in flight.
    surface.handle(&down(300.0, 30.0));
    surface.handle(&move_to(100.0, 200.0));
    let event = surface.handle(&up(100.0, 200.0));

    assert!(matches!(event, SurfaceEvent::DropFailed { .. }), "{event:?}");
    assert_eq!(order(&surface, c(1)), vec![2, 1]);
    assert_eq!(order(&surface, c(2)), vec![3]);
    assert_eq!(surface.notifications().messages(), [ordo::DROP_FAILED_MESSAGE]);
    assert_eq!(surface.remote().requests().len(), 1);
    assert!(!surface.session().is_active());

    // Once the first write resolves, the same gesture goes through.
    let (commit, outcome) = surface.remote_mut().next_response().unwrap();
    surface.acknowledge(commit, outcome);
    surface.handle(&down(300.0, 30.0));
    surface.handle(&move_to(100.0, 200.0));
    let event = surface.handle(&up(100.0, 200.0));
    assert!(matches!(event, SurfaceEvent::Committed { .. }), "{event:?}");
    assert_eq!(order(&surface, c(1)), vec![2, 1, 3]);
}

#[test]
fn successful_write_keeps_optimistic_order() {
    let mut surface = board();
    surface.handle(&down(100.0, 80.0));
    surface.handle(&move_to(100.0, 15.0));
    surface.handle(&up(100.0, 15.0));

    let (commit, outcome) = surface.remote_mut().next_response().unwrap();
    assert_eq!(
        surface.acknowledge(commit, outcome),
        Resolution::Confirmed {
            commit,
            adopted: false
        }
    );
    assert_eq!(order(&surface, c(1)), vec![2, 1]);
    assert!(surface.notifications().is_empty());
    assert_eq!(surface.sync().pending_len(), 0);
}

#[test]
fn keyboard_moves_card_to_next_column() {
    let mut surface = board();
    surface.set_focus(Some(i(2)));
    surface.handle(&key(KeyCode::Char(' ')));
    surface.handle(&key(KeyCode::Right));
    let event = surface.handle(&key(KeyCode::Char(' ')));

    assert!(matches!(event, SurfaceEvent::Committed { .. }));
    assert_eq!(order(&surface, c(1)), vec![1]);
    assert!(order(&surface, c(2)).contains(&2));
    assert_eq!(surface.focus(), Some(i(2)));
}

#[test]
fn drop_outside_every_container_changes_nothing() {
    let mut surface = board();
    surface.handle(&down(100.0, 30.0));
    surface.handle(&move_to(600.0, 30.0));
    let event = surface.handle(&up(600.0, 30.0));

    assert!(matches!(
        event.transition().map(|t| t.effect),
        Some(DragEffect::DropRejected { .. })
    ));
    assert_eq!(order(&surface, c(1)), vec![1, 2]);
    assert!(surface.remote().requests().is_empty());
}

#[test]
fn interleaved_commits_resolve_out_of_order() {
    let mut surface = board();
    surface
        .remote_mut()
        .script(Ok(ordo::WriteAck::ok()))
        .fail_next(TransportError::Timeout);

    // First: card 2 to the top of A. Second: card 3 to the end of A.
    surface.handle(&down(100.0, 80.0));
    surface.handle(&move_to(100.0, 15.0));
    surface.handle(&up(100.0, 15.0));
    surface.handle(&down(300.0, 30.0));
    surface.handle(&move_to(100.0, 200.0));
    surface.handle(&up(100.0, 200.0));
    assert_eq!(order(&surface, c(1)).len(), 3);
    assert!(order(&surface, c(2)).is_empty());

    let mut responses = surface.remote_mut().drain_responses();
    let (second, second_outcome) = responses.pop().unwrap();
    let (first, first_outcome) = responses.pop().unwrap();

    assert!(matches!(
        surface.acknowledge(second, second_outcome),
        Resolution::RolledBack { replayed: 0, .. }
    ));
    assert_eq!(order(&surface, c(1)), vec![2, 1]);
    assert_eq!(order(&surface, c(2)), vec![3]);

    assert!(matches!(
        surface.acknowledge(first, first_outcome),
        Resolution::Confirmed { .. }
    ));
    assert_eq!(order(&surface, c(1)), vec![2, 1]);
    assert_eq!(surface.notifications().messages().len(), 1);
}

// ── Properties ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Down(f64, f64),
    Move(f64, f64),
    Up(f64, f64),
    Key(KeyCode),
    Deliver(bool),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let coord = (0.0f64..460.0, 0.0f64..320.0);
    prop_oneof![
        coord.clone().prop_map(|(x, y)| Step::Down(x, y)),
        coord.clone().prop_map(|(x, y)| Step::Move(x, y)),
        coord.prop_map(|(x, y)| Step::Up(x, y)),
        prop::sample::select(vec![
            KeyCode::Char(' '),
            KeyCode::Enter,
            KeyCode::Escape,
            KeyCode::Up,
            KeyCode::Down,
            KeyCode::Left,
            KeyCode::Right,
            KeyCode::Tab,
        ])
        .prop_map(Step::Key),
        any::<bool>().prop_map(Step::Deliver),
    ]
}

proptest! {
    #[test]
    fn arbitrary_input_keeps_the_board_consistent(
        steps in prop::collection::vec(step_strategy(), 0..60),
    ) {
        let mut surface = board();
        let mut confirmed_any = false;
        for step in steps {
            match step {
                Step::Down(x, y) => { surface.handle(&down(x, y)); }
                Step::Move(x, y) => { surface.handle(&move_to(x, y)); }
                Step::Up(x, y) => { surface.handle(&up(x, y)); }
                Step::Key(code) => { surface.handle(&key(code)); }
                Step::Deliver(ok) => {
                    if let Some((commit, outcome)) = surface.remote_mut().next_response() {
                        let outcome = if ok { outcome } else { Err(TransportError::Timeout) };
                        if matches!(surface.acknowledge(commit, outcome), Resolution::Confirmed { .. }) {
                            confirmed_any = true;
                        }
                    }
                }
            }
            prop_assert!(surface.collection().check_invariants().is_clean());
            prop_assert_eq!(surface.collection().item_count(), 3);
        }

        for (commit, _) in surface.remote_mut().drain_responses() {
            surface.acknowledge(commit, Err(TransportError::Timeout));
        }
        prop_assert_eq!(surface.sync().pending_len(), 0);
        prop_assert!(surface.collection().check_invariants().is_clean());
        if !confirmed_any {
            // Every write failed: the board is back where it started.
            prop_assert_eq!(order(&surface, c(1)), vec![1, 2]);
            prop_assert_eq!(order(&surface, c(2)), vec![3]);
        }
    }
}
