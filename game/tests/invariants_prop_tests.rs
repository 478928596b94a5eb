use matchgrid::cascade::CascadeStepKind;
use matchgrid::hint::find_chain;
use matchgrid::selection::SelectionState;
use matchgrid::{ColorId, GridConfig, MatchSession, Position};
use proptest::prelude::*;

fn config(width: usize, height: usize, colors: u8, min_chain: usize, seed: u64) -> GridConfig {
    GridConfig {
        width,
        height,
        min_chain_length: min_chain,
        moves_per_game: 30,
        palette: (0..colors).map(ColorId).collect(),
        seed: Some(seed),
    }
}

fn assert_chain_valid(session: &MatchSession) {
    let chain = session.chain();
    for (i, &cell) in chain.iter().enumerate() {
        assert!(session.grid().is_active(cell), "inactive cell {cell} in chain");
        assert!(!chain[..i].contains(&cell), "duplicate cell {cell} in chain");
    }
    for pair in chain.windows(2) {
        assert!(pair[0].is_adjacent(pair[1]), "{} and {} not adjacent", pair[0], pair[1]);
        assert_eq!(
            session.grid().color_at(pair[0]),
            session.grid().color_at(pair[1])
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn new_grids_are_full_and_run_free(
        width in 2usize..=12,
        height in 2usize..=6,
        colors in 3u8..=6,
        seed in any::<u64>(),
    ) {
        let session = MatchSession::new(config(width, height, colors, 1, seed), Vec::new()).unwrap();
        prop_assert_eq!(session.grid().active_count(), width * height);
        prop_assert!(!session.grid().has_runs(), "runs in\n{}", session.grid());
    }

    #[test]
    fn random_pointer_input_keeps_chain_valid(
        seed in any::<u64>(),
        taps in prop::collection::vec((0usize..6, 0usize..5, any::<bool>()), 1..80),
    ) {
        let mut session = MatchSession::new(config(6, 5, 4, 3, seed), Vec::new()).unwrap();
        for (col, row, release) in taps {
            session.pointer_down(Position::new(col, row));
            assert_chain_valid(&session);
            if release {
                session.pointer_up();
                session.settle();
                prop_assert_eq!(session.selection_state(), SelectionState::Idle);
                prop_assert!(session.chain().is_empty());
            }
        }
    }

    #[test]
    fn cascades_terminate_and_settle_run_free(
        width in 3usize..=8,
        height in 3usize..=6,
        colors in 3u8..=5,
        seed in any::<u64>(),
        gestures in 1usize..12,
    ) {
        let mut session = MatchSession::new(config(width, height, colors, 2, seed), Vec::new()).unwrap();
        for _ in 0..gestures {
            let Some(chain) = find_chain(session.grid(), 2) else {
                prop_assert!(session.reshuffle());
                continue;
            };
            for cell in chain {
                session.pointer_down(cell);
            }
            session.pointer_up();

            let mut clear_rounds = 0;
            let mut last = None;
            for step in session.cascade_steps() {
                if matches!(step.kind, CascadeStepKind::Cleared { .. }) {
                    clear_rounds += 1;
                }
                last = Some(step.kind);
            }
            prop_assert!(clear_rounds <= width * height);
            if let Some(kind) = last {
                prop_assert_eq!(kind, CascadeStepKind::Settled);
            }
            prop_assert!(!session.is_resolving());
            prop_assert_eq!(session.grid().active_count(), width * height);
            prop_assert!(!session.grid().has_runs(), "runs in\n{}", session.grid());
        }
    }

    #[test]
    fn moves_never_exceed_budget(seed in any::<u64>(), commits in 1usize..40) {
        let mut session = MatchSession::new(config(5, 4, 4, 1, seed), Vec::new()).unwrap();
        for _ in 0..commits {
            session.pointer_down(Position::new(2, 3));
            session.pointer_up();
            session.settle();
            prop_assert!(session.moves_remaining() >= 1);
            prop_assert!(session.moves_remaining() <= 30);
        }
    }
}
