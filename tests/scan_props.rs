use proptest::prelude::*;

use codonscan::{
    Codon, EndpointReport, LocalStore, ScanOrchestrator, ScanParams, ShardedStore,
    SimilarityModel, SimilarityParams,
};

fn model() -> SimilarityModel {
    SimilarityModel::new(SimilarityParams::default()).expect("default params are valid")
}

fn codons(codes: &[u8]) -> Vec<Codon> {
    codes.iter().map(|&c| Codon(c)).collect()
}

proptest! {
    // Aligning a sequence against itself end-to-end scores one exact match
    // per codon, and the backward scan must walk the whole diagonal to
    // reach that goal.
    #[test]
    fn full_identity_alignment_round_trips(
        codes in proptest::collection::vec(0u8..64, 1..28),
    ) {
        let m = model();
        let seq = codons(&codes);
        let n = seq.len() as u64;
        let goal = 5 * seq.len() as i32;

        let store = LocalStore::new(seq.clone(), seq.clone());
        let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(4, 5));
        let outcome = orchestrator.run(&[EndpointReport::new(n - 1, n - 1, goal)]);

        prop_assert_eq!(outcome.accepted_count(), 1);
        let alignment = &outcome.alignments[0];
        prop_assert_eq!(alignment.start_main, 0);
        prop_assert_eq!(alignment.start_match, 0);
        prop_assert_eq!(alignment.len(), seq.len());
        prop_assert!(alignment.aligned_main.iter().all(|c| !c.is_gap()));
        prop_assert_eq!(
            m.rescore(&alignment.aligned_main, &alignment.aligned_match),
            goal
        );
    }

    // Arbitrary reports over arbitrary sequences: runs never panic, give
    // identical outcomes on a re-run, keep accepted starts separated and
    // re-score every accepted alignment to its reported goal.
    #[test]
    fn arbitrary_reports_are_deterministic_and_consistent(
        main_codes in proptest::collection::vec(0u8..64, 1..40),
        match_codes in proptest::collection::vec(0u8..64, 1..40),
        raw_reports in proptest::collection::vec((0usize..40, 0usize..40, -20i32..60), 0..6),
    ) {
        let m = model();
        let main = codons(&main_codes);
        let matched = codons(&match_codes);
        let reports: Vec<EndpointReport> = raw_reports
            .iter()
            .map(|&(e_main, e_match, score)| EndpointReport::new(
                (e_main % main.len()) as u64,
                (e_match % matched.len()) as u64,
                score,
            ))
            .collect();

        let store = LocalStore::new(main, matched);
        let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(3, 5));
        let first = orchestrator.run(&reports);
        let second = orchestrator.run(&reports);
        prop_assert_eq!(&first, &second);

        // Every processed report either produced an alignment or a skip
        // record, and the loop never overruns its cap.
        prop_assert!(first.accepted_count() + first.skipped.len() <= first.requested);
        prop_assert!(first.accepted_count() <= 3);

        for (i, a) in first.alignments.iter().enumerate() {
            prop_assert_eq!(
                m.rescore(&a.aligned_main, &a.aligned_match),
                a.score
            );
            for b in first.alignments.iter().skip(i + 1) {
                let spread = a
                    .start_main
                    .abs_diff(b.start_main)
                    .max(a.start_match.abs_diff(b.start_match));
                prop_assert!(spread >= 5, "starts too close: {:?} vs {:?}", a, b);
            }
        }
    }

    // The sharded backing is transparent: any run over in-process shards
    // matches the same run over flat local arrays.
    #[test]
    fn sharded_store_is_transparent(
        local_size in 1usize..8,
        shards in 1usize..5,
        seed_codes in proptest::collection::vec(0u8..64, 32),
        raw_reports in proptest::collection::vec((0usize..32, 0usize..32, -10i32..50), 0..4),
    ) {
        let m = model();
        let len = local_size * shards;
        let main: Vec<Codon> = (0..len).map(|i| Codon(seed_codes[i % 32])).collect();
        let matched: Vec<Codon> = (0..len).map(|i| Codon(seed_codes[(i * 7 + 3) % 32])).collect();
        let reports: Vec<EndpointReport> = raw_reports
            .iter()
            .map(|&(e_main, e_match, score)| EndpointReport::new(
                (e_main % len) as u64,
                (e_match % len) as u64,
                score,
            ))
            .collect();

        let local = LocalStore::new(main.clone(), matched.clone());
        let local_outcome =
            ScanOrchestrator::new(&m, &local, ScanParams::new(3, 5)).run(&reports);

        let sharded = ShardedStore::in_process(main, matched, shards)
            .expect("length is a multiple of the shard count");
        let sharded_outcome =
            ScanOrchestrator::new(&m, &sharded, ScanParams::new(3, 5)).run(&reports);

        prop_assert_eq!(local_outcome, sharded_outcome);
    }
}
