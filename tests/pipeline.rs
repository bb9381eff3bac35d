use codonscan::{
    Codon, EndpointReport, LocalStore, ScanOrchestrator, ScanParams, ShardedStore,
    SimilarityModel, SimilarityParams, SkipReason,
};

fn model() -> SimilarityModel {
    SimilarityModel::new(SimilarityParams::default()).expect("default params are valid")
}

fn model_with_limit(match_limit: usize) -> SimilarityModel {
    SimilarityModel::new(SimilarityParams {
        match_limit,
        ..SimilarityParams::default()
    })
    .expect("params are valid")
}

#[test]
fn pure_diagonal_alignment_is_recovered() {
    let m = model();
    let seq = m.encode_chain("ACD");
    let store = LocalStore::new(seq.clone(), seq.clone());
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let outcome = orchestrator.run(&[EndpointReport::new(2, 2, 15)]);

    assert_eq!(outcome.accepted_count(), 1);
    assert!(outcome.skipped.is_empty());
    let alignment = &outcome.alignments[0];
    assert_eq!((alignment.start_main, alignment.start_match), (0, 0));
    assert_eq!((alignment.end_main, alignment.end_match), (2, 2));
    assert_eq!(m.amino_chain(&alignment.aligned_main), "ACD");
    assert_eq!(m.amino_chain(&alignment.aligned_match), "ACD");
    assert!(alignment.aligned_main.iter().all(|c| !c.is_gap()));
    assert_eq!(m.rescore(&alignment.aligned_main, &alignment.aligned_match), 15);
}

#[test]
fn substitution_alignment_is_recovered() {
    let m = model();
    // The middle codon of the main sequence codes a different amino acid,
    // so the full-length score is exact + dissimilar + exact.
    let main = m.encode_chain("AMD");
    let matched = m.encode_chain("ACD");
    let store = LocalStore::new(main, matched);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let outcome = orchestrator.run(&[EndpointReport::new(2, 2, 7)]);

    assert_eq!(outcome.accepted_count(), 1);
    let alignment = &outcome.alignments[0];
    assert_eq!((alignment.start_main, alignment.start_match), (0, 0));
    assert_eq!((alignment.end_main, alignment.end_match), (2, 2));
    assert_eq!(m.amino_chain(&alignment.aligned_main), "AMD");
    assert_eq!(m.amino_chain(&alignment.aligned_match), "ACD");
    assert!(alignment.aligned_main.iter().all(|c| !c.is_gap()));
    assert_eq!(m.rescore(&alignment.aligned_main, &alignment.aligned_match), 7);
}

#[test]
fn zero_length_match_resolves_at_the_end_point() {
    let m = model();
    let seq = m.encode_chain("A");
    let store = LocalStore::new(seq.clone(), seq);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let outcome = orchestrator.run(&[EndpointReport::new(0, 0, 5)]);

    assert_eq!(outcome.accepted_count(), 1);
    let alignment = &outcome.alignments[0];
    assert_eq!(alignment.start_main, alignment.end_main);
    assert_eq!(alignment.start_match, alignment.end_match);
    assert_eq!(alignment.len(), 1);
    assert!(!alignment.aligned_main[0].is_gap());
    assert!(!alignment.aligned_match[0].is_gap());
}

#[test]
fn gap_run_longer_than_the_match_limit_is_skipped() {
    // The only alignment of these sequences gaps four match codons against
    // the main sequence; a match limit of 2 keeps the band too narrow.
    let narrow = model_with_limit(2);
    let main = narrow.encode_chain("ACDEF");
    let matched = narrow.encode_chain("AMMMMCDEF");
    let goal = 5 - (5 + 4 * 2) + 4 * 5;
    let store = LocalStore::new(main, matched);
    let orchestrator = ScanOrchestrator::new(&narrow, &store, ScanParams::new(10, 5));

    let outcome = orchestrator.run(&[EndpointReport::new(4, 8, goal)]);

    assert_eq!(outcome.accepted_count(), 0);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, SkipReason::BandExhausted);
}

#[test]
fn gap_run_inside_the_band_is_reconstructed() {
    // Same sequences, wide enough band: the four-codon gap run lands in
    // the main sequence.
    let m = model_with_limit(10);
    let main = m.encode_chain("ACDEF");
    let matched = m.encode_chain("AMMMMCDEF");
    let goal = 5 - (5 + 4 * 2) + 4 * 5;
    let store = LocalStore::new(main, matched);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let outcome = orchestrator.run(&[EndpointReport::new(4, 8, goal)]);

    assert_eq!(outcome.accepted_count(), 1);
    let alignment = &outcome.alignments[0];
    assert_eq!((alignment.start_main, alignment.start_match), (0, 0));
    assert_eq!(m.amino_chain(&alignment.aligned_main), "A----CDEF");
    assert_eq!(m.amino_chain(&alignment.aligned_match), "AMMMMCDEF");
    assert_eq!(
        m.rescore(&alignment.aligned_main, &alignment.aligned_match),
        goal
    );
}

#[test]
fn accepted_starts_honor_the_minimum_separation() {
    let m = model();
    let seq = m.encode_chain("ACDEFGHIKLMN");
    let store = LocalStore::new(seq.clone(), seq);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let reports = [
        // Resolves to start (0, 0).
        EndpointReport::new(5, 5, 30),
        // Would also resolve to start (0, 0): rejected for separation.
        EndpointReport::new(6, 6, 35),
        // Resolves to start (5, 5), exactly the minimum separation away.
        EndpointReport::new(11, 11, 35),
    ];
    let outcome = orchestrator.run(&reports);

    assert_eq!(outcome.accepted_count(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].report, 1);
    assert_eq!(outcome.skipped[0].reason, SkipReason::SeparationConflict);

    for (i, a) in outcome.alignments.iter().enumerate() {
        for b in outcome.alignments.iter().skip(i + 1) {
            let spread = a
                .start_main
                .abs_diff(b.start_main)
                .max(a.start_match.abs_diff(b.start_match));
            assert!(spread >= 5, "starts {a:?} and {b:?} are too close");
        }
    }
}

#[test]
fn report_loop_stops_at_max_reports() {
    let m = model();
    let seq = m.encode_chain("ACDEFGHIKLMN");
    let store = LocalStore::new(seq.clone(), seq);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(1, 5));

    let reports = [
        EndpointReport::new(5, 5, 30),
        EndpointReport::new(11, 11, 35),
    ];
    let outcome = orchestrator.run(&reports);

    // The second report is never scanned once the cap is reached.
    assert_eq!(outcome.accepted_count(), 1);
    assert_eq!(outcome.requested, 2);
    assert!(outcome.skipped.is_empty());
}

#[test]
fn identical_inputs_give_identical_outcomes() {
    let m = model();
    let main = m.encode_chain("AMDACDEFGHIK");
    let matched = m.encode_chain("ACDACDEFGHIK");
    let reports = [
        EndpointReport::new(11, 11, 40),
        EndpointReport::new(5, 5, 30),
        EndpointReport::new(2, 2, 7),
        EndpointReport::new(3, 3, 1000),
    ];

    let store = LocalStore::new(main, matched);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));
    let first = orchestrator.run(&reports);
    let second = orchestrator.run(&reports);

    assert_eq!(first, second);
}

#[test]
fn sharded_and_local_stores_agree() {
    let m = model();
    let seq = m.encode_chain("ACDEFGHIKLMN");
    let reports = [
        EndpointReport::new(5, 5, 30),
        EndpointReport::new(11, 11, 35),
    ];

    let local = LocalStore::new(seq.clone(), seq.clone());
    let local_outcome = ScanOrchestrator::new(&m, &local, ScanParams::new(10, 5)).run(&reports);

    let sharded =
        ShardedStore::in_process(seq.clone(), seq, 3).expect("twelve codons over three shards");
    let sharded_outcome =
        ScanOrchestrator::new(&m, &sharded, ScanParams::new(10, 5)).run(&reports);

    assert_eq!(local_outcome, sharded_outcome);
    assert_eq!(local_outcome.accepted_count(), 2);
}

#[test]
fn every_accepted_alignment_rescans_to_its_reported_score() {
    let m = model();
    let main = m.encode_chain("AMDACDEFGHIK");
    let matched = m.encode_chain("ACDACDEFGHIK");
    let store = LocalStore::new(main, matched);
    let orchestrator = ScanOrchestrator::new(&m, &store, ScanParams::new(10, 5));

    let reports = [
        EndpointReport::new(2, 2, 7),
        EndpointReport::new(11, 11, 40),
    ];
    let outcome = orchestrator.run(&reports);

    assert!(outcome.accepted_count() > 0);
    for alignment in &outcome.alignments {
        assert_eq!(
            m.rescore(&alignment.aligned_main, &alignment.aligned_match),
            alignment.score,
            "alignment {alignment:?} does not round-trip"
        );
    }
}

#[test]
fn gap_symbols_render_as_hyphens() {
    let m = model();
    assert_eq!(m.amino_chain(&[Codon::HYPHEN]), "-");
    assert_eq!(m.codon_chain(&[Codon::HYPHEN]), "---");
}
