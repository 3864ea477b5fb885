use approx::assert_relative_eq;
use ndarray::{Array2, array};
use rand::{Rng, SeedableRng};
use smi_drought::{
    DroughtConfig, DroughtError, DroughtFlag, cell_statistics, drought_indicator, event_statistics,
    sad_analysis, track_events,
};
use smi_grid::{GridMask, NODATA};

/// A 2×2 drought block growing to 3×3 is one event, not two.
#[test]
fn growing_block_is_one_event() {
    let mask = GridMask::all_valid(4, 4).unwrap();
    let mut smi = Array2::from_elem((16, 2), 0.6);
    for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        smi[[r * 4 + c, 0]] = 0.1;
    }
    for r in 0..3 {
        for c in 0..3 {
            smi[[r * 4 + c, 1]] = 0.1;
        }
    }

    let config = DroughtConfig::new()
        .with_threshold(0.2)
        .with_th_cell_clus(2)
        .with_n_cell_inter(2);
    let ind = drought_indicator(smi.view(), config.threshold()).unwrap();
    let reg = track_events(&mask, &ind, &config).unwrap();

    assert_eq!(reg.len(), 1);
    let event = &reg.events()[0];
    assert_eq!((event.start(), event.end()), (0, 1));
    assert_eq!(event.areas(), vec![4, 9]);
    assert_eq!(event.split_from(), None);
    assert_eq!(event.merged_into(), None);

    let ids = reg.cluster_ids();
    assert_eq!(ids.iter().filter(|&&id| id == 1).count(), 13);
    assert_eq!(ids[[15, 1]], 0);
}

/// Three events on a 1×5 strip with hand-computed SAD values.
#[test]
fn sad_percentiles_match_hand_computation() {
    let mask = GridMask::all_valid(1, 5).unwrap();
    let smi = array![
        [0.3, 0.1, 0.4, 0.8, 0.8],
        [0.4, 0.2, 0.5, 0.8, 0.8],
        [0.8, 0.8, 0.8, 0.8, 0.8],
        [0.2, 0.3, 0.8, 0.4, 0.0],
        [0.45, 0.35, 0.8, 0.1, 0.3],
    ];
    let config = DroughtConfig::new()
        .with_threshold(0.5)
        .with_sad_durations(vec![2, 3, 4])
        .with_delta_area(1)
        .with_sad_percentiles(vec![0.25, 0.5]);

    let ind = drought_indicator(smi.view(), config.threshold()).unwrap();
    let reg = track_events(&mask, &ind, &config).unwrap();
    assert_eq!(reg.len(), 3);
    let durations: Vec<usize> = reg.events().iter().map(|e| e.duration()).collect();
    assert_eq!(durations, vec![3, 2, 2]);

    let tables = sad_analysis(&reg, smi.view(), &config).unwrap();
    assert_eq!(tables.len(), 3);

    // D = 2: per-event values (area 1, area 2) are
    // (0.3, 0.25), (0.25, 0.175), (0.3, 0.3).
    let d2 = &tables[0];
    assert_eq!(d2.duration, 2);
    assert_eq!(d2.areas, vec![1, 2]);
    assert_eq!(d2.n_events, vec![3, 3]);
    assert_relative_eq!(d2.values[0][0], 0.275, epsilon = 1e-12);
    assert_relative_eq!(d2.values[0][1], 0.3, epsilon = 1e-12);
    assert_relative_eq!(d2.values[1][0], 0.2125, epsilon = 1e-12);
    assert_relative_eq!(d2.values[1][1], 0.25, epsilon = 1e-12);

    // D = 3: only the first event is long enough.
    let d3 = &tables[1];
    assert_eq!(d3.n_events, vec![1, 1]);
    assert_relative_eq!(d3.values[0][1], 0.7 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(d3.values[1][1], 1.1 / 6.0, epsilon = 1e-12);

    // D = 4: no event qualifies.
    assert!(tables[2].areas.is_empty());
}

#[test]
fn sad_area_bins_follow_delta_area() {
    let mask = GridMask::all_valid(1, 5).unwrap();
    let smi = Array2::from_elem((5, 3), 0.1);
    let config = DroughtConfig::new()
        .with_sad_durations(vec![1])
        .with_delta_area(2);
    let ind = drought_indicator(smi.view(), config.threshold()).unwrap();
    let reg = track_events(&mask, &ind, &config).unwrap();
    let tables = sad_analysis(&reg, smi.view(), &config).unwrap();
    assert_eq!(tables[0].areas, vec![2, 4]);
    for row in &tables[0].values {
        for v in row {
            assert_relative_eq!(*v, 0.1, epsilon = 1e-12);
        }
    }
}

#[test]
fn sad_rejects_threshold_other_than_the_registry() {
    let mask = GridMask::all_valid(1, 2).unwrap();
    let smi = Array2::from_elem((2, 2), 0.1);
    let config = DroughtConfig::new().with_sad_durations(vec![1]).with_delta_area(1);
    let ind = drought_indicator(smi.view(), config.threshold()).unwrap();
    let reg = track_events(&mask, &ind, &config).unwrap();

    let tables = sad_analysis(&reg, smi.view(), &config).unwrap();
    assert_relative_eq!(tables[0].values[0][0], 0.1, epsilon = 1e-12);

    let lower = config.clone().with_threshold(0.05);
    assert!(matches!(
        sad_analysis(&reg, smi.view(), &lower),
        Err(DroughtError::InvalidConfig { .. })
    ));
}

/// Random fields: clusters never fall below the minimum size, no-data cells
/// never join an event, and statistics agree with the registry.
#[test]
fn random_fields_respect_cluster_invariants() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let (rows, cols, steps) = (12, 15, 30);
    let mask = GridMask::all_valid(rows, cols).unwrap();
    let smi = Array2::from_shape_simple_fn((rows * cols, steps), || {
        if rng.random_bool(0.05) {
            NODATA
        } else {
            rng.random::<f64>()
        }
    });

    let config = DroughtConfig::new()
        .with_threshold(0.3)
        .with_th_cell_clus(3)
        .with_n_cell_inter(2);
    let ind = drought_indicator(smi.view(), config.threshold()).unwrap();
    let reg = track_events(&mask, &ind, &config).unwrap();
    assert!(!reg.is_empty());

    for event in reg.events() {
        for (t, cells) in event.steps() {
            assert!(cells.len() >= 3, "event {} too small at {t}", event.id());
            for &c in cells {
                assert_eq!(ind.flag(c, t), DroughtFlag::Drought);
                assert_eq!(reg.cluster_ids()[[c, t]], event.id());
            }
        }
    }
    for ((c, t), &id) in reg.cluster_ids().indexed_iter() {
        if ind.flag(c, t) == DroughtFlag::NoData {
            assert_eq!(id, 0);
        }
    }

    let stats = event_statistics(&reg, smi.view()).unwrap();
    for (s, e) in stats.iter().zip(reg.events()) {
        assert_eq!(s.duration, e.duration());
        assert!(s.severity > 0.0);
        assert!(s.magnitude > 0.0 && s.magnitude <= config.threshold());
    }

    let cells = cell_statistics(&ind, smi.view()).unwrap();
    assert_eq!(cells.n_spells.len(), rows * cols);
    assert!(cells.drought_fraction.iter().all(|f| (0.0..=1.0).contains(f)));
}
