//! Integration tests for multi-step fold correctness and determinism.

use pyramid::{
    testdata, BlockReducer, LevelBands, PyramidBuilder, Reducer, ZoomConfig, ZoomLevel,
};

fn config(levels: Vec<ZoomLevel>) -> ZoomConfig {
    ZoomConfig {
        levels,
        max_block_cells: 65536,
        canopy_threshold: 30,
    }
}

fn three_level_config() -> ZoomConfig {
    config(vec![
        ZoomLevel { zoom: 2, resolution_m: 30.0 },
        ZoomLevel { zoom: 1, resolution_m: 60.0 },
        ZoomLevel { zoom: 0, resolution_m: 120.0 },
    ])
}

/// Collect every level a build emits, cloning the bands.
fn collect_levels(builder: &PyramidBuilder, native: LevelBands) -> Vec<(u32, LevelBands)> {
    let mut out = Vec::new();
    builder
        .build(native, |level| {
            out.push((level.zoom, level.bands.clone()));
            Ok(())
        })
        .unwrap();
    out
}

#[test]
fn stepwise_fold_matches_single_jump_for_sum() {
    // 4x4 -> 2x2 -> 1x1 must total the same as 4x4 -> 1x1 directly.
    let native = testdata::synthetic_bands(4, 4, 30.0).unwrap();
    let direct_reducer = BlockReducer::new(65536);
    let direct = direct_reducer
        .reduce(&native.quantity, 4, Reducer::Sum)
        .unwrap();

    let builder = PyramidBuilder::new(three_level_config());
    let levels = collect_levels(&builder, native);
    let folded = &levels.last().unwrap().1.quantity;

    assert_eq!(folded.width(), 1);
    assert_eq!(folded.get(0, 0), direct.get(0, 0));
}

#[test]
fn folded_totals_match_native_totals_per_destination_cell() {
    // Every coarsest-level cell must hold exactly the sum of the native
    // cells that spatially fall under it.
    let native = testdata::synthetic_bands(64, 64, 30.0).unwrap();
    let native_quantity = native.quantity.clone();

    let builder = PyramidBuilder::new(config(vec![
        ZoomLevel { zoom: 3, resolution_m: 30.0 },
        ZoomLevel { zoom: 2, resolution_m: 60.0 },
        ZoomLevel { zoom: 1, resolution_m: 120.0 },
        ZoomLevel { zoom: 0, resolution_m: 240.0 },
    ]));
    let levels = collect_levels(&builder, native);
    let coarsest = &levels.last().unwrap().1.quantity;
    assert_eq!(coarsest.width(), 8);

    for dest_row in 0..coarsest.height() {
        for dest_col in 0..coarsest.width() {
            let mut expected = 0.0f32;
            let mut any = false;
            for row in dest_row * 8..(dest_row + 1) * 8 {
                for col in dest_col * 8..(dest_col + 1) * 8 {
                    if let Some(v) = native_quantity.get(col, row) {
                        expected += v;
                        any = true;
                    }
                }
            }
            match coarsest.get(dest_col, dest_row) {
                Some(actual) => {
                    assert!(any, "aggregate present where no native cell was set");
                    let tolerance = expected.abs() * 1e-5 + 1e-3;
                    assert!(
                        (actual - expected).abs() <= tolerance,
                        "cell ({dest_col},{dest_row}): folded {actual} vs native {expected}"
                    );
                }
                None => assert!(!any, "aggregate unset over set native cells"),
            }
        }
    }
}

#[test]
fn repeated_builds_are_bit_identical() {
    let builder = PyramidBuilder::new(three_level_config());

    let first = collect_levels(&builder, testdata::synthetic_bands(32, 32, 30.0).unwrap());
    let second = collect_levels(&builder, testdata::synthetic_bands(32, 32, 30.0).unwrap());

    assert_eq!(first.len(), second.len());
    for ((zoom_a, bands_a), (zoom_b, bands_b)) in first.iter().zip(second.iter()) {
        assert_eq!(zoom_a, zoom_b);
        // NaN != NaN, so compare bit patterns.
        let bits = |grid: &loss_common::RasterGrid| {
            grid.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        };
        assert_eq!(bits(&bands_a.year), bits(&bands_b.year));
        assert_eq!(bits(&bands_a.quantity), bits(&bands_b.quantity));
        assert_eq!(bits(&bands_a.secondary), bits(&bands_b.secondary));
        assert_eq!(bits(&bands_a.uncertainty), bits(&bands_b.uncertainty));
    }
}

#[test]
fn year_band_stays_within_offset_range_at_all_levels() {
    let builder = PyramidBuilder::new(three_level_config());
    let levels = collect_levels(&builder, testdata::synthetic_bands(32, 32, 30.0).unwrap());

    for (zoom, bands) in &levels {
        for (_, _, year) in bands.year.valid_cells() {
            assert!(
                (1.0..=15.0).contains(&year),
                "zoom {zoom}: year {year} out of range"
            );
        }
    }
}
