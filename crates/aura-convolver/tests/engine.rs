//! Engine integration tests
//!
//! Drives the convolver family end to end:
//! - impulse/FIR scenarios with literal expected outputs, through the
//!   block adapter (which adds its one-block priming latency)
//! - the algebraic properties the engine guarantees: linearity, time
//!   invariance, unity gain for any FFT back-end, routing sparsity
//! - cross-fade and interpolation behaviour over whole transitions

use aura_convolver::fft::create_fft_backend;
use aura_convolver::{
    BlockAdapter, CoreConvolver, CrossfadingConvolver, FilterRouting, InterpolatingConvolver,
    InterpolationParameter, MultichannelConvolver, RoutingList,
};
use aura_core::AlignedMatrix;
use aura_vector::{initialise_library, uninitialise_library, BackendHint};
use num_complex::Complex;

fn filters_from(rows: &[&[f32]]) -> AlignedMatrix<f32> {
    AlignedMatrix::from_rows(rows, 4).unwrap()
}

fn mono_convolver(
    block: usize,
    taps: &[f32],
    alignment: usize,
    backend: &str,
) -> MultichannelConvolver<f32> {
    let filters = filters_from(&[taps]);
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    MultichannelConvolver::new(
        1,
        1,
        block,
        taps.len(),
        4,
        1,
        &routings,
        Some(&filters),
        alignment,
        backend,
    )
    .unwrap()
}

fn run_block(conv: &mut MultichannelConvolver<f32>, input: &[f32]) -> Vec<f32> {
    let block = conv.block_length();
    let mut output = vec![0.0f32; block];
    conv.process(input, block, &mut output, block, 0).unwrap();
    output
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < tolerance, "{actual:?} != {expected:?}");
    }
}

// ============ Literal Scenarios ============

/// Impulse identity through the adapter: one block of priming latency,
/// then the impulse, then silence.
#[test]
fn scenario_impulse_identity_through_adapter() {
    let conv = mono_convolver(4, &[1.0, 0.0, 0.0, 0.0], 2, "default");
    let mut adapter = BlockAdapter::new(conv).unwrap();
    let blocks = [
        [1.0f32, 0.0, 0.0, 0.0],
        [0.0; 4],
        [0.0; 4],
        [0.0; 4],
        [0.0; 4],
    ];
    let expected = [
        [0.0f32; 4],
        [1.0, 0.0, 0.0, 0.0],
        [0.0; 4],
        [0.0; 4],
        [0.0; 4],
    ];
    let mut output = [0.0f32; 4];
    for (input, want) in blocks.iter().zip(&expected) {
        adapter
            .process(&[&input[..]], &mut [&mut output[..]], 4)
            .unwrap();
        assert_close(&output, want, 1e-5);
    }
}

/// An FIR straddling two partitions appears spread over two blocks.
#[test]
fn scenario_fir_straddling_partitions() {
    let conv = mono_convolver(4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 2, "default");
    let mut adapter = BlockAdapter::new(conv).unwrap();
    let mut feed = |input: [f32; 4]| {
        let mut output = [0.0f32; 4];
        adapter
            .process(&[&input[..]], &mut [&mut output[..]], 4)
            .unwrap();
        output
    };
    assert_close(&feed([1.0, 0.0, 0.0, 0.0]), &[0.0; 4], 1e-5);
    assert_close(&feed([0.0; 4]), &[1.0, 2.0, 3.0, 4.0], 1e-4);
    assert_close(&feed([0.0; 4]), &[5.0, 6.0, 7.0, 8.0], 1e-4);
    assert_close(&feed([0.0; 4]), &[0.0; 4], 1e-4);
}

/// Two-input / two-output mix with per-route gains.
#[test]
fn scenario_two_by_two_mix() {
    let taps = [0.5f32];
    let filters = filters_from(&[&taps]);
    let routings = RoutingList::new(vec![
        FilterRouting::new(0, 0, 0, 1.0),
        FilterRouting::new(1, 0, 0, 1.0),
        FilterRouting::new(0, 1, 0, -1.0),
    ]);
    let mut conv = MultichannelConvolver::<f32>::new(
        2, 2, 2, 1, 4, 1, &routings, Some(&filters), 2, "default",
    )
    .unwrap();

    let x0 = [[1.0f32, 1.0], [1.0, 1.0]];
    let x1 = [[1.0f32, -1.0], [1.0, -1.0]];
    for block in 0..2 {
        let mut out0 = [0.0f32; 2];
        let mut out1 = [0.0f32; 2];
        conv.process_split(
            &[&x0[block], &x1[block]],
            &mut [&mut out0[..], &mut out1[..]],
        )
        .unwrap();
        // out0 = 0.5 * (x0 + x1), out1 = -0.5 * x0
        assert_close(&out0, &[1.0, 0.0], 1e-5);
        assert_close(&out1, &[-0.5, -0.5], 1e-5);
    }
}

/// A completed cross-fade: the switch block mixes with the equal-gain
/// ramp, every later block is the new filter alone.
#[test]
fn scenario_crossfade_completeness() {
    let taps = [1.0f32, 0.0, 0.0, 0.0];
    let filters = filters_from(&[&taps]);
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    let mut conv = CrossfadingConvolver::<f32>::new(
        1, 1, 4, 4, 1, 1, 4, &routings, Some(&filters), 2, "default",
    )
    .unwrap();
    assert_eq!(conv.transition_blocks(), 1);

    let x = [4.0f32, 8.0, -4.0, 2.0];
    let mut output = [0.0f32; 4];
    conv.process(&x, 4, &mut output, 4, 0).unwrap();
    assert_close(&output, &x, 1e-5);

    conv.set_impulse_response(&[2.0, 0.0, 0.0, 0.0], 0, 0).unwrap();
    conv.process(&x, 4, &mut output, 4, 0).unwrap();
    let fade_out = [1.0f32, 0.75, 0.5, 0.25];
    let fade_in = [0.0f32, 0.25, 0.5, 0.75];
    let expected: Vec<f32> = (0..4)
        .map(|i| x[i] * fade_out[i] + 2.0 * x[i] * fade_in[i])
        .collect();
    assert_close(&output, &expected, 1e-5);

    for _ in 0..3 {
        conv.process(&x, 4, &mut output, 4, 0).unwrap();
        let doubled: Vec<f32> = x.iter().map(|v| 2.0 * v).collect();
        assert_close(&output, &doubled, 1e-5);
    }
}

/// Interpolation linearity through the adapter: the K=2 weighted
/// combination of two shifted impulses is their weighted sum, one block
/// after the adapter's priming latency.
#[test]
fn scenario_interpolation_linearity() {
    let f0 = [1.0f32, 0.0, 0.0, 0.0];
    let f1 = [0.0f32, 1.0, 0.0, 0.0];
    let prototypes = filters_from(&[&f0, &f1]);
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    let interpolant =
        InterpolationParameter::from_parts(0, vec![0, 1], vec![0.25, 0.75]).unwrap();
    let conv = InterpolatingConvolver::<f32>::new(
        1,
        1,
        4,
        4,
        1,
        2,
        2,
        0,
        &routings,
        &[interpolant],
        Some(&prototypes),
        2,
        "default",
    )
    .unwrap();
    let mut adapter = BlockAdapter::new(conv).unwrap();

    let mut output = [0.0f32; 4];
    adapter
        .process(&[&[1.0, 0.0, 0.0, 0.0][..]], &mut [&mut output[..]], 4)
        .unwrap();
    assert_close(&output, &[0.0; 4], 1e-5);
    adapter
        .process(&[&[0.0; 4][..]], &mut [&mut output[..]], 4)
        .unwrap();
    assert_close(&output, &[0.25, 0.75, 0.0, 0.0], 1e-5);
}

/// Arbitrary host frame counts: six calls of 3 frames equal the inner
/// block outputs delayed by the primed block.
#[test]
fn scenario_flexible_block_sizes() {
    let samples: Vec<f32> = (0..18).map(|i| ((i * 7 % 5) as f32) - 2.0).collect();

    // Inner engine alone, fed whole blocks.
    let mut direct = mono_convolver(8, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2, "default");
    let mut inner_out = Vec::new();
    let mut padded = samples.clone();
    padded.resize(24, 0.0);
    for block in padded.chunks(8) {
        inner_out.extend_from_slice(&run_block(&mut direct, block));
    }

    // The same engine behind the adapter, fed 3 frames at a time.
    let conv = mono_convolver(8, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2, "default");
    let mut adapter = BlockAdapter::new(conv).unwrap();
    let mut adapted_out = Vec::new();
    let mut out = [0.0f32; 3];
    for chunk in samples.chunks(3) {
        adapter.process(&[chunk], &mut [&mut out[..]], 3).unwrap();
        adapted_out.extend_from_slice(&out);
    }

    let mut expected = vec![0.0f32; 8];
    expected.extend_from_slice(&inner_out);
    assert_close(&adapted_out, &expected[..adapted_out.len()], 1e-5);
}

// ============ Algebraic Properties ============

#[test]
fn property_linearity() {
    let taps = [0.5f32, -0.25, 0.125, 0.7, -0.3, 0.05];
    let x1: Vec<f32> = (0..16).map(|i| (i as f32 * 0.9).sin()).collect();
    let x2: Vec<f32> = (0..16).map(|i| (i as f32 * 0.37).cos()).collect();
    let (a, b) = (0.8f32, -1.5f32);
    let mixed: Vec<f32> = x1.iter().zip(&x2).map(|(p, q)| a * p + b * q).collect();

    let mut y1 = Vec::new();
    let mut y2 = Vec::new();
    let mut y3 = Vec::new();
    for (signal, sink) in [(&x1, &mut y1), (&x2, &mut y2), (&mixed, &mut y3)] {
        let mut conv = mono_convolver(4, &taps, 2, "default");
        for block in signal.chunks(4) {
            sink.extend_from_slice(&run_block(&mut conv, block));
        }
    }
    for i in 0..y3.len() {
        let want = a * y1[i] + b * y2[i];
        assert!((y3[i] - want).abs() < 1e-4, "sample {i}: {} vs {want}", y3[i]);
    }
}

#[test]
fn property_time_invariance() {
    let taps = [0.9f32, -0.4, 0.2, 0.1, 0.6];
    let signal: Vec<f32> = (0..12).map(|i| (i as f32 * 1.3).sin()).collect();

    let mut plain = mono_convolver(4, &taps, 2, "default");
    let mut shifted = mono_convolver(4, &taps, 2, "default");

    let mut y_plain = Vec::new();
    for block in signal.chunks(4) {
        y_plain.extend_from_slice(&run_block(&mut plain, block));
    }
    let mut y_shifted = Vec::new();
    y_shifted.extend_from_slice(&run_block(&mut shifted, &[0.0; 4]));
    for block in signal.chunks(4) {
        y_shifted.extend_from_slice(&run_block(&mut shifted, block));
    }
    // Shifting the input by one block shifts the output by one block.
    for i in 0..y_plain.len() {
        assert!((y_shifted[i + 4] - y_plain[i]).abs() < 1e-4);
    }
}

#[test]
fn property_unity_gain_for_every_backend() {
    let signal: Vec<f32> = (0..16).map(|i| (i as f32 * 0.61).sin()).collect();
    for backend in ["realfft", "rustfft"] {
        let mut conv = mono_convolver(4, &[1.0, 0.0, 0.0, 0.0], 2, backend);
        for block in signal.chunks(4) {
            let output = run_block(&mut conv, block);
            assert_close(&output, block, 1e-4);
        }
    }
}

#[test]
fn property_unity_gain_double_precision_padded_bins() {
    // Alignment 8 pads the 5 bins of a 4-sample block to 8; the padding
    // must not leak into the output.
    let taps = [1.0f64, 0.0, 0.0, 0.0];
    let filters = AlignedMatrix::from_rows(&[&taps[..]], 8).unwrap();
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    let mut conv = MultichannelConvolver::<f64>::new(
        1, 1, 4, 4, 1, 1, &routings, Some(&filters), 8, "default",
    )
    .unwrap();
    let signal: Vec<f64> = (0..16).map(|i| (i as f64 * 0.17).cos()).collect();
    for block in signal.chunks(4) {
        let mut output = [0.0f64; 4];
        conv.process(block, 4, &mut output, 4, 0).unwrap();
        for (o, i) in output.iter().zip(block) {
            assert!((o - i).abs() < 1e-10);
        }
    }
}

#[test]
fn property_routing_sparsity() {
    let taps = [1.0f32, 0.5, 0.25, 0.125];
    let filters = filters_from(&[&taps]);
    let routings = RoutingList::new(vec![FilterRouting::new(0, 1, 0, 1.0)]);
    let mut conv = MultichannelConvolver::<f32>::new(
        1, 3, 4, 4, 4, 1, &routings, Some(&filters), 2, "default",
    )
    .unwrap();
    let input = [1.0f32, -1.0, 2.0, -2.0];
    let mut output = [7.0f32; 12];
    conv.process(&input, 4, &mut output, 4, 0).unwrap();
    // Unrouted outputs are exactly zero, not merely small.
    assert_eq!(&output[0..4], &[0.0; 4]);
    assert_eq!(&output[8..12], &[0.0; 4]);
    assert!(output[4..8].iter().any(|&x| x != 0.0));
}

#[test]
fn property_fdl_block_zero_holds_current_window() {
    let mut core = CoreConvolver::<f32>::new(
        1,
        1,
        4,
        8,
        1,
        None,
        2,
        "default",
    )
    .unwrap();
    let first = [1.0f32, 2.0, 3.0, 4.0];
    let second = [5.0f32, 6.0, 7.0, 8.0];
    core.process_inputs_split(&[&first]).unwrap();
    core.process_inputs_split(&[&second]).unwrap();

    // Inverse-transforming FDL block 0 recovers the most recent
    // dft_size window (previous block then current block), scaled by N.
    let bins = core.fdl_block(0, 0).unwrap()[..core.dft_bins()].to_vec();
    let mut backend = create_fft_backend::<f32>("default", core.dft_size(), 1).unwrap();
    let mut time = vec![0.0f32; core.dft_size()];
    backend.inverse(&bins, &mut time).unwrap();
    let n = core.dft_size() as f32;
    let window: Vec<f32> = first.iter().chain(&second).map(|&x| x).collect();
    for (t, w) in time.iter().zip(&window) {
        assert!((t / n - w).abs() < 1e-4, "{} vs {w}", t / n);
    }

    // Block 1 holds the previous window.
    let bins = core.fdl_block(0, 1).unwrap()[..core.dft_bins()].to_vec();
    backend.inverse(&bins, &mut time).unwrap();
    let previous: Vec<f32> = [0.0f32; 4].iter().chain(&first).map(|&x| x).collect();
    for (t, w) in time.iter().zip(&previous) {
        assert!((t / n - w).abs() < 1e-4);
    }
}

#[test]
fn property_interpolant_transition_settles_on_target() {
    let f0 = [1.0f32, 0.0, 0.0, 0.0];
    let f1 = [0.0f32, 0.0, 1.0, 0.0];
    let prototypes = filters_from(&[&f0, &f1]);
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    let start = InterpolationParameter::from_parts(0, vec![0, 1], vec![1.0, 0.0]).unwrap();
    let mut conv = InterpolatingConvolver::<f32>::new(
        1,
        1,
        4,
        4,
        1,
        2,
        2,
        8,
        &routings,
        &[start],
        Some(&prototypes),
        2,
        "default",
    )
    .unwrap();

    let input = [1.0f32, 0.0, 0.0, 0.0];
    let mut output = [0.0f32; 4];
    conv.process(&input, 4, &mut output, 4, 0).unwrap();
    assert_close(&output, &f0, 1e-5);

    // Fade to the other prototype over two blocks (8 samples).
    let target = InterpolationParameter::from_parts(0, vec![0, 1], vec![0.0, 1.0]).unwrap();
    conv.set_interpolant(&target, true).unwrap();
    conv.process(&input, 4, &mut output, 4, 0).unwrap();
    conv.process(&input, 4, &mut output, 4, 0).unwrap();
    conv.process(&input, 4, &mut output, 4, 0).unwrap();
    assert_close(&output, &f1, 1e-5);
}

#[test]
fn engine_matches_reference_after_simd_initialisation() {
    let taps = [0.4f32, -0.2, 0.6, 0.1, -0.5, 0.3];
    let signal: Vec<f32> = (0..24).map(|i| (i as f32 * 0.23).sin()).collect();

    uninitialise_library();
    let mut reference = mono_convolver(4, &taps, 8, "default");
    let mut y_reference = Vec::new();
    for block in signal.chunks(4) {
        y_reference.extend_from_slice(&run_block(&mut reference, block));
    }

    initialise_library(BackendHint::Auto);
    let mut accelerated = mono_convolver(4, &taps, 8, "default");
    let mut y_accelerated = Vec::new();
    for block in signal.chunks(4) {
        y_accelerated.extend_from_slice(&run_block(&mut accelerated, block));
    }
    uninitialise_library();

    assert_close(&y_accelerated, &y_reference, 1e-5);
}

#[test]
fn filter_spectra_match_between_time_and_frequency_upload() {
    // set_impulse_response and transform + set_transformed_filter land
    // identical data in the bank.
    let taps = [0.3f32, -0.6, 0.9, 0.2];
    let routings = RoutingList::new(vec![FilterRouting::new(0, 0, 0, 1.0)]);
    let mut direct = CrossfadingConvolver::<f32>::new(
        1, 1, 4, 4, 1, 1, 0, &routings, None, 2, "default",
    )
    .unwrap();
    let mut staged = CrossfadingConvolver::<f32>::new(
        1, 1, 4, 4, 1, 1, 0, &routings, None, 2, "default",
    )
    .unwrap();

    direct.set_impulse_response(&taps, 0, 0).unwrap();
    let mut bins = vec![Complex::new(0.0f32, 0.0); staged.filter_row_len()];
    staged.transform_impulse_response(&taps, 0, &mut bins).unwrap();
    staged.set_transformed_filter(&bins, 0, 0, true).unwrap();

    let input = [1.0f32, 0.0, -1.0, 0.5];
    let mut out_direct = [0.0f32; 4];
    let mut out_staged = [0.0f32; 4];
    for _ in 0..3 {
        direct.process(&input, 4, &mut out_direct, 4, 0).unwrap();
        staged.process(&input, 4, &mut out_staged, 4, 0).unwrap();
        assert_close(&out_staged, &out_direct, 1e-6);
    }
}
