//! Equalizer precision tests
//!
//! Measures the steady-state response of the band chain with pure tones and
//! compares it against the configured gains.

use harmonia_audio::{
    AudioEffect, EqualizerPreset, EqualizerProfile, Equalizer, GainNode, SymphoniaDecoder,
};
use std::f32::consts::PI;
use std::io::Cursor;

const SAMPLE_RATE: u32 = 48_000;

fn sine(freq: f32, secs: f32) -> Vec<f32> {
    let frames = (SAMPLE_RATE as f32 * secs) as usize;
    (0..frames)
        .flat_map(|i| {
            let s = 0.25 * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin();
            [s, s]
        })
        .collect()
}

fn rms(buffer: &[f32]) -> f32 {
    (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
}

/// Gain in dB the node applies to a tone at `freq`, measured after settling
fn measured_gain_db(node: &mut dyn AudioEffect, freq: f32) -> f32 {
    let mut buffer = sine(freq, 1.0);
    let input = rms(&buffer[buffer.len() / 2..]);
    node.process(&mut buffer, SAMPLE_RATE);
    20.0 * (rms(&buffer[buffer.len() / 2..]) / input).log10()
}

fn equalizer(profile: EqualizerProfile) -> Equalizer {
    let mut eq = Equalizer::new(profile, 1.0);
    eq.reset();
    eq
}

#[test]
fn peaking_band_hits_its_gain_at_center() {
    let mut profile = EqualizerProfile::rich();
    // Band 4 is the 1 kHz peaking band
    profile.set_gain(4, 6.0).unwrap();
    let mut eq = equalizer(profile);

    let at_center = measured_gain_db(&mut eq, 1000.0);
    assert!((at_center - 6.0).abs() < 0.3, "1 kHz: {at_center:.2} dB");
}

#[test]
fn peaking_band_leaves_distant_frequencies_alone() {
    let mut profile = EqualizerProfile::rich();
    profile.set_gain(4, 9.0).unwrap();

    for freq in [40.0, 15_000.0] {
        let mut eq = equalizer(profile.clone());
        let gain = measured_gain_db(&mut eq, freq);
        assert!(gain.abs() < 0.75, "{freq} Hz: {gain:.2} dB");
    }
}

#[test]
fn cut_is_mirror_of_boost() {
    let mut boost = EqualizerProfile::simple();
    boost.set_gain(2, 8.0).unwrap();
    let mut cut = EqualizerProfile::simple();
    cut.set_gain(2, -8.0).unwrap();

    let up = measured_gain_db(&mut equalizer(boost), 1000.0);
    let down = measured_gain_db(&mut equalizer(cut), 1000.0);

    assert!((up + down).abs() < 0.3, "boost {up:.2} dB, cut {down:.2} dB");
}

#[test]
fn disabled_equalizer_is_transparent() {
    let mut profile = EqualizerProfile::rich();
    profile.apply_preset(EqualizerPreset::Rock).unwrap();
    let mut eq = equalizer(profile.clone());
    eq.apply(&profile, false).unwrap();
    eq.reset();

    for freq in [60.0, 1000.0, 12_000.0] {
        let gain = measured_gain_db(&mut eq, freq);
        assert!(gain.abs() < 0.05, "{freq} Hz: {gain:.3} dB");
    }

    // Re-enabling restores the curve without resupplying it
    eq.apply(&profile, true).unwrap();
    eq.reset();
    assert!(measured_gain_db(&mut eq, 12_000.0) > 2.0);
}

#[test]
fn master_gain_after_equalizer() {
    let mut profile = EqualizerProfile::rich();
    profile.set_gain(4, 6.0).unwrap();

    let mut chain: Vec<Box<dyn AudioEffect>> =
        vec![Box::new(equalizer(profile)), Box::new(GainNode::new(0.5))];
    for node in &mut chain {
        node.reset();
    }

    let mut buffer = sine(1000.0, 1.0);
    let input = rms(&buffer[buffer.len() / 2..]);
    for node in &mut chain {
        node.process(&mut buffer, SAMPLE_RATE);
    }
    let gain = 20.0 * (rms(&buffer[buffer.len() / 2..]) / input).log10();

    // +6 dB band, then -6.02 dB of linear gain
    assert!(gain.abs() < 0.35, "chain: {gain:.2} dB");
}

#[test]
fn decoded_wav_runs_through_equalizer() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..SAMPLE_RATE {
            let s = 0.25 * (2.0 * PI * 1000.0 * i as f32 / SAMPLE_RATE as f32).sin();
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    let source = SymphoniaDecoder::new()
        .decode_bytes(cursor.into_inner(), Some("wav"))
        .unwrap();
    assert_eq!(source.source_channels(), 1);
    assert_eq!(source.channels(), 2);

    let mut samples = source.buffer().samples.clone();
    let input = rms(&samples[samples.len() / 2..]);

    let mut profile = EqualizerProfile::rich();
    profile.set_gain(4, -6.0).unwrap();
    let mut eq = equalizer(profile);
    eq.process(&mut samples, SAMPLE_RATE);

    let gain = 20.0 * (rms(&samples[samples.len() / 2..]) / input).log10();
    assert!((gain + 6.0).abs() < 0.3, "decoded: {gain:.2} dB");
}
