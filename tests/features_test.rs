//! Feature extraction: fixed length, worked example, degenerate inputs.

mod common;

use common::typed;
use typeprint::capture::KeystrokeEvent;
use typeprint::config::FeaturesConfig;
use typeprint::features::{FeatureExtractor, KeystrokeTimings};

fn sample_ab() -> Vec<KeystrokeEvent> {
    vec![
        KeystrokeEvent::press("A", 0.0),
        KeystrokeEvent::release("A", 100.0),
        KeystrokeEvent::press("B", 150.0),
        KeystrokeEvent::release("B", 230.0),
    ]
}

#[test]
fn length_is_always_feature_dim() {
    let extractor = FeatureExtractor::default();
    let long: Vec<KeystrokeEvent> = (0..250)
        .flat_map(|i| {
            let t = i as f64 * 100.0;
            vec![KeystrokeEvent::press("k", t), KeystrokeEvent::release("k", t + 40.0)]
        })
        .collect();
    assert_eq!(long.len(), 500);

    assert_eq!(extractor.extract(&[]).len(), 100);
    assert_eq!(extractor.extract(&[KeystrokeEvent::press("a", 0.0)]).len(), 100);
    assert_eq!(extractor.extract(&sample_ab()).len(), 100);
    assert_eq!(extractor.extract(&long).len(), 100);
}

#[test]
fn empty_and_single_event_are_all_zero() {
    let extractor = FeatureExtractor::default();
    assert!(extractor.extract(&[]).as_slice().iter().all(|v| *v == 0.0));
    let single = extractor.extract(&[KeystrokeEvent::release("a", 12.0)]);
    assert!(single.as_slice().iter().all(|v| *v == 0.0));
}

#[test]
fn worked_example_dwell_flight_and_statistics() {
    let v = FeatureExtractor::default().extract(&sample_ab());
    let s = v.as_slice();
    // dwell [100, 80], flight [130], mean/std dwell, mean/std flight
    assert_eq!(&s[..7], &[100.0, 80.0, 130.0, 90.0, 10.0, 130.0, 0.0]);
    assert!(s[7..].iter().all(|v| *v == 0.0));
}

#[test]
fn interleaved_press_hides_dwell() {
    let events = vec![
        KeystrokeEvent::press("A", 0.0),
        KeystrokeEvent::press("B", 30.0),
        KeystrokeEvent::release("A", 60.0),
        KeystrokeEvent::release("B", 90.0),
    ];
    let t = KeystrokeTimings::from_events(&events);
    assert!(t.dwell.is_empty());
    assert_eq!(t.flight, vec![30.0]);
}

#[test]
fn long_input_loses_statistics_by_default() {
    let events = typed(&"x".repeat(80), 50.0, 25.0);
    let t = KeystrokeTimings::from_events(&events);
    assert_eq!(t.dwell.len(), 80);
    assert_eq!(t.flight.len(), 79);

    let v = FeatureExtractor::default().extract(&events);
    // first 80 are dwell times, the rest flight; summary is truncated away
    assert!(v.as_slice()[..80].iter().all(|d| *d == 50.0));
    assert!(v.as_slice()[80..].iter().all(|f| *f == 75.0));
}

#[test]
fn reserve_summary_keeps_statistics() {
    let events = typed(&"x".repeat(80), 50.0, 25.0);
    let extractor = FeatureExtractor::new(FeaturesConfig {
        feature_dim: 100,
        reserve_summary_stats: true,
    });
    let v = extractor.extract(&events);
    assert_eq!(v.len(), 100);
    assert_eq!(&v.as_slice()[96..], &[50.0, 0.0, 75.0, 0.0]);
}

#[test]
fn extraction_is_pure() {
    let extractor = FeatureExtractor::default();
    let events = typed("correct horse", 87.0, 113.0);
    let a = extractor.extract(&events);
    let b = extractor.extract(&events);
    let bits = |v: &typeprint::FeatureVector| v.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a), bits(&b));
}
