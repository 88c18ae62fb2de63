mod common;

use std::sync::Arc;

use bba::bridge::Bridge;
use bba::envelope;
use bba::framing::{checksum, Framer, Subtype};
use bba::packet::SrcName;
use bba::sink::Sink;
use bba::site::TableSet;
use bba::Result;
use chrono::{DateTime, Utc};

use common::{pfo_tables, wire_frame};

#[derive(Default)]
struct MemSink {
    published: Vec<(SrcName, DateTime<Utc>, Vec<u8>)>,
}

impl Sink for MemSink {
    fn publish(&mut self, src: &SrcName, time: DateTime<Utc>, data: &[u8]) -> Result<()> {
        self.published.push((src.clone(), time, data.to_vec()));
        Ok(())
    }
}

#[test]
fn decode_then_envelope_preserves_wire_bytes() {
    let frame = wire_frame(Subtype::Data, 697, 40, &[(1, &[1, 2, 3, 4]), (2, &[5, 6])]);
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();

    bridge.feed(&frame, &mut sink).unwrap();

    let (src, _, out) = &sink.published[0];
    assert_eq!(src.to_string(), "AZ_PFO_BHZ_BHN/BBA/BS");

    // Envelope metadata reproduces the decoded fields.
    let be16 = |off: usize| u16::from_be_bytes([out[off], out[off + 1]]);
    assert_eq!(be16(0), u16::from_be_bytes([frame[0], frame[1]]));
    assert_eq!(be16(2), envelope::FORMAT_TAG);
    let rate = f32::from_be_bytes([out[10], out[11], out[12], out[13]]);
    assert_eq!(rate, 40.0);
    assert_eq!(be16(16), 100, "sample count");
    assert_eq!(be16(18), 2, "channel count");
    assert_eq!(be16(20), common::HEADER_SIZE);

    // And the original frame rides behind it, unmodified.
    let env_len = usize::from(be16(4));
    assert_eq!(&out[env_len..], &frame[..]);
    assert_eq!(out.len(), env_len + frame.len());
}

#[test]
fn stream_without_sync_yields_nothing_until_real_frame() {
    // Starts with the data subtype byte but no sync marker.
    let mut stream = vec![0xab, 0x00, 0x11, 0x22, 0x33];
    let frame = wire_frame(Subtype::Data, 697, 40, &[(1, &[7, 8])]);
    stream.extend_from_slice(&frame);

    let mut framer = Framer::default();
    let mut frames = Vec::new();
    for &b in &stream {
        if let Ok(Some(f)) = framer.feed(b) {
            frames.push(f);
        }
    }
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data, frame);
}

#[test]
fn oversize_frame_dropped_then_next_frame_decodes() {
    let mut bridge = Bridge::new("AZ", pfo_tables(), 64);
    let mut sink = MemSink::default();

    let mut runaway = wire_frame(Subtype::Data, 697, 40, &[(1, &[0u8; 4])]);
    runaway[4..6].copy_from_slice(&4000u16.to_be_bytes());
    let mut stream = runaway;
    stream.extend_from_slice(&wire_frame(Subtype::Data, 697, 40, &[(2, &[9, 9])]));

    bridge.feed(&stream, &mut sink).unwrap();

    assert_eq!(bridge.stats.dropped, 1);
    assert_eq!(sink.published.len(), 1);
    assert_eq!(sink.published[0].0.channels, "BHN");
}

#[test]
fn corrupted_frame_rejected_corrected_checksum_accepted() {
    let good = wire_frame(Subtype::Data, 697, 40, &[(1, &[1, 2, 3, 4])]);

    // Flip one payload bit: rejected.
    let mut flipped = good.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0x80;
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();
    bridge.feed(&flipped, &mut sink).unwrap();
    assert!(sink.published.is_empty());
    assert_eq!(bridge.stats.dropped, 1);

    // Re-seal the checksum over the flipped payload: accepted.
    checksum::seal(&mut flipped);
    bridge.feed(&flipped, &mut sink).unwrap();
    assert_eq!(sink.published.len(), 1);
}

#[test]
fn das_status_resolves_parameter_names() {
    let frame = wire_frame(Subtype::DasStatus, 697, 1, &[(3, &[0, 1])]);
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();

    bridge.feed(&frame, &mut sink).unwrap();

    let (src, _, _) = &sink.published[0];
    assert_eq!(src.subcode, "DAS");
    assert_eq!(src.station, "PFO");
    assert_eq!(src.channels, "BATT");
}

#[test]
fn das_status_unknown_parameter_drops_frame() {
    let frame = wire_frame(Subtype::DasStatus, 697, 1, &[(99, &[0, 1])]);
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();

    bridge.feed(&frame, &mut sink).unwrap();

    assert!(sink.published.is_empty());
    assert_eq!(bridge.stats.dropped, 1);
}

#[test]
fn random_garbage_between_frames_never_loses_the_stream() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(0x1a2b);
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();

    let mut stream = Vec::new();
    for i in 0..20u8 {
        for _ in 0..rng.gen_range(0..64) {
            // Keep the sync byte out of the noise so each burst really is
            // garbage and not a half-started frame.
            let b: u8 = rng.gen();
            stream.push(if b == 0xda { 0x00 } else { b });
        }
        stream.extend_from_slice(&wire_frame(Subtype::Data, 697, 40, &[(1, &[i; 4])]));
    }

    bridge.feed(&stream, &mut sink).unwrap();
    assert_eq!(sink.published.len(), 20);
    assert_eq!(bridge.stats.forwarded, 20);
}

#[test]
fn reload_swaps_tables_between_frames() {
    let mut bridge = Bridge::new("AZ", pfo_tables(), 5000);
    let mut sink = MemSink::default();

    bridge
        .feed(&wire_frame(Subtype::Data, 697, 40, &[(1, &[0u8; 2])]), &mut sink)
        .unwrap();
    assert_eq!(sink.published[0].0.station, "PFO");

    let mut stations = std::collections::HashMap::new();
    stations.insert("697".to_string(), "PFO-B".to_string());
    bridge.reload(Arc::new(TableSet {
        stations,
        ..TableSet::default()
    }));

    bridge
        .feed(&wire_frame(Subtype::Data, 697, 40, &[(1, &[0u8; 2])]), &mut sink)
        .unwrap();
    assert_eq!(sink.published[1].0.station, "PFO-B");
}
