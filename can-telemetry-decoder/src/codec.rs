//! Signal decoding engine
//!
//! Extracts engineering-unit values from raw CAN frames according to the
//! signal catalog. Decoding is pure and total: a well-formed frame never
//! causes an error, a payload too short for one signal's byte range yields
//! a per-signal fault without touching the frame's other signals, and a
//! frame whose ID matches no catalog entry decodes to nothing at all.

use crate::signals::{ByteOrder, SignalCatalog, SignalKind, SignalSpec};
use crate::types::{RawFrame, Result, SignalRead, SignalValue, TelemetryError};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Stateless frame-to-signal decoder
pub struct SignalCodec<'a> {
    catalog: &'a SignalCatalog,
}

impl<'a> SignalCodec<'a> {
    /// Create a codec over a signal catalog
    pub fn new(catalog: &'a SignalCatalog) -> Self {
        Self { catalog }
    }

    /// Decode every catalog signal carried by this frame
    ///
    /// Returns one [`SignalRead`] per spec whose `frame_id` matches, each
    /// holding either the decoded value or that signal's decode fault.
    /// Unrecognized arbitration IDs return an empty vec - the upstream bus
    /// filter normally prevents them, but they are not an error here.
    pub fn decode(&self, frame: &RawFrame) -> Vec<SignalRead> {
        let Some(specs) = self.catalog.specs_for(frame.can_id) else {
            log::trace!("Ignoring frame with unmapped ID 0x{:X}", frame.can_id);
            return Vec::new();
        };

        specs
            .iter()
            .map(|spec| SignalRead {
                name: spec.name.clone(),
                value: Self::decode_signal(&frame.data, spec),
            })
            .collect()
    }

    /// Apply one spec to a frame payload
    fn decode_signal(data: &[u8], spec: &SignalSpec) -> Result<SignalValue> {
        let range = spec.byte_range();
        let field = data.get(range.clone()).ok_or_else(|| {
            log::warn!(
                "Signal '{}' needs payload bytes {}..{} but frame has {}",
                spec.name,
                range.start,
                range.end,
                data.len()
            );
            TelemetryError::ShortPayload {
                signal: spec.name.clone(),
                start: range.start,
                end: range.end,
                dlc: data.len(),
            }
        })?;

        let value = match spec.kind {
            SignalKind::Temperature => {
                SignalValue::Temperature(Self::to_physical(field, spec))
            }
            SignalKind::Volume => SignalValue::Volume(Self::to_physical(field, spec)),
            SignalKind::Flag => {
                // from_specs guarantees flag specs carry a mask
                let mask = spec.bit_mask.unwrap_or(0);
                SignalValue::Flag(field[0] & mask != 0)
            }
        };

        log::debug!("Decoded {}: {}", spec.name, value);
        Ok(value)
    }

    /// Read the raw u16 in the spec's byte order and scale it
    fn to_physical(field: &[u8], spec: &SignalSpec) -> f64 {
        let raw = match spec.byte_order {
            ByteOrder::BigEndian => BigEndian::read_u16(field),
            ByteOrder::LittleEndian => LittleEndian::read_u16(field),
        };
        raw as f64 * spec.scale + spec.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{FRAME_ENGINE_TEMPS, FRAME_FAULT_FLAGS, FRAME_FUEL_LEVEL};

    fn decode_one(catalog: &SignalCatalog, frame: &RawFrame, name: &str) -> Result<SignalValue> {
        SignalCodec::new(catalog)
            .decode(frame)
            .into_iter()
            .find(|read| read.name == name)
            .expect("signal present in frame")
            .value
    }

    #[test]
    fn test_temperature_decode_big_endian() {
        let catalog = SignalCatalog::default();
        // 0x0AB2 = 2738 deci-Kelvin -> 273.8 K -> 0.65 C
        let frame = RawFrame::new(
            FRAME_ENGINE_TEMPS,
            &[0x0A, 0xB2, 0x00, 0x00, 0x00, 0x00, 0x0A, 0xA0],
        );

        let coolant = decode_one(&catalog, &frame, "coolant_temp_celsius").unwrap();
        let SignalValue::Temperature(c) = coolant else {
            panic!("expected temperature, got {:?}", coolant)
        };
        assert!((c - 0.65).abs() < 1e-9, "coolant was {}", c);

        // 0x0AA0 = 2720 deci-Kelvin -> -1.15 C
        let oil = decode_one(&catalog, &frame, "oil_temp_celsius").unwrap();
        let SignalValue::Temperature(c) = oil else {
            panic!("expected temperature, got {:?}", oil)
        };
        assert!((c - (-1.15)).abs() < 1e-9, "oil was {}", c);
    }

    #[test]
    fn test_temperature_matches_reference_formula() {
        let catalog = SignalCatalog::default();
        for raw in [0u16, 1, 2731, 2738, 3731, u16::MAX] {
            let bytes = raw.to_be_bytes();
            let frame = RawFrame::new(
                FRAME_ENGINE_TEMPS,
                &[bytes[0], bytes[1], 0, 0, 0, 0, 0, 0],
            );
            let value = decode_one(&catalog, &frame, "coolant_temp_celsius").unwrap();
            let expected = raw as f64 / 10.0 - 273.15;
            // scale-multiply and reference-divide may differ by an ulp
            assert!((value.as_f64().unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fuel_decode() {
        let catalog = SignalCatalog::default();
        // 0x0190 = 400 deci-liters = 40.0 L -> 10.56688 gal
        let frame = RawFrame::new(FRAME_FUEL_LEVEL, &[0x01, 0x90, 0, 0, 0, 0, 0, 0]);
        let value = decode_one(&catalog, &frame, "fuel_level_gallons").unwrap();
        let gallons = value.as_f64().unwrap();
        assert!((gallons - 40.0 * 0.264172).abs() < 1e-6, "got {}", gallons);
    }

    #[test]
    fn test_fault_bits_are_pure_bit_tests() {
        let catalog = SignalCatalog::default();
        let cases = [
            (0b1000_0000u8, true, false),
            (0b0100_0000, false, true),
            (0x00, false, false),
            (0xC0, true, true),
        ];
        for (byte, abs_expected, mil_expected) in cases {
            let frame = RawFrame::new(FRAME_FAULT_FLAGS, &[0, 0, 0, 0, 0, 0, 0, byte]);
            let abs = decode_one(&catalog, &frame, "abs_error").unwrap();
            let mil = decode_one(&catalog, &frame, "check_engine").unwrap();
            assert_eq!(abs, SignalValue::Flag(abs_expected), "byte {:#04X}", byte);
            assert_eq!(mil, SignalValue::Flag(mil_expected), "byte {:#04X}", byte);
        }
    }

    #[test]
    fn test_short_payload_faults_only_that_signal() {
        let catalog = SignalCatalog::default();
        // 4 bytes: enough for coolant (0..2), too short for oil (6..8)
        let frame = RawFrame::new(FRAME_ENGINE_TEMPS, &[0x0A, 0xB2, 0x00, 0x00]);
        let reads = SignalCodec::new(&catalog).decode(&frame);
        assert_eq!(reads.len(), 2);

        let coolant = reads.iter().find(|r| r.name == "coolant_temp_celsius").unwrap();
        assert!(coolant.value.is_ok());

        let oil = reads.iter().find(|r| r.name == "oil_temp_celsius").unwrap();
        match &oil.value {
            Err(TelemetryError::ShortPayload { start, end, dlc, .. }) => {
                assert_eq!((*start, *end, *dlc), (6, 8, 4));
            }
            other => panic!("expected ShortPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload_does_not_panic() {
        let catalog = SignalCatalog::default();
        let frame = RawFrame::new(FRAME_FAULT_FLAGS, &[]);
        let reads = SignalCodec::new(&catalog).decode(&frame);
        assert!(reads.iter().all(|r| r.value.is_err()));
    }

    #[test]
    fn test_unmapped_id_decodes_to_nothing() {
        let catalog = SignalCatalog::default();
        let frame = RawFrame::new(0x372, &[0xFF; 8]);
        assert!(SignalCodec::new(&catalog).decode(&frame).is_empty());
    }

    #[test]
    fn test_little_endian_read() {
        let specs = vec![SignalSpec {
            frame_id: 0x200,
            name: "le_temp".to_string(),
            kind: SignalKind::Temperature,
            start_byte: 0,
            byte_order: ByteOrder::LittleEndian,
            bit_mask: None,
            scale: 0.1,
            offset: -273.15,
            unit: None,
        }];
        let catalog = SignalCatalog::from_specs(specs).unwrap();
        // bytes B2 0A read little-endian -> 0x0AB2 = 2738
        let frame = RawFrame::new(0x200, &[0xB2, 0x0A]);
        let value = decode_one(&catalog, &frame, "le_temp").unwrap();
        assert!((value.as_f64().unwrap() - 0.65).abs() < 1e-9);
    }
}
