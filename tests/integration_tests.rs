//! Integration tests for slotcodec
//!
//! These tests drive the public API end to end: encode into a ring, move the
//! bytes, decode them back.

use proptest::prelude::*;
use slotcodec::hash::hash_of;
use slotcodec::{
    ack_back, connect, read_signal, ring_bell, varint, ArrayValue, Decoder, Encoder, ErrorKind,
    ObjSize, Param, Params, Qualifier, RingBuffer, Signal, State, TypeTag, Value,
};

fn roundtrip(capacity: usize, start: usize, params: &Params, args: &[Value]) -> Vec<Value> {
    let mut ring = RingBuffer::new(capacity).unwrap();
    ring.reset_to(start).unwrap();
    Encoder::new(&mut ring).encode(params, args).unwrap();
    let values = Decoder::new(&mut ring).decode(params).unwrap();
    assert!(ring.is_empty());
    values
}

#[test]
fn test_address_host1_layout() {
    let mut ring = RingBuffer::new(32).unwrap();
    let params = Params::builder().address_max(8).build().unwrap();

    let size = Encoder::new(&mut ring)
        .encode(&params, &[Value::address("host1")])
        .unwrap();
    assert_eq!(size, 10);

    let bytes = ring.to_vec();
    assert_eq!(&bytes[..8], b"host1\0\0\0");
    assert_eq!(
        u16::from_le_bytes([bytes[8], bytes[9]]),
        hash_of(&bytes[..8])
    );

    let values = Decoder::new(&mut ring).decode(&params).unwrap();
    assert_eq!(values, [Value::address("host1")]);
}

#[test]
fn test_sv4_large_value_takes_five_bytes() {
    let mut ring = RingBuffer::new(32).unwrap();
    let params = Params::builder().push(TypeTag::Sv4).build().unwrap();

    let size = Encoder::new(&mut ring)
        .encode(&params, &[Value::I32(1 << 30)])
        .unwrap();
    assert_eq!(size - 2, 5);
    assert_eq!(
        Decoder::new(&mut ring).decode(&params).unwrap(),
        [Value::I32(1 << 30)]
    );
}

#[test]
fn test_string_and_int_roundtrip() {
    let params = Params::builder().str(5).push(TypeTag::Si4).build().unwrap();
    let args = [Value::str("abcd"), Value::I32(-7)];
    assert_eq!(roundtrip(64, 0, &params, &args), args);

    let mut ring = RingBuffer::new(64).unwrap();
    let err = Encoder::new(&mut ring)
        .encode(&params, &[Value::str("abcdef"), Value::I32(-7)])
        .unwrap_err();
    assert_eq!(err, ErrorKind::StringOverflow);
    assert_eq!(err.index(), Some(0));
    assert_eq!(ring.stop(), 0);
}

#[test]
fn test_every_tag_roundtrip() {
    let inner = Params::builder()
        .push(TypeTag::Ui2)
        .str(8)
        .build()
        .unwrap();
    let mut builder = Params::builder()
        .push(TypeTag::Nil)
        .address_max(6)
        .str(16)
        .push(TypeTag::Si1)
        .push(TypeTag::Ui1)
        .push(TypeTag::Bol)
        .push(TypeTag::Si2)
        .push(TypeTag::Ui2)
        .push(TypeTag::Hlf)
        .push(TypeTag::Si4)
        .push(TypeTag::Ui4)
        .push(TypeTag::Flt)
        .push(TypeTag::Tms)
        .push(TypeTag::Si8)
        .push(TypeTag::Ui8)
        .push(TypeTag::Dbl)
        .push(TypeTag::Tmu)
        .push(TypeTag::Sv2)
        .push(TypeTag::Uv2)
        .push(TypeTag::Sv4)
        .push(TypeTag::Uv4)
        .push(TypeTag::Sv8)
        .push(TypeTag::Uv8)
        .array(TypeTag::Ui1, 3)
        .array(TypeTag::Si2, 2)
        .array(TypeTag::Flt, 2)
        .array(TypeTag::Dbl, 1)
        .nested(inner)
        .object(ObjSize::W8, 8)
        .object(ObjSize::W64, 8);

    let mut args = vec![
        Value::Nil,
        Value::address("dev-1"),
        Value::str("héllo"),
        Value::I8(-128),
        Value::U8(255),
        Value::Bool(true),
        Value::I16(-30_000),
        Value::U16(65_535),
        Value::Half(0x3C00),
        Value::I32(i32::MIN),
        Value::U32(u32::MAX),
        Value::F32(-0.25),
        Value::Timestamp32(1_600_000_000),
        Value::I64(-(2 * 1024 * 1024)),
        Value::U64(u64::MAX),
        Value::F64(1.0),
        Value::Timestamp64(-1),
        Value::I16(i16::MIN),
        Value::U16(u16::MAX),
        Value::I32(-1),
        Value::U32(1 << 31),
        Value::I64(i64::MIN),
        Value::U64(1 << 63),
        Value::Array(ArrayValue::U8(vec![1, 2, 3])),
        Value::Array(ArrayValue::U16(vec![0xFFFF, 0x0102])),
        Value::Array(ArrayValue::U32(vec![(1.5f32).to_bits(), 0])),
        Value::Array(ArrayValue::U64(vec![(-2.0f64).to_bits()])),
        Value::Args(vec![Value::U16(77), Value::str("inner")]),
        Value::Object(vec![9, 8, 7]),
        Value::Object(vec![]),
    ];

    if cfg!(all(feature = "utf16", feature = "utf32")) {
        builder = builder.str16(8).str32(8);
        args.push(Value::Str16("ωmega".into()));
        args.push(Value::Str32("🦀 ok".into()));
    }

    let params = builder.build().unwrap();
    assert_eq!(roundtrip(512, 0, &params, &args), args);
}

#[test]
fn test_wide_signed_and_double_explicit() {
    let params = Params::builder()
        .push(TypeTag::Si8)
        .push(TypeTag::Dbl)
        .push(TypeTag::Sv8)
        .build()
        .unwrap();
    let args = [
        Value::I64(-(2 * 1024 * 1024)),
        Value::F64(1.0),
        Value::I64(-(2 * 1024 * 1024)),
    ];

    let mut ring = RingBuffer::new(64).unwrap();
    Encoder::new(&mut ring).encode(&params, &args).unwrap();
    let bytes = ring.to_vec();
    assert_eq!(&bytes[..8], &(-(2i64 * 1024 * 1024)).to_le_bytes());
    assert_eq!(&bytes[8..16], &1.0f64.to_le_bytes());

    assert_eq!(Decoder::new(&mut ring).decode(&params).unwrap(), args);
}

#[test]
fn test_varint_boundaries_through_codec() {
    let params = Params::builder()
        .push(TypeTag::Sv2)
        .push(TypeTag::Uv2)
        .push(TypeTag::Sv4)
        .push(TypeTag::Uv4)
        .push(TypeTag::Sv8)
        .push(TypeTag::Uv8)
        .build()
        .unwrap();

    let cases = [
        [0i64, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1],
        [-1, 127, -1, 128, -1, 16_383],
        [
            i16::MIN as i64,
            u16::MAX as i64,
            i32::MIN as i64,
            u32::MAX as i64,
            i64::MIN,
            -1,
        ],
        [
            i16::MAX as i64,
            0,
            i32::MAX as i64,
            0,
            i64::MAX,
            i64::MAX,
        ],
    ];

    for case in cases {
        let args = [
            Value::I16(case[0] as i16),
            Value::U16(case[1] as u16),
            Value::I32(case[2] as i32),
            Value::U32(case[3] as u32),
            Value::I64(case[4]),
            Value::U64(case[5] as u64),
        ];
        assert_eq!(roundtrip(128, 0, &params, &args), args);
    }
}

#[test]
fn test_wraparound_matches_control() {
    let params = Params::builder()
        .str(12)
        .push(TypeTag::Ui8)
        .push(TypeTag::Uv4)
        .array(TypeTag::Ui2, 3)
        .build()
        .unwrap();
    let args = [
        Value::str("wrap me"),
        Value::U64(0x0102_0304_0506_0708),
        Value::U32(300_000),
        Value::Array(ArrayValue::U16(vec![1, 2, 3])),
    ];

    let mut control = RingBuffer::new(48).unwrap();
    Encoder::new(&mut control).encode(&params, &args).unwrap();
    let expected = control.to_vec();

    for start in [40, 45, 47] {
        let mut ring = RingBuffer::new(48).unwrap();
        ring.reset_to(start).unwrap();
        Encoder::new(&mut ring).encode(&params, &args).unwrap();

        let (head, tail) = ring.as_slices();
        assert!(!tail.is_empty(), "start {} should wrap", start);
        assert_eq!([head, tail].concat(), expected);

        assert_eq!(Decoder::new(&mut ring).decode(&params).unwrap(), args);
    }
}

#[test]
fn test_overflow_leaves_last_complete_field() {
    let params = Params::builder()
        .push(TypeTag::Ui2)
        .str(32)
        .push(TypeTag::Ui1)
        .build()
        .unwrap();
    let args = [
        Value::U16(1),
        Value::str("this will not fit"),
        Value::U8(2),
    ];

    let mut ring = RingBuffer::new(12).unwrap();
    ring.reset_to(9).unwrap();
    let err = Encoder::new(&mut ring).encode(&params, &args).unwrap_err();

    assert_eq!(err, ErrorKind::BufferOverflow);
    assert_eq!(err.index(), Some(1));
    assert_eq!(ring.start(), 9);
    assert_eq!(ring.stop(), 11);
    assert_eq!(ring.len(), 2);
}

#[test]
fn test_single_byte_corruption_detected() {
    let params = Params::builder()
        .push(TypeTag::Ui4)
        .push(TypeTag::Si8)
        .push(TypeTag::Dbl)
        .array(TypeTag::Ui1, 4)
        .build()
        .unwrap();
    let args = [
        Value::U32(0xCAFE_F00D),
        Value::I64(-42),
        Value::F64(3.5),
        Value::Array(ArrayValue::U8(vec![1, 2, 3, 4])),
    ];

    let mut ring = RingBuffer::new(64).unwrap();
    Encoder::new(&mut ring).encode(&params, &args).unwrap();
    let wire = ring.to_vec();

    for i in 0..wire.len() {
        for flip in [0x01u8, 0x10, 0x80, 0xFF] {
            let mut corrupted = wire.clone();
            corrupted[i] ^= flip;
            let mut ring = RingBuffer::with_contents(64, &corrupted).unwrap();

            let mut decoder = Decoder::new(&mut ring);
            let err = decoder.decode(&params).unwrap_err();
            assert_eq!(err, ErrorKind::InvalidHash, "byte {} flip {:#x}", i, flip);
            assert_eq!(decoder.state(), State::Error);
            assert_eq!(ring.len(), wire.len());
        }
    }
}

#[test]
fn test_corruption_in_variable_length_fields_never_decodes() {
    let inner = Params::builder().push(TypeTag::Ui1).str(4).build().unwrap();
    let params = Params::builder()
        .address_max(6)
        .str(8)
        .push(TypeTag::Sv8)
        .push(TypeTag::Uv2)
        .array(TypeTag::Ui2, 2)
        .nested(inner)
        .object(ObjSize::W8, 8)
        .build()
        .unwrap();
    let args = [
        Value::address("dev-1"),
        Value::str("héllo"),
        Value::I64(-300),
        Value::U16(1000),
        Value::Array(ArrayValue::U16(vec![0xBEEF, 7])),
        Value::Args(vec![Value::U8(9), Value::str("in")]),
        Value::Object(vec![1, 2, 3]),
    ];

    let mut ring = RingBuffer::new(64).unwrap();
    let size = Encoder::new(&mut ring).encode(&params, &args).unwrap();
    let wire = ring.to_vec();
    assert_eq!(wire.len(), size);

    for i in 0..wire.len() {
        for flip in 1..=255u8 {
            let mut corrupted = wire.clone();
            corrupted[i] ^= flip;
            let mut ring = RingBuffer::with_contents(64, &corrupted).unwrap();

            let mut decoder = Decoder::new(&mut ring);
            let result = decoder.decode(&params);
            assert!(result.is_err(), "byte {} flip {:#x} decoded", i, flip);
            assert_eq!(decoder.state(), State::Error);
            assert_eq!(ring.len(), wire.len());
        }
    }
}

#[test]
fn test_back_to_back_messages() {
    let params = Params::builder().push(TypeTag::Uv4).str(8).build().unwrap();
    let mut ring = RingBuffer::new(40).unwrap();

    for round in 0..20u32 {
        let args = [Value::U32(round * 1000), Value::str("tick")];
        let mut encoder = Encoder::new(&mut ring);
        encoder.encode(&params, &args).unwrap();
        encoder.encode(&params, &args).unwrap();

        let mut decoder = Decoder::new(&mut ring);
        assert_eq!(decoder.decode(&params).unwrap(), args);
        assert_eq!(decoder.decode(&params).unwrap(), args);
        assert!(ring.is_empty());
    }
}

#[test]
fn test_streaming_chunks() {
    let params = Params::builder()
        .str(32)
        .object(ObjSize::W16, 64)
        .build()
        .unwrap();
    let args = [
        Value::str("partial delivery"),
        Value::Object((0..40).collect()),
    ];

    let mut sender = RingBuffer::new(128).unwrap();
    Encoder::new(&mut sender).encode(&params, &args).unwrap();
    let wire = sender.to_vec();

    let mut receiver = RingBuffer::new(128).unwrap();
    let mut decoded = None;
    for chunk in wire.chunks(5) {
        receiver.write_slice(chunk).unwrap();
        let mut decoder = Decoder::new(&mut receiver);
        if let Some(values) = decoder.try_decode(&params).unwrap() {
            decoded = Some(values);
        }
    }
    assert_eq!(decoded.unwrap(), args);
    assert!(receiver.is_empty());
}

#[test]
fn test_parsed_header_matches_builder() {
    // [count, UI1, STR max 10, AR4 of UI4 x 2, OBJ(16-bit) max 20]
    let header = [4, 6, 2, 10, 27, 12, 2, 63, 20];
    let parsed = Params::parse(&header).unwrap();
    let built = Params::builder()
        .push(TypeTag::Ui1)
        .str(10)
        .array(TypeTag::Ui4, 2)
        .object(ObjSize::W16, 20)
        .build()
        .unwrap();
    assert_eq!(parsed, built);
    assert_eq!(built.to_header(), header);

    let args = [
        Value::U8(3),
        Value::str("parsed"),
        Value::Array(ArrayValue::U32(vec![7, 8])),
        Value::Object(b"blob".to_vec()),
    ];
    assert_eq!(roundtrip(64, 30, &parsed, &args), args);
}

#[test]
fn test_session_handshake_flow() {
    let mut link = RingBuffer::new(128).unwrap();
    connect(&mut link, "sensor-3").unwrap();

    let params = Params::builder().push(TypeTag::Flt).build().unwrap();
    Encoder::new(&mut link)
        .encode(&params, &[Value::F32(21.5)])
        .unwrap();

    let mut decoder = Decoder::session(&mut link);
    assert_eq!(decoder.decode(&params).unwrap_err(), ErrorKind::Disconnected);
    assert_eq!(decoder.accept().unwrap(), "sensor-3");
    assert_eq!(decoder.decode(&params).unwrap(), [Value::F32(21.5)]);

    let mut reply = RingBuffer::new(32).unwrap();
    ack_back(&mut reply, "hub").unwrap();
    assert_eq!(read_signal(&mut reply).unwrap(), Signal::Ack("hub".into()));

    ring_bell(&mut reply, "sensor-3").unwrap();
    assert_eq!(
        read_signal(&mut reply).unwrap(),
        Signal::Bell("sensor-3".into())
    );
}

#[test]
fn test_error_recovery_and_reset() {
    let params = Params::builder().push(TypeTag::Ui2).build().unwrap();
    let mut ring = RingBuffer::with_contents(16, &[1, 2, 3, 4]).unwrap();

    let mut decoder = Decoder::new(&mut ring);
    assert_eq!(decoder.decode(&params).unwrap_err(), ErrorKind::InvalidHash);
    assert_eq!(decoder.decode(&params).unwrap_err(), ErrorKind::InvalidOperation);

    decoder.reset();
    assert_eq!(decoder.state(), State::Args);
    assert_eq!(decoder.buffered(), 0);
    assert_eq!(
        decoder.try_decode(&params).unwrap(),
        None
    );
}

#[test]
fn test_error_display() {
    let mut ring = RingBuffer::new(8).unwrap();
    let params = Params::builder().push(TypeTag::Ui8).build().unwrap();
    let err = Encoder::new(&mut ring)
        .encode(&params, &[Value::U64(1)])
        .unwrap_err();
    assert_eq!(err.to_string(), "buffer overflow at param 0 (buffer offset 0)");
}

fn field() -> impl Strategy<Value = (Param, Value)> {
    prop_oneof![
        any::<u8>().prop_map(|v| (Param::from(TypeTag::Ui1), Value::U8(v))),
        any::<bool>().prop_map(|v| (Param::from(TypeTag::Bol), Value::Bool(v))),
        any::<i16>().prop_map(|v| (Param::from(TypeTag::Sv2), Value::I16(v))),
        any::<i32>().prop_map(|v| (Param::from(TypeTag::Sv4), Value::I32(v))),
        any::<u32>().prop_map(|v| (Param::from(TypeTag::Ui4), Value::U32(v))),
        any::<i64>().prop_map(|v| (Param::from(TypeTag::Si8), Value::I64(v))),
        any::<i64>().prop_map(|v| (Param::from(TypeTag::Sv8), Value::I64(v))),
        any::<u64>().prop_map(|v| (Param::from(TypeTag::Uv8), Value::U64(v))),
        (-1.0e300f64..1.0e300).prop_map(|v| (Param::from(TypeTag::Dbl), Value::F64(v))),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| (
            Param::new(TypeTag::Str, Qualifier::MaxLength(12)),
            Value::Str(s)
        )),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip_random_fields(
        fields in proptest::collection::vec(field(), 1..20),
        start in 0usize..512,
    ) {
        let (entries, args): (Vec<Param>, Vec<Value>) = fields.into_iter().unzip();
        let params = Params::new(entries).unwrap();

        let mut ring = RingBuffer::new(512).unwrap();
        ring.reset_to(start).unwrap();
        let written = Encoder::new(&mut ring).encode(&params, &args).unwrap();
        prop_assert_eq!(ring.len(), written);

        let values = Decoder::new(&mut ring).decode(&params).unwrap();
        prop_assert_eq!(values, args);
        prop_assert!(ring.is_empty());
    }

    #[test]
    fn prop_varint_u64_roundtrip(value in any::<u64>()) {
        let mut buf = [0u8; varint::MAX_VARINT_U64_SIZE];
        let n = varint::pack_u64(value, &mut buf).unwrap();
        prop_assert_eq!(n, varint::encoded_len_u64(value));
        prop_assert_eq!(varint::unpack_u64(&buf[..n]).unwrap(), (value, n));
    }

    #[test]
    fn prop_varint_i32_roundtrip(value in any::<i32>()) {
        let mut buf = [0u8; varint::MAX_VARINT_U32_SIZE];
        let n = varint::pack_i32(value, &mut buf).unwrap();
        prop_assert_eq!(varint::unpack_i32(&buf[..n]).unwrap(), (value, n));
    }
}
