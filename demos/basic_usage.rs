//! Basic usage example for slotcodec
//!
//! Run with: cargo run --example basic_usage

use slotcodec::*;

fn main() -> Result<()> {
    println!("slotcodec Basic Usage Example");
    println!("=============================");

    // Example 1: Simple message
    println!("\n1. String and Integer:");
    {
        let mut ring = RingBuffer::new(64)?;
        let params = Params::builder().str(5).push(TypeTag::Si4).build()?;

        let size = Encoder::new(&mut ring).encode(&params, &[Value::str("abcd"), Value::I32(-7)])?;
        println!("  Encoded {} bytes: {:02X?}", size, ring.to_vec());

        let values = Decoder::new(&mut ring).decode(&params)?;
        println!("  Decoded: {:?}", values);
    }

    // Example 2: Descriptor from a flat header, varints and a nested message
    println!("\n2. Parsed Header with Nested Message:");
    {
        // [2 entries: SV4, BSC [2 entries: UI1, STR max 8]]
        let params = Params::parse(&[2, 21, 29, 2, 6, 2, 8])?;
        let args = [
            Value::I32(1 << 30),
            Value::Args(vec![Value::U8(3), Value::str("inner")]),
        ];

        let mut ring = RingBuffer::new(64)?;
        let size = Encoder::new(&mut ring).encode(&params, &args)?;
        println!("  Encoded {} bytes ({} for the varint)", size, varint::encoded_len_u32(1 << 30));

        let values = Decoder::new(&mut ring).decode(&params)?;
        println!("  Decoded: {:?}", values);
    }

    // Example 3: Wraparound
    println!("\n3. Message Crossing the End of the Ring:");
    {
        let mut ring = RingBuffer::new(24)?;
        ring.reset_to(20)?;
        let params = Params::builder().push(TypeTag::Ui8).push(TypeTag::Dbl).build()?;

        Encoder::new(&mut ring).encode(&params, &[Value::U64(42), Value::F64(2.5)])?;
        let (head, tail) = ring.as_slices();
        println!("  Stored as {} + {} bytes", head.len(), tail.len());

        let values = Decoder::new(&mut ring).decode(&params)?;
        println!("  Decoded: {:?}", values);
    }

    // Example 4: Corruption detection
    println!("\n4. Hash Validation:");
    {
        let mut ring = RingBuffer::new(32)?;
        let params = Params::builder().push(TypeTag::Ui4).build()?;
        Encoder::new(&mut ring).encode(&params, &[Value::U32(0xC0FFEE)])?;

        let mut wire = ring.to_vec();
        wire[0] ^= 0x01;
        let mut corrupted = RingBuffer::with_contents(32, &wire)?;

        let mut decoder = Decoder::new(&mut corrupted);
        match decoder.decode(&params) {
            Ok(values) => println!("  Unexpected success: {:?}", values),
            Err(e) => println!("  Rejected: {} (decoder now in {})", e, decoder.state()),
        }
    }

    // Example 5: Session handshake and signals
    println!("\n5. Session Handshake:");
    {
        let mut link = RingBuffer::new(128)?;
        connect(&mut link, "sensor-3")?;

        let mut decoder = Decoder::session(&mut link);
        let peer = decoder.accept()?;
        println!("  Accepted peer {:?}, state {}", peer, decoder.state());

        let mut reply = RingBuffer::new(32)?;
        ack_back(&mut reply, "hub")?;
        println!("  Reply signal: {:?}", read_signal(&mut reply)?);
    }

    // Example 6: Error handling
    println!("\n6. Error Handling:");
    {
        let mut ring = RingBuffer::new(8)?;
        let params = Params::builder().push(TypeTag::Ui4).push(TypeTag::Ui4).build()?;

        let result = Encoder::new(&mut ring).encode(&params, &[Value::U32(1), Value::U32(2)]);
        match result {
            Ok(_) => println!("  Unexpected success"),
            Err(e) => println!(
                "  Expected error: {} ({}); stop left at {}",
                e,
                e.description(),
                ring.stop()
            ),
        }
    }

    println!("\nExample completed successfully!");
    Ok(())
}
