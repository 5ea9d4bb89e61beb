//! Logs synthetic events into a ring and serves them over TCP until a
//! client has connected and been read from once, or a few seconds pass.
//!
//! Run with `cargo run -p telemetry-tcp --bin demo`, then in another
//! terminal: `nc 127.0.0.1 4790 | xxd | head`.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use telemetry_core::{Config, Context, Field, FieldType, Filter, SchemaEntryDescriptor};
use telemetry_tcp::{serve, ServerConfig};

const TICK_SCHEMA_ID: u16 = 0;

fn main() {
    let descriptor = SchemaEntryDescriptor {
        id: TICK_SCHEMA_ID,
        name: "tick".into(),
        description: "a periodic counter tick".into(),
        payload_size: 4,
        fields: vec![Field::scalar("count", 0, 4, FieldType::U32)],
    };

    let mut ctx = Context::new(Config::new(4096));
    ctx.register(&descriptor).expect("schema registration");

    let shutdown = Arc::new(AtomicBool::new(false));

    let producer_shutdown = Arc::clone(&shutdown);
    thread::scope(|scope| {
        scope.spawn(|| {
            let mut count: u32 = 0;
            while !producer_shutdown.load(Ordering::Relaxed) {
                ctx.log(TICK_SCHEMA_ID, &count.to_ne_bytes()).unwrap();
                count = count.wrapping_add(1);
                thread::sleep(Duration::from_millis(5));
            }
        });

        let addr = "127.0.0.1:4790";
        println!("telemetry-tcp demo: serving {addr}");
        let server_shutdown = Arc::clone(&shutdown);
        let server = scope.spawn(|| {
            serve(
                &ctx,
                addr,
                Filter::all(),
                &server_shutdown,
                ServerConfig::default(),
            )
        });

        // Give the server a moment to bind before probing it.
        thread::sleep(Duration::from_millis(50));
        match TcpStream::connect(addr) {
            Ok(_) => println!("telemetry-tcp demo: a client connected successfully"),
            Err(e) => eprintln!("telemetry-tcp demo: probe connection failed: {e}"),
        }

        thread::sleep(Duration::from_millis(200));
        shutdown.store(true, Ordering::Relaxed);
        if let Err(e) = server.join().expect("server thread panicked") {
            eprintln!("telemetry-tcp demo: server ended with error: {e}");
        }
    });
}
