use std::sync::Arc;
use std::thread;

use vazao_core::{ServiceConfig, ThrottleService, ThrottlerConfig, VazaoConfig};

fn test_config() -> VazaoConfig {
    VazaoConfig {
        throttler: ThrottlerConfig {
            overall_rate: 100.0,
            min_rate: 0.0,
            buffer_capacity: 64,
        },
        service: ServiceConfig {
            command_channel_capacity: 1_024,
        },
    }
}

/// Several producer threads buffering against their own keys while the
/// main thread polls: everything buffered is emitted exactly once, and
/// per-source FIFO order survives the trip through the service.
#[test]
fn concurrent_producers_single_consumer() {
    let service = Arc::new(ThrottleService::with_seed(test_config(), 42).unwrap());

    let producers = 3;
    let per_producer = 50u32;

    for p in 0..producers {
        service.register_source(format!("p{p}")).unwrap();
        service.set_weight(format!("p{p}"), 1.0).unwrap();
    }

    thread::scope(|scope| {
        for p in 0..producers {
            let service = Arc::clone(&service);
            scope.spawn(move || {
                let key = format!("p{p}");
                for i in 0..per_producer {
                    service.buffer(key.clone(), (p, i)).unwrap();
                }
            });
        }

        // Poll with generously advancing simulated time until everything
        // buffered has come back out.
        let expected = producers as usize * per_producer as usize;
        let mut received: Vec<Vec<u32>> = vec![Vec::new(); producers as usize];
        let mut collected = 0;
        let mut now = 0.0;
        for _ in 0..100_000 {
            now += 1.0;
            if let Some((key, (p, i))) = service.poll(now).unwrap() {
                assert_eq!(key, format!("p{p}"));
                received[p as usize].push(i);
                collected += 1;
                if collected == expected {
                    break;
                }
            }
        }
        assert_eq!(collected, expected, "some buffered messages never emitted");

        for (p, indices) in received.iter().enumerate() {
            let sorted: Vec<u32> = (0..per_producer).collect();
            assert_eq!(indices, &sorted, "producer {p} messages out of order");
        }
    });

    let stats = service.stats().unwrap();
    assert_eq!(stats.source_count, producers as usize);
    for source in &stats.per_source {
        assert_eq!(source.backlog, 0);
    }
}

/// Buffering against a key nobody registered fails across the service
/// boundary with the same error the engine raises.
#[test]
fn unknown_key_error_crosses_the_service() {
    let service = ThrottleService::with_seed(test_config(), 1).unwrap();
    let err = service.buffer("nobody", (0u32, 0u32)).unwrap_err();
    assert!(matches!(
        err,
        vazao_core::ServiceError::Buffer(vazao_core::BufferError::UnknownKey(key)) if key == "nobody"
    ));
    service.shutdown().unwrap();
}

/// Shutdown drains cleanly even with messages still buffered.
#[test]
fn shutdown_with_backlog_is_clean() {
    let service = ThrottleService::with_seed(test_config(), 2).unwrap();
    service.register_source("s").unwrap();
    service.set_weight("s", 1.0).unwrap();
    for i in 0..10u32 {
        service.buffer("s", (0u32, i)).unwrap();
    }
    service.shutdown().unwrap();
}
