use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::errors::LoggingResult;
use crate::factory::LoggerFactory;
use crate::log_record::LogRecord;
use crate::log_sink::LogSink;
use crate::severity::Severity;

const WORKERS: usize = 8;
const RECORDS: usize = 250;

#[derive(Default)]
struct CountingSink {
    count: AtomicUsize,
    inconsistent: AtomicUsize,
    seen: Mutex<HashSet<(u64, u64)>>,
}

impl LogSink for CountingSink {
    fn consume(&self, record: &LogRecord) -> LoggingResult<()> {
        self.count.fetch_add(1, Ordering::SeqCst);

        let worker = record.arg("worker").and_then(|v| v.as_u64());
        let index = record.arg("index").and_then(|v| v.as_u64());
        let (Some(worker), Some(index)) = (worker, index) else {
            self.inconsistent.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        };

        let expected_message = format!("worker {worker} record {index}");
        let expected_scope = format!("worker-{worker}");
        let consistent = record.message == expected_message
            && record.category == format!("pool::{worker}")
            && record.scope_messages() == vec![expected_scope.as_str()];
        if !consistent {
            self.inconsistent.fetch_add(1, Ordering::SeqCst);
        }
        self.seen.lock().unwrap().insert((worker, index));
        Ok(())
    }
}

#[test]
fn concurrent_emission_delivers_every_record_intact() {
    let sink = Arc::new(CountingSink::default());
    let factory = LoggerFactory::builder()
        .minimum_level(Severity::Trace)
        .add_sink(sink.clone())
        .build()
        .unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let factory = factory.clone();
            thread::spawn(move || {
                let logger = factory.create_logger(&format!("pool::{worker}")).unwrap();
                let _scope = logger.begin_scope("worker-{0}", &[worker.into()]);
                for index in 0..RECORDS {
                    logger.debug(
                        index as i32,
                        "worker {worker} record {index}",
                        &[worker.into(), index.into()],
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.count.load(Ordering::SeqCst), WORKERS * RECORDS);
    assert_eq!(sink.inconsistent.load(Ordering::SeqCst), 0);
    assert_eq!(sink.seen.lock().unwrap().len(), WORKERS * RECORDS);
}

#[test]
fn concurrent_create_logger_shares_one_entry() {
    let factory = LoggerFactory::new();
    let reference = factory.create_logger("shared").unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let factory = factory.clone();
            thread::spawn(move || factory.create_logger("shared").unwrap())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().shares_entry_with(&reference));
    }
}
